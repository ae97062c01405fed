//! Chat Panel State
//!
//! Ordered messages for the open conversation. Optimistic copies, live
//! echoes and persisted copies of the same message are matched by
//! `client_key`, falling back to the server id, never by position.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::error::{ChatError, ChatResult};
use crate::models::{Conversation, Message};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStatus {
    /// Sent by me, not yet confirmed by the backend
    Pending,
    /// Sent by me and persisted
    Sent,
    /// Persisting failed; may be retried with the same key
    Failed,
    /// From the other participant
    Received,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatEntry {
    pub message: Message,
    pub status: DeliveryStatus,
}

impl ChatEntry {
    fn same_message(&self, other: &Message) -> bool {
        match (&self.message.client_key, &other.client_key) {
            (Some(a), Some(b)) if a == b => return true,
            _ => {}
        }
        matches!((&self.message.id, &other.id), (Some(a), Some(b)) if a == b)
    }
}

/// What happened to an inbound live message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundOutcome {
    Appended,
    /// Matched a local copy and filled in its server id
    Reconciled,
    /// Already displayed
    Duplicate,
    /// Addressed to another conversation; ignored
    WrongConversation,
}

#[derive(Debug, Clone)]
pub struct ChatPanel {
    me: String,
    conversation: Option<String>,
    entries: Vec<ChatEntry>,
}

impl ChatPanel {
    pub fn new(me: impl Into<String>) -> Self {
        Self {
            me: me.into(),
            conversation: None,
            entries: Vec::new(),
        }
    }

    pub fn me(&self) -> &str {
        &self.me
    }

    pub fn conversation(&self) -> Option<&str> {
        self.conversation.as_deref()
    }

    /// Switch to a conversation; entries from another one are dropped
    pub fn open(&mut self, conversation_id: impl Into<String>) {
        let conversation_id = conversation_id.into();
        if self.conversation.as_deref() != Some(conversation_id.as_str()) {
            self.entries.clear();
        }
        self.conversation = Some(conversation_id);
    }

    pub fn close(&mut self) {
        self.conversation = None;
        self.entries.clear();
    }

    pub fn entries(&self) -> &[ChatEntry] {
        &self.entries
    }

    pub fn find(&self, client_key: &str) -> Option<&ChatEntry> {
        self.entries
            .iter()
            .find(|e| e.message.client_key.as_deref() == Some(client_key))
    }

    fn find_mut(&mut self, client_key: &str) -> Option<&mut ChatEntry> {
        self.entries
            .iter_mut()
            .find(|e| e.message.client_key.as_deref() == Some(client_key))
    }

    fn status_for(&self, message: &Message) -> DeliveryStatus {
        if message.sender_id == self.me {
            DeliveryStatus::Sent
        } else {
            DeliveryStatus::Received
        }
    }

    /// Replace the view with the backend's history
    ///
    /// History order is kept as-is. Local entries the history does not
    /// contain (unconfirmed sends, live arrivals newer than the fetch) stay
    /// after it. Returns the number of history messages shown.
    pub fn load_history(&mut self, history: Vec<Message>) -> usize {
        let Some(conversation) = self.conversation.clone() else {
            return 0;
        };

        let history: Vec<ChatEntry> = history
            .into_iter()
            .filter(|m| m.conversation_id == conversation)
            .map(|message| ChatEntry {
                status: self.status_for(&message),
                message,
            })
            .collect();

        let leftovers: Vec<ChatEntry> = std::mem::take(&mut self.entries)
            .into_iter()
            .filter(|local| !history.iter().any(|h| h.same_message(&local.message)))
            .collect();

        let count = history.len();
        self.entries = history;
        self.entries.extend(leftovers);
        count
    }

    /// Apply a message that arrived on the live channel
    pub fn apply_inbound(&mut self, message: Message) -> InboundOutcome {
        if self.conversation.as_deref() != Some(message.conversation_id.as_str()) {
            return InboundOutcome::WrongConversation;
        }

        if let Some(entry) = self.entries.iter_mut().find(|e| e.same_message(&message)) {
            if entry.message.id.is_none() && message.id.is_some() {
                entry.message.id = message.id;
                return InboundOutcome::Reconciled;
            }
            return InboundOutcome::Duplicate;
        }

        let status = self.status_for(&message);
        self.entries.push(ChatEntry { message, status });
        InboundOutcome::Appended
    }

    /// Append an optimistic copy and return the message to emit and persist
    pub fn begin_send(&mut self, text: &str, now: DateTime<Utc>) -> ChatResult<Message> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        let conversation_id = self.conversation.clone().ok_or(ChatError::NoConversation)?;

        let message = Message {
            id: None,
            conversation_id,
            sender_id: self.me.clone(),
            text: text.to_string(),
            sent_at: now,
            client_key: Some(Uuid::new_v4().to_string()),
        };

        self.entries.push(ChatEntry {
            message: message.clone(),
            status: DeliveryStatus::Pending,
        });
        Ok(message)
    }

    /// The backend stored the message; adopt its id and timestamp
    pub fn mark_persisted(&mut self, client_key: &str, stored: &Message) -> bool {
        let Some(entry) = self.find_mut(client_key) else {
            return false;
        };
        if stored.id.is_some() {
            entry.message.id = stored.id.clone();
        }
        entry.message.sent_at = stored.sent_at;
        entry.status = DeliveryStatus::Sent;
        true
    }

    pub fn mark_failed(&mut self, client_key: &str) -> bool {
        match self.find_mut(client_key) {
            Some(entry) if entry.status == DeliveryStatus::Pending => {
                entry.status = DeliveryStatus::Failed;
                true
            }
            _ => false,
        }
    }

    /// Put a failed message back to pending; the key is kept
    pub fn retry(&mut self, client_key: &str) -> ChatResult<Message> {
        let entry = self
            .find_mut(client_key)
            .ok_or_else(|| ChatError::UnknownMessage(client_key.to_string()))?;
        if entry.status != DeliveryStatus::Failed {
            return Err(ChatError::NotFailed(client_key.to_string()));
        }
        entry.status = DeliveryStatus::Pending;
        Ok(entry.message.clone())
    }
}

/// Entries already shown by a line-oriented view
///
/// Entries are recognized by client key or server id, so arrivals that
/// land between two snapshots are shown exactly once wherever they sit.
#[derive(Debug, Default)]
pub struct SeenEntries {
    seen: HashSet<String>,
}

impl SeenEntries {
    pub fn new() -> Self {
        Self::default()
    }

    fn identities(message: &Message) -> Vec<String> {
        let mut ids = Vec::with_capacity(2);
        if let Some(key) = &message.client_key {
            ids.push(format!("key:{}", key));
        }
        if let Some(id) = &message.id {
            ids.push(format!("id:{}", id));
        }
        if ids.is_empty() {
            ids.push(format!(
                "raw:{}:{}:{}",
                message.sender_id,
                message.sent_at.timestamp_millis(),
                message.text
            ));
        }
        ids
    }

    /// Entries of `entries` not returned before, in panel order
    pub fn unseen<'a>(&mut self, entries: &'a [ChatEntry]) -> Vec<&'a ChatEntry> {
        let mut fresh = Vec::new();
        for entry in entries {
            let ids = Self::identities(&entry.message);
            if !ids.iter().any(|id| self.seen.contains(id)) {
                fresh.push(entry);
            }
            // Remember ids learned later, such as a server id after persisting
            self.seen.extend(ids);
        }
        fresh
    }
}

/// Conversations `me` takes part in, most recently active first
pub fn arrange_inbox(conversations: Vec<Conversation>, me: &str) -> Vec<Conversation> {
    let mut mine: Vec<Conversation> = conversations
        .into_iter()
        .filter(|c| c.involves(me))
        .collect();
    mine.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    mine
}

#[cfg(test)]
pub(crate) fn message(id: Option<&str>, conversation: &str, sender: &str, text: &str, key: Option<&str>) -> Message {
    Message {
        id: id.map(str::to_string),
        conversation_id: conversation.to_string(),
        sender_id: sender.to_string(),
        text: text.to_string(),
        sent_at: Utc::now(),
        client_key: key.map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn panel() -> ChatPanel {
        let mut panel = ChatPanel::new("u1");
        panel.open("c1");
        panel
    }

    fn texts(panel: &ChatPanel) -> Vec<&str> {
        panel.entries().iter().map(|e| e.message.text.as_str()).collect()
    }

    #[test]
    fn test_history_order_is_kept() {
        let mut panel = panel();
        let count = panel.load_history(vec![
            message(Some("m2"), "c1", "v1", "second", None),
            message(Some("m1"), "c1", "u1", "first", None),
        ]);
        assert_eq!(count, 2);
        assert_eq!(texts(&panel), vec!["second", "first"]);
        assert_eq!(panel.entries()[0].status, DeliveryStatus::Received);
        assert_eq!(panel.entries()[1].status, DeliveryStatus::Sent);
    }

    #[test]
    fn test_inbound_for_other_conversation_is_ignored() {
        let mut panel = panel();
        let outcome = panel.apply_inbound(message(Some("m9"), "c2", "v1", "elsewhere", None));
        assert_eq!(outcome, InboundOutcome::WrongConversation);
        assert!(panel.entries().is_empty());

        let mut closed = ChatPanel::new("u1");
        assert_eq!(
            closed.apply_inbound(message(Some("m9"), "c1", "v1", "hi", None)),
            InboundOutcome::WrongConversation
        );
    }

    #[test]
    fn test_inbound_appended_once() {
        let mut panel = panel();
        let msg = message(Some("m1"), "c1", "v1", "hello", Some("k1"));
        assert_eq!(panel.apply_inbound(msg.clone()), InboundOutcome::Appended);
        assert_eq!(panel.apply_inbound(msg), InboundOutcome::Duplicate);
        assert_eq!(panel.entries().len(), 1);
    }

    #[test]
    fn test_echo_and_persist_reconcile_by_key() {
        let mut panel = panel();
        panel.apply_inbound(message(Some("m0"), "c1", "v1", "hi", None));

        let sent = panel.begin_send("  hello there ", Utc::now()).unwrap();
        let key = sent.client_key.clone().unwrap();
        assert_eq!(sent.text, "hello there");
        assert_eq!(panel.find(&key).unwrap().status, DeliveryStatus::Pending);

        // A message from the vendor lands between send and echo
        panel.apply_inbound(message(Some("m1"), "c1", "v1", "busy?", None));

        let mut echo = sent.clone();
        echo.id = Some("m2".to_string());
        assert_eq!(panel.apply_inbound(echo.clone()), InboundOutcome::Reconciled);

        assert!(panel.mark_persisted(&key, &echo));
        let entry = panel.find(&key).unwrap();
        assert_eq!(entry.status, DeliveryStatus::Sent);
        assert_eq!(entry.message.id.as_deref(), Some("m2"));
        assert_eq!(texts(&panel), vec!["hi", "hello there", "busy?"]);
    }

    #[test]
    fn test_send_requires_text_and_conversation() {
        let mut panel = panel();
        assert_eq!(
            panel.begin_send("   ", Utc::now()),
            Err(ChatError::EmptyMessage)
        );

        let mut closed = ChatPanel::new("u1");
        assert_eq!(
            closed.begin_send("hi", Utc::now()),
            Err(ChatError::NoConversation)
        );
        assert!(panel.entries().is_empty());
    }

    #[test]
    fn test_failed_send_can_be_retried_with_same_key() {
        let mut panel = panel();
        let sent = panel.begin_send("hello", Utc::now()).unwrap();
        let key = sent.client_key.unwrap();

        assert_eq!(panel.retry(&key), Err(ChatError::NotFailed(key.clone())));
        assert!(panel.mark_failed(&key));
        assert_eq!(panel.find(&key).unwrap().status, DeliveryStatus::Failed);

        let again = panel.retry(&key).unwrap();
        assert_eq!(again.client_key.as_deref(), Some(key.as_str()));
        assert_eq!(panel.find(&key).unwrap().status, DeliveryStatus::Pending);
        assert_eq!(panel.entries().len(), 1);
        assert!(matches!(panel.retry("nope"), Err(ChatError::UnknownMessage(_))));
    }

    #[test]
    fn test_history_keeps_unconfirmed_local_entries() {
        let mut panel = panel();
        let pending = panel.begin_send("on its way", Utc::now()).unwrap();
        let confirmed = panel.begin_send("already stored", Utc::now()).unwrap();

        let mut stored = confirmed.clone();
        stored.id = Some("m5".to_string());
        panel.load_history(vec![
            message(Some("m4"), "c1", "v1", "earlier", None),
            stored,
        ]);

        assert_eq!(texts(&panel), vec!["earlier", "already stored", "on its way"]);
        let key = pending.client_key.unwrap();
        assert_eq!(panel.find(&key).unwrap().status, DeliveryStatus::Pending);
    }

    #[test]
    fn test_open_other_conversation_clears() {
        let mut panel = panel();
        panel.apply_inbound(message(Some("m1"), "c1", "v1", "hi", None));
        panel.open("c1");
        assert_eq!(panel.entries().len(), 1);
        panel.open("c2");
        assert!(panel.entries().is_empty());
        assert_eq!(panel.conversation(), Some("c2"));
    }

    #[test]
    fn test_arrange_inbox_filters_and_orders() {
        let at = |h: u32| Utc.with_ymd_and_hms(2026, 5, 1, h, 0, 0).unwrap();
        let conversation = |id: &str, customer: &str, vendor: &str, h: u32| Conversation {
            id: id.to_string(),
            customer_id: customer.to_string(),
            vendor_id: vendor.to_string(),
            last_message: None,
            updated_at: at(h),
        };

        let arranged = arrange_inbox(
            vec![
                conversation("old", "u1", "v1", 8),
                conversation("other", "u2", "v1", 12),
                conversation("new", "v2", "u1", 10),
            ],
            "u1",
        );
        let ids: Vec<&str> = arranged.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "old"]);
    }

    #[test]
    fn test_seen_entries_show_interleaved_arrival_once() {
        let mut panel = panel();
        panel.apply_inbound(message(Some("m1"), "c1", "v1", "hello", None));

        let mut seen = SeenEntries::new();
        assert_eq!(seen.unseen(panel.entries()).len(), 1);

        // A reply lands between the snapshot and our own send
        panel.apply_inbound(message(None, "c1", "v1", "still there?", Some("k-v")));
        let mine = panel.begin_send("yes", Utc::now()).unwrap();
        let key = mine.client_key.clone().unwrap();
        let mut stored = mine.clone();
        stored.id = Some("m9".to_string());
        panel.mark_persisted(&key, &stored);

        let fresh: Vec<&str> = seen
            .unseen(panel.entries())
            .iter()
            .map(|e| e.message.text.as_str())
            .collect();
        assert_eq!(fresh, vec!["still there?", "yes"]);
        assert!(seen.unseen(panel.entries()).is_empty());

        // The server's copy of an entry already shown is not shown again
        panel.load_history(vec![
            message(Some("m1"), "c1", "v1", "hello", None),
            message(Some("m9"), "c1", "u1", "yes", None),
        ]);
        assert!(seen.unseen(panel.entries()).is_empty());
    }
}
