//! Chat Session
//!
//! One open conversation: REST history, a live room subscription feeding the
//! panel, and sends that go out on both paths.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use super::error::{ChatError, ChatResult};
use super::events::ClientEvent;
use super::live::LiveChannel;
use super::panel::{arrange_inbox, ChatEntry, ChatPanel, InboundOutcome};
use crate::api::{ApiResult, MarketplaceClient};
use crate::models::{Conversation, Message, User};

/// Conversation endpoints the chat needs
#[async_trait]
pub trait ConversationApi: Send + Sync {
    async fn open_conversation(&self, customer_id: &str, vendor_id: &str) -> ApiResult<Conversation>;
    async fn conversations(&self, participant_id: &str) -> ApiResult<Vec<Conversation>>;
    async fn messages(&self, conversation_id: &str) -> ApiResult<Vec<Message>>;
    async fn persist_message(&self, message: &Message) -> ApiResult<Message>;
}

#[async_trait]
impl ConversationApi for MarketplaceClient {
    async fn open_conversation(&self, customer_id: &str, vendor_id: &str) -> ApiResult<Conversation> {
        MarketplaceClient::open_conversation(self, customer_id, vendor_id).await
    }

    async fn conversations(&self, participant_id: &str) -> ApiResult<Vec<Conversation>> {
        MarketplaceClient::conversations(self, participant_id).await
    }

    async fn messages(&self, conversation_id: &str) -> ApiResult<Vec<Message>> {
        MarketplaceClient::messages(self, conversation_id).await
    }

    async fn persist_message(&self, message: &Message) -> ApiResult<Message> {
        MarketplaceClient::persist_message(self, message).await
    }
}

/// Conversations the user takes part in, most recent first
pub async fn inbox<A: ConversationApi + ?Sized>(api: &A, me: &str) -> ChatResult<Vec<Conversation>> {
    if me.trim().is_empty() {
        return Err(ChatError::MissingParticipant);
    }
    Ok(arrange_inbox(api.conversations(me).await?, me))
}

pub struct ChatSession<A: ConversationApi + 'static> {
    api: Arc<A>,
    live: Arc<LiveChannel>,
    conversation: Conversation,
    panel: Arc<Mutex<ChatPanel>>,
    pump: JoinHandle<()>,
}

impl<A: ConversationApi + 'static> ChatSession<A> {
    /// Open (or create) the conversation between `me` and `counterpart_id`
    ///
    /// Joins the live room before loading history so messages posted during
    /// the fetch are not lost. On failure nothing stays subscribed.
    pub async fn open(
        api: Arc<A>,
        live: Arc<LiveChannel>,
        me: &User,
        counterpart_id: &str,
    ) -> ChatResult<Self> {
        if me.id.trim().is_empty() || counterpart_id.trim().is_empty() {
            return Err(ChatError::MissingParticipant);
        }

        let (customer_id, vendor_id) = if me.is_vendor() {
            (counterpart_id, me.id.as_str())
        } else {
            (me.id.as_str(), counterpart_id)
        };

        let conversation = api.open_conversation(customer_id, vendor_id).await?;
        tracing::info!(conversation_id = %conversation.id, "Conversation opened");

        let mut panel = ChatPanel::new(me.id.clone());
        panel.open(conversation.id.clone());
        let panel = Arc::new(Mutex::new(panel));

        let mut subscription = live.join(&conversation.id)?;
        let pump_panel = Arc::clone(&panel);
        let pump = tokio::spawn(async move {
            while let Some(message) = subscription.next_message().await {
                let outcome = pump_panel.lock().await.apply_inbound(message);
                if outcome == InboundOutcome::Appended {
                    tracing::debug!(room = %subscription.room(), "Live message appended");
                }
            }
        });

        let session = Self {
            api,
            live,
            conversation,
            panel,
            pump,
        };

        let history = session.api.messages(&session.conversation.id).await?;
        let shown = session.panel.lock().await.load_history(history);
        tracing::debug!(conversation_id = %session.conversation.id, messages = shown, "History loaded");

        Ok(session)
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Send a new message
    ///
    /// Appears immediately as pending, goes out on the live channel, and is
    /// then persisted. Persist failure marks it failed and returns the error.
    pub async fn send(&self, text: &str) -> ChatResult<Message> {
        let message = self.panel.lock().await.begin_send(text, Utc::now())?;
        self.deliver(message).await
    }

    /// Resend a failed message under its original key
    pub async fn retry(&self, client_key: &str) -> ChatResult<Message> {
        let message = self.panel.lock().await.retry(client_key)?;
        self.deliver(message).await
    }

    async fn deliver(&self, message: Message) -> ChatResult<Message> {
        let key = message.client_key.clone().unwrap_or_default();

        if let Err(e) = self.live.emit(ClientEvent::SendMessage {
            message: message.clone(),
        }) {
            tracing::warn!(error = %e, "Live relay unavailable, persisting only");
        }

        match self.api.persist_message(&message).await {
            Ok(stored) => {
                self.panel.lock().await.mark_persisted(&key, &stored);
                tracing::debug!(conversation_id = %message.conversation_id, "Message persisted");
                Ok(stored)
            }
            Err(e) => {
                self.panel.lock().await.mark_failed(&key);
                tracing::warn!(conversation_id = %message.conversation_id, error = %e, "Message not persisted");
                Err(e.into())
            }
        }
    }

    /// Copy of the current entries
    pub async fn snapshot(&self) -> Vec<ChatEntry> {
        self.panel.lock().await.entries().to_vec()
    }
}

impl<A: ConversationApi + 'static> Drop for ChatSession<A> {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use crate::chat::events::ServerEvent;
    use crate::chat::panel::{message, DeliveryStatus};
    use crate::models::Role;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;
    use tokio::sync::mpsc;

    #[derive(Default)]
    struct FakeApi {
        history: Vec<Message>,
        persisted: std::sync::Mutex<Vec<Message>>,
        fail_persist: AtomicBool,
        fail_open: bool,
    }

    #[async_trait]
    impl ConversationApi for FakeApi {
        async fn open_conversation(&self, customer_id: &str, vendor_id: &str) -> ApiResult<Conversation> {
            if self.fail_open {
                return Err(ApiError::Network("down".to_string()));
            }
            Ok(Conversation {
                id: "c1".to_string(),
                customer_id: customer_id.to_string(),
                vendor_id: vendor_id.to_string(),
                last_message: None,
                updated_at: Utc::now(),
            })
        }

        async fn conversations(&self, participant_id: &str) -> ApiResult<Vec<Conversation>> {
            let older = Utc::now() - chrono::Duration::hours(1);
            Ok(vec![
                Conversation {
                    id: "old".to_string(),
                    customer_id: participant_id.to_string(),
                    vendor_id: "v1".to_string(),
                    last_message: None,
                    updated_at: older,
                },
                Conversation {
                    id: "new".to_string(),
                    customer_id: participant_id.to_string(),
                    vendor_id: "v2".to_string(),
                    last_message: Some("see you".to_string()),
                    updated_at: Utc::now(),
                },
                Conversation {
                    id: "stranger".to_string(),
                    customer_id: "someone".to_string(),
                    vendor_id: "v3".to_string(),
                    last_message: None,
                    updated_at: Utc::now(),
                },
            ])
        }

        async fn messages(&self, _conversation_id: &str) -> ApiResult<Vec<Message>> {
            Ok(self.history.clone())
        }

        async fn persist_message(&self, msg: &Message) -> ApiResult<Message> {
            if self.fail_persist.load(Ordering::SeqCst) {
                return Err(ApiError::Timeout);
            }
            let mut persisted = self.persisted.lock().unwrap();
            let mut stored = msg.clone();
            stored.id = Some(format!("m{}", persisted.len() + 100));
            persisted.push(stored.clone());
            Ok(stored)
        }
    }

    fn customer() -> User {
        User {
            id: "u1".to_string(),
            name: "Amina".to_string(),
            email: "amina@example.com".to_string(),
            phone: None,
            role: Role::Customer,
        }
    }

    async fn settle<F>(session: &ChatSession<FakeApi>, done: F) -> Vec<ChatEntry>
    where
        F: Fn(&[ChatEntry]) -> bool,
    {
        for _ in 0..100 {
            let entries = session.snapshot().await;
            if done(&entries) {
                return entries;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        session.snapshot().await
    }

    async fn open_with(
        api: FakeApi,
    ) -> (
        ChatSession<FakeApi>,
        mpsc::UnboundedReceiver<ClientEvent>,
        tokio::sync::broadcast::Sender<ServerEvent>,
    ) {
        let (live, outbound, inbound) = LiveChannel::loopback();
        let session = ChatSession::open(Arc::new(api), Arc::new(live), &customer(), "v1")
            .await
            .unwrap();
        (session, outbound, inbound)
    }

    #[tokio::test]
    async fn test_open_joins_room_and_loads_history() {
        let api = FakeApi {
            history: vec![message(Some("m1"), "c1", "v1", "welcome", None)],
            ..Default::default()
        };
        let (session, mut outbound, _inbound) = open_with(api).await;

        assert_eq!(session.conversation().customer_id, "u1");
        assert_eq!(session.conversation().vendor_id, "v1");
        assert_eq!(
            outbound.recv().await,
            Some(ClientEvent::JoinRoom {
                room: "c1".to_string()
            })
        );
        let entries = session.snapshot().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, DeliveryStatus::Received);
    }

    #[tokio::test]
    async fn test_send_emits_persists_and_reconciles_echo() {
        let (session, mut outbound, inbound) = open_with(FakeApi::default()).await;
        outbound.recv().await;

        let stored = session.send("Is Saturday free?").await.unwrap();
        assert_eq!(stored.id.as_deref(), Some("m100"));

        let emitted = match outbound.recv().await {
            Some(ClientEvent::SendMessage { message }) => message,
            other => panic!("Expected SendMessage, got {:?}", other),
        };
        assert_eq!(emitted.client_key, stored.client_key);

        // Relay echo of our own message, then a reply and a stray event
        inbound
            .send(ServerEvent::ReceiveMessage { message: emitted })
            .unwrap();
        inbound
            .send(ServerEvent::ReceiveMessage {
                message: message(Some("x"), "c2", "v2", "wrong room", None),
            })
            .unwrap();
        inbound
            .send(ServerEvent::ReceiveMessage {
                message: message(Some("m101"), "c1", "v1", "Yes, 10:00", None),
            })
            .unwrap();

        let entries = settle(&session, |e| e.len() >= 2).await;
        let texts: Vec<_> = entries.iter().map(|e| e.message.text.as_str()).collect();
        assert_eq!(texts, vec!["Is Saturday free?", "Yes, 10:00"]);
        assert_eq!(entries[0].status, DeliveryStatus::Sent);
        assert_eq!(entries[0].message.id.as_deref(), Some("m100"));
    }

    #[tokio::test]
    async fn test_persist_failure_marks_failed_then_retry() {
        let api = FakeApi::default();
        api.fail_persist.store(true, Ordering::SeqCst);
        let (session, _outbound, _inbound) = open_with(api).await;

        let err = session.send("hello").await.unwrap_err();
        assert_eq!(err, ChatError::Api(ApiError::Timeout));

        let entries = session.snapshot().await;
        assert_eq!(entries[0].status, DeliveryStatus::Failed);
        let key = entries[0].message.client_key.clone().unwrap();

        session.api.fail_persist.store(false, Ordering::SeqCst);
        let stored = session.retry(&key).await.unwrap();
        assert_eq!(stored.client_key.as_deref(), Some(key.as_str()));

        let entries = session.snapshot().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, DeliveryStatus::Sent);
    }

    #[tokio::test]
    async fn test_dropping_session_leaves_room() {
        let (session, mut outbound, _inbound) = open_with(FakeApi::default()).await;
        outbound.recv().await;

        drop(session);

        let left = tokio::time::timeout(Duration::from_secs(1), outbound.recv())
            .await
            .unwrap();
        assert_eq!(
            left,
            Some(ClientEvent::LeaveRoom {
                room: "c1".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_open_validation_and_failure() {
        let (live, _outbound, _inbound) = LiveChannel::loopback();
        let live = Arc::new(live);

        let result =
            ChatSession::open(Arc::new(FakeApi::default()), Arc::clone(&live), &customer(), " ").await;
        assert!(matches!(result, Err(ChatError::MissingParticipant)));

        let failing = FakeApi {
            fail_open: true,
            ..Default::default()
        };
        let result = ChatSession::open(Arc::new(failing), live, &customer(), "v1").await;
        assert!(matches!(result, Err(ChatError::Api(ApiError::Network(_)))));
    }

    #[tokio::test]
    async fn test_inbox_sorted_and_filtered() {
        let conversations = inbox(&FakeApi::default(), "u1").await.unwrap();
        let ids: Vec<_> = conversations.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "old"]);

        assert_eq!(
            inbox(&FakeApi::default(), "").await.unwrap_err(),
            ChatError::MissingParticipant
        );
    }
}
