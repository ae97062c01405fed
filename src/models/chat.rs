use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A persistent thread between a customer and a vendor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub customer_id: String,
    pub vendor_id: String,
    #[serde(default)]
    pub last_message: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// The participant that is not `me`
    pub fn counterpart_of(&self, me: &str) -> &str {
        if self.customer_id == me {
            &self.vendor_id
        } else {
            &self.customer_id
        }
    }

    pub fn involves(&self, user_id: &str) -> bool {
        self.customer_id == user_id || self.vendor_id == user_id
    }
}

/// A chat message
///
/// `id` is assigned by the backend once persisted. `client_key` is generated
/// by the sender and echoed back by both the live channel and the REST
/// persistence call, so the copies can be matched up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub conversation_id: String,
    pub sender_id: String,
    pub text: String,
    pub sent_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_key: Option<String>,
}
