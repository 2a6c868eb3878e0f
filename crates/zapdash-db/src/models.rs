use serde::{Deserialize, Serialize};

/// One person on the other side, keyed by canonical phone.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Contact {
    pub id: String,
    pub phone: String,
    pub name: Option<String>,
    pub push_name: Option<String>,
    pub avatar_url: Option<String>,
    pub last_seen: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A 1:1 thread with a contact, keyed by the gateway's remote JID.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Conversation {
    pub id: String,
    pub contact_id: String,
    pub remote_jid: String,
    pub status: String,
    pub last_message_at: Option<i64>,
    pub messages_count: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A stored message. The row id is the gateway-native message id, which is
/// what makes re-ingestion idempotent.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub contact_id: String,
    pub content: Option<String>,
    pub message_type: String,
    pub from_me: bool,
    pub status: String,
    pub timestamp: i64,
    pub media_url: Option<String>,
    pub metadata: Option<String>,
    pub created_at: i64,
}

/// Insert/upsert shape for a message row.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub id: String,
    pub conversation_id: String,
    pub contact_id: String,
    pub content: Option<String>,
    pub message_type: String,
    pub from_me: bool,
    pub status: String,
    pub timestamp: i64,
    pub media_url: Option<String>,
    pub metadata: Option<String>,
}

/// Audit row for one webhook delivery, written before any processing.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct WebhookLog {
    pub id: i64,
    pub source: String,
    pub event_type: String,
    pub payload: String,
    pub processed: bool,
    pub error_message: Option<String>,
    pub created_at: i64,
}

/// Aggregated dashboard numbers for one calendar date.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DailyMetrics {
    pub date: String,
    pub total_leads: i64,
    pub response_rate: f64,
    pub no_response_count: i64,
    pub total_conversations: i64,
    pub conversations_today: i64,
    pub avg_response_time: f64,
    pub created_at: i64,
    pub updated_at: i64,
}
