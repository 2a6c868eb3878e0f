use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite};
use tracing::info;
use uuid::Uuid;

use crate::error::{DbError, Result};
use crate::models::{Contact, Conversation, DailyMetrics, Message, NewMessage, WebhookLog};
use crate::schema::SCHEMA;

pub struct ZapdashDb {
    pool: Pool<Sqlite>,
}

impl ZapdashDb {
    /// Open the database at the platform data directory, creating it and the
    /// schema on first run.
    pub async fn new() -> Result<Self> {
        let path = Self::default_path()?;
        Self::new_with_path(&path.display().to_string()).await
    }

    /// Open (or create) the database at an explicit path.
    pub async fn new_with_path(path: &str) -> Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let url = format!("sqlite:{path}?mode=rwc");
        let pool = SqlitePoolOptions::new().connect(&url).await?;
        sqlx::raw_sql(SCHEMA).execute(&pool).await?;

        info!("Database initialized at {path}");
        Ok(Self { pool })
    }

    /// In-memory database for tests. Each `:memory:` connection is its own
    /// database, so the pool is pinned to a single connection.
    pub async fn open_in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        sqlx::raw_sql(SCHEMA).execute(&pool).await?;
        Ok(Self { pool })
    }

    fn default_path() -> Result<PathBuf> {
        let dirs =
            ProjectDirs::from("com.br", "zapdash", "zapdash").ok_or(DbError::PathUnavailable)?;
        let data_dir = dirs.data_dir();
        std::fs::create_dir_all(data_dir)?;
        Ok(data_dir.join("zapdash.db"))
    }

    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    // --- contacts ---

    pub async fn contact_by_id(&self, id: &str) -> Result<Option<Contact>> {
        let contact = sqlx::query_as::<_, Contact>("SELECT * FROM contacts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(contact)
    }

    pub async fn contact_by_phone(&self, phone: &str) -> Result<Option<Contact>> {
        let contact = sqlx::query_as::<_, Contact>("SELECT * FROM contacts WHERE phone = ?")
            .bind(phone)
            .fetch_optional(&self.pool)
            .await?;
        Ok(contact)
    }

    pub async fn create_contact(
        &self,
        phone: &str,
        name: Option<&str>,
        push_name: Option<&str>,
    ) -> Result<Contact> {
        let now = unix_timestamp();
        sqlx::query(
            "INSERT INTO contacts (id, phone, name, push_name, last_seen, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(phone)
        .bind(name)
        .bind(push_name)
        .bind(now)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.contact_by_phone(phone)
            .await?
            .ok_or_else(|| DbError::ContactNotResolved(phone.to_string()))
    }

    /// Refresh the reported name of an existing contact.
    pub async fn update_contact_identity(&self, id: &str, push_name: &str) -> Result<Contact> {
        let now = unix_timestamp();
        sqlx::query(
            "UPDATE contacts SET name = ?, push_name = ?, last_seen = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(push_name)
        .bind(push_name)
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.contact_by_id(id)
            .await?
            .ok_or_else(|| DbError::ContactNotResolved(id.to_string()))
    }

    /// Insert or refresh a contact keyed on phone. Incoming NULLs keep the
    /// stored value, so a sparse sighting never erases a known name.
    pub async fn upsert_contact_by_phone(
        &self,
        phone: &str,
        push_name: Option<&str>,
        avatar_url: Option<&str>,
    ) -> Result<Contact> {
        let now = unix_timestamp();
        sqlx::query(
            "INSERT INTO contacts (id, phone, name, push_name, avatar_url, last_seen, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(phone) DO UPDATE SET
                 name = COALESCE(excluded.name, name),
                 push_name = COALESCE(excluded.push_name, push_name),
                 avatar_url = COALESCE(excluded.avatar_url, avatar_url),
                 last_seen = excluded.last_seen,
                 updated_at = excluded.updated_at",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(phone)
        .bind(push_name)
        .bind(push_name)
        .bind(avatar_url)
        .bind(now)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.contact_by_phone(phone)
            .await?
            .ok_or_else(|| DbError::ContactNotResolved(phone.to_string()))
    }

    pub async fn count_contacts(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM contacts")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Contacts that sent us at least one message.
    pub async fn count_responded_contacts(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(DISTINCT contact_id) FROM messages WHERE from_me = 0",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    // --- conversations ---

    pub async fn conversation_by_id(&self, id: &str) -> Result<Option<Conversation>> {
        let conversation =
            sqlx::query_as::<_, Conversation>("SELECT * FROM conversations WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(conversation)
    }

    pub async fn conversation_by_remote_jid(
        &self,
        remote_jid: &str,
    ) -> Result<Option<Conversation>> {
        let conversation =
            sqlx::query_as::<_, Conversation>("SELECT * FROM conversations WHERE remote_jid = ?")
                .bind(remote_jid)
                .fetch_optional(&self.pool)
                .await?;
        Ok(conversation)
    }

    pub async fn create_conversation(
        &self,
        contact_id: &str,
        remote_jid: &str,
        status: &str,
        last_message_at: Option<i64>,
    ) -> Result<Conversation> {
        let now = unix_timestamp();
        sqlx::query(
            "INSERT INTO conversations (id, contact_id, remote_jid, status, last_message_at, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(contact_id)
        .bind(remote_jid)
        .bind(status)
        .bind(last_message_at)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.conversation_by_remote_jid(remote_jid)
            .await?
            .ok_or_else(|| DbError::ConversationNotResolved(remote_jid.to_string()))
    }

    /// Insert or refresh a conversation keyed on remote JID.
    pub async fn upsert_conversation_by_remote_jid(
        &self,
        contact_id: &str,
        remote_jid: &str,
        status: &str,
        last_message_at: Option<i64>,
    ) -> Result<Conversation> {
        let now = unix_timestamp();
        sqlx::query(
            "INSERT INTO conversations (id, contact_id, remote_jid, status, last_message_at, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(remote_jid) DO UPDATE SET
                 contact_id = excluded.contact_id,
                 status = excluded.status,
                 last_message_at = COALESCE(excluded.last_message_at, last_message_at),
                 updated_at = excluded.updated_at",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(contact_id)
        .bind(remote_jid)
        .bind(status)
        .bind(last_message_at)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.conversation_by_remote_jid(remote_jid)
            .await?
            .ok_or_else(|| DbError::ConversationNotResolved(remote_jid.to_string()))
    }

    /// Record the outcome of a per-conversation message sync.
    pub async fn update_conversation_sync_stats(
        &self,
        conversation_id: &str,
        messages_count: i64,
    ) -> Result<()> {
        sqlx::query("UPDATE conversations SET messages_count = ?, updated_at = ? WHERE id = ?")
            .bind(messages_count)
            .bind(unix_timestamp())
            .bind(conversation_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn list_conversations(
        &self,
        status: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Conversation>> {
        let conversations = match status {
            Some(status) => {
                sqlx::query_as::<_, Conversation>(
                    "SELECT * FROM conversations WHERE status = ?
                     ORDER BY last_message_at DESC LIMIT ? OFFSET ?",
                )
                .bind(status)
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Conversation>(
                    "SELECT * FROM conversations ORDER BY last_message_at DESC LIMIT ? OFFSET ?",
                )
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(conversations)
    }

    pub async fn count_conversations(&self, status: Option<&str>) -> Result<i64> {
        let count = match status {
            Some(status) => {
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM conversations WHERE status = ?")
                    .bind(status)
                    .fetch_one(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM conversations")
                    .fetch_one(&self.pool)
                    .await?
            }
        };
        Ok(count)
    }

    pub async fn count_conversations_created_between(&self, start: i64, end: i64) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM conversations WHERE created_at >= ? AND created_at < ?",
        )
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    // --- messages ---

    /// Insert or overwrite a message keyed on the gateway-native id. A
    /// re-ingested message wins wholesale; only created_at survives.
    pub async fn upsert_message(&self, message: &NewMessage) -> Result<()> {
        sqlx::query(
            "INSERT INTO messages (id, conversation_id, contact_id, content, message_type, from_me, status, timestamp, media_url, metadata, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 conversation_id = excluded.conversation_id,
                 contact_id = excluded.contact_id,
                 content = excluded.content,
                 message_type = excluded.message_type,
                 from_me = excluded.from_me,
                 status = excluded.status,
                 timestamp = excluded.timestamp,
                 media_url = excluded.media_url,
                 metadata = excluded.metadata",
        )
        .bind(&message.id)
        .bind(&message.conversation_id)
        .bind(&message.contact_id)
        .bind(&message.content)
        .bind(&message.message_type)
        .bind(message.from_me)
        .bind(&message.status)
        .bind(message.timestamp)
        .bind(&message.media_url)
        .bind(&message.metadata)
        .bind(unix_timestamp())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn messages_by_conversation(&self, conversation_id: &str) -> Result<Vec<Message>> {
        let messages = sqlx::query_as::<_, Message>(
            "SELECT * FROM messages WHERE conversation_id = ? ORDER BY timestamp ASC",
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(messages)
    }

    pub async fn last_message_for(&self, conversation_id: &str) -> Result<Option<Message>> {
        let message = sqlx::query_as::<_, Message>(
            "SELECT * FROM messages WHERE conversation_id = ? ORDER BY timestamp DESC LIMIT 1",
        )
        .bind(conversation_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(message)
    }

    /// Messages in a time window, grouped by conversation then time. This is
    /// the traversal order the response-time fold expects.
    pub async fn messages_between(&self, start: i64, end: i64) -> Result<Vec<Message>> {
        let messages = sqlx::query_as::<_, Message>(
            "SELECT * FROM messages WHERE timestamp >= ? AND timestamp < ?
             ORDER BY conversation_id ASC, timestamp ASC",
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;
        Ok(messages)
    }

    pub async fn count_inbound_messages_between(&self, start: i64, end: i64) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM messages WHERE from_me = 0 AND timestamp >= ? AND timestamp < ?",
        )
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    // --- webhook logs ---

    pub async fn insert_webhook_log(
        &self,
        source: &str,
        event_type: &str,
        payload: &str,
    ) -> Result<i64> {
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO webhook_logs (source, event_type, payload, created_at)
             VALUES (?, ?, ?, ?) RETURNING id",
        )
        .bind(source)
        .bind(event_type)
        .bind(payload)
        .bind(unix_timestamp())
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    pub async fn mark_webhook_log(
        &self,
        id: i64,
        processed: bool,
        error_message: Option<&str>,
    ) -> Result<()> {
        sqlx::query("UPDATE webhook_logs SET processed = ?, error_message = ? WHERE id = ?")
            .bind(processed)
            .bind(error_message)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn recent_webhook_logs(&self, limit: i64) -> Result<Vec<WebhookLog>> {
        let logs =
            sqlx::query_as::<_, WebhookLog>("SELECT * FROM webhook_logs ORDER BY id DESC LIMIT ?")
                .bind(limit)
                .fetch_all(&self.pool)
                .await?;
        Ok(logs)
    }

    // --- daily metrics ---

    #[allow(clippy::too_many_arguments)]
    pub async fn upsert_daily_metrics(
        &self,
        date: &str,
        total_leads: i64,
        response_rate: f64,
        no_response_count: i64,
        total_conversations: i64,
        conversations_today: i64,
        avg_response_time: f64,
    ) -> Result<DailyMetrics> {
        let now = unix_timestamp();
        sqlx::query(
            "INSERT INTO daily_metrics (date, total_leads, response_rate, no_response_count, total_conversations, conversations_today, avg_response_time, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(date) DO UPDATE SET
                 total_leads = excluded.total_leads,
                 response_rate = excluded.response_rate,
                 no_response_count = excluded.no_response_count,
                 total_conversations = excluded.total_conversations,
                 conversations_today = excluded.conversations_today,
                 avg_response_time = excluded.avg_response_time,
                 updated_at = excluded.updated_at",
        )
        .bind(date)
        .bind(total_leads)
        .bind(response_rate)
        .bind(no_response_count)
        .bind(total_conversations)
        .bind(conversations_today)
        .bind(avg_response_time)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.daily_metrics_for(date)
            .await?
            .ok_or_else(|| DbError::MetricsNotResolved(date.to_string()))
    }

    pub async fn daily_metrics_for(&self, date: &str) -> Result<Option<DailyMetrics>> {
        let metrics =
            sqlx::query_as::<_, DailyMetrics>("SELECT * FROM daily_metrics WHERE date = ?")
                .bind(date)
                .fetch_optional(&self.pool)
                .await?;
        Ok(metrics)
    }
}

fn unix_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}
