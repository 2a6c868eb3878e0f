use serde_json::Value;
use tracing::{info, warn};

use zapdash_core::{NativeMessage, WebhookEvent};

use crate::engine::{IngestOrigin, MessageOutcome, SyncEngine};
use crate::error::Result;

/// Source tag stamped on webhook log rows.
pub const WEBHOOK_SOURCE: &str = "evolution";

/// Event types the gateway is asked to deliver.
pub const WEBHOOK_EVENTS: [&str; 2] = ["messages.upsert", "connection.update"];

/// What became of one webhook delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// The event produced store writes.
    Processed,
    /// The event was readable but carried nothing reconcilable.
    Discarded,
    /// The event type is observed, not acted on.
    Ignored,
}

impl SyncEngine {
    /// Ingest one webhook delivery. The raw payload is logged durably
    /// before any routing, so a failed delivery stays diagnosable; routing
    /// success marks the log row processed, failure records the error.
    pub async fn ingest_webhook(&self, payload: &Value) -> Result<WebhookOutcome> {
        let event_type = payload
            .get("event")
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        let log_id = self
            .db
            .insert_webhook_log(WEBHOOK_SOURCE, event_type, &payload.to_string())
            .await?;

        match self.route_event(payload).await {
            Ok(outcome) => {
                self.db.mark_webhook_log(log_id, true, None).await?;
                Ok(outcome)
            }
            Err(e) => {
                if let Err(mark) = self
                    .db
                    .mark_webhook_log(log_id, false, Some(&e.to_string()))
                    .await
                {
                    warn!("Falha ao marcar webhook {log_id}: {mark}");
                }
                Err(e)
            }
        }
    }

    async fn route_event(&self, payload: &Value) -> Result<WebhookOutcome> {
        let event: WebhookEvent = serde_json::from_value(payload.clone())?;

        match event.event.as_str() {
            "messages.upsert" => self.handle_message_upsert(&event.data).await,
            "connection.update" => {
                let state = event
                    .data
                    .get("state")
                    .and_then(Value::as_str)
                    .unwrap_or("desconhecido");
                info!("🔌 Conexão da instância {}: {state}", event.instance);
                Ok(WebhookOutcome::Ignored)
            }
            other => {
                info!("Evento não tratado: {other}");
                Ok(WebhookOutcome::Ignored)
            }
        }
    }

    async fn handle_message_upsert(&self, data: &Value) -> Result<WebhookOutcome> {
        let native: NativeMessage = serde_json::from_value(data.clone())?;

        if native.key.remote_jid.is_empty() {
            warn!("Evento messages.upsert sem remoteJid, descartado");
            return Ok(WebhookOutcome::Discarded);
        }

        match self.reconcile_message(&native, IngestOrigin::Webhook).await? {
            MessageOutcome::Stored => {
                info!("📨 Mensagem {} registrada via webhook", native.key.id);
                Ok(WebhookOutcome::Processed)
            }
            MessageOutcome::Skipped => Ok(WebhookOutcome::Discarded),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::error::SyncError;
    use crate::gateway::testing::FakeGateway;
    use zapdash_db::ZapdashDb;

    async fn engine() -> SyncEngine {
        let db = Arc::new(ZapdashDb::open_in_memory().await.unwrap());
        SyncEngine::new(db, Arc::new(FakeGateway::default()))
    }

    fn upsert_payload(data: Value) -> Value {
        json!({
            "event": "messages.upsert",
            "instance": "main",
            "data": data,
        })
    }

    #[tokio::test]
    async fn message_event_creates_contact_conversation_and_message() {
        let engine = engine().await;

        let payload = upsert_payload(json!({
            "key": {
                "remoteJid": "5511999990001@s.whatsapp.net",
                "fromMe": false,
                "id": "ABC123"
            },
            "pushName": "Ana",
            "message": { "conversation": "Olá" },
            "messageTimestamp": 1_700_000_000i64,
        }));
        let outcome = engine.ingest_webhook(&payload).await.unwrap();
        assert_eq!(outcome, WebhookOutcome::Processed);

        let contact = engine
            .db
            .contact_by_phone("5511999990001")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(contact.push_name.as_deref(), Some("Ana"));

        let conversation = engine
            .db
            .conversation_by_remote_jid("5511999990001@s.whatsapp.net")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(conversation.contact_id, contact.id);

        let messages = engine
            .db
            .messages_by_conversation(&conversation.id)
            .await
            .unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id, "ABC123");
        assert_eq!(messages[0].content.as_deref(), Some("Olá"));
        assert_eq!(messages[0].message_type, "text");
        assert!(!messages[0].from_me);
        assert_eq!(messages[0].status, "received");
        assert_eq!(messages[0].timestamp, 1_700_000_000);

        let logs = engine.db.recent_webhook_logs(5).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert!(logs[0].processed);
        assert_eq!(logs[0].event_type, "messages.upsert");
    }

    #[tokio::test]
    async fn repeated_delivery_stays_idempotent() {
        let engine = engine().await;
        let payload = upsert_payload(json!({
            "key": { "remoteJid": "5511999990001@s.whatsapp.net", "id": "ABC123" },
            "message": { "conversation": "Olá" },
            "messageTimestamp": 1_700_000_000i64,
        }));

        engine.ingest_webhook(&payload).await.unwrap();
        engine.ingest_webhook(&payload).await.unwrap();

        assert_eq!(engine.db.count_contacts().await.unwrap(), 1);
        assert_eq!(engine.db.count_conversations(None).await.unwrap(), 1);
        let conversation = engine
            .db
            .conversation_by_remote_jid("5511999990001@s.whatsapp.net")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            engine.db.messages_by_conversation(&conversation.id).await.unwrap().len(),
            1
        );
        // both deliveries were logged
        assert_eq!(engine.db.recent_webhook_logs(5).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn missing_remote_jid_is_discarded_quietly() {
        let engine = engine().await;
        let payload = upsert_payload(json!({
            "key": { "id": "ABC123" },
            "message": { "conversation": "Olá" },
            "messageTimestamp": 1_700_000_000i64,
        }));

        let outcome = engine.ingest_webhook(&payload).await.unwrap();
        assert_eq!(outcome, WebhookOutcome::Discarded);
        assert_eq!(engine.db.count_contacts().await.unwrap(), 0);
        assert_eq!(engine.db.count_conversations(None).await.unwrap(), 0);

        // discarded deliveries still leave a processed log row
        let logs = engine.db.recent_webhook_logs(5).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert!(logs[0].processed);
    }

    #[tokio::test]
    async fn connection_update_is_observed_only() {
        let engine = engine().await;
        let payload = json!({
            "event": "connection.update",
            "instance": "main",
            "data": { "state": "open" },
        });

        let outcome = engine.ingest_webhook(&payload).await.unwrap();
        assert_eq!(outcome, WebhookOutcome::Ignored);
        assert_eq!(engine.db.count_contacts().await.unwrap(), 0);
        assert!(engine.db.recent_webhook_logs(1).await.unwrap()[0].processed);
    }

    #[tokio::test]
    async fn unknown_events_are_logged_and_ignored() {
        let engine = engine().await;
        let payload = json!({
            "event": "presence.update",
            "instance": "main",
            "data": {},
        });

        let outcome = engine.ingest_webhook(&payload).await.unwrap();
        assert_eq!(outcome, WebhookOutcome::Ignored);
        let logs = engine.db.recent_webhook_logs(5).await.unwrap();
        assert_eq!(logs[0].event_type, "presence.update");
    }

    #[tokio::test]
    async fn undecodable_data_fails_but_stays_logged() {
        let engine = engine().await;
        let payload = json!({
            "event": "messages.upsert",
            "instance": "main",
            "data": 42,
        });

        let result = engine.ingest_webhook(&payload).await;
        assert!(matches!(result, Err(SyncError::Serialization(_))));

        let logs = engine.db.recent_webhook_logs(5).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert!(!logs[0].processed);
        assert!(logs[0].error_message.is_some());
    }

    #[tokio::test]
    async fn group_messages_from_webhooks_are_processed() {
        let engine = engine().await;
        let payload = upsert_payload(json!({
            "key": { "remoteJid": "120363041234567890@g.us", "id": "G1" },
            "message": { "conversation": "mensagem de grupo" },
            "messageTimestamp": 1_700_000_000i64,
        }));

        // the group skip applies to chat batches, not webhook traffic
        let outcome = engine.ingest_webhook(&payload).await.unwrap();
        assert_eq!(outcome, WebhookOutcome::Processed);
        let conversation = engine
            .db
            .conversation_by_remote_jid("120363041234567890@g.us")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            engine.db.messages_by_conversation(&conversation.id).await.unwrap().len(),
            1
        );
    }
}
