use std::collections::HashSet;

use tracing::{error, info, warn};

use zapdash_core::{NativeMessage, jid_matches};
use zapdash_evolution::FindMessagesParams;

use crate::engine::{IngestOrigin, MessageOutcome, SyncEngine};
use crate::error::{Result, SyncError};
use crate::metrics;
use crate::report::{BatchReport, ConversationSync, FullSyncReport, SyncKind, SyncOutcome};

/// Page size for the server-side filtered per-conversation fetch.
const FILTERED_FETCH_LIMIT: u32 = 500;
/// Page size for the unfiltered fallback fetch, filtered locally afterwards.
const FALLBACK_FETCH_LIMIT: u32 = 1000;
/// Default page size for bulk fetches.
const BULK_FETCH_LIMIT: u32 = 500;

impl SyncEngine {
    pub async fn sync_contacts(&self) -> Result<BatchReport> {
        let contacts = self.gateway.find_contacts().await?;
        Ok(self.reconcile_contact_batch(&contacts).await)
    }

    pub async fn sync_chats(&self) -> Result<BatchReport> {
        let chats = self.gateway.find_chats(BULK_FETCH_LIMIT).await?;
        Ok(self.reconcile_chat_batch(&chats).await)
    }

    pub async fn sync_messages(&self, limit: u32) -> Result<BatchReport> {
        let params = FindMessagesParams { limit: Some(limit), ..Default::default() };
        let messages = self.gateway.find_messages(&params).await?;
        Ok(self.reconcile_message_batch(&messages).await)
    }

    /// Full sync in dependency order: contacts, then chats, then messages,
    /// so names and conversations exist before messages land on them.
    pub async fn sync_all(&self, limit: u32) -> Result<FullSyncReport> {
        info!("🔄 Sincronização completa iniciada");
        let contacts = self.sync_contacts().await?;
        let chats = self.sync_chats().await?;
        let messages = self.sync_messages(limit).await?;
        info!(
            "🔄 Sincronização completa: {} contatos, {} conversas, {} mensagens",
            contacts.processed, chats.processed, messages.processed
        );
        Ok(FullSyncReport { contacts, chats, messages })
    }

    /// Pull the message history of one conversation. Some gateway versions
    /// return nothing for the server-side JID filter, so an empty filtered
    /// fetch falls back to an unfiltered page filtered locally, treating
    /// `@s.whatsapp.net` and `@c.us` as the same chat.
    pub async fn sync_conversation_messages(
        &self,
        conversation_id: &str,
    ) -> Result<ConversationSync> {
        let conversation = self
            .db
            .conversation_by_id(conversation_id)
            .await?
            .ok_or_else(|| SyncError::ConversationNotFound(conversation_id.to_string()))?;
        let contact = self
            .db
            .contact_by_id(&conversation.contact_id)
            .await?
            .ok_or_else(|| {
                zapdash_db::DbError::ContactNotResolved(conversation.contact_id.clone())
            })?;

        let remote_jid = conversation.remote_jid.clone();
        info!("🔄 Sincronizando mensagens de {remote_jid}");

        let filtered = FindMessagesParams {
            remote_jid: Some(remote_jid.clone()),
            limit: Some(FILTERED_FETCH_LIMIT),
            ..Default::default()
        };
        let mut fetched = self.gateway.find_messages(&filtered).await?;

        if fetched.is_empty() {
            info!("Filtro do servidor vazio para {remote_jid}, ampliando busca");
            let fallback =
                FindMessagesParams { limit: Some(FALLBACK_FETCH_LIMIT), ..Default::default() };
            fetched = self
                .gateway
                .find_messages(&fallback)
                .await?
                .into_iter()
                .filter(|message| jid_matches(&message.key.remote_jid, &remote_jid))
                .collect();
        }

        let unique = dedupe_by_id(fetched);
        info!("Encontradas {} mensagens para {remote_jid}", unique.len());

        let mut report = BatchReport::new(unique.len());
        for native in &unique {
            match self
                .upsert_native_message(
                    native,
                    &conversation.id,
                    &conversation.contact_id,
                    IngestOrigin::Bulk,
                )
                .await
            {
                Ok(MessageOutcome::Stored) => report.processed += 1,
                Ok(MessageOutcome::Skipped) => report.skipped += 1,
                Err(e) => {
                    warn!("Falha ao sincronizar mensagem {}: {e}", native.key.id);
                    report.errors += 1;
                }
            }
        }

        self.db
            .update_conversation_sync_stats(&conversation.id, report.processed as i64)
            .await?;
        self.recalculate_metrics().await;

        let conversation = self
            .db
            .conversation_by_id(conversation_id)
            .await?
            .ok_or_else(|| SyncError::ConversationNotFound(conversation_id.to_string()))?;
        Ok(ConversationSync { report, conversation, contact })
    }

    /// Dispatch for the manual sync trigger. Metrics recompute once per
    /// trigger, after the data lands.
    pub async fn run_sync(&self, kind: SyncKind, limit: Option<u32>) -> Result<SyncOutcome> {
        let outcome = match kind {
            SyncKind::Contacts => SyncOutcome::Batch(self.sync_contacts().await?),
            SyncKind::Chats => SyncOutcome::Batch(self.sync_chats().await?),
            SyncKind::Messages => {
                SyncOutcome::Batch(self.sync_messages(limit.unwrap_or(100)).await?)
            }
            SyncKind::All => {
                SyncOutcome::Full(self.sync_all(limit.unwrap_or(BULK_FETCH_LIMIT)).await?)
            }
        };

        self.recalculate_metrics().await;
        Ok(outcome)
    }

    /// Recompute today's metrics row, logging failures instead of
    /// propagating them. A broken aggregate must not fail a finished sync.
    pub async fn recalculate_metrics(&self) {
        let today = chrono::Utc::now().date_naive();
        if let Err(e) = metrics::recalculate_daily_metrics(&self.db, today).await {
            error!("Falha ao recalcular métricas: {e}");
        }
    }
}

/// Keep the first occurrence of each message id. The fallback path can hand
/// back the same message under both JID spellings.
fn dedupe_by_id(messages: Vec<NativeMessage>) -> Vec<NativeMessage> {
    let mut seen = HashSet::new();
    messages
        .into_iter()
        .filter(|message| seen.insert(message.key.id.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use super::*;
    use crate::gateway::testing::FakeGateway;
    use zapdash_core::{MessageContent, MessageKey, NativeChat, NativeContact};
    use zapdash_db::ZapdashDb;

    async fn engine_with(gateway: FakeGateway) -> SyncEngine {
        let db = Arc::new(ZapdashDb::open_in_memory().await.unwrap());
        SyncEngine::new(db, Arc::new(gateway))
    }

    fn native_text(id: &str, jid: &str, text: &str, timestamp: i64) -> NativeMessage {
        NativeMessage {
            key: MessageKey {
                remote_jid: jid.to_string(),
                from_me: false,
                id: id.to_string(),
            },
            push_name: Some("Ana".to_string()),
            message: Some(MessageContent {
                conversation: Some(text.to_string()),
                ..Default::default()
            }),
            message_timestamp: Some(timestamp),
            status: None,
        }
    }

    async fn seeded_conversation(engine: &SyncEngine, jid: &str) -> String {
        let phone = zapdash_core::extract_phone(jid);
        let contact = engine.find_or_create_contact(&phone, Some("Ana")).await.unwrap();
        engine
            .find_or_create_conversation(&contact.id, jid)
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn filtered_fetch_feeds_the_conversation() {
        let jid = "5511999990001@s.whatsapp.net";
        let mut filtered = HashMap::new();
        filtered.insert(
            jid.to_string(),
            vec![
                native_text("M1", jid, "oi", 1_700_000_001),
                native_text("M2", jid, "tudo bem?", 1_700_000_002),
            ],
        );
        let engine = engine_with(FakeGateway { filtered, ..Default::default() }).await;
        let conversation_id = seeded_conversation(&engine, jid).await;

        let sync = engine.sync_conversation_messages(&conversation_id).await.unwrap();

        assert_eq!(sync.report.total, 2);
        assert_eq!(sync.report.processed, 2);
        assert_eq!(sync.conversation.messages_count, 2);
        assert_eq!(sync.contact.phone, "5511999990001");
    }

    #[tokio::test]
    async fn empty_filter_falls_back_to_local_filtering() {
        let jid = "5511999990001@s.whatsapp.net";
        // server-side filter finds nothing; the wide fetch carries the same
        // chat under the legacy suffix plus unrelated traffic
        let gateway = FakeGateway {
            messages: vec![
                native_text("M1", "5511999990001@c.us", "oi", 1_700_000_001),
                native_text("M2", "5511888880002@s.whatsapp.net", "outra conversa", 1_700_000_002),
            ],
            ..Default::default()
        };
        let engine = engine_with(gateway).await;
        let conversation_id = seeded_conversation(&engine, jid).await;

        let sync = engine.sync_conversation_messages(&conversation_id).await.unwrap();

        assert_eq!(sync.report.total, 1);
        assert_eq!(sync.report.processed, 1);
        // the legacy-suffix message landed on the existing conversation,
        // not on a duplicate
        assert_eq!(engine.db.count_conversations(None).await.unwrap(), 1);
        let stored = engine
            .db
            .messages_by_conversation(&conversation_id)
            .await
            .unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].content.as_deref(), Some("oi"));
    }

    #[tokio::test]
    async fn duplicate_ids_are_collapsed_before_ingest() {
        let jid = "5511999990001@s.whatsapp.net";
        let gateway = FakeGateway {
            messages: vec![
                native_text("M1", "5511999990001@c.us", "oi", 1_700_000_001),
                native_text("M1", jid, "oi", 1_700_000_001),
            ],
            ..Default::default()
        };
        let engine = engine_with(gateway).await;
        let conversation_id = seeded_conversation(&engine, jid).await;

        let sync = engine.sync_conversation_messages(&conversation_id).await.unwrap();
        assert_eq!(sync.report.total, 1);
        assert_eq!(sync.report.processed, 1);
    }

    #[tokio::test]
    async fn fetch_failure_propagates() {
        let engine = engine_with(FakeGateway { fail_fetches: true, ..Default::default() }).await;

        assert!(matches!(engine.sync_messages(100).await, Err(SyncError::Gateway(_))));
        assert!(matches!(engine.sync_contacts().await, Err(SyncError::Gateway(_))));

        let conversation_id = {
            let contact = engine
                .db
                .create_contact("5511999990001", None, None)
                .await
                .unwrap();
            engine
                .db
                .create_conversation(&contact.id, "5511999990001@s.whatsapp.net", "active", None)
                .await
                .unwrap()
                .id
        };
        assert!(matches!(
            engine.sync_conversation_messages(&conversation_id).await,
            Err(SyncError::Gateway(_))
        ));
    }

    #[tokio::test]
    async fn unknown_conversation_is_reported_as_such() {
        let engine = engine_with(FakeGateway::default()).await;
        assert!(matches!(
            engine.sync_conversation_messages("nope").await,
            Err(SyncError::ConversationNotFound(_))
        ));
    }

    #[tokio::test]
    async fn full_sync_runs_all_three_stages() {
        let jid = "5511999990001@s.whatsapp.net";
        let gateway = FakeGateway {
            contacts: vec![NativeContact {
                id: jid.to_string(),
                push_name: Some("Ana".to_string()),
                ..Default::default()
            }],
            chats: vec![NativeChat { id: jid.to_string(), ..Default::default() }],
            messages: vec![native_text("M1", jid, "oi", 1_700_000_001)],
            ..Default::default()
        };
        let engine = engine_with(gateway).await;

        let report = engine.sync_all(100).await.unwrap();
        assert_eq!(report.contacts.processed, 1);
        assert_eq!(report.chats.processed, 1);
        assert_eq!(report.messages.processed, 1);

        // one contact, one conversation, one message end to end
        assert_eq!(engine.db.count_contacts().await.unwrap(), 1);
        assert_eq!(engine.db.count_conversations(None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn run_sync_writes_a_metrics_row() {
        let jid = "5511999990001@s.whatsapp.net";
        let gateway = FakeGateway {
            messages: vec![native_text("M1", jid, "oi", chrono::Utc::now().timestamp())],
            ..Default::default()
        };
        let engine = engine_with(gateway).await;

        let outcome = engine.run_sync(SyncKind::Messages, None).await.unwrap();
        assert!(matches!(outcome, SyncOutcome::Batch(report) if report.processed == 1));

        let today = chrono::Utc::now().date_naive().format("%Y-%m-%d").to_string();
        let metrics = engine.db.daily_metrics_for(&today).await.unwrap().unwrap();
        assert_eq!(metrics.total_leads, 1);
    }
}
