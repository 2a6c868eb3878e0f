use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use zapdash_core::{
    ConversationStatus, MIN_PHONE_LEN, MessageKind, NativeChat, NativeContact, NativeMessage,
    classify_kind, extract_content, extract_phone, is_group_jid, media_url,
};
use zapdash_db::{Contact, Conversation, NewMessage, ZapdashDb};

use crate::error::{Result, SyncError};
use crate::gateway::MessagingGateway;
use crate::report::BatchReport;

/// Where a message entered the system. Recorded in metadata and used to
/// decide whether the gateway's own status field is trustworthy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOrigin {
    Webhook,
    Bulk,
}

impl IngestOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            IngestOrigin::Webhook => "webhook",
            IngestOrigin::Bulk => "sync",
        }
    }
}

/// Outcome of one message ingest attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOutcome {
    Stored,
    Skipped,
}

/// Reconciles gateway-native data into the store. All writes are
/// find-or-create or upsert on natural keys, so any batch can be replayed.
pub struct SyncEngine {
    pub(crate) db: Arc<ZapdashDb>,
    pub(crate) gateway: Arc<dyn MessagingGateway>,
}

impl SyncEngine {
    pub fn new(db: Arc<ZapdashDb>, gateway: Arc<dyn MessagingGateway>) -> Self {
        Self { db, gateway }
    }

    /// Look up a contact by canonical phone, creating it if missing. A
    /// differing reported name refreshes the stored one.
    pub async fn find_or_create_contact(
        &self,
        phone: &str,
        display_name: Option<&str>,
    ) -> Result<Contact> {
        let display_name = display_name.filter(|n| !n.is_empty());

        if let Some(existing) = self.db.contact_by_phone(phone).await? {
            if let Some(name) = display_name {
                if existing.push_name.as_deref() != Some(name) {
                    debug!("  → Atualizando nome de {phone}: {name}");
                    return Ok(self.db.update_contact_identity(&existing.id, name).await?);
                }
            }
            return Ok(existing);
        }

        info!("👤 Novo contato: {} ({phone})", display_name.unwrap_or("sem nome"));
        Ok(self.db.create_contact(phone, display_name, display_name).await?)
    }

    /// Look up a conversation by remote JID, creating it active if missing.
    pub async fn find_or_create_conversation(
        &self,
        contact_id: &str,
        remote_jid: &str,
    ) -> Result<Conversation> {
        if let Some(existing) = self.db.conversation_by_remote_jid(remote_jid).await? {
            return Ok(existing);
        }

        info!("💬 Nova conversa: {remote_jid}");
        Ok(self
            .db
            .create_conversation(
                contact_id,
                remote_jid,
                ConversationStatus::Active.as_str(),
                Some(unix_now()),
            )
            .await?)
    }

    /// Build the canonical row for a native message and upsert it keyed on
    /// the gateway id. Messages without an id or timestamp cannot be
    /// reconciled and are skipped, not errored.
    pub async fn upsert_native_message(
        &self,
        native: &NativeMessage,
        conversation_id: &str,
        contact_id: &str,
        origin: IngestOrigin,
    ) -> Result<MessageOutcome> {
        if native.key.id.is_empty() {
            warn!("Mensagem sem id ignorada ({})", native.key.remote_jid);
            return Ok(MessageOutcome::Skipped);
        }
        let Some(timestamp) = native.message_timestamp else {
            warn!("Mensagem {} sem timestamp ignorada", native.key.id);
            return Ok(MessageOutcome::Skipped);
        };

        let status = match origin {
            IngestOrigin::Webhook => "received".to_string(),
            IngestOrigin::Bulk => {
                native.status.clone().unwrap_or_else(|| "received".to_string())
            }
        };
        let metadata = serde_json::to_string(&serde_json::json!({
            "pushName": native.push_name,
            "origin": origin.as_str(),
            "syncedAt": unix_now(),
            "originalMessage": native,
        }))?;

        let row = NewMessage {
            id: native.key.id.clone(),
            conversation_id: conversation_id.to_string(),
            contact_id: contact_id.to_string(),
            content: Some(extract_content(native)),
            message_type: classify_kind(native).as_str().to_string(),
            from_me: native.key.from_me,
            status,
            timestamp,
            media_url: media_url(native),
            metadata: Some(metadata),
        };
        self.db.upsert_message(&row).await?;
        Ok(MessageOutcome::Stored)
    }

    /// Full single-message chain: contact, then conversation, then the
    /// message row itself.
    pub async fn reconcile_message(
        &self,
        native: &NativeMessage,
        origin: IngestOrigin,
    ) -> Result<MessageOutcome> {
        if native.key.remote_jid.is_empty() {
            debug!("Mensagem sem remoteJid ignorada");
            return Ok(MessageOutcome::Skipped);
        }
        let phone = extract_phone(&native.key.remote_jid);
        if phone.is_empty() {
            debug!("Mensagem de {} sem telefone extraível", native.key.remote_jid);
            return Ok(MessageOutcome::Skipped);
        }

        let contact = self
            .find_or_create_contact(&phone, native.push_name.as_deref())
            .await?;
        let conversation = self
            .find_or_create_conversation(&contact.id, &native.key.remote_jid)
            .await?;
        self.upsert_native_message(native, &conversation.id, &contact.id, origin)
            .await
    }

    /// Upsert a batch of native contacts keyed on canonical phone.
    pub async fn reconcile_contact_batch(&self, contacts: &[NativeContact]) -> BatchReport {
        let mut report = BatchReport::new(contacts.len());
        info!("📇 Reconciliando {} contatos", contacts.len());

        for contact in contacts {
            let phone = extract_phone(&contact.id);
            if contact.id.is_empty() || phone.is_empty() {
                report.skipped += 1;
                continue;
            }

            let push_name = contact.push_name.as_deref().filter(|n| !n.is_empty());
            match self
                .db
                .upsert_contact_by_phone(&phone, push_name, contact.profile_picture_url.as_deref())
                .await
            {
                Ok(_) => report.processed += 1,
                Err(e) => {
                    warn!("Falha ao reconciliar contato {phone}: {e}");
                    report.errors += 1;
                }
            }
        }

        report
    }

    /// Upsert a batch of native chats as 1:1 conversations. Groups are not
    /// dashboard material and are skipped without touching the store.
    pub async fn reconcile_chat_batch(&self, chats: &[NativeChat]) -> BatchReport {
        let mut report = BatchReport::new(chats.len());
        info!("💬 Reconciliando {} conversas", chats.len());

        for chat in chats {
            if chat.id.is_empty() {
                report.skipped += 1;
                continue;
            }
            if chat.is_group || is_group_jid(&chat.id) {
                debug!("  → Grupo ignorado: {}", chat.id);
                report.skipped += 1;
                continue;
            }

            let phone = extract_phone(&chat.id);
            if phone.len() < MIN_PHONE_LEN {
                debug!("  → Telefone implausível em {}: '{phone}'", chat.id);
                report.skipped += 1;
                continue;
            }

            match self.reconcile_chat(chat, &phone).await {
                Ok(()) => report.processed += 1,
                Err(e) => {
                    warn!("Falha ao reconciliar conversa {}: {e}", chat.id);
                    report.errors += 1;
                }
            }
        }

        report
    }

    async fn reconcile_chat(&self, chat: &NativeChat, phone: &str) -> Result<()> {
        let chat_name = chat.name.as_deref().filter(|n| !n.is_empty());

        // Placeholder name only at creation; a chat sighting never overwrites
        // a name learned from the contact itself.
        let contact = match self.db.contact_by_phone(phone).await? {
            Some(existing) => existing,
            None => {
                let placeholder = format!("Contato {phone}");
                let name = chat_name.unwrap_or(&placeholder);
                info!("👤 Novo contato: {name} ({phone})");
                self.db.create_contact(phone, Some(name), chat_name).await?
            }
        };

        let status = if chat.archived {
            ConversationStatus::Archived
        } else {
            ConversationStatus::Active
        };
        let last_message_at = chat.last_message_timestamp.unwrap_or_else(unix_now);

        self.db
            .upsert_conversation_by_remote_jid(
                &contact.id,
                &chat.id,
                status.as_str(),
                Some(last_message_at),
            )
            .await?;
        Ok(())
    }

    /// Run a batch of native messages through the full reconcile chain.
    pub async fn reconcile_message_batch(&self, messages: &[NativeMessage]) -> BatchReport {
        let mut report = BatchReport::new(messages.len());
        info!("📥 Reconciliando {} mensagens", messages.len());

        for native in messages {
            match self.reconcile_message(native, IngestOrigin::Bulk).await {
                Ok(MessageOutcome::Stored) => report.processed += 1,
                Ok(MessageOutcome::Skipped) => report.skipped += 1,
                Err(e) => {
                    warn!("Falha ao reconciliar mensagem {}: {e}", native.key.id);
                    report.errors += 1;
                }
            }
        }

        report
    }

    /// Send a text through the gateway and persist the outbound message.
    /// Persistence trouble is logged, not surfaced: the send already left.
    pub async fn send_text(&self, conversation_id: &str, text: &str) -> Result<NewMessage> {
        let conversation = self
            .db
            .conversation_by_id(conversation_id)
            .await?
            .ok_or_else(|| SyncError::ConversationNotFound(conversation_id.to_string()))?;

        let response = self.gateway.send_text(&conversation.remote_jid, text).await?;

        let now = unix_now();
        let id = if response.key.id.is_empty() {
            format!("msg_{now}_{}", Uuid::new_v4().simple())
        } else {
            response.key.id.clone()
        };
        let metadata = serde_json::to_string(&serde_json::json!({
            "gatewayResponse": response,
            "sentViaInterface": true,
        }))?;

        let row = NewMessage {
            id,
            conversation_id: conversation.id.clone(),
            contact_id: conversation.contact_id.clone(),
            content: Some(text.to_string()),
            message_type: MessageKind::Text.as_str().to_string(),
            from_me: true,
            status: "sent".to_string(),
            timestamp: response.message_timestamp.unwrap_or(now),
            media_url: None,
            metadata: Some(metadata),
        };
        if let Err(e) = self.db.upsert_message(&row).await {
            warn!("Mensagem enviada mas não persistida: {e}");
        }

        info!("📤 Mensagem enviada para {}", conversation.remote_jid);
        Ok(row)
    }
}

pub(crate) fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}
