use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{error, warn};

use zapdash_core::{ConversationStatus, derive_status, format_as_jid};
use zapdash_db::{Contact, Conversation, DbError, Message};
use zapdash_sync::SyncError;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    status: Option<String>,
    search: Option<String>,
    limit: Option<i64>,
    offset: Option<i64>,
}

/// GET /conversations: dashboard listing, newest activity first.
pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> (StatusCode, Json<Value>) {
    match build_list(&state, &query).await {
        Ok(body) => (StatusCode::OK, Json(body)),
        Err(e) => internal(e),
    }
}

async fn build_list(state: &AppState, query: &ListQuery) -> Result<Value, DbError> {
    let limit = query.limit.unwrap_or(50).clamp(1, 200);
    let offset = query.offset.unwrap_or(0).max(0);
    let storage_status = query.status.as_deref().and_then(storage_filter);
    let needle = query.search.as_ref().map(|s| s.to_lowercase());

    let conversations = state.db.list_conversations(storage_status, limit, offset).await?;
    let total = state.db.count_conversations(storage_status).await?;

    let mut items = Vec::with_capacity(conversations.len());
    for conversation in conversations {
        let contact = state.db.contact_by_id(&conversation.contact_id).await?;
        let last_message = state.db.last_message_for(&conversation.id).await?;

        if let Some(needle) = needle.as_deref() {
            if !matches_search(contact.as_ref(), last_message.as_ref(), needle) {
                continue;
            }
        }

        items.push(conversation_json(&conversation, contact.as_ref(), last_message.as_ref()));
    }

    Ok(json!({
        "conversations": items,
        "total": total,
        "limit": limit,
        "offset": offset,
    }))
}

#[derive(Debug, Deserialize)]
pub struct CreateRequest {
    #[serde(rename = "contactId")]
    contact_id: Option<String>,
    message: Option<String>,
}

/// POST /conversations: open a conversation with an existing contact,
/// optionally firing the first text through the gateway.
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateRequest>,
) -> (StatusCode, Json<Value>) {
    let Some(contact_id) = request.contact_id.as_deref().filter(|id| !id.is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "error": "contactId é obrigatório" })),
        );
    };

    let contact = match state.db.contact_by_id(contact_id).await {
        Ok(Some(contact)) => contact,
        Ok(None) => return not_found("Contato não encontrado"),
        Err(e) => return internal(e),
    };

    let remote_jid = format_as_jid(&contact.phone);
    match state.db.conversation_by_remote_jid(&remote_jid).await {
        Ok(None) => {}
        Ok(Some(_)) => {
            return (
                StatusCode::CONFLICT,
                Json(json!({ "success": false, "error": "Conversa já existe para este contato" })),
            );
        }
        Err(e) => return internal(e),
    }

    let now = chrono::Utc::now().timestamp();
    let conversation = match state
        .db
        .create_conversation(&contact.id, &remote_jid, "active", Some(now))
        .await
    {
        Ok(conversation) => conversation,
        Err(e) => return internal(e),
    };

    if let Some(text) = request
        .message
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
    {
        if let Err(e) = state.engine.send_text(&conversation.id, text).await {
            warn!("Falha ao enviar a primeira mensagem de {}: {e}", conversation.id);
        }
    }

    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "conversation": conversation_json(&conversation, Some(&contact), None),
        })),
    )
}

/// GET /conversations/{id}/messages: full thread, oldest first.
pub async fn messages(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> (StatusCode, Json<Value>) {
    let conversation = match state.db.conversation_by_id(&id).await {
        Ok(Some(conversation)) => conversation,
        Ok(None) => return not_found("Conversa não encontrada"),
        Err(e) => return internal(e),
    };
    let contact = match state.db.contact_by_id(&conversation.contact_id).await {
        Ok(contact) => contact,
        Err(e) => return internal(e),
    };
    let thread = match state.db.messages_by_conversation(&conversation.id).await {
        Ok(thread) => thread,
        Err(e) => return internal(e),
    };

    (
        StatusCode::OK,
        Json(json!({
            "conversation": {
                "id": conversation.id,
                "contact": display_name(contact.as_ref()),
                "phone": contact.as_ref().map(|c| c.phone.clone()),
            },
            "messages": thread.iter().map(message_json).collect::<Vec<_>>(),
            "total": thread.len(),
        })),
    )
}

#[derive(Debug, Deserialize)]
pub struct SendRequest {
    message: Option<String>,
}

/// POST /conversations/{id}/send-message: proxy a text to the gateway and
/// record it as ours.
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<SendRequest>,
) -> (StatusCode, Json<Value>) {
    let Some(text) = request
        .message
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
    else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "error": "Mensagem não pode ser vazia" })),
        );
    };

    match state.engine.send_text(&id, text).await {
        Ok(sent) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "messageId": sent.id,
                    "conversationId": sent.conversation_id,
                    "timestamp": to_rfc3339(sent.timestamp),
                },
            })),
        ),
        Err(SyncError::ConversationNotFound(_)) => not_found("Conversa não encontrada"),
        Err(e) => internal(e),
    }
}

/// POST /conversations/{id}/sync-messages: pull this thread's history from
/// the gateway.
pub async fn sync_messages(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> (StatusCode, Json<Value>) {
    match state.engine.sync_conversation_messages(&id).await {
        Ok(sync) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "synced": sync.report.processed,
                "errors": sync.report.errors,
                "total": sync.report.total,
                "conversation": {
                    "id": sync.conversation.id,
                    "contact": display_name(Some(&sync.contact)),
                    "phone": sync.contact.phone,
                },
                "timestamp": chrono::Utc::now().to_rfc3339(),
            })),
        ),
        Err(SyncError::ConversationNotFound(_)) => not_found("Conversa não encontrada"),
        Err(e) => internal(e),
    }
}

/// Map a dashboard status filter onto the stored column. `all` means no
/// filter; anything outside the known display values passes through raw.
fn storage_filter(display: &str) -> Option<&str> {
    match display {
        "all" => None,
        "initiated" | "waiting" => Some("active"),
        "finished" => Some("archived"),
        other => Some(other),
    }
}

/// Search over what the listing actually shows: the resolved contact name,
/// the phone, and the last-message preview with its placeholders.
fn matches_search(contact: Option<&Contact>, last_message: Option<&Message>, needle: &str) -> bool {
    if display_name(contact).to_lowercase().contains(needle) {
        return true;
    }
    if let Some(contact) = contact {
        if contact.phone.contains(needle) {
            return true;
        }
    }
    let preview = last_message
        .map(|m| m.content.clone().unwrap_or_else(|| "[Mídia]".to_string()))
        .unwrap_or_else(|| "Sem mensagens".to_string());
    preview.to_lowercase().contains(needle)
}

fn conversation_json(
    conversation: &Conversation,
    contact: Option<&Contact>,
    last_message: Option<&Message>,
) -> Value {
    let status = ConversationStatus::parse(&conversation.status);
    let derived = derive_status(status, last_message.map(|m| m.from_me));

    json!({
        "id": conversation.id,
        "contact": {
            "id": contact.map(|c| c.id.clone()),
            "name": display_name(contact),
            "phone": contact.map(|c| c.phone.clone()),
            "avatarUrl": contact.and_then(|c| c.avatar_url.clone()),
        },
        "status": derived.as_str(),
        "lastMessage": match last_message {
            Some(message) => message_json(message),
            None => json!({
                "id": "",
                "content": "Sem mensagens",
                "timestamp": to_rfc3339(conversation.created_at),
                "fromContact": false,
                "read": true,
            }),
        },
        "messagesCount": conversation.messages_count,
        "lastMessageAt": conversation.last_message_at.map(to_rfc3339),
        "createdAt": to_rfc3339(conversation.created_at),
        "updatedAt": to_rfc3339(conversation.updated_at),
    })
}

fn message_json(message: &Message) -> Value {
    json!({
        "id": message.id,
        "content": message.content.clone().unwrap_or_else(|| "[Mídia]".to_string()),
        "timestamp": to_rfc3339(message.timestamp),
        "fromContact": !message.from_me,
        "messageType": message.message_type,
        "mediaUrl": message.media_url,
        "read": true,
    })
}

fn display_name(contact: Option<&Contact>) -> String {
    contact
        .and_then(|c| c.name.clone().or_else(|| c.push_name.clone()))
        .unwrap_or_else(|| "Sem nome".to_string())
}

pub(crate) fn to_rfc3339(timestamp: i64) -> String {
    chrono::DateTime::from_timestamp(timestamp, 0)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_default()
}

pub(crate) fn not_found(message: &str) -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "success": false, "error": message })),
    )
}

pub(crate) fn internal<E: std::fmt::Display>(error: E) -> (StatusCode, Json<Value>) {
    error!("Erro interno: {error}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "success": false, "error": "Erro interno do servidor" })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_filter_maps_display_onto_storage() {
        assert_eq!(storage_filter("initiated"), Some("active"));
        assert_eq!(storage_filter("waiting"), Some("active"));
        assert_eq!(storage_filter("finished"), Some("archived"));
        assert_eq!(storage_filter("all"), None);
        // unknown values filter the stored column as-is
        assert_eq!(storage_filter("archived"), Some("archived"));
    }

    #[test]
    fn search_checks_name_phone_and_last_content() {
        let contact = Contact {
            id: "c1".to_string(),
            phone: "5511999990001".to_string(),
            name: None,
            push_name: Some("Ana Paula".to_string()),
            avatar_url: None,
            last_seen: None,
            created_at: 0,
            updated_at: 0,
        };
        let message = Message {
            id: "m1".to_string(),
            conversation_id: "v1".to_string(),
            contact_id: "c1".to_string(),
            content: Some("Proposta enviada".to_string()),
            message_type: "text".to_string(),
            from_me: true,
            status: "sent".to_string(),
            timestamp: 0,
            media_url: None,
            metadata: None,
            created_at: 0,
        };

        assert!(matches_search(Some(&contact), None, "paula"));
        assert!(matches_search(Some(&contact), None, "11999"));
        assert!(matches_search(Some(&contact), Some(&message), "proposta"));
        assert!(!matches_search(Some(&contact), Some(&message), "zzz"));
        assert!(!matches_search(None, None, "ana"));
        // placeholders are searchable, same as the rendered listing
        assert!(matches_search(None, None, "sem nome"));
        assert!(matches_search(None, None, "sem mensagens"));
    }

    #[test]
    fn conversation_json_derives_the_display_status() {
        let conversation = Conversation {
            id: "v1".to_string(),
            contact_id: "c1".to_string(),
            remote_jid: "5511999990001@s.whatsapp.net".to_string(),
            status: "active".to_string(),
            last_message_at: Some(1_700_000_000),
            messages_count: 3,
            created_at: 1_699_999_000,
            updated_at: 1_700_000_000,
        };
        let ours = Message {
            id: "m1".to_string(),
            conversation_id: "v1".to_string(),
            contact_id: "c1".to_string(),
            content: None,
            message_type: "image".to_string(),
            from_me: true,
            status: "sent".to_string(),
            timestamp: 1_700_000_000,
            media_url: None,
            metadata: None,
            created_at: 0,
        };

        let value = conversation_json(&conversation, None, Some(&ours));
        assert_eq!(value["status"], "waiting");
        assert_eq!(value["contact"]["name"], "Sem nome");
        // content NULL renders as the media placeholder
        assert_eq!(value["lastMessage"]["content"], "[Mídia]");
        assert_eq!(value["lastMessage"]["fromContact"], false);

        let empty = conversation_json(&conversation, None, None);
        assert_eq!(empty["lastMessage"]["id"], "");
        assert_eq!(empty["lastMessage"]["content"], "Sem mensagens");
        assert_eq!(empty["lastMessage"]["read"], true);
    }
}
