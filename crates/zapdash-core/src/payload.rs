use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A message as the Evolution API delivers it, both in webhook pushes and in
/// bulk find queries. Every field is optional on the wire; absent values fall
/// back to defaults so a single sparse item never poisons a whole batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NativeMessage {
    pub key: MessageKey,
    pub push_name: Option<String>,
    pub message: Option<MessageContent>,
    pub message_timestamp: Option<i64>,
    pub status: Option<String>,
}

/// Gateway-side identity of a message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MessageKey {
    pub remote_jid: String,
    pub from_me: bool,
    pub id: String,
}

/// The payload body, one optional field per shape the gateway emits.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MessageContent {
    pub conversation: Option<String>,
    pub extended_text_message: Option<ExtendedTextContent>,
    pub image_message: Option<MediaContent>,
    pub video_message: Option<MediaContent>,
    pub audio_message: Option<MediaContent>,
    pub document_message: Option<DocumentContent>,
    pub sticker_message: Option<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtendedTextContent {
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MediaContent {
    pub url: Option<String>,
    pub caption: Option<String>,
    pub mimetype: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DocumentContent {
    pub url: Option<String>,
    pub file_name: Option<String>,
    pub title: Option<String>,
}

/// A chat entry from the gateway's findChats query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NativeChat {
    pub id: String,
    pub name: Option<String>,
    pub is_group: bool,
    pub unread_count: i64,
    pub last_message_timestamp: Option<i64>,
    pub archived: bool,
}

/// A contact entry from the gateway's findContacts query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NativeContact {
    pub id: String,
    pub push_name: Option<String>,
    pub profile_picture_url: Option<String>,
    pub is_my_contact: bool,
    #[serde(rename = "isWAContact")]
    pub is_wa_contact: bool,
}

/// Envelope of a webhook delivery. `data` stays untyped here; each event
/// type decides what shape to read out of it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookEvent {
    pub event: String,
    pub instance: String,
    pub data: Value,
    pub date_time: Option<String>,
}
