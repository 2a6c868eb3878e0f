mod content;
mod jid;
mod payload;
mod status;

pub use content::{MessageKind, NO_CONTENT_PLACEHOLDER, classify_kind, extract_content, media_url};
pub use jid::{
    GROUP_SUFFIX, LEGACY_SUFFIX, MIN_PHONE_LEN, USER_SUFFIX, alternate_jid, extract_phone,
    format_as_jid, is_group_jid, jid_matches,
};
pub use payload::{
    DocumentContent, ExtendedTextContent, MediaContent, MessageContent, MessageKey, NativeChat,
    NativeContact, NativeMessage, WebhookEvent,
};
pub use status::{ConversationStatus, DerivedStatus, derive_status};
