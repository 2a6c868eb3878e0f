use crate::payload::NativeMessage;

/// Placeholder stored when no known payload shape matches.
pub const NO_CONTENT_PLACEHOLDER: &str = "[Mensagem sem conteúdo]";

/// Canonical message kinds, in the same priority order the extraction
/// probes payload shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Text,
    Image,
    Video,
    Audio,
    Document,
    Sticker,
    Unknown,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Text => "text",
            MessageKind::Image => "image",
            MessageKind::Video => "video",
            MessageKind::Audio => "audio",
            MessageKind::Document => "document",
            MessageKind::Sticker => "sticker",
            MessageKind::Unknown => "unknown",
        }
    }
}

/// Reduce a native message to displayable text. Shapes are probed in a fixed
/// priority order and the first match wins, so a captioned image yields its
/// caption rather than the media placeholder.
pub fn extract_content(message: &NativeMessage) -> String {
    let Some(content) = message.message.as_ref() else {
        return NO_CONTENT_PLACEHOLDER.to_string();
    };

    if let Some(text) = content.conversation.as_ref().filter(|t| !t.is_empty()) {
        return text.clone();
    }
    if let Some(text) = content
        .extended_text_message
        .as_ref()
        .and_then(|m| m.text.as_ref())
        .filter(|t| !t.is_empty())
    {
        return text.clone();
    }
    if let Some(image) = content.image_message.as_ref() {
        if let Some(caption) = image.caption.as_ref().filter(|c| !c.is_empty()) {
            return caption.clone();
        }
        return "[Imagem]".to_string();
    }
    if content.video_message.is_some() {
        return "[Vídeo]".to_string();
    }
    if content.audio_message.is_some() {
        return "[Áudio]".to_string();
    }
    if let Some(document) = content.document_message.as_ref() {
        return match document.file_name.as_ref().filter(|n| !n.is_empty()) {
            Some(name) => format!("[Documento: {name}]"),
            None => "[Documento]".to_string(),
        };
    }
    if content.sticker_message.is_some() {
        return "[Sticker]".to_string();
    }

    NO_CONTENT_PLACEHOLDER.to_string()
}

/// Classify the payload shape, same priority order as `extract_content`.
pub fn classify_kind(message: &NativeMessage) -> MessageKind {
    let Some(content) = message.message.as_ref() else {
        return MessageKind::Unknown;
    };

    let has_text = content.conversation.as_deref().is_some_and(|t| !t.is_empty())
        || content.extended_text_message.is_some();
    if has_text {
        return MessageKind::Text;
    }
    if content.image_message.is_some() {
        return MessageKind::Image;
    }
    if content.video_message.is_some() {
        return MessageKind::Video;
    }
    if content.audio_message.is_some() {
        return MessageKind::Audio;
    }
    if content.document_message.is_some() {
        return MessageKind::Document;
    }
    if content.sticker_message.is_some() {
        return MessageKind::Sticker;
    }
    MessageKind::Unknown
}

/// Media URL when the payload carries one. Images take precedence over
/// video; other kinds never expose a URL here.
pub fn media_url(message: &NativeMessage) -> Option<String> {
    let content = message.message.as_ref()?;
    if let Some(url) = content.image_message.as_ref().and_then(|m| m.url.clone()) {
        return Some(url);
    }
    content.video_message.as_ref().and_then(|m| m.url.clone())
}
