//! WhatsApp JID handling. A JID is `<phone>@<domain>`; 1:1 chats use
//! `@s.whatsapp.net` (or the legacy `@c.us`), groups use `@g.us`.

pub const USER_SUFFIX: &str = "@s.whatsapp.net";
pub const LEGACY_SUFFIX: &str = "@c.us";
pub const GROUP_SUFFIX: &str = "@g.us";

/// Minimum digit count for a phone to be considered plausible.
pub const MIN_PHONE_LEN: usize = 8;

/// Strip the known 1:1 suffixes off a JID, leaving the canonical phone.
/// Returns an empty string when there is nothing to extract; callers decide
/// how strict to be about what comes back.
pub fn extract_phone(jid: &str) -> String {
    if jid.is_empty() {
        return String::new();
    }
    jid.replace(USER_SUFFIX, "").replace(LEGACY_SUFFIX, "")
}

/// Format a phone as a user JID. Inputs that already carry a domain pass
/// through unchanged; anything else is reduced to digits and suffixed.
pub fn format_as_jid(phone: &str) -> String {
    if phone.contains('@') {
        return phone.to_string();
    }
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    format!("{digits}{USER_SUFFIX}")
}

/// Whether the JID addresses a group chat.
pub fn is_group_jid(jid: &str) -> bool {
    jid.ends_with(GROUP_SUFFIX)
}

/// The same logical JID under the other 1:1 suffix, when one applies.
pub fn alternate_jid(jid: &str) -> Option<String> {
    if let Some(local) = jid.strip_suffix(USER_SUFFIX) {
        return Some(format!("{local}{LEGACY_SUFFIX}"));
    }
    if let Some(local) = jid.strip_suffix(LEGACY_SUFFIX) {
        return Some(format!("{local}{USER_SUFFIX}"));
    }
    None
}

/// JID equality that treats `@s.whatsapp.net` and `@c.us` as the same
/// domain. The gateway mixes both for the same chat depending on version.
pub fn jid_matches(candidate: &str, target: &str) -> bool {
    if candidate == target {
        return true;
    }
    match alternate_jid(target) {
        Some(alternate) => candidate == alternate,
        None => false,
    }
}
