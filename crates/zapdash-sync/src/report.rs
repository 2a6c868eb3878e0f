use serde::Serialize;

use zapdash_db::{Contact, Conversation};

/// Accounting for one reconcile batch. Items are processed, skipped
/// (unusable for reconciliation) or errored (tried and failed); a single bad
/// item never aborts the batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub total: usize,
    pub processed: usize,
    pub errors: usize,
    pub skipped: usize,
}

impl BatchReport {
    pub fn new(total: usize) -> Self {
        Self { total, ..Default::default() }
    }
}

/// Aggregate of a full contacts, chats and messages sync.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct FullSyncReport {
    pub contacts: BatchReport,
    pub chats: BatchReport,
    pub messages: BatchReport,
}

/// What a per-conversation history pull produced.
#[derive(Debug, Clone)]
pub struct ConversationSync {
    pub report: BatchReport,
    pub conversation: Conversation,
    pub contact: Contact,
}

/// Which data a manual sync trigger targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncKind {
    Messages,
    Contacts,
    Chats,
    All,
}

impl SyncKind {
    pub const VALID: [&'static str; 4] = ["messages", "contacts", "chats", "all"];

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "messages" => Some(SyncKind::Messages),
            "contacts" => Some(SyncKind::Contacts),
            "chats" => Some(SyncKind::Chats),
            "all" => Some(SyncKind::All),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SyncKind::Messages => "messages",
            SyncKind::Contacts => "contacts",
            SyncKind::Chats => "chats",
            SyncKind::All => "all",
        }
    }
}

/// Result of a manual sync trigger: one batch or the full three-stage run.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(untagged)]
pub enum SyncOutcome {
    Batch(BatchReport),
    Full(FullSyncReport),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_kind_parses_the_known_names() {
        assert_eq!(SyncKind::parse("messages"), Some(SyncKind::Messages));
        assert_eq!(SyncKind::parse("contacts"), Some(SyncKind::Contacts));
        assert_eq!(SyncKind::parse("chats"), Some(SyncKind::Chats));
        assert_eq!(SyncKind::parse("all"), Some(SyncKind::All));
        assert_eq!(SyncKind::parse("everything"), None);
        assert_eq!(SyncKind::parse(""), None);
    }

    #[test]
    fn outcome_serializes_flat() {
        let outcome = SyncOutcome::Batch(BatchReport {
            total: 5,
            processed: 4,
            errors: 1,
            skipped: 0,
        });
        let value = serde_json::to_value(outcome).unwrap();
        assert_eq!(value["total"], 5);
        assert_eq!(value["processed"], 4);
        assert_eq!(value["errors"], 1);
    }
}
