/// Lifecycle status as persisted on a conversation row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationStatus {
    Active,
    Archived,
    Blocked,
}

impl ConversationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationStatus::Active => "active",
            ConversationStatus::Archived => "archived",
            ConversationStatus::Blocked => "blocked",
        }
    }

    /// Parse a stored value. Unknown strings read as active rather than
    /// failing; the column predates any check constraint.
    pub fn parse(value: &str) -> Self {
        match value {
            "archived" => ConversationStatus::Archived,
            "blocked" => ConversationStatus::Blocked,
            _ => ConversationStatus::Active,
        }
    }
}

/// Status shown on the dashboard. Derived on read, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivedStatus {
    Initiated,
    Waiting,
    Finished,
}

impl DerivedStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DerivedStatus::Initiated => "initiated",
            DerivedStatus::Waiting => "waiting",
            DerivedStatus::Finished => "finished",
        }
    }
}

/// Derive the dashboard status from the stored status plus the direction of
/// the last message. Archived conversations are finished; otherwise we sent
/// last means waiting on the contact, and anything else means initiated.
pub fn derive_status(status: ConversationStatus, last_from_me: Option<bool>) -> DerivedStatus {
    if status == ConversationStatus::Archived {
        return DerivedStatus::Finished;
    }
    match last_from_me {
        Some(true) => DerivedStatus::Waiting,
        _ => DerivedStatus::Initiated,
    }
}
