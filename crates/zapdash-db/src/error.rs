use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Contact not resolved after upsert: {0}")]
    ContactNotResolved(String),

    #[error("Conversation not resolved after upsert: {0}")]
    ConversationNotResolved(String),

    #[error("Metrics not resolved after upsert: {0}")]
    MetricsNotResolved(String),

    #[error("Could not determine database path")]
    PathUnavailable,
}

pub type Result<T> = std::result::Result<T, DbError>;
