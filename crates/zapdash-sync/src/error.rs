use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Database error: {0}")]
    Db(#[from] zapdash_db::DbError),

    #[error("Gateway error: {0}")]
    Gateway(#[from] zapdash_evolution::EvolutionError),

    #[error("Conversation not found: {0}")]
    ConversationNotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SyncError>;
