use thiserror::Error;

#[derive(Error, Debug)]
pub enum EvolutionError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Evolution API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EvolutionError>;
