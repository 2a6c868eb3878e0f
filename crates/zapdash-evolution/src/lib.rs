mod client;
mod error;

pub use client::{ConnectionState, EvolutionClient, EvolutionConfig, FindMessagesParams};
pub use error::{EvolutionError, Result};
