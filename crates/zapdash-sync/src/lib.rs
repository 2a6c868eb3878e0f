mod bulk;
mod engine;
mod error;
mod gateway;
mod metrics;
mod report;
mod webhook;

pub use engine::{IngestOrigin, MessageOutcome, SyncEngine};
pub use error::{Result, SyncError};
pub use gateway::MessagingGateway;
pub use metrics::{day_bounds, recalculate_daily_metrics};
pub use report::{BatchReport, ConversationSync, FullSyncReport, SyncKind, SyncOutcome};
pub use webhook::{WEBHOOK_EVENTS, WEBHOOK_SOURCE, WebhookOutcome};

pub use zapdash_db::{Contact, Conversation, DailyMetrics, Message, WebhookLog, ZapdashDb};
pub use zapdash_evolution::{EvolutionClient, EvolutionConfig, EvolutionError};
