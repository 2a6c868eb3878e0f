mod error;
mod models;
mod repository;
mod schema;

pub use error::{DbError, Result};
pub use models::{Contact, Conversation, DailyMetrics, Message, NewMessage, WebhookLog};
pub use repository::ZapdashDb;
