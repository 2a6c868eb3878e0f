mod conversations;
mod dashboard;
mod health;
mod sync;
mod webhooks;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/dashboard", get(dashboard::dashboard))
        .route("/webhooks/evolution", get(webhooks::status).post(webhooks::receive))
        .route("/evolution/sync", get(sync::status).post(sync::trigger))
        .route("/conversations", get(conversations::list).post(conversations::create))
        .route("/conversations/{id}/messages", get(conversations::messages))
        .route("/conversations/{id}/send-message", post(conversations::send_message))
        .route("/conversations/{id}/sync-messages", post(conversations::sync_messages))
        .with_state(state)
}
