use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde_json::{Value, json};
use tracing::error;

use zapdash_sync::WEBHOOK_EVENTS;

use crate::state::AppState;

/// POST /webhooks/evolution: one gateway event per request.
pub async fn receive(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let event = payload
        .get("event")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string();

    match state.engine.ingest_webhook(&payload).await {
        Ok(_) => (StatusCode::OK, Json(json!({ "success": true, "event": event }))),
        Err(e) => {
            error!("Erro ao processar webhook {event}: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Erro interno do servidor" })),
            )
        }
    }
}

/// GET /webhooks/evolution: static status, handy for checking the URL the
/// gateway was pointed at.
pub async fn status() -> Json<Value> {
    Json(json!({
        "status": "ativo",
        "endpoint": "/webhooks/evolution",
        "events": WEBHOOK_EVENTS,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
