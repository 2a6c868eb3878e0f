use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde_json::{Value, json};

use crate::state::AppState;

/// GET /health: liveness of the store and the gateway.
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    let database_ok = state.db.ping().await.is_ok();
    let evolution_ok = state.evolution.health_check().await;
    let healthy = database_ok && evolution_ok;

    let code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        code,
        Json(json!({
            "status": if healthy { "ok" } else { "degraded" },
            "services": {
                "database": if database_ok { "ok" } else { "error" },
                "evolution_api": if evolution_ok { "ok" } else { "error" },
            },
            "timestamp": chrono::Utc::now().to_rfc3339(),
        })),
    )
}
