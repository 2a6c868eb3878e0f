use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{error, info};

use zapdash_sync::SyncKind;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SyncRequest {
    #[serde(rename = "type")]
    kind: Option<String>,
    limit: Option<u32>,
}

/// POST /evolution/sync: manual sync trigger. An unknown type is a client
/// mistake, not a server failure, so it answers 200 with success false.
pub async fn trigger(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SyncRequest>,
) -> (StatusCode, Json<Value>) {
    let requested = request.kind.as_deref().unwrap_or("");
    let Some(kind) = SyncKind::parse(requested) else {
        return (
            StatusCode::OK,
            Json(json!({
                "success": false,
                "error": format!("Tipo de sync inválido: {requested}"),
                "valid": SyncKind::VALID,
            })),
        );
    };

    info!("🔁 Sync manual: {}", kind.as_str());
    match state.engine.run_sync(kind, request.limit).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "type": kind.as_str(),
                "result": outcome,
                "timestamp": chrono::Utc::now().to_rfc3339(),
            })),
        ),
        Err(e) => {
            error!("Sync {} falhou: {e}", kind.as_str());
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "error": e.to_string() })),
            )
        }
    }
}

/// GET /evolution/sync: gateway health plus the latest webhook deliveries.
pub async fn status(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    let healthy = state.evolution.health_check().await;
    let recent = match state.db.recent_webhook_logs(5).await {
        Ok(logs) => logs,
        Err(e) => {
            error!("Falha ao ler webhook_logs: {e}");
            Vec::new()
        }
    };

    (
        StatusCode::OK,
        Json(json!({
            "status": "online",
            "evolution_api": {
                "healthy": healthy,
                "instance": state.evolution.instance(),
            },
            "recent_activity": recent,
            "available_sync_types": SyncKind::VALID,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        })),
    )
}
