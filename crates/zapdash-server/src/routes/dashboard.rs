use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use chrono::{Datelike, Days, NaiveDate};
use serde_json::{Value, json};

use zapdash_db::DailyMetrics;
use zapdash_sync::day_bounds;

use crate::routes::conversations::internal;
use crate::state::AppState;

const WEEKDAY_LABELS: [&str; 7] = ["Dom", "Seg", "Ter", "Qua", "Qui", "Sex", "Sáb"];

/// GET /dashboard: metrics for today plus the charts the frontend renders.
pub async fn dashboard(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    match build_dashboard(&state).await {
        Ok(body) => (StatusCode::OK, Json(body)),
        Err(e) => internal(e),
    }
}

async fn build_dashboard(state: &AppState) -> Result<Value, zapdash_db::DbError> {
    let today = chrono::Utc::now().date_naive();
    let key = today.format("%Y-%m-%d").to_string();

    // Serve the stored row when today was already computed, otherwise
    // compute it on demand.
    let metrics = match state.db.daily_metrics_for(&key).await? {
        Some(metrics) => metrics,
        None => zapdash_sync::recalculate_daily_metrics(&state.db, today).await?,
    };

    let responded = metrics.total_leads - metrics.no_response_count;
    let no_response = metrics.no_response_count.max(0);
    let chart_data = json!([
        { "name": "Responderam", "value": responded, "color": "#1DB954" },
        { "name": "Não Responderam", "value": no_response, "color": "#ff6b6b" },
    ]);

    let weekly_data = weekly_activity(state, today).await?;

    Ok(json!({
        "metrics": metrics_json(&metrics),
        "chartData": chart_data,
        "weeklyData": weekly_data,
    }))
}

/// Conversation and inbound-message counts for the trailing seven days,
/// oldest day first.
async fn weekly_activity(state: &AppState, today: NaiveDate) -> Result<Value, zapdash_db::DbError> {
    let mut days = Vec::with_capacity(7);
    for back in (0..7u64).rev() {
        let date = today - Days::new(back);
        let (start, end) = day_bounds(date);
        let conversations = state.db.count_conversations_created_between(start, end).await?;
        let messages = state.db.count_inbound_messages_between(start, end).await?;
        let label = WEEKDAY_LABELS[date.weekday().num_days_from_sunday() as usize];
        days.push(json!({
            "name": label,
            "conversas": conversations,
            "mensagens": messages,
        }));
    }
    Ok(Value::Array(days))
}

fn metrics_json(metrics: &DailyMetrics) -> Value {
    json!({
        "date": metrics.date,
        "totalLeads": metrics.total_leads,
        "responseRate": metrics.response_rate,
        "noResponseCount": metrics.no_response_count,
        "totalConversations": metrics.total_conversations,
        "conversationsToday": metrics.conversations_today,
        "avgResponseTime": metrics.avg_response_time,
    })
}
