// HTTP handlers for the health server
//
// Liveness and readiness endpoints; the engine itself is driven by the scheduler

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::AppState;

/// GET /health - Basic health check
pub(crate) async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status": "healthy"})))
}

/// GET /ready - Readiness check with index and ledger sizes
pub(crate) async fn ready_check(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.indices.snapshot();
    (
        StatusCode::OK,
        Json(json!({
            "status": "ready",
            "subscribers": snapshot.subscribers.len(),
            "subscriptions": snapshot.subscriptions.total(),
            "active_subscriptions": snapshot.subscriptions.active(),
            "ledger_entries": state.ledger.len(),
        })),
    )
}
