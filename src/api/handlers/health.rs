use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::ingestion::EngineState;
use crate::AppState;

/// Healthy while resolving or reconnecting; only a failed engine is unhealthy.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.engine.state() {
        EngineState::Failed(reason) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "unhealthy", "engine": "failed", "reason": reason })),
        ),
        engine => (
            StatusCode::OK,
            Json(json!({ "status": "healthy", "engine": engine.as_str() })),
        ),
    }
}
