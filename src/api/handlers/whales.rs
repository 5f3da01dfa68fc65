use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::WhaleEvent;
use crate::AppState;

#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SnapshotParams {
    pub limit: Option<usize>,
}

/// GET /api/whales — latest whale trade per instrument, busiest first.
/// Empty while the catalog is resolving or the feed is connecting.
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<SnapshotParams>,
) -> Result<Json<ApiResponse<Vec<WhaleEvent>>>, AppError> {
    let limit = params.limit.unwrap_or(state.config.max_rows);
    if limit == 0 {
        return Err(AppError::BadRequest("limit must be greater than zero".into()));
    }

    let rows = state.engine.snapshot(limit).await;
    Ok(Json(ApiResponse {
        success: true,
        data: Some(rows),
        error: None,
    }))
}
