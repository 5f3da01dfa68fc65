use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct EngineStatus {
    pub engine: String,
    pub instruments: usize,
    pub with_reference_stats: usize,
    pub tracked_instruments: usize,
    pub threshold: String,
    pub max_rows: usize,
}

/// GET /api/status — ingestion progress and detection settings.
pub async fn status(State(state): State<AppState>) -> Json<EngineStatus> {
    let catalog = state.engine.catalog();

    Json(EngineStatus {
        engine: state.engine.state().to_string(),
        instruments: catalog.instruments.len(),
        with_reference_stats: catalog.reference.len(),
        tracked_instruments: state.engine.tracked_instruments().await,
        threshold: state.engine.threshold().to_string(),
        max_rows: state.config.max_rows,
    })
}
