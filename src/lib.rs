pub mod aggregate;
pub mod api;
pub mod binance;
pub mod config;
pub mod engine;
pub mod errors;
pub mod ingestion;
pub mod metrics;
pub mod models;
pub mod services;

use std::sync::Arc;
use tokio::sync::broadcast;

use crate::api::ws_types::WsMessage;
use crate::config::AppConfig;
use crate::engine::WhaleEngine;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<WhaleEngine>,
    pub config: AppConfig,
    pub ws_tx: broadcast::Sender<WsMessage>,
    pub metrics_handle: metrics_exporter_prometheus::PrometheusHandle,
}
