use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use crate::aggregate::WhaleBoard;
use crate::config::AppConfig;
use crate::errors::EngineError;
use crate::ingestion::feed::{EngineState, FeedConnector};
use crate::ingestion::pipeline::{run_ingestion, IngestionConfig};
use crate::ingestion::sink::event_sink;
use crate::models::{Catalog, WhaleEvent};
use crate::services::catalog::{CatalogResolver, CatalogSource, InstrumentFilter};

/// Whale-trade detection engine with an explicit start/stop lifecycle.
///
/// The ingestion flow runs on its own task and only ever touches the sink's
/// producer half. Everything readable from here lives on the consumer side.
pub struct WhaleEngine {
    board: Mutex<WhaleBoard>,
    threshold: Decimal,
    state_rx: watch::Receiver<EngineState>,
    catalog_rx: watch::Receiver<Arc<Catalog>>,
    shutdown_tx: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<Result<(), EngineError>>>>,
}

impl WhaleEngine {
    /// Spawn the ingestion task and return immediately. Must be called
    /// from within a tokio runtime.
    pub fn start<S, C>(config: &AppConfig, source: S, connector: C) -> Self
    where
        S: CatalogSource + 'static,
        C: FeedConnector + 'static,
    {
        let (publisher, drain) = event_sink(config.sink_capacity);
        let (state_tx, state_rx) = watch::channel(EngineState::Resolving);
        let (catalog_tx, catalog_rx) = watch::channel(Arc::new(Catalog::default()));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let resolver = CatalogResolver::new(
            source,
            InstrumentFilter::from_config(config),
            config.resolve_retry_delay,
        );
        let ingestion = IngestionConfig {
            threshold: config.whale_threshold,
            reconnect_delay: config.reconnect_delay,
            idle_timeout: config.feed_idle_timeout,
        };

        let task = tokio::spawn(run_ingestion(
            resolver,
            connector,
            ingestion,
            publisher,
            catalog_tx,
            state_tx,
            shutdown_rx,
        ));

        tracing::info!(
            threshold = %config.whale_threshold,
            quote = %config.quote_asset,
            excluded = ?config.excluded_bases,
            "Whale engine started"
        );

        Self {
            board: Mutex::new(WhaleBoard::new(drain, config.sink_capacity)),
            threshold: config.whale_threshold,
            state_rx,
            catalog_rx,
            shutdown_tx,
            task: Mutex::new(Some(task)),
        }
    }

    /// Raise the stop signal and wait for the ingestion task to release its
    /// connection. Returns the fatal error, if ingestion failed. Idempotent.
    pub async fn stop(&self) -> Result<(), EngineError> {
        self.shutdown_tx.send_replace(true);

        let handle = self.task.lock().await.take();
        match handle {
            Some(handle) => {
                let result = handle.await?;
                tracing::info!("Whale engine stopped");
                result
            }
            None => Ok(()),
        }
    }

    /// Latest records, drained fresh from the sink.
    pub async fn snapshot(&self, limit: usize) -> Vec<WhaleEvent> {
        let mut board = self.board.lock().await;
        board.refresh();
        board.snapshot(limit)
    }

    /// Drain the sink, then hand out every event drained since the last call,
    /// including those drained by `snapshot`. Each event is returned once.
    pub async fn take_alerts(&self) -> Vec<WhaleEvent> {
        let mut board = self.board.lock().await;
        board.refresh();
        board.take_alerts()
    }

    /// Instruments with at least one qualifying trade so far.
    pub async fn tracked_instruments(&self) -> usize {
        self.board.lock().await.state().instrument_count()
    }

    pub fn state(&self) -> EngineState {
        self.state_rx.borrow().clone()
    }

    pub fn watch_state(&self) -> watch::Receiver<EngineState> {
        self.state_rx.clone()
    }

    /// Resolved catalog; empty until resolution completes.
    pub fn catalog(&self) -> Arc<Catalog> {
        Arc::clone(&self.catalog_rx.borrow())
    }

    pub fn threshold(&self) -> Decimal {
        self.threshold
    }

    /// A receiver that flips to `true` once `stop` is called.
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    /// Resolves with the failure reason once the engine enters `Failed`.
    /// Pends forever if ingestion ends any other way.
    pub async fn wait_for_failure(&self) -> String {
        let mut rx = self.state_rx.clone();
        loop {
            let failed = match &*rx.borrow_and_update() {
                EngineState::Failed(reason) => Some(reason.clone()),
                _ => None,
            };
            if let Some(reason) = failed {
                return reason;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}
