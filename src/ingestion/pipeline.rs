use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use rust_decimal::Decimal;
use tokio::sync::watch;

use crate::errors::EngineError;
use crate::ingestion::classifier::TradeClassifier;
use crate::ingestion::feed::{stopped, EngineState, FeedConnector, FeedManager};
use crate::ingestion::sink::EventPublisher;
use crate::models::Catalog;
use crate::services::catalog::{CatalogResolver, CatalogSource};

/// Tunables for one ingestion session.
#[derive(Debug, Clone)]
pub struct IngestionConfig {
    pub threshold: Decimal,
    pub reconnect_delay: std::time::Duration,
    pub idle_timeout: Option<std::time::Duration>,
}

/// The ingestion flow: resolve the catalog, then stream, classify and publish
/// until `shutdown` fires.
///
/// 1. Resolve instruments and reference stats (retried until success)
/// 2. Open one combined stream for every instrument (reconnected forever)
/// 3. Classify each trade; publish qualifying events to the sink
///
/// Returns `Ok(())` on a cooperative stop and `Err` only when the sink fails.
pub async fn run_ingestion<S, C>(
    resolver: CatalogResolver<S>,
    connector: C,
    config: IngestionConfig,
    publisher: EventPublisher,
    catalog_tx: watch::Sender<Arc<Catalog>>,
    state_tx: watch::Sender<EngineState>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), EngineError>
where
    S: CatalogSource,
    C: FeedConnector,
{
    state_tx.send_replace(EngineState::Resolving);

    let catalog = tokio::select! {
        biased;
        _ = stopped(&mut shutdown) => {
            tracing::info!("Stopped before the instrument catalog was resolved");
            state_tx.send_replace(EngineState::Stopped);
            return Ok(());
        }
        catalog = resolver.resolve() => Arc::new(catalog),
    };
    catalog_tx.send_replace(Arc::clone(&catalog));

    let mut classifier = TradeClassifier::new(config.threshold, &catalog);
    let feed = FeedManager::new(connector, catalog.stream_names(), config.reconnect_delay)
        .with_idle_timeout(config.idle_timeout);

    tracing::info!(
        instruments = catalog.instruments.len(),
        threshold = %classifier.threshold(),
        "Starting trade ingestion"
    );

    let result = feed
        .run(shutdown, &state_tx, |trade| {
            let start = Instant::now();
            let outcome = match classifier.classify(&trade) {
                Some(event) => {
                    counter!("whale_events_total").increment(1);
                    publisher.publish(event)
                }
                None => Ok(()),
            };
            histogram!("classify_latency_seconds").record(start.elapsed().as_secs_f64());
            outcome
        })
        .await;

    match result {
        Ok(()) => {
            tracing::info!("Trade ingestion stopped");
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = %e, "Trade ingestion failed");
            state_tx.send_replace(EngineState::Failed(e.to_string()));
            Err(EngineError::Sink(e))
        }
    }
}
