use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::{interval, MissedTickBehavior};

use crate::api::ws_types::WsMessage;
use crate::engine::WhaleEngine;
use crate::ingestion::feed::stopped;

/// Consumer flow: periodically drain the engine's sink and push every event
/// drained since the last tick to dashboard WebSocket clients, whether this
/// loop or an API read drained it. Stops with the engine.
pub async fn run_board_refresher(
    engine: Arc<WhaleEngine>,
    refresh_interval: Duration,
    max_rows: usize,
    ws_tx: broadcast::Sender<WsMessage>,
) {
    let mut shutdown = engine.shutdown_signal();
    let mut ticker = interval(refresh_interval.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::info!(
        interval_ms = refresh_interval.as_millis() as u64,
        max_rows,
        "Board refresher started"
    );

    loop {
        tokio::select! {
            biased;
            _ = stopped(&mut shutdown) => break,
            _ = ticker.tick() => {}
        }

        let alerts = engine.take_alerts().await;
        if alerts.is_empty() {
            continue;
        }

        // No subscribers is not an error; the board state is still updated.
        for event in alerts {
            let _ = ws_tx.send(WsMessage::WhaleAlert(event));
        }
        let rows = engine.snapshot(max_rows).await;
        let _ = ws_tx.send(WsMessage::Snapshot(rows));
    }

    tracing::info!("Board refresher stopped");
}
