use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use metrics::counter;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::{sleep, timeout};

use crate::binance::{AggTrade, StreamEnvelope};

/// Text frames from one live connection. The stream ending means the peer went away.
pub type FeedConnection = BoxStream<'static, Result<String, FeedError>>;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("connection closed by server: {0}")]
    Closed(String),

    #[error("no frame received for {0:?}")]
    IdleTimeout(Duration),

    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Opens a single multiplexed connection for the given stream names.
#[async_trait]
pub trait FeedConnector: Send + Sync {
    async fn connect(&self, streams: &[String]) -> Result<FeedConnection, FeedError>;
}

/// Connection lifecycle as seen by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineState {
    Resolving,
    Connecting,
    Connected,
    Disconnected,
    Stopped,
    Failed(String),
}

impl EngineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineState::Resolving => "resolving",
            EngineState::Connecting => "connecting",
            EngineState::Connected => "connected",
            EngineState::Disconnected => "disconnected",
            EngineState::Stopped => "stopped",
            EngineState::Failed(_) => "failed",
        }
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineState::Failed(reason) => write!(f, "failed: {reason}"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Decode one combined-stream frame. `Ok(None)` for frames that are not
/// aggregate trades (subscription acks, other event types).
pub fn decode_frame(text: &str) -> Result<Option<AggTrade>, FeedError> {
    let envelope: StreamEnvelope<AggTrade> = serde_json::from_str(text)?;
    if envelope.data.is_agg_trade() {
        Ok(Some(envelope.data))
    } else {
        Ok(None)
    }
}

/// Resolves once the stop flag is raised or its sender is gone.
pub async fn stopped(shutdown: &mut watch::Receiver<bool>) {
    while !*shutdown.borrow_and_update() {
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

/// Owns the streaming connection and reconnects on every failure until stopped.
pub struct FeedManager<C> {
    connector: C,
    streams: Vec<String>,
    reconnect_delay: Duration,
    idle_timeout: Option<Duration>,
}

impl<C: FeedConnector> FeedManager<C> {
    pub fn new(connector: C, streams: Vec<String>, reconnect_delay: Duration) -> Self {
        Self {
            connector,
            streams,
            reconnect_delay,
            idle_timeout: None,
        }
    }

    /// Treat a connection that stays silent for `idle` as dropped.
    pub fn with_idle_timeout(mut self, idle: Option<Duration>) -> Self {
        self.idle_timeout = idle;
        self
    }

    /// Deliver every decoded trade to `on_trade` until `shutdown` fires.
    ///
    /// Connection errors never end the loop. An error returned by `on_trade`
    /// is fatal and is returned to the caller after the connection is released.
    pub async fn run<F, E>(
        &self,
        mut shutdown: watch::Receiver<bool>,
        state_tx: &watch::Sender<EngineState>,
        mut on_trade: F,
    ) -> Result<(), E>
    where
        F: FnMut(AggTrade) -> Result<(), E>,
    {
        let mut consecutive_failures: u32 = 0;

        loop {
            if *shutdown.borrow() {
                break;
            }

            state_tx.send_replace(EngineState::Connecting);
            let connected = tokio::select! {
                biased;
                _ = stopped(&mut shutdown) => break,
                result = self.connector.connect(&self.streams) => result,
            };

            match connected {
                Ok(mut conn) => {
                    state_tx.send_replace(EngineState::Connected);
                    tracing::info!(streams = self.streams.len(), "Feed connected");
                    consecutive_failures = 0;

                    loop {
                        let frame = tokio::select! {
                            biased;
                            _ = stopped(&mut shutdown) => {
                                state_tx.send_replace(EngineState::Stopped);
                                return Ok(());
                            }
                            frame = self.next_frame(&mut conn) => frame,
                        };

                        match frame {
                            Some(Ok(text)) => {
                                counter!("feed_messages_total").increment(1);
                                match decode_frame(&text) {
                                    Ok(Some(trade)) => on_trade(trade)?,
                                    Ok(None) => {
                                        tracing::trace!(raw = %text, "Non-trade frame received");
                                    }
                                    Err(e) => {
                                        counter!("feed_malformed_total").increment(1);
                                        tracing::warn!(error = %e, raw = %text, "Dropping malformed frame");
                                    }
                                }
                            }
                            Some(Err(e)) => {
                                tracing::warn!(error = %e, "Feed read error");
                                break;
                            }
                            None => {
                                tracing::warn!("Feed stream ended");
                                break;
                            }
                        }
                    }
                }
                Err(e) => {
                    consecutive_failures = consecutive_failures.saturating_add(1);
                    tracing::warn!(
                        error = %e,
                        consecutive_failures,
                        "Feed connection failed"
                    );
                }
            }

            state_tx.send_replace(EngineState::Disconnected);
            counter!("feed_reconnects_total").increment(1);
            tracing::info!(
                delay_ms = self.reconnect_delay.as_millis() as u64,
                "Reconnecting..."
            );

            tokio::select! {
                biased;
                _ = stopped(&mut shutdown) => break,
                _ = sleep(self.reconnect_delay) => {}
            }
        }

        state_tx.send_replace(EngineState::Stopped);
        Ok(())
    }

    async fn next_frame(&self, conn: &mut FeedConnection) -> Option<Result<String, FeedError>> {
        match self.idle_timeout {
            Some(idle) => match timeout(idle, conn.next()).await {
                Ok(frame) => frame,
                Err(_) => Some(Err(FeedError::IdleTimeout(idle))),
            },
            None => conn.next().await,
        }
    }
}
