use async_trait::async_trait;
use futures_util::StreamExt;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::ingestion::feed::{FeedConnection, FeedConnector, FeedError};

const FUTURES_STREAM_BASE: &str = "wss://fstream.binance.com/stream";

/// Opens one combined-stream connection carrying every subscribed stream.
///
/// Server pings are answered by tungstenite while reading; this connector
/// never sends pings of its own.
#[derive(Debug, Clone)]
pub struct BinanceStreamConnector {
    base_url: String,
}

impl Default for BinanceStreamConnector {
    fn default() -> Self {
        Self::new(FUTURES_STREAM_BASE)
    }
}

impl BinanceStreamConnector {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    /// `wss://.../stream?streams=a@aggTrade/b@aggTrade`
    pub fn combined_url(&self, streams: &[String]) -> String {
        format!("{}?streams={}", self.base_url, streams.join("/"))
    }
}

#[async_trait]
impl FeedConnector for BinanceStreamConnector {
    async fn connect(&self, streams: &[String]) -> Result<FeedConnection, FeedError> {
        let url = self.combined_url(streams);
        tracing::info!(
            streams = streams.len(),
            url_len = url.len(),
            "Connecting to Binance combined stream..."
        );

        let (ws_stream, _response) = connect_async(url.as_str()).await?;

        let frames = ws_stream.filter_map(|msg| async move {
            match msg {
                Ok(Message::Text(text)) => Some(Ok(text.as_str().to_owned())),
                Ok(Message::Close(frame)) => {
                    let reason = frame.map(|f| f.reason.to_string()).unwrap_or_default();
                    Some(Err(FeedError::Closed(reason)))
                }
                Ok(_) => None, // Binary, Ping, Pong, Frame
                Err(e) => Some(Err(FeedError::WebSocket(e))),
            }
        });

        Ok(Box::pin(frames))
    }
}
