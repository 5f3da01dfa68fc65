use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use rust_decimal::Decimal;
use serde_json::json;

use futures_whale::binance::{RestClientError, SymbolInfo, Ticker24h};
use futures_whale::config::AppConfig;
use futures_whale::engine::WhaleEngine;
use futures_whale::ingestion::{FeedConnection, FeedConnector, FeedError};
use futures_whale::models::WhaleEvent;
use futures_whale::services::CatalogSource;

/// Fast timings and the default 100k threshold.
#[allow(dead_code)]
pub fn test_config() -> AppConfig {
    AppConfig {
        whale_threshold: Decimal::from(100_000),
        resolve_retry_delay: Duration::from_millis(5),
        reconnect_delay: Duration::from_millis(10),
        refresh_interval: Duration::from_millis(10),
        ..AppConfig::default()
    }
}

#[allow(dead_code)]
pub fn perpetual(symbol: &str, base: &str) -> SymbolInfo {
    SymbolInfo {
        symbol: symbol.into(),
        contract_type: Some("PERPETUAL".into()),
        quote_asset: Some("USDT".into()),
        base_asset: Some(base.into()),
    }
}

#[allow(dead_code)]
pub fn ticker(symbol: &str, pct: &str) -> Ticker24h {
    Ticker24h {
        symbol: symbol.into(),
        price_change_percent: pct.into(),
    }
}

/// DOGE and XRP are streamable; BTC is excluded by default; the quarterly
/// contract and the USDC pair never qualify.
#[allow(dead_code)]
pub fn sample_symbols() -> Vec<SymbolInfo> {
    vec![
        perpetual("BTCUSDT", "BTC"),
        perpetual("DOGEUSDT", "DOGE"),
        perpetual("XRPUSDT", "XRP"),
        SymbolInfo {
            symbol: "DOGEUSDT_250926".into(),
            contract_type: Some("CURRENT_QUARTER".into()),
            quote_asset: Some("USDT".into()),
            base_asset: Some("DOGE".into()),
        },
        SymbolInfo {
            symbol: "DOGEUSDC".into(),
            contract_type: Some("PERPETUAL".into()),
            quote_asset: Some("USDC".into()),
            base_asset: Some("DOGE".into()),
        },
    ]
}

#[allow(dead_code)]
pub fn sample_tickers() -> Vec<Ticker24h> {
    vec![
        ticker("BTCUSDT", "1.10"),
        ticker("DOGEUSDT", "-3.25"),
        ticker("XRPUSDT", "7.5"),
    ]
}

/// Serves fixed catalog data after failing a configurable number of times.
#[derive(Clone, Default)]
pub struct StubCatalogSource {
    pub symbols: Vec<SymbolInfo>,
    pub tickers: Vec<Ticker24h>,
    pub symbol_failures: usize,
    pub ticker_failures: usize,
    pub symbol_calls: Arc<AtomicUsize>,
    pub ticker_calls: Arc<AtomicUsize>,
}

#[allow(dead_code)]
impl StubCatalogSource {
    pub fn new(symbols: Vec<SymbolInfo>, tickers: Vec<Ticker24h>) -> Self {
        Self {
            symbols,
            tickers,
            ..Self::default()
        }
    }

    pub fn sample() -> Self {
        Self::new(sample_symbols(), sample_tickers())
    }

    /// A source that never answers successfully.
    pub fn unreachable() -> Self {
        Self {
            symbol_failures: usize::MAX,
            ..Self::sample()
        }
    }
}

#[async_trait]
impl CatalogSource for StubCatalogSource {
    async fn fetch_symbols(&self) -> Result<Vec<SymbolInfo>, RestClientError> {
        let call = self.symbol_calls.fetch_add(1, Ordering::SeqCst);
        if call < self.symbol_failures {
            return Err(RestClientError::Unexpected(format!("exchange info down (call {call})")));
        }
        Ok(self.symbols.clone())
    }

    async fn fetch_ticker_stats(&self) -> Result<Vec<Ticker24h>, RestClientError> {
        let call = self.ticker_calls.fetch_add(1, Ordering::SeqCst);
        if call < self.ticker_failures {
            return Err(RestClientError::Unexpected(format!("ticker down (call {call})")));
        }
        Ok(self.tickers.clone())
    }
}

/// What one `connect` call produces.
#[allow(dead_code)]
pub enum Session {
    /// Connect fails outright.
    Refused,
    /// Deliver the frames, then the server drops the connection.
    Drop(Vec<String>),
    /// Deliver the frames, then stay connected and silent.
    Hold(Vec<String>),
}

/// Plays back scripted sessions; once exhausted, every connect holds open silently.
#[derive(Clone, Default)]
pub struct ScriptedConnector {
    sessions: Arc<Mutex<VecDeque<Session>>>,
    pub connects: Arc<AtomicUsize>,
    pub last_streams: Arc<Mutex<Vec<String>>>,
}

#[allow(dead_code)]
impl ScriptedConnector {
    pub fn new(sessions: Vec<Session>) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(sessions.into())),
            ..Self::default()
        }
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedConnector for ScriptedConnector {
    async fn connect(&self, streams: &[String]) -> Result<FeedConnection, FeedError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        *self.last_streams.lock().unwrap() = streams.to_vec();

        let session = self.sessions.lock().unwrap().pop_front();
        match session.unwrap_or(Session::Hold(Vec::new())) {
            Session::Refused => Err(FeedError::Closed("connection refused".into())),
            Session::Drop(frames) => Ok(stream::iter(frames.into_iter().map(Ok)).boxed()),
            Session::Hold(frames) => Ok(stream::iter(frames.into_iter().map(Ok))
                .chain(stream::pending())
                .boxed()),
        }
    }
}

/// A combined-stream aggTrade frame as Binance sends it.
#[allow(dead_code)]
pub fn agg_trade_frame(symbol: &str, price: &str, qty: &str, is_buyer_maker: bool) -> String {
    json!({
        "stream": format!("{}@aggTrade", symbol.to_lowercase()),
        "data": {
            "e": "aggTrade",
            "E": 1_700_000_000_000_i64,
            "s": symbol,
            "a": 42,
            "p": price,
            "q": qty,
            "f": 1,
            "l": 1,
            "T": 1_700_000_000_000_i64,
            "m": is_buyer_maker,
        }
    })
    .to_string()
}

/// Poll the engine until the snapshot satisfies `done`, or panic after 5s.
#[allow(dead_code)]
pub async fn wait_for_snapshot<F>(engine: &WhaleEngine, limit: usize, done: F) -> Vec<WhaleEvent>
where
    F: Fn(&[WhaleEvent]) -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let rows = engine.snapshot(limit).await;
        if done(&rows) {
            return rows;
        }
        if tokio::time::Instant::now() > deadline {
            panic!("snapshot never reached expected state: {rows:?}");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
