use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use rust_decimal::Decimal;

const DEFAULT_REST_URL: &str = "https://fapi.binance.com";
const DEFAULT_WS_URL: &str = "wss://fstream.binance.com/stream";
const DEFAULT_EXCLUDED_BASES: &str = "btc,eth,sol";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,

    // Exchange endpoints
    pub binance_rest_url: String,
    pub binance_ws_url: String,

    // Detection
    pub whale_threshold: Decimal,
    pub max_rows: usize,
    pub quote_asset: String,
    pub excluded_bases: Vec<String>,

    // Resilience
    pub resolve_retry_delay: Duration,
    pub reconnect_delay: Duration,
    /// Reconnect when no frame arrives for this long. `None` relies on the transport alone.
    pub feed_idle_timeout: Option<Duration>,
    pub http_timeout: Duration,

    // Hand-off
    pub sink_capacity: usize,
    pub refresh_interval: Duration,

    pub log_json: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
            binance_rest_url: DEFAULT_REST_URL.into(),
            binance_ws_url: DEFAULT_WS_URL.into(),
            whale_threshold: Decimal::from(100_000),
            max_rows: 100,
            quote_asset: "USDT".into(),
            excluded_bases: split_list(DEFAULT_EXCLUDED_BASES),
            resolve_retry_delay: Duration::from_secs(5),
            reconnect_delay: Duration::from_millis(1_000),
            feed_idle_timeout: None,
            http_timeout: Duration::from_secs(10),
            sink_capacity: 65_536,
            refresh_interval: Duration::from_millis(500),
            log_json: false,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. Absent keys take defaults;
    /// present but invalid values are errors.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let whale_threshold: Decimal = parse_or(&get, "WHALE_THRESHOLD", defaults.whale_threshold)?;
        if whale_threshold <= Decimal::ZERO {
            anyhow::bail!("WHALE_THRESHOLD must be positive, got {whale_threshold}");
        }

        let max_rows: usize = parse_or(&get, "MAX_ROWS", defaults.max_rows)?;
        if max_rows == 0 {
            anyhow::bail!("MAX_ROWS must be greater than zero");
        }

        let sink_capacity: usize = parse_or(&get, "SINK_CAPACITY", defaults.sink_capacity)?;
        if sink_capacity == 0 {
            anyhow::bail!("SINK_CAPACITY must be greater than zero");
        }

        let refresh_ms: u64 = parse_or(&get, "REFRESH_INTERVAL_MS", 500)?;
        if refresh_ms == 0 {
            anyhow::bail!("REFRESH_INTERVAL_MS must be greater than zero");
        }

        let idle_secs: u64 = parse_or(&get, "FEED_IDLE_TIMEOUT_SECS", 0)?;

        Ok(Self {
            host: get("HOST").unwrap_or(defaults.host),
            port: parse_or(&get, "PORT", defaults.port)?,

            binance_rest_url: get("BINANCE_REST_URL").unwrap_or(defaults.binance_rest_url),
            binance_ws_url: get("BINANCE_WS_URL").unwrap_or(defaults.binance_ws_url),

            whale_threshold,
            max_rows,
            quote_asset: get("QUOTE_ASSET")
                .map(|q| q.to_uppercase())
                .unwrap_or(defaults.quote_asset),
            excluded_bases: get("EXCLUDED_BASES")
                .map(|raw| split_list(&raw))
                .unwrap_or(defaults.excluded_bases),

            resolve_retry_delay: Duration::from_secs(parse_or(&get, "RESOLVE_RETRY_SECS", 5)?),
            reconnect_delay: Duration::from_millis(parse_or(&get, "RECONNECT_DELAY_MS", 1_000)?),
            feed_idle_timeout: (idle_secs > 0).then(|| Duration::from_secs(idle_secs)),
            http_timeout: Duration::from_secs(parse_or(&get, "HTTP_TIMEOUT_SECS", 10)?),

            sink_capacity,
            refresh_interval: Duration::from_millis(refresh_ms),

            log_json: get("LOG_FORMAT").is_some_and(|f| f.eq_ignore_ascii_case("json")),
        })
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("invalid value for {key}: {raw:?}")),
        None => Ok(default),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}
