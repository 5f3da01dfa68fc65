use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Exchange info (REST)
// ---------------------------------------------------------------------------

/// `GET /fapi/v1/exchangeInfo`. A body without `symbols` fails to decode.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExchangeInfo {
    pub symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolInfo {
    pub symbol: String,
    #[serde(default)]
    pub contract_type: Option<String>,
    #[serde(default)]
    pub quote_asset: Option<String>,
    #[serde(default)]
    pub base_asset: Option<String>,
}

impl SymbolInfo {
    /// Base asset, falling back to the symbol with the quote suffix removed.
    pub fn base(&self) -> Option<&str> {
        if let Some(base) = self.base_asset.as_deref().filter(|b| !b.is_empty()) {
            return Some(base);
        }
        let quote = self.quote_asset.as_deref()?;
        self.symbol.strip_suffix(quote).filter(|b| !b.is_empty())
    }
}

// ---------------------------------------------------------------------------
// 24h ticker statistics (REST)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticker24h {
    pub symbol: String,
    pub price_change_percent: String,
}

// ---------------------------------------------------------------------------
// Combined-stream aggregate trade (WebSocket)
// ---------------------------------------------------------------------------

/// `{"stream": "btcusdt@aggTrade", "data": {...}}`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StreamEnvelope<T> {
    #[serde(default)]
    pub stream: Option<String>,
    pub data: T,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AggTrade {
    #[serde(rename = "e", default)]
    pub event_type: Option<String>,
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "p")]
    pub price: String,
    #[serde(rename = "q")]
    pub quantity: String,
    /// True when the buyer was the resting (maker) side.
    #[serde(rename = "m")]
    pub is_buyer_maker: bool,
    #[serde(rename = "T", default)]
    pub trade_time: Option<i64>,
}

impl AggTrade {
    pub fn is_agg_trade(&self) -> bool {
        self.event_type.as_deref().map_or(true, |e| e == "aggTrade")
    }
}
