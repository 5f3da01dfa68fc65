use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use metrics::{counter, gauge};
use rust_decimal::Decimal;
use tokio::time::sleep;

use crate::binance::{RestClientError, SymbolInfo, Ticker24h};
use crate::config::AppConfig;
use crate::models::{Catalog, ContractType, Instrument, ReferenceStats};

/// Where the instrument universe and its 24h stats come from.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch_symbols(&self) -> Result<Vec<SymbolInfo>, RestClientError>;

    async fn fetch_ticker_stats(&self) -> Result<Vec<Ticker24h>, RestClientError>;
}

/// Eligibility rules for the streamed universe.
#[derive(Debug, Clone)]
pub struct InstrumentFilter {
    pub quote_asset: String,
    /// Lowercased base assets that are never streamed.
    pub excluded_bases: HashSet<String>,
}

impl InstrumentFilter {
    pub fn new<I, S>(quote_asset: &str, excluded_bases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            quote_asset: quote_asset.to_uppercase(),
            excluded_bases: excluded_bases
                .into_iter()
                .map(|b| b.as_ref().trim().to_lowercase())
                .filter(|b| !b.is_empty())
                .collect(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.quote_asset, &config.excluded_bases)
    }

    /// Keep perpetuals quoted in the settlement currency whose base is not excluded.
    pub fn admit(&self, info: &SymbolInfo) -> Option<Instrument> {
        let contract_type = ContractType::from_api_str(info.contract_type.as_deref()?);
        if contract_type != ContractType::Perpetual {
            return None;
        }

        let quote = info.quote_asset.as_deref()?;
        if !quote.eq_ignore_ascii_case(&self.quote_asset) {
            return None;
        }

        let base = info.base()?;
        if self.excluded_bases.contains(&base.to_lowercase()) {
            return None;
        }

        Some(Instrument {
            symbol: info.symbol.to_uppercase(),
            base_asset: base.to_string(),
            quote_asset: quote.to_string(),
            contract_type,
        })
    }
}

/// Resolves the instrument catalog, retrying every failure until it succeeds.
pub struct CatalogResolver<S> {
    source: S,
    filter: InstrumentFilter,
    retry_delay: Duration,
}

impl<S: CatalogSource> CatalogResolver<S> {
    pub fn new(source: S, filter: InstrumentFilter, retry_delay: Duration) -> Self {
        Self {
            source,
            filter,
            retry_delay,
        }
    }

    /// Resolve instruments, then their reference stats. Never returns an error.
    pub async fn resolve(&self) -> Catalog {
        let instruments = self.resolve_instruments().await;
        let reference = self.resolve_reference_stats(&instruments).await;

        gauge!("resolved_instruments").set(instruments.len() as f64);
        if reference.is_empty() {
            tracing::warn!("No 24h reference stats matched; 24h change will read as zero");
        }
        tracing::info!(
            instruments = instruments.len(),
            with_stats = reference.len(),
            "Instrument catalog resolved"
        );

        Catalog {
            instruments,
            reference,
        }
    }

    /// Eligible instruments in exchange order. An empty universe is retried.
    pub async fn resolve_instruments(&self) -> Vec<Instrument> {
        self.retry_forever("exchange info", move || async move {
            let symbols = self.source.fetch_symbols().await?;
            let total = symbols.len();
            let instruments: Vec<Instrument> =
                symbols.iter().filter_map(|s| self.filter.admit(s)).collect();

            if instruments.is_empty() {
                return Err(RestClientError::Unexpected(format!(
                    "no eligible instruments among {total} symbols"
                )));
            }
            Ok(instruments)
        })
        .await
    }

    /// 24h change for the resolved instruments only; unparseable rows are skipped.
    pub async fn resolve_reference_stats(&self, instruments: &[Instrument]) -> ReferenceStats {
        let wanted: HashSet<&str> = instruments.iter().map(|i| i.symbol.as_str()).collect();
        let tickers = self
            .retry_forever("24h ticker stats", move || self.source.fetch_ticker_stats())
            .await;

        let changes: HashMap<String, Decimal> = tickers
            .into_iter()
            .filter(|t| wanted.contains(t.symbol.as_str()))
            .filter_map(|t| match Decimal::from_str(&t.price_change_percent) {
                Ok(pct) => Some((t.symbol, pct)),
                Err(e) => {
                    tracing::debug!(
                        symbol = %t.symbol,
                        raw = %t.price_change_percent,
                        error = %e,
                        "Skipping unparseable 24h change"
                    );
                    None
                }
            })
            .collect();

        ReferenceStats::new(changes)
    }

    async fn retry_forever<T, F, Fut>(&self, what: &str, mut op: F) -> T
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RestClientError>>,
    {
        let mut attempt: u32 = 0;
        loop {
            attempt = attempt.saturating_add(1);
            match op().await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::info!(attempt, "Fetched {what} after retrying");
                    }
                    return value;
                }
                Err(e) => {
                    counter!("catalog_resolve_failures_total").increment(1);
                    tracing::warn!(
                        error = %e,
                        attempt,
                        delay_ms = self.retry_delay.as_millis() as u64,
                        "Failed to fetch {what}, retrying"
                    );
                    sleep(self.retry_delay).await;
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn symbol(symbol: &str, contract: &str, quote: &str, base: Option<&str>) -> SymbolInfo {
        SymbolInfo {
            symbol: symbol.into(),
            contract_type: Some(contract.into()),
            quote_asset: Some(quote.into()),
            base_asset: base.map(Into::into),
        }
    }

    fn default_filter() -> InstrumentFilter {
        InstrumentFilter::new("USDT", ["btc", "ETH", " sol "])
    }

    #[test]
    fn test_admit_usdt_perpetual() {
        let instrument = default_filter()
            .admit(&symbol("DOGEUSDT", "PERPETUAL", "USDT", Some("DOGE")))
            .expect("DOGEUSDT should be admitted");

        assert_eq!(instrument.symbol, "DOGEUSDT");
        assert_eq!(instrument.base_asset, "DOGE");
        assert_eq!(instrument.contract_type, ContractType::Perpetual);
    }

    #[test]
    fn test_reject_delivery_contract() {
        let info = symbol("DOGEUSDT_250627", "CURRENT_QUARTER", "USDT", Some("DOGE"));
        assert!(default_filter().admit(&info).is_none());
    }

    #[test]
    fn test_reject_other_quote() {
        let info = symbol("DOGEUSDC", "PERPETUAL", "USDC", Some("DOGE"));
        assert!(default_filter().admit(&info).is_none());
    }

    #[test]
    fn test_reject_excluded_base_case_insensitive() {
        let filter = default_filter();
        assert!(filter.admit(&symbol("BTCUSDT", "PERPETUAL", "USDT", Some("BTC"))).is_none());
        assert!(filter.admit(&symbol("ETHUSDT", "PERPETUAL", "USDT", None)).is_none());
        assert!(filter.admit(&symbol("SOLUSDT", "PERPETUAL", "USDT", Some("SOL"))).is_none());
    }

    #[test]
    fn test_reject_missing_contract_type() {
        let info = SymbolInfo {
            symbol: "DOGEUSDT".into(),
            contract_type: None,
            quote_asset: Some("USDT".into()),
            base_asset: Some("DOGE".into()),
        };
        assert!(default_filter().admit(&info).is_none());
    }
}
