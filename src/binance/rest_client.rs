use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;

use super::types::{ExchangeInfo, SymbolInfo, Ticker24h};
use crate::services::catalog::CatalogSource;

const FUTURES_API_BASE: &str = "https://fapi.binance.com";

#[derive(Debug, Error)]
pub enum RestClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected response: {0}")]
    Unexpected(String),
}

/// Public (unauthenticated) USDⓈ-M futures market-data endpoints.
#[derive(Debug, Clone)]
pub struct FuturesRestClient {
    http: Client,
    base_url: String,
}

impl Default for FuturesRestClient {
    fn default() -> Self {
        Self::new(Client::new(), FUTURES_API_BASE)
    }
}

impl FuturesRestClient {
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Build a client whose requests give up after `timeout`.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self, RestClientError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self::new(http, base_url))
    }

    pub async fn get_exchange_info(&self) -> Result<ExchangeInfo, RestClientError> {
        let url = format!("{}/fapi/v1/exchangeInfo", self.base_url);
        let resp = self.http.get(&url).send().await?.error_for_status()?;

        let info: ExchangeInfo = resp.json().await?;
        Ok(info)
    }

    pub async fn get_ticker_24h(&self) -> Result<Vec<Ticker24h>, RestClientError> {
        let url = format!("{}/fapi/v1/ticker/24hr", self.base_url);
        let resp = self.http.get(&url).send().await?.error_for_status()?;

        let tickers: Vec<Ticker24h> = resp.json().await?;
        Ok(tickers)
    }
}

#[async_trait]
impl CatalogSource for FuturesRestClient {
    async fn fetch_symbols(&self) -> Result<Vec<SymbolInfo>, RestClientError> {
        Ok(self.get_exchange_info().await?.symbols)
    }

    async fn fetch_ticker_stats(&self) -> Result<Vec<Ticker24h>, RestClientError> {
        self.get_ticker_24h().await
    }
}
