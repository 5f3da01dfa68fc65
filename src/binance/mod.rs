pub mod rest_client;
pub mod types;
pub mod ws_connector;

pub use rest_client::{FuturesRestClient, RestClientError};
pub use types::{AggTrade, ExchangeInfo, StreamEnvelope, SymbolInfo, Ticker24h};
pub use ws_connector::BinanceStreamConnector;
