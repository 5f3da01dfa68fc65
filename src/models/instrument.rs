use std::collections::HashMap;
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContractType {
    Perpetual,
    CurrentQuarter,
    NextQuarter,
    Other,
}

impl ContractType {
    pub fn from_api_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "PERPETUAL" => ContractType::Perpetual,
            "CURRENT_QUARTER" => ContractType::CurrentQuarter,
            "NEXT_QUARTER" => ContractType::NextQuarter,
            _ => ContractType::Other,
        }
    }
}

impl fmt::Display for ContractType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContractType::Perpetual => write!(f, "PERPETUAL"),
            ContractType::CurrentQuarter => write!(f, "CURRENT_QUARTER"),
            ContractType::NextQuarter => write!(f, "NEXT_QUARTER"),
            ContractType::Other => write!(f, "OTHER"),
        }
    }
}

/// A tradable contract in the resolved universe. Immutable once resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    pub symbol: String,
    pub base_asset: String,
    pub quote_asset: String,
    pub contract_type: ContractType,
}

impl Instrument {
    /// Aggregate-trade stream name on the combined stream endpoint.
    pub fn agg_trade_stream(&self) -> String {
        format!("{}@aggTrade", self.symbol.to_lowercase())
    }
}

/// 24h percent price change per symbol, captured once at startup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceStats(HashMap<String, Decimal>);

impl ReferenceStats {
    pub fn new(changes: HashMap<String, Decimal>) -> Self {
        Self(changes)
    }

    /// 24h change for `symbol`, or zero when no stats were captured.
    pub fn pct_change_24h(&self, symbol: &str) -> Decimal {
        self.0.get(symbol).copied().unwrap_or(Decimal::ZERO)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.0.contains_key(symbol)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Output of a completed resolution: the instrument universe plus its stats.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub instruments: Vec<Instrument>,
    pub reference: ReferenceStats,
}

impl Catalog {
    pub fn stream_names(&self) -> Vec<String> {
        self.instruments.iter().map(Instrument::agg_trade_stream).collect()
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.instruments.iter().map(|i| i.symbol.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_type_parsing() {
        assert_eq!(ContractType::from_api_str("PERPETUAL"), ContractType::Perpetual);
        assert_eq!(ContractType::from_api_str("perpetual"), ContractType::Perpetual);
        assert_eq!(
            ContractType::from_api_str("CURRENT_QUARTER"),
            ContractType::CurrentQuarter
        );
        assert_eq!(ContractType::from_api_str(""), ContractType::Other);
    }

    #[test]
    fn test_stream_names_are_lowercase_agg_trade() {
        let catalog = Catalog {
            instruments: vec![Instrument {
                symbol: "DOGEUSDT".into(),
                base_asset: "DOGE".into(),
                quote_asset: "USDT".into(),
                contract_type: ContractType::Perpetual,
            }],
            reference: ReferenceStats::default(),
        };

        assert_eq!(catalog.stream_names(), vec!["dogeusdt@aggTrade".to_string()]);
    }

    #[test]
    fn test_reference_stats_default_zero() {
        let mut changes = HashMap::new();
        changes.insert("XRPUSDT".to_string(), Decimal::new(-215, 2));
        let stats = ReferenceStats::new(changes);

        assert_eq!(stats.pct_change_24h("XRPUSDT"), Decimal::new(-215, 2));
        assert_eq!(stats.pct_change_24h("ADAUSDT"), Decimal::ZERO);
    }
}
