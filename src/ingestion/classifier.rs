use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use metrics::counter;
use rust_decimal::Decimal;

use crate::binance::AggTrade;
use crate::models::{to_ist, Catalog, ReferenceStats, Side, WhaleEvent};

/// Admits trades whose notional meets the threshold and enriches them.
///
/// Owns the per-instrument last qualifying price and occurrence count for the
/// session. Keys are added as instruments first qualify and are never removed,
/// so both maps stay bounded by the resolved universe.
#[derive(Debug)]
pub struct TradeClassifier {
    threshold: Decimal,
    instruments: HashSet<String>,
    reference: ReferenceStats,
    last_price: HashMap<String, Decimal>,
    counts: HashMap<String, u64>,
}

impl TradeClassifier {
    pub fn new(threshold: Decimal, catalog: &Catalog) -> Self {
        Self {
            threshold,
            instruments: catalog.symbols().map(str::to_string).collect(),
            reference: catalog.reference.clone(),
            last_price: HashMap::new(),
            counts: HashMap::new(),
        }
    }

    pub fn threshold(&self) -> Decimal {
        self.threshold
    }

    pub fn classify(&mut self, trade: &AggTrade) -> Option<WhaleEvent> {
        self.classify_at(trade, Utc::now())
    }

    /// Classify with an explicit detection time.
    pub fn classify_at(&mut self, trade: &AggTrade, now: DateTime<Utc>) -> Option<WhaleEvent> {
        if !self.instruments.contains(&trade.symbol) {
            tracing::trace!(symbol = %trade.symbol, "Trade for unrecognized instrument");
            return None;
        }

        let (price, quantity) = match (
            Decimal::from_str(&trade.price),
            Decimal::from_str(&trade.quantity),
        ) {
            (Ok(p), Ok(q)) => (p, q),
            _ => {
                tracing::debug!(
                    symbol = %trade.symbol,
                    price = %trade.price,
                    quantity = %trade.quantity,
                    "Unparseable price or quantity"
                );
                return None;
            }
        };

        let Some(notional) = price.checked_mul(quantity) else {
            return self.reject_out_of_range(trade);
        };
        if notional < self.threshold {
            return None;
        }

        let pct_change_since_last = match self.last_price.get(&trade.symbol) {
            Some(prev) if !prev.is_zero() => match pct_change(*prev, price) {
                Some(pct) => pct,
                None => return self.reject_out_of_range(trade),
            },
            _ => Decimal::ZERO,
        };
        self.last_price.insert(trade.symbol.clone(), price);

        let count = self.counts.entry(trade.symbol.clone()).or_insert(0);
        *count += 1;

        let event = WhaleEvent {
            timestamp: to_ist(now),
            instrument: trade.symbol.clone(),
            side: Side::from_buyer_maker(trade.is_buyer_maker),
            notional,
            price,
            quantity,
            pct_change_since_last,
            pct_change_24h: self.reference.pct_change_24h(&trade.symbol),
            occurrence_count: *count,
        };

        tracing::info!(
            symbol = %event.instrument,
            side = %event.side,
            notional = %event.notional.round_dp(2),
            price = %event.price,
            count = event.occurrence_count,
            "Whale trade detected"
        );

        Some(event)
    }

    fn reject_out_of_range(&self, trade: &AggTrade) -> Option<WhaleEvent> {
        counter!("feed_malformed_total").increment(1);
        tracing::warn!(
            symbol = %trade.symbol,
            price = %trade.price,
            quantity = %trade.quantity,
            "Dropping trade with out-of-range values"
        );
        None
    }
}

/// `(current - previous) / previous * 100`, or `None` if it leaves Decimal's range.
fn pct_change(previous: Decimal, current: Decimal) -> Option<Decimal> {
    current
        .checked_sub(previous)?
        .checked_div(previous)?
        .checked_mul(Decimal::ONE_HUNDRED)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
