pub mod instrument;

pub use instrument::{Catalog, ContractType, Instrument, ReferenceStats};

use chrono::{DateTime, FixedOffset, Offset, SubsecRound, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// UTC+05:30, the offset every event timestamp is rendered in.
pub const IST_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

/// Convert a UTC instant into the fixed +05:30 offset, truncated to milliseconds.
pub fn to_ist(now: DateTime<Utc>) -> DateTime<FixedOffset> {
    let offset = FixedOffset::east_opt(IST_OFFSET_SECS).unwrap_or_else(|| Utc.fix());
    now.with_timezone(&offset).trunc_subsecs(3)
}

// ---------------------------------------------------------------------------
// Side
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Derive the aggressor side from the feed's buyer-is-maker flag.
    /// A maker buyer means the seller crossed the spread.
    pub fn from_buyer_maker(is_buyer_maker: bool) -> Self {
        if is_buyer_maker {
            Side::Sell
        } else {
            Side::Buy
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

// ---------------------------------------------------------------------------
// WhaleEvent — a qualifying trade, enriched
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhaleEvent {
    pub timestamp: DateTime<FixedOffset>,
    pub instrument: String,
    pub side: Side,
    pub notional: Decimal,
    pub price: Decimal,
    pub quantity: Decimal,
    /// Percent change vs. the previous qualifying price for this instrument.
    pub pct_change_since_last: Decimal,
    pub pct_change_24h: Decimal,
    pub occurrence_count: u64,
}

impl WhaleEvent {
    /// `2024-01-01 17:30:00.123 IST`
    pub fn timestamp_label(&self) -> String {
        format!("{} IST", self.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

/// Render a percentage with explicit sign and two decimals, e.g. `+1.25%`.
pub fn format_pct(pct: Decimal) -> String {
    let rounded = pct.round_dp(2);
    if rounded.is_sign_negative() && !rounded.is_zero() {
        format!("{rounded:.2}%")
    } else {
        format!("+{:.2}%", rounded.abs())
    }
}

impl fmt::Display for WhaleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} notional={} price={} qty={} since_last={} 24h={} count={}",
            self.timestamp_label(),
            self.instrument,
            self.side,
            self.notional.round_dp(2),
            self.price,
            self.quantity,
            format_pct(self.pct_change_since_last),
            format_pct(self.pct_change_24h),
            self.occurrence_count,
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
