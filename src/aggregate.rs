use std::collections::{HashMap, VecDeque};

use metrics::counter;

use crate::ingestion::sink::EventDrain;
use crate::models::WhaleEvent;

/// Latest qualifying event per instrument.
///
/// Keys accumulate for the life of the process and are never removed.
#[derive(Debug, Default)]
pub struct AggregateState {
    latest: HashMap<String, WhaleEvent>,
}

impl AggregateState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge drained events in order; later events replace earlier ones.
    pub fn apply_drained<I>(&mut self, events: I)
    where
        I: IntoIterator<Item = WhaleEvent>,
    {
        for event in events {
            self.latest.insert(event.instrument.clone(), event);
        }
    }

    /// At most `limit` records by descending occurrence count, ties by symbol.
    pub fn snapshot(&self, limit: usize) -> Vec<WhaleEvent> {
        let mut rows: Vec<&WhaleEvent> = self.latest.values().collect();
        rows.sort_by(|a, b| {
            b.occurrence_count
                .cmp(&a.occurrence_count)
                .then_with(|| a.instrument.cmp(&b.instrument))
        });
        rows.into_iter().take(limit).cloned().collect()
    }

    pub fn get(&self, instrument: &str) -> Option<&WhaleEvent> {
        self.latest.get(instrument)
    }

    /// Instruments with at least one qualifying event.
    pub fn instrument_count(&self) -> usize {
        self.latest.len()
    }
}

/// Consumer side of the hand-off: drains the sink into the aggregate state.
///
/// Whoever triggers a drain, every drained event is also queued as an
/// unannounced alert until `take_alerts` hands it to the broadcaster. The
/// alert queue is bounded; the oldest alerts are discarded past `alert_capacity`.
#[derive(Debug)]
pub struct WhaleBoard {
    drain: EventDrain,
    state: AggregateState,
    alerts: VecDeque<WhaleEvent>,
    alert_capacity: usize,
}

impl WhaleBoard {
    pub fn new(drain: EventDrain, alert_capacity: usize) -> Self {
        Self {
            drain,
            state: AggregateState::new(),
            alerts: VecDeque::new(),
            alert_capacity: alert_capacity.max(1),
        }
    }

    /// Drain the sink into the state and the alert queue. Returns how many
    /// events were applied.
    pub fn refresh(&mut self) -> usize {
        let drained = self.drain.drain_all();
        if drained.is_empty() {
            return 0;
        }

        tracing::debug!(events = drained.len(), "Applying drained whale events");
        let applied = drained.len();
        self.state.apply_drained(drained.iter().cloned());
        self.alerts.extend(drained);

        let excess = self.alerts.len().saturating_sub(self.alert_capacity);
        if excess > 0 {
            self.alerts.drain(..excess);
            counter!("alerts_discarded_total").increment(excess as u64);
            tracing::warn!(discarded = excess, "Alert queue full, oldest alerts discarded");
        }
        applied
    }

    /// Every drained event not yet handed out, in drain order.
    pub fn take_alerts(&mut self) -> Vec<WhaleEvent> {
        self.alerts.drain(..).collect()
    }

    pub fn snapshot(&self, limit: usize) -> Vec<WhaleEvent> {
        self.state.snapshot(limit)
    }

    pub fn state(&self) -> &AggregateState {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::sink::event_sink;
    use crate::models::{to_ist, Side};
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn event(symbol: &str, count: u64, price: i64) -> WhaleEvent {
        WhaleEvent {
            timestamp: to_ist(Utc::now()),
            instrument: symbol.into(),
            side: Side::Sell,
            notional: Decimal::from(price * 1_000),
            price: Decimal::from(price),
            quantity: Decimal::from(1_000),
            pct_change_since_last: Decimal::ZERO,
            pct_change_24h: Decimal::ZERO,
            occurrence_count: count,
        }
    }

    fn symbols(rows: &[WhaleEvent]) -> Vec<&str> {
        rows.iter().map(|e| e.instrument.as_str()).collect()
    }

    #[test]
    fn test_later_event_overwrites() {
        let mut state = AggregateState::new();
        state.apply_drained(vec![event("DOGEUSDT", 1, 100), event("DOGEUSDT", 2, 120)]);

        assert_eq!(state.instrument_count(), 1);
        let latest = state.get("DOGEUSDT").unwrap();
        assert_eq!(latest.occurrence_count, 2);
        assert_eq!(latest.price, Decimal::from(120));
    }

    #[test]
    fn test_snapshot_orders_by_count_and_truncates() {
        let mut state = AggregateState::new();
        state.apply_drained(vec![event("A", 3, 1), event("B", 7, 1), event("C", 1, 1)]);

        assert_eq!(symbols(&state.snapshot(2)), vec!["B", "A"]);
        assert_eq!(symbols(&state.snapshot(10)), vec!["B", "A", "C"]);
        assert!(state.snapshot(0).is_empty());
    }

    #[test]
    fn test_snapshot_ties_break_by_symbol() {
        let mut state = AggregateState::new();
        state.apply_drained(vec![event("ZECUSDT", 2, 1), event("ADAUSDT", 2, 1), event("LTCUSDT", 2, 1)]);

        assert_eq!(symbols(&state.snapshot(3)), vec!["ADAUSDT", "LTCUSDT", "ZECUSDT"]);
    }

    #[test]
    fn test_board_refresh_drains_sink() {
        let (publisher, drain) = event_sink(16);
        let mut board = WhaleBoard::new(drain, 16);
        assert_eq!(board.refresh(), 0);
        assert!(board.snapshot(5).is_empty());

        publisher.publish(event("XRPUSDT", 1, 2)).unwrap();
        publisher.publish(event("XRPUSDT", 2, 3)).unwrap();

        assert_eq!(board.refresh(), 2);
        assert_eq!(board.refresh(), 0);

        let rows = board.snapshot(5);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].occurrence_count, 2);
        assert_eq!(board.state().instrument_count(), 1);
    }

    #[test]
    fn test_alerts_collected_across_refreshes() {
        let (publisher, drain) = event_sink(16);
        let mut board = WhaleBoard::new(drain, 16);

        publisher.publish(event("DOGEUSDT", 1, 1)).unwrap();
        board.refresh();
        publisher.publish(event("XRPUSDT", 1, 2)).unwrap();
        board.refresh();

        let alerts = board.take_alerts();
        assert_eq!(symbols(&alerts), vec!["DOGEUSDT", "XRPUSDT"]);
        assert!(board.take_alerts().is_empty());
    }

    #[test]
    fn test_alert_queue_discards_oldest_past_capacity() {
        let (publisher, drain) = event_sink(16);
        let mut board = WhaleBoard::new(drain, 2);

        for count in 1..=3 {
            publisher.publish(event("DOGEUSDT", count, 1)).unwrap();
        }
        board.refresh();

        let counts: Vec<u64> = board.take_alerts().iter().map(|e| e.occurrence_count).collect();
        assert_eq!(counts, vec![2, 3]);
        assert_eq!(board.snapshot(1)[0].occurrence_count, 3);
    }
}
