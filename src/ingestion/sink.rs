use metrics::counter;
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TryRecvError, error::TrySendError};

use crate::models::WhaleEvent;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SinkError {
    #[error("event sink overflowed its capacity of {capacity} events")]
    Overflow { capacity: usize },

    #[error("event sink consumer has been dropped")]
    Closed,
}

/// Create the single-producer/single-consumer hand-off between ingestion and display.
pub fn event_sink(capacity: usize) -> (EventPublisher, EventDrain) {
    let capacity = capacity.max(1);
    let (tx, rx) = mpsc::channel(capacity);
    (EventPublisher { tx, capacity }, EventDrain { rx })
}

/// Producer half, owned by the ingestion task.
#[derive(Debug)]
pub struct EventPublisher {
    tx: mpsc::Sender<WhaleEvent>,
    capacity: usize,
}

impl EventPublisher {
    /// Enqueue without waiting. A full queue means the consumer has stalled
    /// for `capacity` events, which is reported as a fatal overflow.
    pub fn publish(&self, event: WhaleEvent) -> Result<(), SinkError> {
        match self.tx.try_send(event) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                counter!("sink_overflows_total").increment(1);
                Err(SinkError::Overflow {
                    capacity: self.capacity,
                })
            }
            Err(TrySendError::Closed(_)) => Err(SinkError::Closed),
        }
    }
}

/// Consumer half, owned by the aggregate board.
#[derive(Debug)]
pub struct EventDrain {
    rx: mpsc::Receiver<WhaleEvent>,
}

impl EventDrain {
    /// Everything queued right now, in publish order. Never waits.
    pub fn drain_all(&mut self) -> Vec<WhaleEvent> {
        let mut events = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        events
    }

    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{to_ist, Side};
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn event(symbol: &str, count: u64) -> WhaleEvent {
        WhaleEvent {
            timestamp: to_ist(Utc::now()),
            instrument: symbol.into(),
            side: Side::Buy,
            notional: Decimal::from(150_000),
            price: Decimal::from(1),
            quantity: Decimal::from(150_000),
            pct_change_since_last: Decimal::ZERO,
            pct_change_24h: Decimal::ZERO,
            occurrence_count: count,
        }
    }

    #[test]
    fn test_drain_preserves_order_and_empties() {
        let (publisher, mut drain) = event_sink(8);
        for i in 1..=3 {
            publisher.publish(event("DOGEUSDT", i)).unwrap();
        }

        let counts: Vec<u64> = drain.drain_all().iter().map(|e| e.occurrence_count).collect();
        assert_eq!(counts, vec![1, 2, 3]);
        assert!(drain.drain_all().is_empty());
    }

    #[test]
    fn test_drain_on_empty_returns_immediately() {
        let (_publisher, mut drain) = event_sink(4);
        assert!(drain.drain_all().is_empty());
        assert_eq!(drain.pending(), 0);
    }

    #[test]
    fn test_overflow_is_reported() {
        let (publisher, _drain) = event_sink(2);
        publisher.publish(event("A", 1)).unwrap();
        publisher.publish(event("A", 2)).unwrap();

        assert_eq!(
            publisher.publish(event("A", 3)),
            Err(SinkError::Overflow { capacity: 2 })
        );
    }

    #[test]
    fn test_publish_after_consumer_dropped() {
        let (publisher, drain) = event_sink(2);
        drop(drain);
        assert_eq!(publisher.publish(event("A", 1)), Err(SinkError::Closed));
    }

    #[test]
    fn test_drain_after_producer_dropped_keeps_queued_events() {
        let (publisher, mut drain) = event_sink(4);
        publisher.publish(event("A", 1)).unwrap();
        drop(publisher);

        assert_eq!(drain.drain_all().len(), 1);
        assert!(drain.drain_all().is_empty());
    }
}
