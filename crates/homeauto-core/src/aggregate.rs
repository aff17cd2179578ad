//! Probe aggregation: latest temperature per slot from one store query.

use std::sync::Arc;

use tracing::{debug, warn};

use homeauto_types::{AggregatedEnvironment, ProbeSlotMap};

use crate::error::{Error, Result};
use crate::traits::ReadingStore;

/// Default aggregation window.
pub const DEFAULT_WINDOW: usize = 10;

/// Resolves the most recent store window against a [`ProbeSlotMap`].
///
/// Each call performs its own fetch; nothing is cached or shared between
/// calls. A call either yields a reading for every required slot or fails
/// with [`Error::IncompleteData`].
pub struct ProbeAggregator {
    store: Arc<dyn ReadingStore>,
    slots: ProbeSlotMap,
    window: usize,
}

impl std::fmt::Debug for ProbeAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbeAggregator")
            .field("slots", &self.slots)
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}

impl ProbeAggregator {
    /// Create an aggregator.
    ///
    /// Fails with [`Error::InvalidConfig`] when `window` is smaller than the
    /// number of distinct required slots, since such a window could never
    /// satisfy the map.
    pub fn new(store: Arc<dyn ReadingStore>, slots: ProbeSlotMap, window: usize) -> Result<Self> {
        let required = slots.required_slots().len();
        if window < required {
            return Err(Error::InvalidConfig(format!(
                "aggregation window {} is smaller than the {} required slot(s)",
                window, required
            )));
        }

        Ok(Self {
            store,
            slots,
            window,
        })
    }

    pub fn slots(&self) -> &ProbeSlotMap {
        &self.slots
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Fetch the latest window and resolve one temperature per slot.
    pub async fn aggregate(&self) -> Result<AggregatedEnvironment> {
        let readings = self.store.fetch_latest(self.window).await?;
        debug!("Resolving {} reading(s) against {} probe(s)", readings.len(), self.slots.len());

        self.slots.resolve(&readings).map_err(|missing| {
            warn!("Aggregation window incomplete: {}", missing);
            Error::from(missing)
        })
    }
}

#[cfg(test)]
mod tests {
    use homeauto_types::{ProbeId, ProbeSlot, RawReading};

    use super::*;
    use crate::mock::MockReadingStore;

    fn reading(probe: &str, temperature: f64) -> RawReading {
        RawReading::new(ProbeId::new(probe).unwrap(), temperature)
    }

    fn slot_map(pairs: &[(&str, &str)]) -> ProbeSlotMap {
        pairs
            .iter()
            .map(|(id, slot)| (ProbeId::new(*id).unwrap(), ProbeSlot::new(*slot).unwrap()))
            .collect()
    }

    fn reference_window() -> Vec<RawReading> {
        vec![
            reading("A", 12.0),
            reading("B", 5.0),
            reading("C", 9.0),
            reading("A", 11.0),
        ]
    }

    #[tokio::test]
    async fn test_aggregate_reference_scenario() {
        let store = Arc::new(MockReadingStore::new(reference_window()));
        let aggregator = ProbeAggregator::new(
            store.clone(),
            slot_map(&[("A", "pool"), ("B", "shade"), ("C", "sun")]),
            DEFAULT_WINDOW,
        )
        .unwrap();

        let env = aggregator.aggregate().await.unwrap();

        assert_eq!(env.temperature("pool"), Some(12.0));
        assert_eq!(env.temperature("shade"), Some(5.0));
        assert_eq!(env.temperature("sun"), Some(9.0));
        assert_eq!(store.requested_limits(), vec![10]);
    }

    #[tokio::test]
    async fn test_aggregate_missing_slot_is_incomplete() {
        let store = Arc::new(MockReadingStore::new(reference_window()));
        let aggregator = ProbeAggregator::new(
            store,
            slot_map(&[("A", "pool"), ("B", "shade"), ("C", "sun"), ("D", "attic")]),
            DEFAULT_WINDOW,
        )
        .unwrap();

        let err = aggregator.aggregate().await.unwrap_err();

        match err {
            Error::IncompleteData { missing } => {
                assert_eq!(missing, vec![ProbeSlot::new("attic").unwrap()]);
            }
            other => panic!("expected IncompleteData, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_aggregate_only_sees_window() {
        let mut readings = vec![reading("A", 12.0), reading("B", 5.0)];
        readings.extend((0..8).map(|i| reading("A", i as f64)));
        readings.push(reading("C", 9.0));
        let store = Arc::new(MockReadingStore::new(readings));
        let aggregator = ProbeAggregator::new(
            store,
            slot_map(&[("A", "pool"), ("B", "shade"), ("C", "sun")]),
            DEFAULT_WINDOW,
        )
        .unwrap();

        let err = aggregator.aggregate().await.unwrap_err();

        assert!(matches!(err, Error::IncompleteData { ref missing } if missing.len() == 1));
    }

    #[tokio::test]
    async fn test_aggregate_propagates_store_error() {
        let store = Arc::new(MockReadingStore::new(reference_window()));
        store.set_failure(Some("connection refused"));
        let aggregator = ProbeAggregator::new(
            store,
            slot_map(&[("A", "pool")]),
            DEFAULT_WINDOW,
        )
        .unwrap();

        assert!(matches!(aggregator.aggregate().await, Err(Error::Query(_))));
    }

    #[tokio::test]
    async fn test_each_call_fetches_again() {
        let store = Arc::new(MockReadingStore::new(reference_window()));
        let aggregator = ProbeAggregator::new(
            store.clone(),
            slot_map(&[("A", "pool"), ("B", "shade"), ("C", "sun")]),
            DEFAULT_WINDOW,
        )
        .unwrap();

        aggregator.aggregate().await.unwrap();
        store.set_readings(vec![reading("C", 1.0), reading("B", 2.0), reading("A", 3.0)]);
        let env = aggregator.aggregate().await.unwrap();

        assert_eq!(env.temperature("pool"), Some(3.0));
        assert_eq!(store.requested_limits().len(), 2);
    }

    #[test]
    fn test_window_smaller_than_slots_rejected() {
        let store = Arc::new(MockReadingStore::default());
        let result = ProbeAggregator::new(
            store,
            slot_map(&[("A", "pool"), ("B", "shade"), ("C", "sun")]),
            2,
        );

        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_window_counts_distinct_slots() {
        let store = Arc::new(MockReadingStore::default());
        let result = ProbeAggregator::new(
            store,
            slot_map(&[("A", "pool"), ("A2", "pool"), ("B", "shade")]),
            2,
        );

        assert!(result.is_ok());
    }
}
