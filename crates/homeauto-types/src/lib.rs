//! Shared data model for the homeauto sidecar.
//!
//! This crate holds the plain types used by both subsystems of the sidecar:
//!
//! - Probe readings and the probe-to-slot mapping used by sensor aggregation
//! - Identity tokens, WAN addresses and request bodies used by self-registration
//! - Service-account credentials
//!
//! It performs no I/O. The slot resolution rule lives here as a pure function
//! ([`ProbeSlotMap::resolve`]) so it can be tested without a reading store.
//!
//! # Example
//!
//! ```
//! use homeauto_types::{ProbeId, ProbeSlot, ProbeSlotMap, RawReading};
//!
//! let map: ProbeSlotMap = [
//!     (ProbeId::new("A").unwrap(), ProbeSlot::new("pool").unwrap()),
//!     (ProbeId::new("B").unwrap(), ProbeSlot::new("shade").unwrap()),
//! ]
//! .into_iter()
//! .collect();
//!
//! let window = vec![
//!     RawReading::new(ProbeId::new("B").unwrap(), 5.0),
//!     RawReading::new(ProbeId::new("A").unwrap(), 12.0),
//! ];
//! let env = map.resolve(&window).unwrap();
//! assert_eq!(env.temperature("pool"), Some(12.0));
//! ```

pub mod error;
pub mod probe;
pub mod registration;

pub use error::{ParseError, ParseResult};
pub use probe::{AggregatedEnvironment, MissingSlots, ProbeId, ProbeSlot, ProbeSlotMap, RawReading};
pub use registration::{
    Credentials, DEFAULT_TOKEN_URI, IdentityToken, RegistrationRequest, WanAddress,
};


/// Property-based tests for slot resolution.
///
/// # Running Tests
///
/// ```bash
/// cargo test -p homeauto-types proptests
/// ```
#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    const PROBES: [&str; 4] = ["A", "B", "C", "X"];

    fn map() -> ProbeSlotMap {
        [("A", "pool"), ("B", "shade"), ("C", "sun")]
            .into_iter()
            .map(|(i, s)| (ProbeId::new(i).unwrap(), ProbeSlot::new(s).unwrap()))
            .collect()
    }

    fn window() -> impl Strategy<Value = Vec<RawReading>> {
        proptest::collection::vec((0..PROBES.len(), -20.0f64..45.0), 0..12).prop_map(|items| {
            items
                .into_iter()
                .map(|(i, t)| RawReading::new(ProbeId::new(PROBES[i]).unwrap(), t))
                .collect()
        })
    }

    proptest! {
        /// Every filled slot carries the temperature of the first matching reading,
        /// and resolution fails exactly when some mapped probe never appears.
        #[test]
        fn resolve_matches_first_occurrence(readings in window()) {
            let map = map();
            let mut expected: Vec<(&str, Option<f64>)> = Vec::new();
            for (probe, slot) in [("A", "pool"), ("B", "shade"), ("C", "sun")] {
                let first = readings.iter().find(|r| r.probe_id.as_str() == probe);
                expected.push((slot, first.map(|r| r.temperature)));
            }

            match map.resolve(&readings) {
                Ok(env) => {
                    for (slot, temperature) in expected {
                        prop_assert_eq!(env.temperature(slot), temperature);
                    }
                }
                Err(MissingSlots(missing)) => {
                    prop_assert!(!missing.is_empty());
                    for (slot, temperature) in expected {
                        let is_missing = missing.iter().any(|m| m.as_str() == slot);
                        prop_assert_eq!(is_missing, temperature.is_none());
                    }
                }
            }
        }
    }
}
