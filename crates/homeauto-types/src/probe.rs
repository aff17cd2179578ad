//! Probe, slot and reading types.
//!
//! A probe is a physical temperature sensor identified by an opaque id. Each
//! probe is assigned to exactly one logical [`ProbeSlot`] (for example `pool`)
//! through a [`ProbeSlotMap`]. The map's set of distinct slots is the set of
//! *required* slots: an [`AggregatedEnvironment`] only exists when every one of
//! them received a reading.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{ParseError, ParseResult};

/// Opaque sensor identifier as it appears in the reading store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProbeId(String);

impl ProbeId {
    /// Create a probe id, rejecting empty strings.
    pub fn new(id: impl Into<String>) -> ParseResult<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(ParseError::EmptyProbeId);
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ProbeId {
    type Error = ParseError;

    fn try_from(value: String) -> ParseResult<Self> {
        Self::new(value)
    }
}

impl From<ProbeId> for String {
    fn from(id: ProbeId) -> Self {
        id.0
    }
}

impl FromStr for ProbeId {
    type Err = ParseError;

    fn from_str(s: &str) -> ParseResult<Self> {
        Self::new(s)
    }
}

impl fmt::Display for ProbeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Logical role a probe reports for, e.g. `pool`, `shade` or `sun`.
///
/// Slot names are restricted to ASCII letters, digits and `_` because they
/// become JSON field names (`<slot>Temp`) on the HTTP surface.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProbeSlot(String);

impl ProbeSlot {
    pub fn new(name: impl Into<String>) -> ParseResult<Self> {
        let name = name.into();
        let valid =
            !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid {
            return Err(ParseError::InvalidSlot(name));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ProbeSlot {
    type Error = ParseError;

    fn try_from(value: String) -> ParseResult<Self> {
        Self::new(value)
    }
}

impl From<ProbeSlot> for String {
    fn from(slot: ProbeSlot) -> Self {
        slot.0
    }
}

impl FromStr for ProbeSlot {
    type Err = ParseError;

    fn from_str(s: &str) -> ParseResult<Self> {
        Self::new(s)
    }
}

impl fmt::Display for ProbeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One temperature document from the reading store.
///
/// Readings carry no timestamp of their own: their age is implied by their
/// position in the newest-first sequence returned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawReading {
    pub probe_id: ProbeId,
    pub temperature: f64,
}

impl RawReading {
    pub fn new(probe_id: ProbeId, temperature: f64) -> Self {
        Self {
            probe_id,
            temperature,
        }
    }
}

/// Static mapping from probe id to slot.
///
/// Each id maps to exactly one slot; several ids may share a slot, in which
/// case whichever of them appears first in a window fills it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProbeSlotMap {
    slots: BTreeMap<ProbeId, ProbeSlot>,
}

impl ProbeSlotMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign `id` to `slot`, returning the slot it was previously assigned to.
    pub fn insert(&mut self, id: ProbeId, slot: ProbeSlot) -> Option<ProbeSlot> {
        self.slots.insert(id, slot)
    }

    /// Slot assigned to a probe id, if the probe is known.
    pub fn slot_for(&self, id: &ProbeId) -> Option<&ProbeSlot> {
        self.slots.get(id)
    }

    /// The distinct slots that must all be filled for aggregation to succeed.
    pub fn required_slots(&self) -> BTreeSet<&ProbeSlot> {
        self.slots.values().collect()
    }

    /// Number of mapped probe ids.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ProbeId, &ProbeSlot)> {
        self.slots.iter()
    }

    /// Resolve a newest-first window of readings into one temperature per slot.
    ///
    /// Walks `readings` in order and records the first reading seen for each
    /// slot. Unknown probe ids are skipped. Iteration stops as soon as every
    /// required slot is filled, so the remainder of the window is never
    /// consumed. If the window is exhausted first, no partial result is
    /// returned: the error lists every slot that stayed empty.
    pub fn resolve<'a, I>(&self, readings: I) -> Result<AggregatedEnvironment, MissingSlots>
    where
        I: IntoIterator<Item = &'a RawReading>,
    {
        let required = self.required_slots();
        let mut temperatures = BTreeMap::new();

        if required.is_empty() {
            return Ok(AggregatedEnvironment { temperatures });
        }

        for reading in readings {
            let Some(slot) = self.slot_for(&reading.probe_id) else {
                continue;
            };
            if temperatures.contains_key(slot) {
                continue;
            }
            temperatures.insert(slot.clone(), reading.temperature);
            if temperatures.len() == required.len() {
                return Ok(AggregatedEnvironment { temperatures });
            }
        }

        let missing = required
            .into_iter()
            .filter(|slot| !temperatures.contains_key(*slot))
            .cloned()
            .collect();
        Err(MissingSlots(missing))
    }
}

impl FromIterator<(ProbeId, ProbeSlot)> for ProbeSlotMap {
    fn from_iter<T: IntoIterator<Item = (ProbeId, ProbeSlot)>>(iter: T) -> Self {
        Self {
            slots: iter.into_iter().collect(),
        }
    }
}

/// Slots left unfilled after a whole window was scanned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no reading in window for slot(s): {}", format_slots(.0))]
pub struct MissingSlots(pub Vec<ProbeSlot>);

fn format_slots(slots: &[ProbeSlot]) -> String {
    slots
        .iter()
        .map(ProbeSlot::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Latest temperature for every required slot.
///
/// Only produced by a successful [`ProbeSlotMap::resolve`]; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedEnvironment {
    temperatures: BTreeMap<ProbeSlot, f64>,
}

impl AggregatedEnvironment {
    pub fn get(&self, slot: &ProbeSlot) -> Option<f64> {
        self.temperatures.get(slot).copied()
    }

    /// Look up a slot by name.
    pub fn temperature(&self, slot: &str) -> Option<f64> {
        self.temperatures
            .iter()
            .find(|(s, _)| s.as_str() == slot)
            .map(|(_, t)| *t)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ProbeSlot, f64)> {
        self.temperatures.iter().map(|(s, t)| (s, *t))
    }

    pub fn len(&self) -> usize {
        self.temperatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.temperatures.is_empty()
    }
}
