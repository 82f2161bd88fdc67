//! Sensor readings and the snapshot map exposed to readers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Timestamp reported for a sensor that was never observed.
///
/// A reading genuinely stamped at epoch 0 reports the same value, so callers
/// that need to tell the two apart use `check_if_entry_exists`.
pub const NEVER_OBSERVED: u64 = 0;

/// Latest value of one sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// Sensor name, unique within the namespace.
    pub name: String,
    /// Reading value (degrees Celsius for temperature sensors).
    pub value: f64,
    /// Acquisition time in epoch seconds.
    pub timestamp: u64,
}

impl SensorReading {
    pub fn new(name: impl Into<String>, value: f64, timestamp: u64) -> Self {
        Self {
            name: name.into(),
            value,
            timestamp,
        }
    }
}

/// Outcome of folding one reading into a [`SensorData`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Upsert {
    Inserted,
    Updated,
    /// The incoming timestamp was older than the stored one.
    Rejected { stored: u64 },
}

/// Mapping from sensor name to its latest reading.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SensorData {
    entries: BTreeMap<String, SensorReading>,
}

impl SensorData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check_if_entry_exists(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&SensorReading> {
        self.entries.get(name)
    }

    /// Number of distinct sensors ever observed.
    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Last-updated timestamp, or [`NEVER_OBSERVED`].
    pub fn get_last_updated(&self, name: &str) -> u64 {
        self.entries
            .get(name)
            .map_or(NEVER_OBSERVED, |reading| reading.timestamp)
    }

    /// A sensor is stale when absent or when `now - last_updated` exceeds
    /// `threshold_s`. Exactly at the threshold it is still fresh.
    pub fn is_stale(&self, name: &str, now: u64, threshold_s: u64) -> bool {
        match self.entries.get(name) {
            None => true,
            Some(reading) => now.saturating_sub(reading.timestamp) > threshold_s,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &SensorReading> {
        self.entries.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub(crate) fn upsert(&mut self, reading: &SensorReading) -> Upsert {
        match self.entries.get_mut(&reading.name) {
            Some(stored) if reading.timestamp < stored.timestamp => Upsert::Rejected {
                stored: stored.timestamp,
            },
            Some(stored) => {
                stored.value = reading.value;
                stored.timestamp = reading.timestamp;
                Upsert::Updated
            }
            None => {
                self.entries.insert(reading.name.clone(), reading.clone());
                Upsert::Inserted
            }
        }
    }

    pub(crate) fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|name, _| keep(name));
        before - self.entries.len()
    }
}

impl FromIterator<SensorReading> for SensorData {
    fn from_iter<I: IntoIterator<Item = SensorReading>>(iter: I) -> Self {
        let mut data = SensorData::new();
        for reading in iter {
            data.upsert(&reading);
        }
        data
    }
}
