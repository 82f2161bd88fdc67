//! Sampled execution primitives.
//!
//! Zones are evaluated on discrete telemetry samples. When no newer sample
//! has arrived since the last evaluation the previous output is held
//! (zero-order hold). [`SampleClock`] paces the control loop itself.

use crate::error::{ControlError, ControlResult};
use serde::{Deserialize, Serialize};

/// Tick cadence for the control loop, in seconds since loop start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleClock {
    /// Sample period in seconds.
    pub period: f64,
    /// Time of next scheduled sample.
    pub next_sample_time: f64,
}

impl SampleClock {
    /// Create a new sample clock.
    ///
    /// # Arguments
    ///
    /// * `period` - Sample period in seconds (must be positive)
    /// * `initial_time` - Time the clock starts at
    pub fn new(period: f64, initial_time: f64) -> ControlResult<Self> {
        if !period.is_finite() || period <= 0.0 {
            return Err(ControlError::InvalidArg {
                what: "sample period must be positive",
            });
        }
        Ok(Self {
            period,
            next_sample_time: initial_time + period,
        })
    }

    /// Returns `true` if `current_time >= next_sample_time`.
    pub fn should_sample(&self, current_time: f64) -> bool {
        current_time >= self.next_sample_time
    }

    /// Advance to the next sample time.
    ///
    /// Missed samples are skipped rather than replayed back to back.
    pub fn advance(&mut self, current_time: f64) {
        self.next_sample_time += self.period;
        if self.next_sample_time <= current_time {
            self.next_sample_time = current_time + self.period;
        }
    }

    /// Get the time until the next sample.
    pub fn time_until_sample(&self, current_time: f64) -> f64 {
        (self.next_sample_time - current_time).max(0.0)
    }
}

/// One fresh reading as seen by [`SampleHold`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleStamp {
    pub sensor: String,
    pub timestamp: u64,
    pub value: f64,
}

impl SampleStamp {
    pub fn new(sensor: impl Into<String>, timestamp: u64, value: f64) -> Self {
        Self {
            sensor: sensor.into(),
            timestamp,
            value,
        }
    }
}

/// Zero-order hold keyed on the telemetry sample a zone was last evaluated on.
///
/// A sample is identified by the sensor, timestamp and value of every fresh
/// reading that fed it. A re-delivery with an unchanged timestamp but a new
/// value is a new sample. Re-evaluating the same sample is skipped so that
/// repeated ticks without new telemetry are idempotent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleHold {
    stamps: Vec<SampleStamp>,
    newest: Option<u64>,
    value: Option<f64>,
}

impl SampleHold {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` if `stamps` differ from the last evaluated sample.
    pub fn is_new_sample(&self, stamps: &[SampleStamp]) -> bool {
        self.value.is_none() || self.stamps.as_slice() != stamps
    }

    /// Force the next evaluation to recompute.
    ///
    /// The newest timestamp is kept, so the next `dt` still measures
    /// progress since the last evaluated sample.
    pub fn invalidate(&mut self) {
        self.value = None;
    }

    /// Held output, if the zone has been evaluated at least once.
    pub fn held(&self) -> Option<f64> {
        self.value
    }

    /// Newest sensor timestamp of the last evaluated sample.
    pub fn newest(&self) -> Option<u64> {
        self.newest
    }

    /// Seconds between the last evaluated sample and `newest`.
    ///
    /// `None` before the first evaluation or when time did not advance.
    pub fn elapsed_until(&self, newest: u64) -> Option<u64> {
        match self.newest {
            Some(prev) if newest > prev => Some(newest - prev),
            _ => None,
        }
    }

    /// Record an evaluated sample and its output.
    pub fn record(&mut self, stamps: Vec<SampleStamp>, value: f64) {
        self.newest = stamps.iter().map(|s| s.timestamp).max();
        self.stamps = stamps;
        self.value = Some(value);
    }
}
