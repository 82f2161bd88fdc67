//! Fan actuation.
//!
//! [`FanActuator`] is the hardware boundary: one call writes one fan.
//! [`ActuatorDriver`] sits in front of it and owns the failure policy:
//! - Per-fan retries within a tick
//! - Consecutive failed-tick counting per zone, with one alert per episode
//! - Last known-good command per zone
//!
//! The driver never stops the loop. A zone that cannot be written keeps
//! receiving its current command every tick until the fans answer again.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, PoisonError};

use fc_core::WriteMode;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::error::ActuatorError;

/// Writes fan outputs, in percent of full duty.
pub trait FanActuator: Send {
    /// Write one fan. In [`WriteMode::Simulate`] nothing reaches hardware.
    fn write(&mut self, fan: &str, output: f64, mode: WriteMode) -> Result<(), ActuatorError>;
}

/// Failure policy for [`ActuatorDriver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActuatorPolicy {
    /// Extra attempts per fan per tick.
    pub write_retries: u32,
    /// Consecutive failed ticks before an alert is raised.
    pub alert_after_failed_ticks: u32,
}

impl Default for ActuatorPolicy {
    fn default() -> Self {
        Self {
            write_retries: 2,
            alert_after_failed_ticks: 3,
        }
    }
}

/// Outcome of applying one zone command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplyReport {
    pub zone: String,
    pub output: f64,
    pub fans_written: usize,
    pub fans_failed: Vec<String>,
    /// Zone is in an alerting episode after this apply.
    pub alerting: bool,
}

impl ApplyReport {
    pub fn all_failed(&self) -> bool {
        self.fans_written == 0 && !self.fans_failed.is_empty()
    }
}

#[derive(Debug, Default, Clone)]
struct ZoneHealth {
    failed_ticks: u32,
    alerting: bool,
    last_good: Option<f64>,
}

pub struct ActuatorDriver {
    actuator: Box<dyn FanActuator>,
    policy: ActuatorPolicy,
    health: BTreeMap<String, ZoneHealth>,
}

impl std::fmt::Debug for ActuatorDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActuatorDriver")
            .field("policy", &self.policy)
            .field("health", &self.health)
            .finish_non_exhaustive()
    }
}

impl ActuatorDriver {
    pub fn new(actuator: Box<dyn FanActuator>, policy: ActuatorPolicy) -> Self {
        Self {
            actuator,
            policy,
            health: BTreeMap::new(),
        }
    }

    pub fn policy(&self) -> ActuatorPolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: ActuatorPolicy) {
        self.policy = policy;
    }

    /// Write `output` to every fan of `zone`.
    pub fn apply(&mut self, zone: &str, fans: &[String], output: f64, mode: WriteMode) -> ApplyReport {
        let attempts = self.policy.write_retries.saturating_add(1);
        let mut fans_written = 0;
        let mut fans_failed = Vec::new();

        for fan in fans {
            let mut written = false;
            for attempt in 1..=attempts {
                match self.actuator.write(fan, output, mode) {
                    Ok(()) => {
                        written = true;
                        break;
                    }
                    Err(e) => {
                        debug!(zone, fan = %fan, attempt, error = %e, "fan write failed");
                        if attempt == attempts {
                            warn!(zone, fan = %fan, attempts, error = %e, "fan write gave up");
                        }
                    }
                }
            }
            if written {
                fans_written += 1;
            } else {
                fans_failed.push(fan.clone());
            }
        }

        let threshold = self.policy.alert_after_failed_ticks.max(1);
        let health = self.health.entry(zone.to_string()).or_default();
        if fans_written == 0 && !fans.is_empty() {
            health.failed_ticks = health.failed_ticks.saturating_add(1);
            if health.failed_ticks >= threshold && !health.alerting {
                error!(
                    zone,
                    failed_ticks = health.failed_ticks,
                    last_good = ?health.last_good,
                    "zone fans unreachable, cooling is not being applied"
                );
                health.alerting = true;
            }
        } else {
            if health.alerting {
                info!(zone, failed_ticks = health.failed_ticks, "zone fans reachable again");
            }
            health.failed_ticks = 0;
            health.alerting = false;
            health.last_good = Some(output);
        }

        ApplyReport {
            zone: zone.to_string(),
            output,
            fans_written,
            fans_failed,
            alerting: health.alerting,
        }
    }

    /// Last command that reached at least one fan of `zone`.
    pub fn last_good(&self, zone: &str) -> Option<f64> {
        self.health.get(zone).and_then(|h| h.last_good)
    }

    pub fn is_alerting(&self, zone: &str) -> bool {
        self.health.get(zone).is_some_and(|h| h.alerting)
    }

    pub fn failed_ticks(&self, zone: &str) -> u32 {
        self.health.get(zone).map_or(0, |h| h.failed_ticks)
    }

    /// Forget health for zones not in `zones`.
    pub fn retain_zones<'a>(&mut self, zones: impl IntoIterator<Item = &'a str>) {
        let keep: BTreeSet<&str> = zones.into_iter().collect();
        self.health.retain(|zone, _| keep.contains(zone.as_str()));
    }
}

/// One recorded write.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedWrite {
    pub fan: String,
    pub output: f64,
    pub mode: WriteMode,
}

#[derive(Debug, Default)]
struct RecordingState {
    applied: BTreeMap<String, f64>,
    history: Vec<RecordedWrite>,
    unreachable: BTreeSet<String>,
    fail_next: BTreeMap<String, u32>,
}

/// In-memory actuator for simulation and tests.
///
/// Clones share state, so a clone kept by the caller observes writes made
/// through the boxed instance handed to an [`ActuatorDriver`].
#[derive(Debug, Clone, Default)]
pub struct RecordingActuator {
    state: Arc<Mutex<RecordingState>>,
}

impl RecordingActuator {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RecordingState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Last value applied to `fan` in [`WriteMode::Apply`].
    pub fn applied(&self, fan: &str) -> Option<f64> {
        self.lock().applied.get(fan).copied()
    }

    pub fn applied_all(&self) -> BTreeMap<String, f64> {
        self.lock().applied.clone()
    }

    /// Every write attempt that succeeded, in order.
    pub fn history(&self) -> Vec<RecordedWrite> {
        self.lock().history.clone()
    }

    /// Make `fan` fail every write until [`RecordingActuator::set_reachable`].
    pub fn set_unreachable(&self, fan: &str) {
        self.lock().unreachable.insert(fan.to_string());
    }

    pub fn set_reachable(&self, fan: &str) {
        self.lock().unreachable.remove(fan);
    }

    /// Fail the next `count` writes to `fan`.
    pub fn fail_next(&self, fan: &str, count: u32) {
        self.lock().fail_next.insert(fan.to_string(), count);
    }
}

impl FanActuator for RecordingActuator {
    fn write(&mut self, fan: &str, output: f64, mode: WriteMode) -> Result<(), ActuatorError> {
        let mut state = self.lock();
        if state.unreachable.contains(fan) {
            return Err(ActuatorError::Unreachable {
                fan: fan.to_string(),
                what: "marked unreachable".to_string(),
            });
        }
        if let Some(remaining) = state.fail_next.get_mut(fan) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(ActuatorError::Unreachable {
                    fan: fan.to_string(),
                    what: "injected failure".to_string(),
                });
            }
        }
        if !(0.0..=100.0).contains(&output) {
            return Err(ActuatorError::Rejected {
                fan: fan.to_string(),
                what: format!("output {output} outside 0..=100"),
            });
        }
        if mode == WriteMode::Apply {
            state.applied.insert(fan.to_string(), output);
        }
        state.history.push(RecordedWrite {
            fan: fan.to_string(),
            output,
            mode,
        });
        Ok(())
    }
}
