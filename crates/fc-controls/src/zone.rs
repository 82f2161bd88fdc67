//! Zones: groups of sensors and fans sharing one control computation.
//!
//! [`ZoneController::compute`] turns per-zone fresh/stale readings into one
//! [`ZoneDecision`] per configured zone. A zone with no usable reading falls
//! back to its maximum output and keeps its [`ControlState`] frozen until
//! telemetry returns.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::algorithm::{ControlAlgorithm, ControlState};
use crate::error::{ControlError, ControlResult};
use crate::sampled::{SampleHold, SampleStamp};

/// How member sensor readings are combined into one zone temperature.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    #[default]
    Max,
    Mean,
}

impl Aggregation {
    /// Combine values. `None` for an empty slice.
    pub fn apply(self, values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        Some(match self {
            Self::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Self::Mean => values.iter().sum::<f64>() / values.len() as f64,
        })
    }
}

#[derive(Debug)]
pub struct Zone {
    pub name: String,
    pub sensors: Vec<String>,
    pub fans: Vec<String>,
    pub min_output: f64,
    pub max_output: f64,
    pub aggregation: Aggregation,
    pub algorithm: Box<dyn ControlAlgorithm>,
}

impl Zone {
    /// Output applied when no member sensor is usable.
    pub fn fail_safe_output(&self) -> f64 {
        self.max_output
    }

    pub fn validate(&self) -> ControlResult<()> {
        let invalid = |what: &str| ControlError::InvalidZone {
            zone: self.name.clone(),
            what: what.to_string(),
        };
        if self.name.is_empty() {
            return Err(invalid("name must not be empty"));
        }
        if self.sensors.is_empty() {
            return Err(invalid("at least one sensor is required"));
        }
        if self.fans.is_empty() {
            return Err(invalid("at least one fan is required"));
        }
        if !(self.min_output.is_finite() && self.max_output.is_finite()) {
            return Err(invalid("output bounds must be finite"));
        }
        if self.min_output < 0.0 || self.max_output > 100.0 || self.min_output >= self.max_output {
            return Err(invalid("output bounds must satisfy 0 <= min < max <= 100"));
        }
        Ok(())
    }
}

/// One usable member reading.
#[derive(Debug, Clone, PartialEq)]
pub struct FreshReading {
    pub sensor: String,
    pub value: f64,
    pub timestamp: u64,
}

/// Member sensors of one zone, partitioned for a tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ZoneInput {
    pub fresh: Vec<FreshReading>,
    pub stale: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    /// Algorithm ran on a new sample.
    Computed,
    /// No new sample; previous output re-emitted.
    Held,
    /// No usable sensor; maximum output.
    FailSafe,
}

/// Result of one tick for one zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneDecision {
    pub zone: String,
    pub output: f64,
    pub reason: DecisionReason,
    /// Aggregated temperature the output was computed from.
    pub input: Option<f64>,
    pub fresh_sensors: Vec<String>,
    pub stale_sensors: Vec<String>,
}

impl ZoneDecision {
    pub fn is_fail_safe(&self) -> bool {
        self.reason == DecisionReason::FailSafe
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneControllerOptions {
    /// Step used for the first evaluation of a zone (seconds).
    pub nominal_dt_s: f64,
    /// Upper bound on the integration step (seconds).
    pub max_dt_s: f64,
}

impl ZoneControllerOptions {
    /// Options for a loop that ticks every `fetch_frequency_s` seconds.
    pub fn for_fetch_frequency(fetch_frequency_s: u64) -> Self {
        let nominal = fetch_frequency_s.max(1) as f64;
        Self {
            nominal_dt_s: nominal,
            max_dt_s: 2.0 * nominal,
        }
    }
}

/// Per-zone memory kept between ticks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ZoneRuntime {
    pub state: ControlState,
    pub hold: SampleHold,
    pub fail_safe: bool,
}

#[derive(Debug)]
pub struct ZoneController {
    zones: Vec<Zone>,
    runtime: BTreeMap<String, ZoneRuntime>,
    options: ZoneControllerOptions,
}

impl ZoneController {
    pub fn new(zones: Vec<Zone>, options: ZoneControllerOptions) -> ControlResult<Self> {
        validate_zones(&zones)?;
        Ok(Self {
            zones,
            runtime: BTreeMap::new(),
            options,
        })
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub fn zone(&self, name: &str) -> Option<&Zone> {
        self.zones.iter().find(|z| z.name == name)
    }

    pub fn options(&self) -> ZoneControllerOptions {
        self.options
    }

    /// Memory for `zone`; `None` until its first tick.
    pub fn runtime(&self, zone: &str) -> Option<&ZoneRuntime> {
        self.runtime.get(zone)
    }

    /// Swap the zone set. Zones that survive by name keep their memory.
    ///
    /// Their held output is dropped so the next tick recomputes under the
    /// new bounds and algorithm.
    pub fn reconfigure(
        &mut self,
        zones: Vec<Zone>,
        options: ZoneControllerOptions,
    ) -> ControlResult<()> {
        validate_zones(&zones)?;
        let keep: BTreeSet<&str> = zones.iter().map(|z| z.name.as_str()).collect();
        self.runtime.retain(|name, _| keep.contains(name.as_str()));
        for runtime in self.runtime.values_mut() {
            runtime.hold.invalidate();
        }
        self.zones = zones;
        self.options = options;
        Ok(())
    }

    /// Compute one decision per configured zone, in configuration order.
    ///
    /// A zone missing from `inputs` is treated as having every sensor stale.
    pub fn compute(&mut self, inputs: &BTreeMap<String, ZoneInput>) -> Vec<ZoneDecision> {
        let options = self.options;
        let mut decisions = Vec::with_capacity(self.zones.len());
        for zone in &self.zones {
            let runtime = self.runtime.entry(zone.name.clone()).or_default();
            let decision = match inputs.get(&zone.name) {
                Some(input) => evaluate(zone, runtime, input, options),
                None => evaluate(
                    zone,
                    runtime,
                    &ZoneInput {
                        fresh: Vec::new(),
                        stale: zone.sensors.clone(),
                    },
                    options,
                ),
            };
            decisions.push(decision);
        }
        decisions
    }
}

fn validate_zones(zones: &[Zone]) -> ControlResult<()> {
    let mut seen = BTreeSet::new();
    for zone in zones {
        zone.validate()?;
        if !seen.insert(zone.name.as_str()) {
            return Err(ControlError::InvalidZone {
                zone: zone.name.clone(),
                what: "duplicate zone name".to_string(),
            });
        }
    }
    Ok(())
}

fn evaluate(
    zone: &Zone,
    runtime: &mut ZoneRuntime,
    input: &ZoneInput,
    options: ZoneControllerOptions,
) -> ZoneDecision {
    let mut stale = input.stale.clone();
    let mut usable: Vec<&FreshReading> = Vec::with_capacity(input.fresh.len());
    for reading in &input.fresh {
        if reading.value.is_finite() {
            usable.push(reading);
        } else {
            stale.push(reading.sensor.clone());
        }
    }
    usable.sort_by(|a, b| a.sensor.cmp(&b.sensor));
    let fresh_sensors: Vec<String> = usable.iter().map(|r| r.sensor.clone()).collect();

    if usable.is_empty() {
        if !runtime.fail_safe {
            warn!(
                zone = %zone.name,
                stale = ?stale,
                output = zone.fail_safe_output(),
                "no usable sensor readings, entering fail-safe"
            );
        }
        runtime.fail_safe = true;
        return ZoneDecision {
            zone: zone.name.clone(),
            output: zone.fail_safe_output(),
            reason: DecisionReason::FailSafe,
            input: None,
            fresh_sensors,
            stale_sensors: stale,
        };
    }
    if runtime.fail_safe {
        info!(zone = %zone.name, "sensor readings recovered, leaving fail-safe");
        runtime.fail_safe = false;
    }

    let values: Vec<f64> = usable.iter().map(|r| r.value).collect();
    let aggregated = zone.aggregation.apply(&values);
    let stamps: Vec<SampleStamp> = usable
        .iter()
        .map(|r| SampleStamp::new(r.sensor.clone(), r.timestamp, r.value))
        .collect();

    let held = runtime.hold.held();
    if let (false, Some(held)) = (runtime.hold.is_new_sample(&stamps), held) {
        let output = fc_core::clamp_or(held, zone.min_output, zone.max_output, zone.max_output);
        debug!(zone = %zone.name, output, "no new sample, holding output");
        return ZoneDecision {
            zone: zone.name.clone(),
            output,
            reason: DecisionReason::Held,
            input: aggregated,
            fresh_sensors,
            stale_sensors: stale,
        };
    }

    let newest = stamps.iter().map(|s| s.timestamp).max().unwrap_or(0);
    let dt = match (runtime.hold.newest(), runtime.hold.elapsed_until(newest)) {
        (None, _) => options.nominal_dt_s,
        (Some(_), Some(elapsed)) => elapsed as f64,
        (Some(_), None) => 0.0,
    }
    .min(options.max_dt_s);

    let temperature = aggregated.unwrap_or(f64::NAN);
    let (state, raw) = zone.algorithm.compute(&runtime.state, temperature, dt);
    let output = fc_core::clamp_or(raw, zone.min_output, zone.max_output, zone.max_output);
    debug!(zone = %zone.name, temperature, dt, output, "zone computed");

    runtime.state = state;
    runtime.hold.record(stamps, output);

    ZoneDecision {
        zone: zone.name.clone(),
        output,
        reason: DecisionReason::Computed,
        input: aggregated,
        fresh_sensors,
        stale_sensors: stale,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::PidController;
    use crate::curve::{Breakpoint, CurveController};

    fn curve_zone(name: &str) -> Zone {
        Zone {
            name: name.to_string(),
            sensors: vec!["cpu".to_string(), "asic".to_string()],
            fans: vec!["fan1".to_string()],
            min_output: 20.0,
            max_output: 100.0,
            aggregation: Aggregation::Max,
            algorithm: Box::new(
                CurveController::new(
                    vec![Breakpoint::new(30.0, 20.0), Breakpoint::new(80.0, 100.0)],
                    20.0,
                    100.0,
                )
                .unwrap(),
            ),
        }
    }

    fn pid_zone(name: &str) -> Zone {
        Zone {
            name: name.to_string(),
            sensors: vec!["cpu".to_string()],
            fans: vec!["fan1".to_string()],
            min_output: 0.0,
            max_output: 100.0,
            aggregation: Aggregation::Max,
            algorithm: Box::new(
                PidController::new(0.0, 1.0, 0.0, 50.0, 0.0, 100.0)
                    .unwrap()
                    .with_integral_limit(10_000.0)
                    .unwrap(),
            ),
        }
    }

    fn reading(sensor: &str, value: f64, timestamp: u64) -> FreshReading {
        FreshReading {
            sensor: sensor.to_string(),
            value,
            timestamp,
        }
    }

    fn inputs(zone: &str, fresh: Vec<FreshReading>, stale: &[&str]) -> BTreeMap<String, ZoneInput> {
        let mut map = BTreeMap::new();
        map.insert(
            zone.to_string(),
            ZoneInput {
                fresh,
                stale: stale.iter().map(|s| s.to_string()).collect(),
            },
        );
        map
    }

    fn controller(zones: Vec<Zone>) -> ZoneController {
        ZoneController::new(zones, ZoneControllerOptions::for_fetch_frequency(10)).unwrap()
    }

    #[test]
    fn aggregation_modes() {
        assert_eq!(Aggregation::Max.apply(&[1.0, 5.0, 3.0]), Some(5.0));
        assert_eq!(Aggregation::Mean.apply(&[1.0, 5.0, 3.0]), Some(3.0));
        assert_eq!(Aggregation::Max.apply(&[]), None);
    }

    #[test]
    fn rejects_invalid_zones() {
        let mut zone = curve_zone("z");
        zone.fans.clear();
        assert!(zone.validate().is_err());

        let mut zone = curve_zone("z");
        zone.min_output = 90.0;
        zone.max_output = 80.0;
        assert!(zone.validate().is_err());

        let dup = ZoneController::new(
            vec![curve_zone("a"), curve_zone("a")],
            ZoneControllerOptions::for_fetch_frequency(10),
        );
        assert!(matches!(dup, Err(ControlError::InvalidZone { .. })));
    }

    #[test]
    fn computes_from_hottest_sensor() {
        let mut ctl = controller(vec![curve_zone("z")]);
        let decisions = ctl.compute(&inputs(
            "z",
            vec![reading("cpu", 40.0, 100), reading("asic", 55.0, 100)],
            &[],
        ));
        assert_eq!(decisions.len(), 1);
        assert_eq!(decisions[0].reason, DecisionReason::Computed);
        assert_eq!(decisions[0].input, Some(55.0));
        assert_eq!(decisions[0].output, 60.0);
    }

    #[test]
    fn fail_safe_when_all_stale_or_missing() {
        let mut ctl = controller(vec![curve_zone("z"), curve_zone("other")]);
        let decisions = ctl.compute(&inputs("z", vec![], &["cpu", "asic"]));
        assert_eq!(decisions.len(), 2);
        for d in &decisions {
            assert!(d.is_fail_safe());
            assert_eq!(d.output, 100.0);
        }
        assert_eq!(decisions[1].stale_sensors, vec!["cpu", "asic"]);
    }

    #[test]
    fn non_finite_reading_counts_as_stale() {
        let mut ctl = controller(vec![curve_zone("z")]);
        let decisions = ctl.compute(&inputs(
            "z",
            vec![reading("cpu", f64::NAN, 100), reading("asic", 30.0, 100)],
            &[],
        ));
        assert_eq!(decisions[0].output, 20.0);
        assert_eq!(decisions[0].stale_sensors, vec!["cpu"]);
        assert_eq!(decisions[0].fresh_sensors, vec!["asic"]);
    }

    #[test]
    fn repeated_sample_is_held_and_state_untouched() {
        let mut ctl = controller(vec![pid_zone("z")]);
        let input = inputs("z", vec![reading("cpu", 60.0, 100)], &[]);
        let first = ctl.compute(&input);
        let state = ctl.runtime("z").unwrap().state.clone();
        let second = ctl.compute(&input);
        assert_eq!(second[0].reason, DecisionReason::Held);
        assert_eq!(second[0].output, first[0].output);
        assert_eq!(ctl.runtime("z").unwrap().state, state);
    }

    #[test]
    fn fail_safe_freezes_state_and_dt_is_capped_on_resume() {
        let mut ctl = controller(vec![pid_zone("z")]);
        ctl.compute(&inputs("z", vec![reading("cpu", 51.0, 100)], &[]));
        // First evaluation integrates over the nominal step: 1 °C * 10 s.
        assert_eq!(ctl.runtime("z").unwrap().state.integral, 10.0);

        for _ in 0..5 {
            let d = ctl.compute(&inputs("z", vec![], &["cpu"]));
            assert!(d[0].is_fail_safe());
        }
        assert_eq!(ctl.runtime("z").unwrap().state.integral, 10.0);

        // Sample arrives 300 s later; only 2 * 10 s may be integrated.
        let d = ctl.compute(&inputs("z", vec![reading("cpu", 51.0, 400)], &[]));
        assert_eq!(d[0].reason, DecisionReason::Computed);
        assert_eq!(ctl.runtime("z").unwrap().state.integral, 30.0);
        assert!(!ctl.runtime("z").unwrap().fail_safe);
    }

    #[test]
    fn dt_follows_sample_timestamps() {
        let mut ctl = controller(vec![pid_zone("z")]);
        ctl.compute(&inputs("z", vec![reading("cpu", 51.0, 100)], &[]));
        ctl.compute(&inputs("z", vec![reading("cpu", 51.0, 105)], &[]));
        assert_eq!(ctl.runtime("z").unwrap().state.integral, 15.0);
    }

    #[test]
    fn reconfigure_keeps_surviving_zone_memory() {
        let mut ctl = controller(vec![pid_zone("keep"), pid_zone("drop")]);
        let mut map = inputs("keep", vec![reading("cpu", 60.0, 100)], &[]);
        map.insert(
            "drop".to_string(),
            ZoneInput {
                fresh: vec![reading("cpu", 60.0, 100)],
                stale: vec![],
            },
        );
        ctl.compute(&map);
        ctl.reconfigure(
            vec![pid_zone("keep"), curve_zone("new")],
            ZoneControllerOptions::for_fetch_frequency(10),
        )
        .unwrap();
        assert!(ctl.runtime("keep").is_some());
        assert!(ctl.runtime("drop").is_none());
        assert!(ctl.runtime("new").is_none());
        assert_eq!(ctl.zones().len(), 2);
    }

    #[test]
    fn reconfigure_with_narrower_bounds_recomputes_within_them() {
        let mut ctl = controller(vec![curve_zone("z")]);
        let input = inputs("z", vec![reading("asic", 55.0, 100)], &[]);
        assert_eq!(ctl.compute(&input)[0].output, 60.0);

        let mut narrow = curve_zone("z");
        narrow.max_output = 50.0;
        ctl.reconfigure(vec![narrow], ZoneControllerOptions::for_fetch_frequency(10))
            .unwrap();

        let d = ctl.compute(&input);
        assert_eq!(d[0].reason, DecisionReason::Computed);
        assert_eq!(d[0].output, 50.0);
        // Same sample again is held, still inside the new bounds.
        let d = ctl.compute(&input);
        assert_eq!(d[0].reason, DecisionReason::Held);
        assert_eq!(d[0].output, 50.0);
    }

    #[test]
    fn redelivered_timestamp_with_new_value_is_recomputed() {
        let mut ctl = controller(vec![curve_zone("z")]);
        let first = ctl.compute(&inputs("z", vec![reading("cpu", 40.0, 100)], &[]));
        assert_eq!(first[0].output, 36.0);

        let second = ctl.compute(&inputs("z", vec![reading("cpu", 80.0, 100)], &[]));
        assert_eq!(second[0].reason, DecisionReason::Computed);
        assert_eq!(second[0].output, 100.0);
    }
}
