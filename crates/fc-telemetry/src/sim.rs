//! Synthetic acquisition service for demos and soak tests.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use fc_core::{Clock, StopSignal};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::BusResult;
use crate::memory::InMemoryBus;
use crate::reading::SensorReading;

/// One simulated sensor: a slow sine wave around `base`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatedSensor {
    pub name: String,
    pub base: f64,
    #[serde(default)]
    pub amplitude: f64,
}

impl SimulatedSensor {
    pub fn new(name: impl Into<String>, base: f64, amplitude: f64) -> Self {
        Self {
            name: name.into(),
            base,
            amplitude,
        }
    }

    /// Deterministic value at publication step `step`.
    pub fn sample(&self, step: u64) -> f64 {
        self.base + self.amplitude * (step as f64 * 0.1).sin()
    }
}

/// Background publisher feeding an [`InMemoryBus`].
pub struct SimulatedSource {
    stop: Arc<StopSignal>,
    handle: Option<JoinHandle<()>>,
}

impl SimulatedSource {
    pub fn start(
        bus: InMemoryBus,
        namespace: impl Into<String>,
        sensors: Vec<SimulatedSensor>,
        interval: Duration,
        clock: Arc<dyn Clock>,
    ) -> BusResult<Self> {
        let stop = Arc::new(StopSignal::new());
        let remote = Arc::clone(&stop);
        let namespace = namespace.into();

        let handle = thread::Builder::new()
            .name("fc-sim-source".to_string())
            .spawn(move || {
                let mut step = 0_u64;
                loop {
                    let now = clock.now_secs();
                    let batch = sensors
                        .iter()
                        .map(|s| SensorReading::new(s.name.clone(), s.sample(step), now))
                        .collect();
                    let reached = bus.publish(&namespace, batch);
                    debug!(step, reached, "published simulated readings");
                    step += 1;
                    if remote.sleep(interval) {
                        break;
                    }
                }
            })?;

        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    pub fn stop(&mut self) {
        self.stop.stop();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("simulated source thread panicked");
            }
        }
    }
}

impl Drop for SimulatedSource {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fc_core::ManualClock;

    #[test]
    fn samples_are_deterministic() {
        let sensor = SimulatedSensor::new("t1", 40.0, 5.0);
        assert_eq!(sensor.sample(0), 40.0);
        assert_eq!(sensor.sample(17), sensor.sample(17));
        assert!(sensor.sample(15) <= 45.0 && sensor.sample(15) >= 35.0);
    }

    #[test]
    fn publishes_until_stopped() {
        let bus = InMemoryBus::new();
        let clock = ManualClock::new(1_000);
        let mut source = SimulatedSource::start(
            bus.clone(),
            "sensors",
            vec![SimulatedSensor::new("t1", 40.0, 0.0)],
            Duration::from_millis(5),
            Arc::new(clock),
        )
        .unwrap();
        thread::sleep(Duration::from_millis(30));
        source.stop();

        let truth = bus.published_sensors("sensors");
        assert_eq!(truth.get_last_updated("t1"), 1_000);
        assert_eq!(truth.get("t1").unwrap().value, 40.0);
    }
}
