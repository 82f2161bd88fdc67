#![allow(dead_code)]

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use fc_config::*;
use fc_controls::RecordingActuator;
use fc_core::{ManualClock, WriteMode};
use fc_service::FanService;
use fc_telemetry::{InMemoryBus, SensorReading};

pub const NAMESPACE: &str = "sensors";
pub const T0: u64 = 1_700_000_000;

pub fn wait_until(timeout: Duration, mut f: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if f() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    f()
}

pub fn curve_zone(id: &str, sensors: &[&str], fans: &[&str]) -> ZoneDef {
    ZoneDef {
        id: id.to_string(),
        name: String::new(),
        sensors: sensors.iter().map(|s| s.to_string()).collect(),
        fans: fans.iter().map(|f| f.to_string()).collect(),
        min_output: 20.0,
        max_output: 100.0,
        aggregation: AggregationDef::Max,
        control: ControlDef::Curve {
            breakpoints: vec![
                BreakpointDef {
                    temperature: 30.0,
                    output: 20.0,
                },
                BreakpointDef {
                    temperature: 80.0,
                    output: 100.0,
                },
            ],
        },
    }
}

pub fn config(fetch_frequency_s: u64, zones: Vec<ZoneDef>) -> ServiceConfig {
    ServiceConfig {
        version: LATEST_VERSION,
        name: "test".to_string(),
        platform: None,
        fetch_frequency_s,
        initial_sync_timeout_ms: 50,
        write_mode: WriteMode::Apply,
        bus: BusDef {
            transport: TransportDef::Memory,
            namespace: NAMESPACE.to_string(),
            poll_timeout_ms: 10,
            backoff: BackoffDef {
                initial_ms: 5,
                max_ms: 20,
                multiplier: 2.0,
            },
        },
        actuator: ActuatorDef {
            write_retries: 1,
            alert_after_failed_ticks: 2,
            pwm_root: None,
            pwm_max: 255,
        },
        simulation: SimulationDef::default(),
        zones,
    }
}

/// Service wired to an in-memory bus, a manual clock and a recording actuator.
pub struct Harness {
    pub bus: InMemoryBus,
    pub clock: ManualClock,
    pub fans: RecordingActuator,
    pub service: Arc<FanService>,
}

impl Harness {
    pub fn new(config: ServiceConfig) -> Self {
        let bus = InMemoryBus::new();
        let clock = ManualClock::new(T0);
        let fans = RecordingActuator::new();
        let service = Arc::new(
            FanService::new(
                config,
                Arc::new(bus.clone()),
                Box::new(fans.clone()),
                Arc::new(clock.clone()),
            )
            .expect("valid test config"),
        );
        Self {
            bus,
            clock,
            fans,
            service,
        }
    }

    /// Two-sensor single-zone setup with a 10 s fetch frequency.
    pub fn standard() -> Self {
        Self::new(config(10, vec![curve_zone("z", &["t1", "t2"], &["f1", "f2"])]))
    }

    /// Kickstart and wait until the bus client is subscribed.
    pub fn start(&self) {
        self.service.kickstart().expect("kickstart");
        assert!(
            wait_until(Duration::from_secs(5), || self.bus.subscriber_count() > 0),
            "bus client never subscribed"
        );
    }

    /// Publish readings stamped `timestamp` and wait until they are merged.
    pub fn publish(&self, readings: &[(&str, f64)], timestamp: u64) {
        let before = self.service.bus_status().batches_delivered;
        let batch = readings
            .iter()
            .map(|(name, value)| SensorReading::new(*name, *value, timestamp))
            .collect();
        let reached = self.bus.publish(NAMESPACE, batch);
        assert!(reached > 0, "no subscriber received the batch");
        assert!(
            wait_until(Duration::from_secs(5), || {
                self.service.bus_status().batches_delivered > before
            }),
            "batch never merged"
        );
    }

    /// Take the bus down and wait until the client notices.
    pub fn halt_bus(&self) {
        self.bus.set_available(false);
        assert!(wait_until(Duration::from_secs(5), || {
            !self.service.bus_status().connected
        }));
    }

    /// Bring the bus back and wait until the client has resubscribed.
    pub fn resume_bus(&self) {
        self.bus.set_available(true);
        assert!(wait_until(Duration::from_secs(5), || {
            self.bus.subscriber_count() > 0 && self.service.bus_status().connected
        }));
    }
}
