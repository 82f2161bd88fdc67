//! The fan control service: telemetry cache, zone control and actuation
//! behind one read surface and one control surface.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use fc_config::{ServiceConfig, validate_config};
use fc_controls::{
    ActuatorDriver, FanActuator, FreshReading, Zone, ZoneController, ZoneInput,
};
use fc_core::timing::{TICK_TIMING, Timer};
use fc_core::{Clock, WriteModeCell};
use fc_platform::Platform;
use fc_telemetry::{BusClient, BusClientStatus, SensorData, TelemetryBus, TelemetryCache};
use tracing::{debug, info, warn};

use crate::compile;
use crate::error::{ServiceError, ServiceResult};
use crate::report::{TickReport, ZoneReport};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// State only touched by a running tick.
#[derive(Debug)]
struct ControlCore {
    zones: ZoneController,
    driver: ActuatorDriver,
    ticks: u64,
}

pub struct FanService {
    config: RwLock<Arc<ServiceConfig>>,
    cache: Arc<TelemetryCache>,
    bus: Arc<dyn TelemetryBus>,
    clock: Arc<dyn Clock>,
    write_mode: WriteModeCell,
    fetch_frequency_s: AtomicU64,
    last_fetch_time: AtomicU64,
    core: Mutex<ControlCore>,
    last_tick: RwLock<Option<Arc<TickReport>>>,
    client: Mutex<Option<BusClient>>,
    shut_down: AtomicBool,
}

impl std::fmt::Debug for FanService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FanService")
            .field("bus", &self.bus.name())
            .field("write_mode", &self.write_mode.get())
            .field("fetch_frequency_s", &self.get_sensor_fetch_frequency())
            .field("shut_down", &self.shut_down.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl FanService {
    /// Build a service. Nothing is subscribed until [`FanService::kickstart`].
    pub fn new(
        config: ServiceConfig,
        bus: Arc<dyn TelemetryBus>,
        actuator: Box<dyn FanActuator>,
        clock: Arc<dyn Clock>,
    ) -> ServiceResult<Self> {
        validate_config(&config)?;
        let zones = ZoneController::new(
            compile::build_zones(&config)?,
            compile::zone_options(&config),
        )?;
        let driver = ActuatorDriver::new(actuator, compile::actuator_policy(&config.actuator));

        info!(
            name = %config.name,
            zones = config.zones.len(),
            fetch_frequency_s = config.fetch_frequency_s,
            write_mode = ?config.write_mode,
            bus = bus.name(),
            "fan service created"
        );

        Ok(Self {
            fetch_frequency_s: AtomicU64::new(config.fetch_frequency_s),
            write_mode: WriteModeCell::new(config.write_mode),
            config: RwLock::new(Arc::new(config)),
            cache: Arc::new(TelemetryCache::new()),
            bus,
            clock,
            last_fetch_time: AtomicU64::new(0),
            core: Mutex::new(ControlCore {
                zones,
                driver,
                ticks: 0,
            }),
            last_tick: RwLock::new(None),
            client: Mutex::new(None),
            shut_down: AtomicBool::new(false),
        })
    }

    /// Build a service driving the fans of `platform`, after LED bring-up.
    pub fn from_platform(
        config: ServiceConfig,
        bus: Arc<dyn TelemetryBus>,
        platform: &dyn Platform,
        clock: Arc<dyn Clock>,
    ) -> ServiceResult<Self> {
        validate_config(&config)?;
        platform.init_leds()?;
        let actuator = platform.fan_actuator(&config.actuator)?;
        Self::new(config, bus, actuator, clock)
    }

    pub fn config(&self) -> Arc<ServiceConfig> {
        Arc::clone(&self.config.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn cache(&self) -> Arc<TelemetryCache> {
        Arc::clone(&self.cache)
    }

    /// Hardware-write mode consulted by every tick.
    pub fn write_mode(&self) -> &WriteModeCell {
        &self.write_mode
    }

    // ---- control surface ----

    /// Start the subscription, wait briefly for first telemetry, run one tick.
    ///
    /// A missing first delivery is not an error: the tick runs anyway and
    /// zones without data fall back to their maximum output.
    pub fn kickstart(&self) -> ServiceResult<TickReport> {
        let seen = self.cache.generation();
        if self.start_subscription()? {
            let timeout = self.config().initial_sync_timeout();
            if self.cache.wait_for_update(seen, timeout) {
                info!(sensors = self.cache.size(), "initial telemetry received");
            } else {
                warn!(
                    timeout_ms = timeout.as_millis() as u64,
                    "no telemetry within initial sync timeout, starting anyway"
                );
            }
        }
        Ok(self.control_fan())
    }

    /// Returns `true` if a new subscription was started.
    fn start_subscription(&self) -> ServiceResult<bool> {
        let mut client = lock(&self.client);
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(ServiceError::ShutDown);
        }
        if client.is_some() {
            return Ok(false);
        }
        let options = compile::bus_client_options(&self.config().bus);
        info!(bus = self.bus.name(), namespace = %options.namespace, "subscribing to telemetry");
        *client = Some(BusClient::connect(
            Arc::clone(&self.bus),
            Arc::clone(&self.cache),
            options,
        )?);
        Ok(true)
    }

    /// Run exactly one tick: read the cache, compute every zone, write fans.
    pub fn control_fan(&self) -> TickReport {
        let mut guard = lock(&self.core);
        let core = &mut *guard;
        let timer = Timer::start("tick");

        let started_at = self.clock.now_secs();
        let threshold = self.fetch_frequency_s.load(Ordering::SeqCst);
        let snapshot = self.cache.snapshot();
        let inputs = partition_zone_inputs(core.zones.zones(), &snapshot, started_at, threshold);
        let decisions = core.zones.compute(&inputs);

        let mode = self.write_mode.get();
        let mut zones = Vec::with_capacity(decisions.len());
        for decision in decisions {
            let fans = core
                .zones
                .zone(&decision.zone)
                .map(|z| z.fans.clone())
                .unwrap_or_default();
            let actuation = core
                .driver
                .apply(&decision.zone, &fans, decision.output, mode);
            zones.push(ZoneReport {
                decision,
                actuation,
            });
        }
        core.ticks += 1;

        let completed_at = self.clock.now_secs();
        self.last_fetch_time.fetch_max(completed_at, Ordering::SeqCst);
        let duration_s = timer.stop_into(&TICK_TIMING);

        let report = TickReport {
            tick: core.ticks,
            started_at,
            completed_at,
            write_mode: mode,
            sensors_seen: snapshot.size(),
            zones,
            duration_s,
        };
        *self
            .last_tick
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(report.clone()));
        debug!(
            tick = report.tick,
            sensors = report.sensors_seen,
            fail_safe = ?report.fail_safe_zones(),
            "tick complete"
        );
        report
    }

    /// Swap in a new configuration without dropping cache contents or the
    /// memory of zones that survive by id.
    ///
    /// Sensors no longer referenced by any zone are evicted. Changing the
    /// bus transport requires a restart.
    pub fn reconfigure(&self, config: ServiceConfig) -> ServiceResult<()> {
        validate_config(&config)?;
        let zones = compile::build_zones(&config)?;
        let current = self.config();
        if current.bus.transport != config.bus.transport {
            return Err(ServiceError::Unsupported {
                message: "bus transport cannot change while running".to_string(),
            });
        }
        let bus_changed = current.bus != config.bus;

        {
            let mut core = lock(&self.core);
            core.zones
                .reconfigure(zones, compile::zone_options(&config))?;
            core.driver
                .set_policy(compile::actuator_policy(&config.actuator));
            core.driver
                .retain_zones(config.zones.iter().map(|z| z.id.as_str()));

            let keep: BTreeSet<String> = config
                .sensor_names()
                .into_iter()
                .map(str::to_string)
                .collect();
            let evicted = self.cache.evict_except(|name| keep.contains(name));
            self.fetch_frequency_s
                .store(config.fetch_frequency_s, Ordering::SeqCst);
            self.write_mode.set(config.write_mode);
            info!(
                zones = config.zones.len(),
                evicted,
                fetch_frequency_s = config.fetch_frequency_s,
                "fan service reconfigured"
            );
            *self.config.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(config);
        }

        // The running subscription is only replaced once its successor is
        // up, so a failed connect leaves the old one delivering.
        if bus_changed {
            let mut client = lock(&self.client);
            if client.is_some() {
                let options = compile::bus_client_options(&self.config().bus);
                info!(namespace = %options.namespace, "resubscribing after bus change");
                let fresh = BusClient::connect(
                    Arc::clone(&self.bus),
                    Arc::clone(&self.cache),
                    options,
                )?;
                if let Some(mut old) = client.replace(fresh) {
                    old.shutdown();
                }
            }
        }
        Ok(())
    }

    /// Tear down the subscription. Waits for an in-flight tick to finish.
    pub fn shutdown(&self) {
        let first = !self.shut_down.swap(true, Ordering::SeqCst);
        let client = lock(&self.client).take();
        if let Some(mut client) = client {
            client.shutdown();
        }
        drop(lock(&self.core));
        if first {
            info!("fan service shut down");
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    // ---- read surface ----

    /// Consistent copy of the telemetry cache.
    pub fn sensor_data(&self) -> SensorData {
        self.cache.snapshot()
    }

    /// Completion time of the latest tick, epoch seconds. Never decreases.
    pub fn last_sensor_fetch_time_sec(&self) -> u64 {
        self.last_fetch_time.load(Ordering::SeqCst)
    }

    pub fn get_sensor_fetch_frequency(&self) -> u64 {
        self.fetch_frequency_s.load(Ordering::SeqCst)
    }

    pub fn check_if_entry_exists(&self, name: &str) -> bool {
        self.cache.exists(name)
    }

    /// Timestamp of the latest reading for `name`, 0 if never observed.
    pub fn get_last_updated(&self, name: &str) -> u64 {
        self.cache.last_updated(name)
    }

    pub fn last_tick(&self) -> Option<Arc<TickReport>> {
        self.last_tick
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Outputs commanded by the latest tick.
    pub fn zone_outputs(&self) -> BTreeMap<String, f64> {
        self.last_tick()
            .map(|report| report.outputs())
            .unwrap_or_default()
    }

    /// Last output that reached at least one fan of `zone`.
    pub fn last_good_output(&self, zone: &str) -> Option<f64> {
        lock(&self.core).driver.last_good(zone)
    }

    pub fn bus_status(&self) -> BusClientStatus {
        lock(&self.client)
            .as_ref()
            .map(BusClient::status)
            .unwrap_or_default()
    }
}

impl Drop for FanService {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Split each zone's sensors into fresh readings and stale names.
///
/// A sensor is stale when absent or when `now - last_updated > threshold_s`.
pub fn partition_zone_inputs(
    zones: &[Zone],
    data: &SensorData,
    now: u64,
    threshold_s: u64,
) -> BTreeMap<String, ZoneInput> {
    let mut inputs = BTreeMap::new();
    for zone in zones {
        let mut input = ZoneInput::default();
        for sensor in &zone.sensors {
            match data.get(sensor) {
                Some(reading) if !data.is_stale(sensor, now, threshold_s) => {
                    input.fresh.push(FreshReading {
                        sensor: sensor.clone(),
                        value: reading.value,
                        timestamp: reading.timestamp,
                    });
                }
                _ => {
                    debug!(zone = %zone.name, sensor = %sensor, "sensor stale or missing");
                    input.stale.push(sensor.clone());
                }
            }
        }
        inputs.insert(zone.name.clone(), input);
    }
    inputs
}
