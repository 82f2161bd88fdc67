//! Turn a validated [`ServiceConfig`] into runtime objects.

use std::sync::Arc;
use std::time::Duration;

use fc_config::{
    ActuatorDef, AggregationDef, BusDef, ControlDef, ServiceConfig, SimulationDef, TransportDef,
    ZoneDef,
};
use fc_controls::{
    ActuatorPolicy, Aggregation, Breakpoint, ControlAlgorithm, CurveController, PidController,
    Zone, ZoneControllerOptions,
};
use fc_telemetry::{
    BackoffConfig, BusClientOptions, InMemoryBus, SimulatedSensor, TcpBus, TelemetryBus,
};

use crate::error::ServiceResult;

/// Build every configured zone, in configuration order.
pub fn build_zones(config: &ServiceConfig) -> ServiceResult<Vec<Zone>> {
    config.zones.iter().map(build_zone).collect()
}

pub fn build_zone(def: &ZoneDef) -> ServiceResult<Zone> {
    let zone = Zone {
        name: def.id.clone(),
        sensors: def.sensors.clone(),
        fans: def.fans.clone(),
        min_output: def.min_output,
        max_output: def.max_output,
        aggregation: match def.aggregation {
            AggregationDef::Max => Aggregation::Max,
            AggregationDef::Mean => Aggregation::Mean,
        },
        algorithm: build_algorithm(def)?,
    };
    zone.validate()?;
    Ok(zone)
}

/// Control algorithm for a zone, bounded by the zone's output range.
pub fn build_algorithm(def: &ZoneDef) -> ServiceResult<Box<dyn ControlAlgorithm>> {
    let algorithm: Box<dyn ControlAlgorithm> = match &def.control {
        ControlDef::Curve { breakpoints } => {
            let breakpoints = breakpoints
                .iter()
                .map(|bp| Breakpoint::new(bp.temperature, bp.output))
                .collect();
            Box::new(CurveController::new(
                breakpoints,
                def.min_output,
                def.max_output,
            )?)
        }
        ControlDef::Pid {
            kp,
            ki,
            kd,
            setpoint,
            td_filter,
            integral_limit,
        } => {
            let mut pid =
                PidController::new(*kp, *ki, *kd, *setpoint, def.min_output, def.max_output)?
                    .with_derivative_filter(*td_filter)?;
            if let Some(limit) = integral_limit {
                pid = pid.with_integral_limit(*limit)?;
            }
            Box::new(pid)
        }
    };
    Ok(algorithm)
}

pub fn zone_options(config: &ServiceConfig) -> ZoneControllerOptions {
    ZoneControllerOptions::for_fetch_frequency(config.fetch_frequency_s)
}

pub fn actuator_policy(def: &ActuatorDef) -> ActuatorPolicy {
    ActuatorPolicy {
        write_retries: def.write_retries,
        alert_after_failed_ticks: def.alert_after_failed_ticks,
    }
}

pub fn bus_client_options(def: &BusDef) -> BusClientOptions {
    BusClientOptions {
        namespace: def.namespace.clone(),
        poll_timeout: Duration::from_millis(def.poll_timeout_ms),
        backoff: BackoffConfig {
            initial_ms: def.backoff.initial_ms,
            max_ms: def.backoff.max_ms,
            multiplier: def.backoff.multiplier,
        },
    }
}

/// A constructed transport. `memory` is set for the in-process broker so
/// callers can attach publishers to it.
pub struct BuiltBus {
    pub bus: Arc<dyn TelemetryBus>,
    pub memory: Option<InMemoryBus>,
}

pub fn build_bus(def: &BusDef) -> BuiltBus {
    match &def.transport {
        TransportDef::Memory => {
            let memory = InMemoryBus::new();
            BuiltBus {
                bus: Arc::new(memory.clone()),
                memory: Some(memory),
            }
        }
        TransportDef::Tcp {
            address,
            connect_timeout_ms,
        } => BuiltBus {
            bus: Arc::new(TcpBus::new(
                address.clone(),
                Duration::from_millis(*connect_timeout_ms),
            )),
            memory: None,
        },
    }
}

pub fn simulated_sensors(def: &SimulationDef) -> Vec<SimulatedSensor> {
    def.sensors
        .iter()
        .map(|s| SimulatedSensor::new(s.name.clone(), s.base, s.amplitude))
        .collect()
}
