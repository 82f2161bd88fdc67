//! Configuration validation logic.

use crate::schema::{
    ActuatorDef, BusDef, ControlDef, ServiceConfig, SimulationDef, TransportDef, ZoneDef,
};
use std::collections::{HashMap, HashSet};

/// Newest configuration format understood by this build.
pub const LATEST_VERSION: u32 = 1;

#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("Duplicate ID: {id} in {context}")]
    DuplicateId { id: String, context: String },

    #[error("Missing reference: {id} in {context}")]
    MissingReference { id: String, context: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unsupported feature: {feature} - {reason}")]
    Unsupported { feature: String, reason: String },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

fn invalid(field: impl Into<String>, value: impl ToString, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.into(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

pub fn validate_config(config: &ServiceConfig) -> Result<(), ValidationError> {
    if config.version == 0 || config.version > LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: config.version,
        });
    }
    if config.name.trim().is_empty() {
        return Err(invalid("name", &config.name, "must not be empty"));
    }
    if config.fetch_frequency_s == 0 {
        return Err(invalid(
            "fetch_frequency_s",
            config.fetch_frequency_s,
            "must be positive",
        ));
    }

    validate_bus(&config.bus)?;
    validate_actuator(&config.actuator)?;
    validate_simulation(&config.simulation, &config.bus)?;

    if config.zones.is_empty() {
        return Err(invalid("zones", "[]", "at least one zone is required"));
    }
    let mut zone_ids = HashSet::new();
    let mut fan_owner: HashMap<&str, &str> = HashMap::new();
    for zone in &config.zones {
        if !zone_ids.insert(zone.id.as_str()) {
            return Err(ValidationError::DuplicateId {
                id: zone.id.clone(),
                context: "zones".to_string(),
            });
        }
        validate_zone(zone)?;
        for fan in &zone.fans {
            if let Some(owner) = fan_owner.insert(fan.as_str(), zone.id.as_str()) {
                return Err(ValidationError::DuplicateId {
                    id: fan.clone(),
                    context: format!("fans of zones '{}' and '{}'", owner, zone.id),
                });
            }
        }
    }

    // With simulated telemetry every zone sensor must be produced somewhere.
    if !config.simulation.sensors.is_empty() {
        let simulated: HashSet<&str> = config
            .simulation
            .sensors
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        for zone in &config.zones {
            for sensor in &zone.sensors {
                if !simulated.contains(sensor.as_str()) {
                    return Err(ValidationError::MissingReference {
                        id: sensor.clone(),
                        context: format!("zone '{}' sensors (simulation)", zone.id),
                    });
                }
            }
        }
    }

    Ok(())
}

fn validate_bus(bus: &BusDef) -> Result<(), ValidationError> {
    if bus.namespace.trim().is_empty() {
        return Err(invalid("bus.namespace", &bus.namespace, "must not be empty"));
    }
    if bus.poll_timeout_ms == 0 {
        return Err(invalid("bus.poll_timeout_ms", 0, "must be positive"));
    }
    if let TransportDef::Tcp {
        address,
        connect_timeout_ms,
    } = &bus.transport
    {
        if address.trim().is_empty() {
            return Err(invalid("bus.transport.address", address, "must not be empty"));
        }
        if *connect_timeout_ms == 0 {
            return Err(invalid("bus.transport.connect_timeout_ms", 0, "must be positive"));
        }
    }
    let backoff = &bus.backoff;
    if backoff.initial_ms == 0 {
        return Err(invalid("bus.backoff.initial_ms", 0, "must be positive"));
    }
    if backoff.max_ms < backoff.initial_ms {
        return Err(invalid(
            "bus.backoff.max_ms",
            backoff.max_ms,
            "must be at least initial_ms",
        ));
    }
    if !backoff.multiplier.is_finite() || backoff.multiplier < 1.0 {
        return Err(invalid(
            "bus.backoff.multiplier",
            backoff.multiplier,
            "must be finite and at least 1",
        ));
    }
    Ok(())
}

fn validate_actuator(actuator: &ActuatorDef) -> Result<(), ValidationError> {
    if actuator.pwm_max == 0 {
        return Err(invalid("actuator.pwm_max", 0, "must be positive"));
    }
    if actuator.alert_after_failed_ticks == 0 {
        return Err(invalid(
            "actuator.alert_after_failed_ticks",
            0,
            "must be positive",
        ));
    }
    Ok(())
}

fn validate_simulation(sim: &SimulationDef, bus: &BusDef) -> Result<(), ValidationError> {
    if sim.sensors.is_empty() {
        return Ok(());
    }
    if matches!(bus.transport, TransportDef::Tcp { .. }) {
        return Err(ValidationError::Unsupported {
            feature: "simulation.sensors".to_string(),
            reason: "simulated sensors publish on the memory bus only".to_string(),
        });
    }
    if sim.interval_ms == 0 {
        return Err(invalid("simulation.interval_ms", 0, "must be positive"));
    }
    let mut names = HashSet::new();
    for sensor in &sim.sensors {
        if !names.insert(sensor.name.as_str()) {
            return Err(ValidationError::DuplicateId {
                id: sensor.name.clone(),
                context: "simulation sensors".to_string(),
            });
        }
        if !sensor.base.is_finite() || !sensor.amplitude.is_finite() {
            return Err(invalid(
                format!("simulation sensor '{}'", sensor.name),
                sensor.base,
                "base and amplitude must be finite",
            ));
        }
    }
    Ok(())
}

fn validate_zone(zone: &ZoneDef) -> Result<(), ValidationError> {
    let field = |name: &str| format!("zone '{}' {}", zone.id, name);

    if zone.id.trim().is_empty() {
        return Err(invalid("zone.id", &zone.id, "must not be empty"));
    }
    if zone.sensors.is_empty() {
        return Err(invalid(field("sensors"), "[]", "at least one sensor is required"));
    }
    if zone.fans.is_empty() {
        return Err(invalid(field("fans"), "[]", "at least one fan is required"));
    }
    let mut sensors = HashSet::new();
    for sensor in &zone.sensors {
        if !sensors.insert(sensor.as_str()) {
            return Err(ValidationError::DuplicateId {
                id: sensor.clone(),
                context: field("sensors"),
            });
        }
    }
    if !(zone.min_output.is_finite() && zone.min_output >= 0.0) {
        return Err(invalid(field("min_output"), zone.min_output, "must be within 0..=100"));
    }
    if !(zone.max_output.is_finite() && zone.max_output <= 100.0) {
        return Err(invalid(field("max_output"), zone.max_output, "must be within 0..=100"));
    }
    if zone.min_output >= zone.max_output {
        return Err(invalid(
            field("min_output"),
            zone.min_output,
            "must be less than max_output",
        ));
    }

    match &zone.control {
        ControlDef::Curve { breakpoints } => {
            if breakpoints.is_empty() {
                return Err(invalid(
                    field("breakpoints"),
                    "[]",
                    "at least one breakpoint is required",
                ));
            }
            for (i, bp) in breakpoints.iter().enumerate() {
                if !bp.temperature.is_finite() || !bp.output.is_finite() {
                    return Err(invalid(
                        field(&format!("breakpoints[{i}]")),
                        bp.temperature,
                        "must be finite",
                    ));
                }
            }
            for (i, pair) in breakpoints.windows(2).enumerate() {
                if pair[1].temperature <= pair[0].temperature {
                    return Err(invalid(
                        field(&format!("breakpoints[{}].temperature", i + 1)),
                        pair[1].temperature,
                        "temperatures must be strictly increasing",
                    ));
                }
                if pair[1].output < pair[0].output {
                    return Err(invalid(
                        field(&format!("breakpoints[{}].output", i + 1)),
                        pair[1].output,
                        "outputs must be non-decreasing",
                    ));
                }
            }
        }
        ControlDef::Pid {
            kp,
            ki,
            kd,
            setpoint,
            td_filter,
            integral_limit,
        } => {
            for (name, gain) in [("kp", kp), ("ki", ki), ("kd", kd), ("td_filter", td_filter)] {
                if !gain.is_finite() || *gain < 0.0 {
                    return Err(invalid(field(name), gain, "must be finite and non-negative"));
                }
            }
            if !setpoint.is_finite() {
                return Err(invalid(field("setpoint"), setpoint, "must be finite"));
            }
            if let Some(limit) = integral_limit {
                if !limit.is_finite() || *limit < 0.0 {
                    return Err(invalid(
                        field("integral_limit"),
                        limit,
                        "must be finite and non-negative",
                    ));
                }
            }
        }
    }
    Ok(())
}
