use fc_config::schema::*;
use fc_config::{LATEST_VERSION, ValidationError, validate_config};

fn zone(id: &str, fans: &[&str]) -> ZoneDef {
    ZoneDef {
        id: id.to_string(),
        name: String::new(),
        sensors: vec!["t1".to_string()],
        fans: fans.iter().map(|f| f.to_string()).collect(),
        min_output: 20.0,
        max_output: 100.0,
        aggregation: AggregationDef::Max,
        control: ControlDef::Pid {
            kp: 2.0,
            ki: 0.1,
            kd: 0.0,
            setpoint: 50.0,
            td_filter: 0.0,
            integral_limit: None,
        },
    }
}

fn config() -> ServiceConfig {
    ServiceConfig {
        version: LATEST_VERSION,
        name: "test".to_string(),
        platform: None,
        fetch_frequency_s: 15,
        initial_sync_timeout_ms: 1_000,
        write_mode: Default::default(),
        bus: BusDef::default(),
        actuator: ActuatorDef::default(),
        simulation: SimulationDef::default(),
        zones: vec![zone("z1", &["fan1"])],
    }
}

#[test]
fn baseline_is_valid() {
    validate_config(&config()).unwrap();
}

#[test]
fn rejects_unknown_versions() {
    for version in [0, LATEST_VERSION + 1] {
        let mut c = config();
        c.version = version;
        assert!(matches!(
            validate_config(&c),
            Err(ValidationError::UnsupportedVersion { .. })
        ));
    }
}

#[test]
fn rejects_zero_fetch_frequency() {
    let mut c = config();
    c.fetch_frequency_s = 0;
    assert!(matches!(
        validate_config(&c),
        Err(ValidationError::InvalidValue { ref field, .. }) if field == "fetch_frequency_s"
    ));
}

#[test]
fn rejects_empty_and_duplicate_zones() {
    let mut c = config();
    c.zones.clear();
    assert!(validate_config(&c).is_err());

    let mut c = config();
    c.zones.push(zone("z1", &["fan2"]));
    assert!(matches!(
        validate_config(&c),
        Err(ValidationError::DuplicateId { ref id, .. }) if id == "z1"
    ));
}

#[test]
fn rejects_fan_shared_between_zones() {
    let mut c = config();
    c.zones.push(zone("z2", &["fan1"]));
    assert!(matches!(
        validate_config(&c),
        Err(ValidationError::DuplicateId { ref id, .. }) if id == "fan1"
    ));
}

#[test]
fn rejects_bad_output_bounds() {
    let mut c = config();
    c.zones[0].min_output = 80.0;
    c.zones[0].max_output = 60.0;
    assert!(validate_config(&c).is_err());

    let mut c = config();
    c.zones[0].max_output = 120.0;
    assert!(validate_config(&c).is_err());

    let mut c = config();
    c.zones[0].min_output = f64::NAN;
    assert!(validate_config(&c).is_err());
}

#[test]
fn rejects_non_monotonic_curves() {
    let bp = |temperature, output| BreakpointDef {
        temperature,
        output,
    };
    let mut c = config();
    c.zones[0].control = ControlDef::Curve {
        breakpoints: vec![bp(40.0, 30.0), bp(40.0, 50.0)],
    };
    assert!(validate_config(&c).is_err());

    c.zones[0].control = ControlDef::Curve {
        breakpoints: vec![bp(40.0, 50.0), bp(60.0, 30.0)],
    };
    assert!(validate_config(&c).is_err());

    c.zones[0].control = ControlDef::Curve {
        breakpoints: vec![],
    };
    assert!(validate_config(&c).is_err());

    c.zones[0].control = ControlDef::Curve {
        breakpoints: vec![bp(40.0, 30.0), bp(60.0, 30.0)],
    };
    validate_config(&c).unwrap();
}

#[test]
fn rejects_negative_gains() {
    let mut c = config();
    c.zones[0].control = ControlDef::Pid {
        kp: -1.0,
        ki: 0.0,
        kd: 0.0,
        setpoint: 50.0,
        td_filter: 0.0,
        integral_limit: None,
    };
    assert!(matches!(
        validate_config(&c),
        Err(ValidationError::InvalidValue { .. })
    ));
}

#[test]
fn rejects_bad_backoff_and_tcp_address() {
    let mut c = config();
    c.bus.backoff.multiplier = 0.5;
    assert!(validate_config(&c).is_err());

    let mut c = config();
    c.bus.backoff.max_ms = 10;
    assert!(validate_config(&c).is_err());

    let mut c = config();
    c.bus.transport = TransportDef::Tcp {
        address: " ".to_string(),
        connect_timeout_ms: 100,
    };
    assert!(validate_config(&c).is_err());
}

#[test]
fn simulated_sensors_must_cover_zone_sensors() {
    let mut c = config();
    c.simulation.sensors.push(SimSensorDef {
        name: "other".to_string(),
        base: 40.0,
        amplitude: 0.0,
    });
    assert!(matches!(
        validate_config(&c),
        Err(ValidationError::MissingReference { ref id, .. }) if id == "t1"
    ));

    c.simulation.sensors.push(SimSensorDef {
        name: "t1".to_string(),
        base: 40.0,
        amplitude: 2.0,
    });
    validate_config(&c).unwrap();
}

#[test]
fn simulation_requires_memory_bus() {
    let mut c = config();
    c.simulation.sensors.push(SimSensorDef {
        name: "t1".to_string(),
        base: 40.0,
        amplitude: 0.0,
    });
    c.bus.transport = TransportDef::Tcp {
        address: "127.0.0.1:1".to_string(),
        connect_timeout_ms: 100,
    };
    assert!(matches!(
        validate_config(&c),
        Err(ValidationError::Unsupported { .. })
    ));
}
