use fc_config::schema::*;
use fc_config::{ConfigError, load_config, load_json, load_yaml, save_json, save_yaml};
use fc_core::WriteMode;

fn sample() -> ServiceConfig {
    ServiceConfig {
        version: 1,
        name: "roundtrip".to_string(),
        platform: Some("wedge400".to_string()),
        fetch_frequency_s: 10,
        initial_sync_timeout_ms: 1_000,
        write_mode: WriteMode::Apply,
        bus: BusDef {
            transport: TransportDef::Tcp {
                address: "10.0.0.1:5909".to_string(),
                connect_timeout_ms: 500,
            },
            ..BusDef::default()
        },
        actuator: ActuatorDef::default(),
        simulation: SimulationDef::default(),
        zones: vec![ZoneDef {
            id: "z1".to_string(),
            name: "Zone 1".to_string(),
            sensors: vec!["t1".to_string()],
            fans: vec!["fan1".to_string()],
            min_output: 20.0,
            max_output: 90.0,
            aggregation: AggregationDef::Mean,
            control: ControlDef::Curve {
                breakpoints: vec![
                    BreakpointDef {
                        temperature: 30.0,
                        output: 20.0,
                    },
                    BreakpointDef {
                        temperature: 70.0,
                        output: 90.0,
                    },
                ],
            },
        }],
    }
}

#[test]
fn roundtrip_yaml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("service.yaml");
    let config = sample();

    save_yaml(&path, &config).unwrap();
    let loaded = load_yaml(&path).unwrap();

    assert_eq!(config, loaded);
}

#[test]
fn roundtrip_json_by_extension() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("service.json");
    let config = sample();

    save_json(&path, &config).unwrap();
    let loaded = load_config(&path).unwrap();

    assert_eq!(config, loaded);
    assert_eq!(load_json(&path).unwrap(), config);
}

#[test]
fn defaults_fill_optional_fields() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("minimal.yml");
    std::fs::write(
        &path,
        "version: 1\nname: minimal\nzones:\n  - id: z\n    sensors: [t]\n    fans: [f]\n    control:\n      type: pid\n      kp: 2.0\n      setpoint: 50.0\n",
    )
    .unwrap();

    let config = load_config(&path).unwrap();
    assert_eq!(config.fetch_frequency_s, 15);
    assert_eq!(config.initial_sync_timeout_ms, 5_000);
    assert_eq!(config.write_mode, WriteMode::Apply);
    assert_eq!(config.bus.transport, TransportDef::Memory);
    assert_eq!(config.bus.namespace, "sensors");
    assert_eq!(config.actuator.write_retries, 2);
    assert_eq!(config.actuator.pwm_max, 255);
    let zone = &config.zones[0];
    assert_eq!((zone.min_output, zone.max_output), (0.0, 100.0));
    assert_eq!(
        zone.control,
        ControlDef::Pid {
            kp: 2.0,
            ki: 0.0,
            kd: 0.0,
            setpoint: 50.0,
            td_filter: 0.0,
            integral_limit: None,
        }
    );
}

#[test]
fn unknown_extension_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("service.toml");
    std::fs::write(&path, "").unwrap();
    assert!(matches!(
        load_config(&path),
        Err(ConfigError::UnsupportedFormat { .. })
    ));
}

#[test]
fn invalid_file_is_not_saved() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.yaml");
    let mut config = sample();
    config.zones.clear();
    assert!(matches!(
        save_yaml(&path, &config),
        Err(ConfigError::Validation(_))
    ));
    assert!(!path.exists());
}

#[test]
fn malformed_yaml_reports_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.yaml");
    std::fs::write(&path, "version: [1\nname: x").unwrap();
    assert!(matches!(load_config(&path), Err(ConfigError::Yaml(_))));
}
