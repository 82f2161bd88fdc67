mod common;

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use common::{Harness, T0, config, curve_zone, wait_until};
use fc_core::ManualClock;
use fc_platform::{Platform, ProductInfo, SimPlatform};
use fc_service::{FanService, RunnerOptions, ServiceError, ServiceRunner};
use fc_telemetry::{InMemoryBus, SensorReading};

#[test]
fn nothing_is_merged_after_shutdown() {
    let h = Harness::standard();
    h.start();
    h.publish(&[("t1", 40.0)], T0);

    h.service.shutdown();
    assert!(h.service.is_shut_down());
    h.bus
        .publish(common::NAMESPACE, vec![SensorReading::new("t1", 99.0, T0 + 5)]);
    thread::sleep(Duration::from_millis(30));

    assert_eq!(h.service.get_last_updated("t1"), T0);
    assert!(matches!(h.service.kickstart(), Err(ServiceError::ShutDown)));

    // The cache stays readable and ticks still drive the fans from it.
    let report = h.service.control_fan();
    assert!(report.fail_safe_zones().is_empty());
    h.service.shutdown();
}

#[test]
fn runner_stops_after_max_ticks() {
    let h = Harness::standard();
    h.start();
    let mut runner = ServiceRunner::start(
        Arc::clone(&h.service),
        RunnerOptions {
            period: Duration::from_millis(5),
            max_ticks: Some(3),
        },
    )
    .unwrap();

    assert_eq!(runner.wait(), 3);
    assert!(runner.is_finished());
    assert_eq!(h.service.last_tick().unwrap().tick, 4);
}

#[test]
fn runner_stop_is_prompt() {
    let h = Harness::standard();
    let mut options = RunnerOptions::for_service(&h.service);
    assert_eq!(options.period, Duration::from_secs(10));
    options.period = Duration::from_secs(3_600);

    let mut runner = ServiceRunner::start(Arc::clone(&h.service), options).unwrap();
    runner.stop();
    assert_eq!(runner.ticks(), 0);
    assert!(h.service.last_tick().is_none());
}

#[test]
fn readers_see_whole_ticks_while_the_loop_runs() {
    let h = Harness::standard();
    h.start();
    h.publish(&[("t1", 40.0), ("t2", 45.0)], T0);
    let mut runner = ServiceRunner::start(
        Arc::clone(&h.service),
        RunnerOptions {
            period: Duration::from_millis(1),
            max_ticks: Some(200),
        },
    )
    .unwrap();

    let mut last_seen = 0;
    while !runner.is_finished() {
        if let Some(report) = h.service.last_tick() {
            assert!(report.tick >= last_seen);
            assert_eq!(report.zones.len(), 1);
            assert_eq!(report.outputs()["z"], 44.0);
            last_seen = report.tick;
        }
        assert!(h.service.last_sensor_fetch_time_sec() >= T0);
    }
    assert_eq!(runner.wait(), 200);
}

#[test]
fn service_built_from_sim_platform_drives_its_recorder() {
    let platform = SimPlatform::new(ProductInfo::named("sim"));
    let recorder = platform.recorder();
    let bus = InMemoryBus::new();
    let service = FanService::from_platform(
        config(10, vec![curve_zone("z", &["t1"], &["f1"])]),
        Arc::new(bus.clone()),
        &platform,
        Arc::new(ManualClock::new(T0)),
    )
    .unwrap();

    assert!(platform.leds_initialized());
    assert_eq!(platform.name(), "sim");
    service.kickstart().unwrap();
    assert!(wait_until(Duration::from_secs(5), || bus.subscriber_count() == 1));
    assert_eq!(recorder.applied("f1"), Some(100.0));
}

#[test]
fn invalid_config_is_rejected_up_front() {
    let mut bad = config(10, vec![curve_zone("z", &["t1"], &["f1"])]);
    bad.fetch_frequency_s = 0;
    let err = FanService::new(
        bad,
        Arc::new(InMemoryBus::new()),
        Box::new(fc_controls::RecordingActuator::new()),
        Arc::new(ManualClock::new(T0)),
    )
    .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
}
