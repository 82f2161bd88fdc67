mod common;

use common::{Harness, T0};
use fc_controls::DecisionReason;

#[test]
fn outage_freezes_timestamps_and_recovery_refreshes_them() {
    let h = Harness::standard();
    h.start();
    h.publish(&[("t1", 40.0), ("t2", 45.0)], T0);
    assert_eq!(h.service.control_fan().outputs()["z"], 44.0);
    let before_outage = h.service.last_sensor_fetch_time_sec();

    h.halt_bus();
    h.clock.advance(30);
    assert_eq!(h.bus.publish(common::NAMESPACE, vec![]), 0);
    let report = h.service.control_fan();

    assert_eq!(h.service.get_last_updated("t1"), T0);
    assert_eq!(h.service.get_last_updated("t2"), T0);
    assert_eq!(report.fail_safe_zones(), vec!["z"]);
    assert_eq!(h.fans.applied("f1"), Some(100.0));
    assert!(!h.service.bus_status().connected);
    let during_outage = h.service.last_sensor_fetch_time_sec();

    h.resume_bus();
    h.clock.advance(5);
    h.publish(&[("t1", 41.0), ("t2", 46.0)], T0 + 35);
    let report = h.service.control_fan();

    assert_eq!(h.service.get_last_updated("t1"), T0 + 35);
    assert_eq!(h.service.get_last_updated("t2"), T0 + 35);
    let after = h.service.last_sensor_fetch_time_sec();
    assert!(after > before_outage.max(during_outage));
    assert!(report.fail_safe_zones().is_empty());
    assert_eq!(report.zone("z").unwrap().decision.reason, DecisionReason::Computed);
    assert!(h.service.bus_status().disconnects >= 1);
}

#[test]
fn readings_published_while_down_are_not_replayed() {
    let h = Harness::standard();
    h.start();
    h.halt_bus();
    h.bus
        .publish(common::NAMESPACE, vec![fc_telemetry::SensorReading::new("t1", 40.0, T0)]);
    h.resume_bus();

    assert!(!h.service.check_if_entry_exists("t1"));
    assert!(h.bus.published_sensors(common::NAMESPACE).check_if_entry_exists("t1"));
}

#[test]
fn kickstart_is_idempotent_while_subscribed() {
    let h = Harness::standard();
    h.start();
    h.service.kickstart().unwrap();
    h.service.kickstart().unwrap();
    assert_eq!(h.bus.subscriber_count(), 1);
    assert_eq!(h.service.last_tick().unwrap().tick, 3);
}
