//! Two sensors, a 10 s fetch frequency, and a clock walking past the threshold.

mod common;

use common::{Harness, T0};
use fc_controls::DecisionReason;

#[test]
fn zone_goes_to_max_once_sensors_exceed_threshold() {
    let h = Harness::standard();
    h.start();
    h.publish(&[("t1", 40.0), ("t2", 45.0)], T0);

    let at_t0 = h.service.control_fan();
    let z = &at_t0.zone("z").unwrap().decision;
    assert_eq!(z.reason, DecisionReason::Computed);
    assert_eq!(z.input, Some(45.0));
    assert_eq!(z.output, 44.0);

    // Exactly at the threshold still counts as fresh.
    h.clock.set(T0 + 10);
    let at_t10 = h.service.control_fan();
    let z = &at_t10.zone("z").unwrap().decision;
    assert_eq!(z.reason, DecisionReason::Held);
    assert_eq!(z.output, 44.0);
    assert_eq!(z.stale_sensors, Vec::<String>::new());

    h.clock.set(T0 + 40);
    let at_t40 = h.service.control_fan();
    let z = &at_t40.zone("z").unwrap().decision;
    assert_eq!(z.reason, DecisionReason::FailSafe);
    assert_eq!(z.output, 100.0);
    assert_eq!(z.stale_sensors, vec!["t1", "t2"]);
    assert_eq!(h.fans.applied("f1"), Some(100.0));
    assert_eq!(h.fans.applied("f2"), Some(100.0));
    assert_eq!(h.service.last_sensor_fetch_time_sec(), T0 + 40);
}

#[test]
fn outage_after_second_delivery_pins_timestamps_and_fails_safe() {
    let h = Harness::standard();
    h.start();
    h.publish(&[("t1", 40.0), ("t2", 45.0)], T0);
    assert_eq!(h.service.control_fan().outputs()["z"], 44.0);

    h.clock.set(T0 + 10);
    h.publish(&[("t1", 40.0), ("t2", 45.0)], T0 + 10);
    let at_t10 = h.service.control_fan();
    assert_eq!(at_t10.zone("z").unwrap().decision.reason, DecisionReason::Computed);
    assert_eq!(at_t10.outputs()["z"], 44.0);
    assert_eq!(h.service.get_last_updated("t1"), T0 + 10);
    assert_eq!(h.service.get_last_updated("t2"), T0 + 10);

    h.halt_bus();
    h.clock.set(T0 + 40);
    let at_t40 = h.service.control_fan();

    assert_eq!(h.service.get_last_updated("t1"), T0 + 10);
    assert_eq!(h.service.get_last_updated("t2"), T0 + 10);
    let z = &at_t40.zone("z").unwrap().decision;
    assert_eq!(z.reason, DecisionReason::FailSafe);
    assert_eq!(z.output, 100.0);
    assert_eq!(z.stale_sensors, vec!["t1", "t2"]);
    assert_eq!(h.fans.applied("f1"), Some(100.0));
    assert_eq!(h.fans.applied("f2"), Some(100.0));
    assert_eq!(h.service.last_sensor_fetch_time_sec(), T0 + 40);
}

#[test]
fn one_fresh_sensor_keeps_the_zone_computing() {
    let h = Harness::standard();
    h.start();
    h.publish(&[("t1", 40.0), ("t2", 45.0)], T0);
    h.clock.set(T0 + 25);
    h.publish(&[("t1", 55.0)], T0 + 25);

    let report = h.service.control_fan();
    let z = &report.zone("z").unwrap().decision;
    assert_eq!(z.reason, DecisionReason::Computed);
    assert_eq!(z.fresh_sensors, vec!["t1"]);
    assert_eq!(z.stale_sensors, vec!["t2"]);
    assert_eq!(z.output, 60.0);
}

#[test]
fn kickstart_without_telemetry_runs_fail_safe() {
    let h = Harness::standard();
    let report = h.service.kickstart().unwrap();
    assert_eq!(report.tick, 1);
    assert_eq!(report.fail_safe_zones(), vec!["z"]);
    assert_eq!(h.fans.applied("f1"), Some(100.0));
}
