//! Fan control service layer.
//!
//! Ties the telemetry cache and bus client, the zone controller and the
//! actuator driver into [`FanService`], and runs it on a fixed cadence with
//! [`ServiceRunner`].

pub mod compile;
pub mod error;
pub mod report;
pub mod runner;
pub mod service;

pub use compile::{BuiltBus, build_bus, build_zones, simulated_sensors};
pub use error::{ServiceError, ServiceResult};
pub use report::{TickReport, ZoneReport};
pub use runner::{RunnerOptions, ServiceRunner};
pub use service::{FanService, partition_zone_inputs};
