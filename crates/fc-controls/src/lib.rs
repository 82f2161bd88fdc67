//! Control algorithms and fan actuation for the fan control service.
//!
//! # Architecture
//!
//! - [`ControlAlgorithm`] maps an aggregated zone temperature to an output.
//!   Two strategies ship: [`CurveController`] (breakpoint lookup) and
//!   [`PidController`].
//! - [`ZoneController`] evaluates every configured [`Zone`] once per tick,
//!   applying the fail-safe and zero-order hold ([`SampleHold`]).
//! - [`ActuatorDriver`] writes zone outputs through a [`FanActuator`] with
//!   retry and alerting.
//!
//! Everything here is synchronous and free of I/O except the actuator
//! implementation supplied by the caller.

pub mod actuator;
pub mod algorithm;
pub mod controller;
pub mod curve;
pub mod error;
pub mod sampled;
pub mod zone;

pub use actuator::{
    ActuatorDriver, ActuatorPolicy, ApplyReport, FanActuator, RecordedWrite, RecordingActuator,
};
pub use algorithm::{AlgorithmKind, ControlAlgorithm, ControlState};
pub use controller::PidController;
pub use curve::{Breakpoint, CurveController, validate_breakpoints};
pub use error::{ActuatorError, ControlError, ControlResult};
pub use sampled::{SampleClock, SampleHold, SampleStamp};
pub use zone::{
    Aggregation, DecisionReason, FreshReading, Zone, ZoneController, ZoneControllerOptions,
    ZoneDecision, ZoneInput, ZoneRuntime,
};
