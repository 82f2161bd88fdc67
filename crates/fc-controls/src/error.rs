//! Error types for control and actuation.

use thiserror::Error;

/// Result type for control system operations.
pub type ControlResult<T> = Result<T, ControlError>;

/// Errors raised while building controllers and zones.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ControlError {
    /// Invalid argument provided to a control function.
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    /// Breakpoint table is not usable.
    #[error("Invalid curve: {what}")]
    InvalidCurve { what: String },

    /// Zone definition is inconsistent.
    #[error("Invalid zone '{zone}': {what}")]
    InvalidZone { zone: String, what: String },
}

/// Errors raised by a single fan write.
#[derive(Debug, Error)]
pub enum ActuatorError {
    /// The fan controller did not answer.
    #[error("Fan '{fan}' unreachable: {what}")]
    Unreachable { fan: String, what: String },

    /// The device rejected the value.
    #[error("Fan '{fan}' rejected write: {what}")]
    Rejected { fan: String, what: String },

    #[error("I/O error writing fan '{fan}': {source}")]
    Io {
        fan: String,
        #[source]
        source: std::io::Error,
    },
}
