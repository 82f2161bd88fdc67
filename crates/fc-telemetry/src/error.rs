//! Error types for telemetry bus operations.

use thiserror::Error;

/// Result type for telemetry bus operations.
pub type BusResult<T> = Result<T, BusError>;

/// Errors raised by bus transports and the bus client.
#[derive(Debug, Error)]
pub enum BusError {
    /// The bus cannot be reached right now. Retried with backoff.
    #[error("Telemetry bus unavailable: {what}")]
    Unavailable { what: String },

    /// An established subscription ended.
    #[error("Subscription disconnected: {what}")]
    Disconnected { what: String },

    /// A delivered batch could not be decoded. The subscription stays up.
    #[error("Malformed telemetry batch: {what}")]
    Decode { what: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BusError {
    /// Whether the subscription should be torn down and re-established.
    pub fn requires_reconnect(&self) -> bool {
        !matches!(self, Self::Decode { .. })
    }
}
