//! Error types for the fc-service layer.

/// Service error type wrapping failures from the backend crates.
///
/// Only construction, kickstart and reconfiguration return these. A tick
/// never fails.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Config validation failed: {0}")]
    Validation(String),

    #[error("Control setup failed: {0}")]
    Control(String),

    #[error("Platform error: {0}")]
    Platform(String),

    #[error("Bus error: {0}")]
    Bus(String),

    #[error("Unsupported reconfiguration: {message}")]
    Unsupported { message: String },

    #[error("Service is shut down")]
    ShutDown,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for fc-service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

// Conversions from backend error types
impl From<fc_config::ConfigError> for ServiceError {
    fn from(err: fc_config::ConfigError) -> Self {
        ServiceError::Config(err.to_string())
    }
}

impl From<fc_config::ValidationError> for ServiceError {
    fn from(err: fc_config::ValidationError) -> Self {
        ServiceError::Validation(err.to_string())
    }
}

impl From<fc_controls::ControlError> for ServiceError {
    fn from(err: fc_controls::ControlError) -> Self {
        ServiceError::Control(err.to_string())
    }
}

impl From<fc_platform::PlatformError> for ServiceError {
    fn from(err: fc_platform::PlatformError) -> Self {
        ServiceError::Platform(err.to_string())
    }
}

impl From<fc_telemetry::BusError> for ServiceError {
    fn from(err: fc_telemetry::BusError) -> Self {
        ServiceError::Bus(err.to_string())
    }
}
