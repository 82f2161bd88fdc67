//! Telemetry bus abstraction.

use std::time::Duration;

use crate::error::BusResult;
use crate::reading::SensorReading;

/// A publish/subscribe distribution layer carrying sensor readings.
pub trait TelemetryBus: Send + Sync {
    /// Short transport name for logs.
    fn name(&self) -> &str;

    /// Open a subscription to `namespace`.
    ///
    /// Fails with [`crate::BusError::Unavailable`] while the bus is down.
    fn subscribe(&self, namespace: &str) -> BusResult<Box<dyn Subscription>>;
}

/// A live subscription delivering batches of readings.
pub trait Subscription: Send {
    /// Wait up to `timeout` for the next batch.
    ///
    /// `Ok(None)` means nothing arrived in time; an error other than
    /// [`crate::BusError::Decode`] means the subscription is gone.
    fn next_batch(&mut self, timeout: Duration) -> BusResult<Option<Vec<SensorReading>>>;
}
