//! Sensor telemetry ingestion for the fan control service.
//!
//! Readings are produced by an independent acquisition service and carried
//! over a publish/subscribe telemetry bus. This crate provides:
//!
//! - **Data model**: [`SensorReading`] and the [`SensorData`] snapshot map
//! - **Cache**: [`TelemetryCache`], the single shared store between the bus
//!   thread (writer) and the control loop (reader)
//! - **Bus abstraction**: [`TelemetryBus`] / [`Subscription`] with an
//!   in-process broker ([`InMemoryBus`]) and a line-delimited JSON TCP
//!   transport ([`TcpBus`])
//! - **Bus client**: [`BusClient`], which keeps a subscription alive with
//!   exponential backoff and merges every delivered batch into the cache
//! - **Simulation**: [`SimulatedSource`], a synthetic acquisition service
//!
//! Bus failures never propagate to the control loop. Absence of delivery
//! only ages the entries already in the cache.

pub mod backoff;
pub mod bus;
pub mod cache;
pub mod client;
pub mod error;
pub mod memory;
pub mod reading;
pub mod sim;
pub mod tcp;

pub use backoff::{Backoff, BackoffConfig};
pub use bus::{Subscription, TelemetryBus};
pub use cache::{MergeSummary, TelemetryCache};
pub use client::{BusClient, BusClientOptions, BusClientStatus};
pub use error::{BusError, BusResult};
pub use memory::InMemoryBus;
pub use reading::{NEVER_OBSERVED, SensorData, SensorReading};
pub use sim::{SimulatedSensor, SimulatedSource};
pub use tcp::TcpBus;
