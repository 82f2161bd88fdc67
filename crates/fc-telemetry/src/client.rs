//! Telemetry bus client.
//!
//! Owns a background thread that keeps one subscription alive and merges
//! every delivered batch into the [`TelemetryCache`]. Losing the bus is
//! never reported to callers: the thread logs, backs off, and resubscribes.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use fc_core::StopSignal;
use tracing::{debug, error, info, warn};

use crate::backoff::{Backoff, BackoffConfig};
use crate::bus::TelemetryBus;
use crate::cache::TelemetryCache;
use crate::error::{BusError, BusResult};

/// Bus client configuration.
#[derive(Debug, Clone)]
pub struct BusClientOptions {
    /// Sensor namespace to subscribe to.
    pub namespace: String,
    /// Upper bound on one blocking read from the subscription.
    pub poll_timeout: Duration,
    pub backoff: BackoffConfig,
}

impl Default for BusClientOptions {
    fn default() -> Self {
        Self {
            namespace: "sensors".to_string(),
            poll_timeout: Duration::from_millis(250),
            backoff: BackoffConfig::default(),
        }
    }
}

/// Point-in-time view of the client's health.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BusClientStatus {
    pub connected: bool,
    pub batches_delivered: u64,
    pub readings_delivered: u64,
    pub reconnect_attempts: u64,
    pub disconnects: u64,
}

#[derive(Debug, Default)]
struct Counters {
    connected: AtomicBool,
    batches: AtomicU64,
    readings: AtomicU64,
    reconnect_attempts: AtomicU64,
    disconnects: AtomicU64,
}

/// Handle to the running subscription thread. Dropping it shuts it down.
pub struct BusClient {
    stop: Arc<StopSignal>,
    counters: Arc<Counters>,
    handle: Option<JoinHandle<()>>,
}

impl BusClient {
    /// Start delivering `options.namespace` from `bus` into `cache`.
    ///
    /// Returns as soon as the thread is running; the first subscription
    /// attempt happens on that thread.
    pub fn connect(
        bus: Arc<dyn TelemetryBus>,
        cache: Arc<TelemetryCache>,
        options: BusClientOptions,
    ) -> BusResult<Self> {
        let stop = Arc::new(StopSignal::new());
        let counters = Arc::new(Counters::default());

        let worker = Worker {
            bus,
            cache,
            options,
            stop: Arc::clone(&stop),
            counters: Arc::clone(&counters),
        };
        let handle = thread::Builder::new()
            .name("fc-bus-client".to_string())
            .spawn(move || worker.run())?;

        Ok(Self {
            stop,
            counters,
            handle: Some(handle),
        })
    }

    pub fn status(&self) -> BusClientStatus {
        BusClientStatus {
            connected: self.counters.connected.load(Ordering::SeqCst),
            batches_delivered: self.counters.batches.load(Ordering::SeqCst),
            readings_delivered: self.counters.readings.load(Ordering::SeqCst),
            reconnect_attempts: self.counters.reconnect_attempts.load(Ordering::SeqCst),
            disconnects: self.counters.disconnects.load(Ordering::SeqCst),
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some() && !self.stop.is_stopped()
    }

    /// Tear down the subscription and wait for the thread to exit.
    ///
    /// No batch is merged once this has been called, even one already
    /// received and queued on the thread.
    pub fn shutdown(&mut self) {
        self.stop.stop();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("bus client thread panicked");
            }
        }
    }
}

impl Drop for BusClient {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct Worker {
    bus: Arc<dyn TelemetryBus>,
    cache: Arc<TelemetryCache>,
    options: BusClientOptions,
    stop: Arc<StopSignal>,
    counters: Arc<Counters>,
}

impl Worker {
    fn run(self) {
        let mut backoff = Backoff::new(self.options.backoff);
        let namespace = self.options.namespace.as_str();

        while !self.stop.is_stopped() {
            let mut subscription = match self.bus.subscribe(namespace) {
                Ok(subscription) => subscription,
                Err(err) => {
                    self.counters.reconnect_attempts.fetch_add(1, Ordering::SeqCst);
                    let delay = backoff.next_delay();
                    warn!(
                        bus = self.bus.name(),
                        namespace,
                        error = %err,
                        delay_ms = delay.as_millis() as u64,
                        "telemetry bus unavailable, retrying"
                    );
                    if self.stop.sleep(delay) {
                        break;
                    }
                    continue;
                }
            };

            info!(bus = self.bus.name(), namespace, "subscribed to telemetry bus");
            backoff.reset();
            self.counters.connected.store(true, Ordering::SeqCst);

            loop {
                if self.stop.is_stopped() {
                    break;
                }
                match subscription.next_batch(self.options.poll_timeout) {
                    Ok(Some(batch)) => {
                        let merged = self.stop.run_unless_stopped(|| self.cache.merge(&batch));
                        let Some(summary) = merged else { break };
                        self.counters.batches.fetch_add(1, Ordering::SeqCst);
                        self.counters
                            .readings
                            .fetch_add(summary.accepted() as u64, Ordering::SeqCst);
                    }
                    Ok(None) => {}
                    Err(err @ BusError::Decode { .. }) => {
                        warn!(error = %err, "dropping undecodable telemetry batch");
                    }
                    Err(err) => {
                        self.counters.connected.store(false, Ordering::SeqCst);
                        self.counters.disconnects.fetch_add(1, Ordering::SeqCst);
                        warn!(bus = self.bus.name(), error = %err, "telemetry subscription lost");
                        break;
                    }
                }
            }
        }

        self.counters.connected.store(false, Ordering::SeqCst);
        debug!(namespace, "bus client thread exiting");
    }
}
