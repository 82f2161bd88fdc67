//! In-process telemetry broker.
//!
//! Used for simulation and tests. It keeps a source-of-truth view of
//! everything published, independent of delivery, and can be taken offline
//! to model a bus outage.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use tracing::info;

use crate::bus::{Subscription, TelemetryBus};
use crate::error::{BusError, BusResult};
use crate::reading::{SensorData, SensorReading};

#[derive(Debug)]
struct BrokerState {
    available: bool,
    subscribers: Vec<(String, Sender<Vec<SensorReading>>)>,
    published: BTreeMap<String, SensorData>,
}

/// Cloneable handle to a shared in-memory broker.
#[derive(Debug, Clone)]
pub struct InMemoryBus {
    state: Arc<Mutex<BrokerState>>,
}

impl Default for InMemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBus {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(BrokerState {
                available: true,
                subscribers: Vec::new(),
                published: BTreeMap::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BrokerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publish a batch. Returns the number of subscribers it reached.
    ///
    /// The source-of-truth view is updated even while the bus is down.
    pub fn publish(&self, namespace: &str, batch: Vec<SensorReading>) -> usize {
        let mut state = self.lock();
        let truth = state.published.entry(namespace.to_string()).or_default();
        for reading in &batch {
            truth.upsert(reading);
        }
        if !state.available {
            return 0;
        }
        let mut delivered = 0;
        state.subscribers.retain(|(ns, tx)| {
            if ns != namespace {
                return true;
            }
            let ok = tx.send(batch.clone()).is_ok();
            delivered += usize::from(ok);
            ok
        });
        delivered
    }

    /// Bring the bus up or down. Going down ends every live subscription.
    pub fn set_available(&self, available: bool) {
        let mut state = self.lock();
        if state.available != available {
            info!(available, "in-memory telemetry bus availability changed");
        }
        state.available = available;
        if !available {
            state.subscribers.clear();
        }
    }

    pub fn is_available(&self) -> bool {
        self.lock().available
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    /// Everything ever published to `namespace`, as the acquisition service
    /// itself would report it.
    pub fn published_sensors(&self, namespace: &str) -> SensorData {
        self.lock()
            .published
            .get(namespace)
            .cloned()
            .unwrap_or_default()
    }
}

impl TelemetryBus for InMemoryBus {
    fn name(&self) -> &str {
        "memory"
    }

    fn subscribe(&self, namespace: &str) -> BusResult<Box<dyn Subscription>> {
        let mut state = self.lock();
        if !state.available {
            return Err(BusError::Unavailable {
                what: "in-memory bus is offline".to_string(),
            });
        }
        let (tx, rx) = unbounded();
        state.subscribers.push((namespace.to_string(), tx));
        Ok(Box::new(MemorySubscription { rx }))
    }
}

struct MemorySubscription {
    rx: Receiver<Vec<SensorReading>>,
}

impl Subscription for MemorySubscription {
    fn next_batch(&mut self, timeout: Duration) -> BusResult<Option<Vec<SensorReading>>> {
        match self.rx.recv_timeout(timeout) {
            Ok(batch) => Ok(Some(batch)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(BusError::Disconnected {
                what: "in-memory bus dropped the subscription".to_string(),
            }),
        }
    }
}
