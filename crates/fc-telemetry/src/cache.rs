//! Thread-safe telemetry cache.
//!
//! The bus client merges batches in; the control loop and diagnostics read
//! snapshots out. A merge is applied under one lock, so a reader sees
//! either none or all of a batch.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::reading::{SensorData, SensorReading, Upsert};

/// Counts produced by a single [`TelemetryCache::merge`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub inserted: usize,
    pub updated: usize,
    pub rejected: usize,
}

impl MergeSummary {
    pub fn accepted(&self) -> usize {
        self.inserted + self.updated
    }
}

#[derive(Debug, Default)]
struct CacheInner {
    data: SensorData,
    /// Bumped on every merge that accepted at least one reading.
    generation: u64,
    rejected_total: u64,
}

/// Per-sensor store of the latest value and last-updated timestamp.
#[derive(Debug, Default)]
pub struct TelemetryCache {
    inner: Mutex<CacheInner>,
    updated: Condvar,
}

impl TelemetryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fold a delivered batch into the cache.
    ///
    /// A reading older than the stored one is rejected so that timestamps
    /// never move backwards.
    pub fn merge(&self, batch: &[SensorReading]) -> MergeSummary {
        let mut summary = MergeSummary::default();
        let mut inner = self.lock();
        for reading in batch {
            match inner.data.upsert(reading) {
                Upsert::Inserted => summary.inserted += 1,
                Upsert::Updated => summary.updated += 1,
                Upsert::Rejected { stored } => {
                    summary.rejected += 1;
                    warn!(
                        sensor = %reading.name,
                        incoming = reading.timestamp,
                        stored,
                        "rejected out-of-order sensor reading"
                    );
                }
            }
        }
        inner.rejected_total += summary.rejected as u64;
        if summary.accepted() > 0 {
            inner.generation += 1;
            self.updated.notify_all();
        }
        drop(inner);

        debug!(
            inserted = summary.inserted,
            updated = summary.updated,
            rejected = summary.rejected,
            "merged telemetry batch"
        );
        summary
    }

    pub fn get(&self, name: &str) -> Option<SensorReading> {
        self.lock().data.get(name).cloned()
    }

    pub fn exists(&self, name: &str) -> bool {
        self.lock().data.check_if_entry_exists(name)
    }

    /// Last-updated timestamp, or [`crate::NEVER_OBSERVED`].
    pub fn last_updated(&self, name: &str) -> u64 {
        self.lock().data.get_last_updated(name)
    }

    pub fn size(&self) -> usize {
        self.lock().data.size()
    }

    pub fn is_stale(&self, name: &str, now: u64, threshold_s: u64) -> bool {
        self.lock().data.is_stale(name, now, threshold_s)
    }

    /// Consistent copy of every entry.
    pub fn snapshot(&self) -> SensorData {
        self.lock().data.clone()
    }

    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// Total number of out-of-order readings rejected so far.
    pub fn rejected_count(&self) -> u64 {
        self.lock().rejected_total
    }

    /// Block until the generation moves past `seen` or `timeout` elapses.
    ///
    /// Returns `true` if an update landed.
    pub fn wait_for_update(&self, seen: u64, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut inner = self.lock();
        while inner.generation <= seen {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            let (guard, _) = self
                .updated
                .wait_timeout(inner, remaining)
                .unwrap_or_else(PoisonError::into_inner);
            inner = guard;
        }
        true
    }

    /// Drop every sensor for which `keep` returns `false`.
    ///
    /// Only used on explicit reconfiguration. Returns the number evicted.
    pub fn evict_except(&self, keep: impl FnMut(&str) -> bool) -> usize {
        let evicted = self.lock().data.retain(keep);
        if evicted > 0 {
            debug!(evicted, "evicted sensors on reconfiguration");
        }
        evicted
    }
}
