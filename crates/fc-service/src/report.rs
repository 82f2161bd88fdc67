//! Per-tick results published by the service.

use std::collections::BTreeMap;

use fc_controls::{ApplyReport, ZoneDecision};
use fc_core::WriteMode;
use serde::Serialize;

/// Decision and actuation outcome for one zone.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZoneReport {
    pub decision: ZoneDecision,
    pub actuation: ApplyReport,
}

/// Everything one tick did. Published whole, never partially.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickReport {
    /// 1-based tick counter.
    pub tick: u64,
    pub started_at: u64,
    pub completed_at: u64,
    pub write_mode: WriteMode,
    /// Sensors present in the cache when the tick read it.
    pub sensors_seen: usize,
    pub zones: Vec<ZoneReport>,
    pub duration_s: f64,
}

impl TickReport {
    pub fn zone(&self, id: &str) -> Option<&ZoneReport> {
        self.zones.iter().find(|z| z.decision.zone == id)
    }

    /// Commanded output per zone.
    pub fn outputs(&self) -> BTreeMap<String, f64> {
        self.zones
            .iter()
            .map(|z| (z.decision.zone.clone(), z.decision.output))
            .collect()
    }

    pub fn fail_safe_zones(&self) -> Vec<&str> {
        self.zones
            .iter()
            .filter(|z| z.decision.is_fail_safe())
            .map(|z| z.decision.zone.as_str())
            .collect()
    }

    /// Zones whose fans have been unreachable long enough to alert.
    pub fn alerting_zones(&self) -> Vec<&str> {
        self.zones
            .iter()
            .filter(|z| z.actuation.alerting)
            .map(|z| z.decision.zone.as_str())
            .collect()
    }
}
