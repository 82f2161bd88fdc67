//! Service configuration schema.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use fc_core::WriteMode;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceConfig {
    pub version: u32,
    pub name: String,
    /// Platform override. When absent the platform is detected from product info.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    /// Tick cadence and staleness threshold, in seconds.
    #[serde(default = "default_fetch_frequency_s")]
    pub fetch_frequency_s: u64,
    #[serde(default = "default_initial_sync_timeout_ms")]
    pub initial_sync_timeout_ms: u64,
    #[serde(default)]
    pub write_mode: WriteMode,
    #[serde(default)]
    pub bus: BusDef,
    #[serde(default)]
    pub actuator: ActuatorDef,
    #[serde(default)]
    pub simulation: SimulationDef,
    #[serde(default)]
    pub zones: Vec<ZoneDef>,
}

impl ServiceConfig {
    pub fn fetch_frequency(&self) -> Duration {
        Duration::from_secs(self.fetch_frequency_s)
    }

    pub fn initial_sync_timeout(&self) -> Duration {
        Duration::from_millis(self.initial_sync_timeout_ms)
    }

    pub fn zone(&self, id: &str) -> Option<&ZoneDef> {
        self.zones.iter().find(|z| z.id == id)
    }

    /// Every sensor referenced by any zone.
    pub fn sensor_names(&self) -> BTreeSet<&str> {
        self.zones
            .iter()
            .flat_map(|z| z.sensors.iter().map(String::as_str))
            .collect()
    }
}

fn default_fetch_frequency_s() -> u64 {
    15
}

fn default_initial_sync_timeout_ms() -> u64 {
    5_000
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BusDef {
    #[serde(default)]
    pub transport: TransportDef,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default = "default_poll_timeout_ms")]
    pub poll_timeout_ms: u64,
    #[serde(default)]
    pub backoff: BackoffDef,
}

impl Default for BusDef {
    fn default() -> Self {
        Self {
            transport: TransportDef::default(),
            namespace: default_namespace(),
            poll_timeout_ms: default_poll_timeout_ms(),
            backoff: BackoffDef::default(),
        }
    }
}

fn default_namespace() -> String {
    "sensors".to_string()
}

fn default_poll_timeout_ms() -> u64 {
    250
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransportDef {
    /// In-process broker, fed by the simulated sensors.
    #[default]
    Memory,
    /// Newline-delimited JSON over TCP.
    Tcp {
        address: String,
        #[serde(default = "default_connect_timeout_ms")]
        connect_timeout_ms: u64,
    },
}

fn default_connect_timeout_ms() -> u64 {
    2_000
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackoffDef {
    #[serde(default = "default_backoff_initial_ms")]
    pub initial_ms: u64,
    #[serde(default = "default_backoff_max_ms")]
    pub max_ms: u64,
    #[serde(default = "default_backoff_multiplier")]
    pub multiplier: f64,
}

impl Default for BackoffDef {
    fn default() -> Self {
        Self {
            initial_ms: default_backoff_initial_ms(),
            max_ms: default_backoff_max_ms(),
            multiplier: default_backoff_multiplier(),
        }
    }
}

fn default_backoff_initial_ms() -> u64 {
    500
}

fn default_backoff_max_ms() -> u64 {
    30_000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActuatorDef {
    #[serde(default = "default_write_retries")]
    pub write_retries: u32,
    #[serde(default = "default_alert_after_failed_ticks")]
    pub alert_after_failed_ticks: u32,
    /// Directory holding one PWM file per fan. Absent means fans are recorded in memory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pwm_root: Option<PathBuf>,
    #[serde(default = "default_pwm_max")]
    pub pwm_max: u32,
}

impl Default for ActuatorDef {
    fn default() -> Self {
        Self {
            write_retries: default_write_retries(),
            alert_after_failed_ticks: default_alert_after_failed_ticks(),
            pwm_root: None,
            pwm_max: default_pwm_max(),
        }
    }
}

fn default_write_retries() -> u32 {
    2
}

fn default_alert_after_failed_ticks() -> u32 {
    3
}

fn default_pwm_max() -> u32 {
    255
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationDef {
    #[serde(default = "default_sim_interval_ms")]
    pub interval_ms: u64,
    #[serde(default)]
    pub sensors: Vec<SimSensorDef>,
}

impl Default for SimulationDef {
    fn default() -> Self {
        Self {
            interval_ms: default_sim_interval_ms(),
            sensors: Vec::new(),
        }
    }
}

fn default_sim_interval_ms() -> u64 {
    1_000
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimSensorDef {
    pub name: String,
    pub base: f64,
    #[serde(default)]
    pub amplitude: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ZoneDef {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub sensors: Vec<String>,
    pub fans: Vec<String>,
    #[serde(default = "default_min_output")]
    pub min_output: f64,
    #[serde(default = "default_max_output")]
    pub max_output: f64,
    #[serde(default)]
    pub aggregation: AggregationDef,
    pub control: ControlDef,
}

fn default_min_output() -> f64 {
    0.0
}

fn default_max_output() -> f64 {
    100.0
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AggregationDef {
    #[default]
    Max,
    Mean,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlDef {
    Curve {
        breakpoints: Vec<BreakpointDef>,
    },
    Pid {
        kp: f64,
        #[serde(default)]
        ki: f64,
        #[serde(default)]
        kd: f64,
        setpoint: f64,
        #[serde(default)]
        td_filter: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        integral_limit: Option<f64>,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BreakpointDef {
    pub temperature: f64,
    pub output: f64,
}
