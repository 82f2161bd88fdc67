//! Exponential reconnect backoff.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Backoff parameters for bus reconnection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// Delay before the first retry (milliseconds).
    pub initial_ms: u64,
    /// Upper bound on any single delay (milliseconds).
    pub max_ms: u64,
    /// Growth factor applied after every failed attempt.
    pub multiplier: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_ms: 500,
            max_ms: 30_000,
            multiplier: 2.0,
        }
    }
}

/// Stateful delay generator: `initial * multiplier^n`, capped at `max`.
#[derive(Debug, Clone)]
pub struct Backoff {
    config: BackoffConfig,
    attempts: u32,
}

impl Backoff {
    pub fn new(config: BackoffConfig) -> Self {
        Self {
            config,
            attempts: 0,
        }
    }

    /// Delay to wait before the next attempt; advances the sequence.
    pub fn next_delay(&mut self) -> Duration {
        let factor = self.config.multiplier.max(1.0).powi(self.attempts as i32);
        let raw_ms = self.config.initial_ms as f64 * factor;
        let capped_ms = raw_ms.min(self.config.max_ms as f64);
        self.attempts = self.attempts.saturating_add(1);
        Duration::from_millis(capped_ms as u64)
    }

    /// Forget previous failures after a successful connection.
    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}
