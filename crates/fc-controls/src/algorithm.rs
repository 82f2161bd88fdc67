//! Pluggable control strategy interface.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Per-zone algorithm memory, carried across ticks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlState {
    /// Integral accumulator (error × seconds).
    pub integral: f64,
    /// Low-pass filtered error used for the derivative term.
    pub filtered_error: f64,
    /// Set once the first sample has been processed.
    pub primed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlgorithmKind {
    Curve,
    Pid,
}

impl fmt::Display for AlgorithmKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Curve => f.write_str("curve"),
            Self::Pid => f.write_str("pid"),
        }
    }
}

/// Maps a zone temperature to a fan output.
///
/// Implementations are pure: the same `state`, `input` and `dt` always
/// produce the same result. The returned output is already clamped to
/// [`ControlAlgorithm::output_bounds`].
pub trait ControlAlgorithm: Send + Sync + fmt::Debug {
    fn kind(&self) -> AlgorithmKind;

    /// `(min, max)` output range.
    fn output_bounds(&self) -> (f64, f64);

    /// Compute the next state and output.
    ///
    /// * `input` - aggregated zone temperature
    /// * `dt` - seconds since the previous evaluated sample
    fn compute(&self, state: &ControlState, input: f64, dt: f64) -> (ControlState, f64);
}
