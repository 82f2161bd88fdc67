//! Lookup-table fan curves.
//!
//! Outputs are linearly interpolated between breakpoints and clamped to the
//! first/last output outside the table.

use crate::algorithm::{AlgorithmKind, ControlAlgorithm, ControlState};
use crate::error::{ControlError, ControlResult};
use serde::{Deserialize, Serialize};

/// One `(temperature, output)` point of a fan curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Breakpoint {
    pub temperature: f64,
    pub output: f64,
}

impl Breakpoint {
    pub fn new(temperature: f64, output: f64) -> Self {
        Self {
            temperature,
            output,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveController {
    breakpoints: Vec<Breakpoint>,
    out_min: f64,
    out_max: f64,
}

impl CurveController {
    /// Build a curve from breakpoints.
    ///
    /// Temperatures must be strictly increasing and outputs non-decreasing,
    /// so a hotter zone never gets less cooling.
    pub fn new(breakpoints: Vec<Breakpoint>, out_min: f64, out_max: f64) -> ControlResult<Self> {
        if !(out_min.is_finite() && out_max.is_finite()) || out_min >= out_max {
            return Err(ControlError::InvalidArg {
                what: "out_min must be less than out_max",
            });
        }
        validate_breakpoints(&breakpoints)?;
        Ok(Self {
            breakpoints,
            out_min,
            out_max,
        })
    }

    pub fn breakpoints(&self) -> &[Breakpoint] {
        &self.breakpoints
    }

    /// Output for `temperature`, clamped to the zone bounds.
    pub fn interpolate(&self, temperature: f64) -> f64 {
        if !temperature.is_finite() {
            return self.out_max;
        }
        let first = self.breakpoints[0];
        let last = self.breakpoints[self.breakpoints.len() - 1];

        let raw = if temperature <= first.temperature {
            first.output
        } else if temperature >= last.temperature {
            last.output
        } else {
            self.breakpoints
                .windows(2)
                .find(|w| temperature <= w[1].temperature)
                .map(|w| {
                    let (lo, hi) = (w[0], w[1]);
                    let frac = (temperature - lo.temperature) / (hi.temperature - lo.temperature);
                    lo.output + frac * (hi.output - lo.output)
                })
                .unwrap_or(last.output)
        };
        raw.clamp(self.out_min, self.out_max)
    }
}

/// Check a breakpoint table without building a controller.
pub fn validate_breakpoints(breakpoints: &[Breakpoint]) -> ControlResult<()> {
    if breakpoints.is_empty() {
        return Err(ControlError::InvalidCurve {
            what: "at least one breakpoint is required".to_string(),
        });
    }
    for (i, bp) in breakpoints.iter().enumerate() {
        if !bp.temperature.is_finite() || !bp.output.is_finite() {
            return Err(ControlError::InvalidCurve {
                what: format!("breakpoint {i} is not finite"),
            });
        }
    }
    for (i, pair) in breakpoints.windows(2).enumerate() {
        if pair[1].temperature <= pair[0].temperature {
            return Err(ControlError::InvalidCurve {
                what: format!(
                    "temperatures must be strictly increasing (breakpoint {})",
                    i + 1
                ),
            });
        }
        if pair[1].output < pair[0].output {
            return Err(ControlError::InvalidCurve {
                what: format!("outputs must be non-decreasing (breakpoint {})", i + 1),
            });
        }
    }
    Ok(())
}

impl ControlAlgorithm for CurveController {
    fn kind(&self) -> AlgorithmKind {
        AlgorithmKind::Curve
    }

    fn output_bounds(&self) -> (f64, f64) {
        (self.out_min, self.out_max)
    }

    fn compute(&self, state: &ControlState, input: f64, _dt: f64) -> (ControlState, f64) {
        let next = ControlState {
            primed: true,
            ..state.clone()
        };
        (next, self.interpolate(input))
    }
}
