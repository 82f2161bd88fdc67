//! PID controller for fan cooling.
//!
//! The controller works on the cooling sign convention: error is
//! `temperature - setpoint`, so a zone running hot produces a positive
//! error and drives the fan output up.
//!
//! Includes:
//! - Integral clamping (`integral_limit`)
//! - Conditional integration while the output is saturated
//! - Filtered derivative, primed by the first sample (no derivative kick)

use crate::algorithm::{AlgorithmKind, ControlAlgorithm, ControlState};
use crate::error::{ControlError, ControlResult};
use fc_core::clamp_or;
use serde::{Deserialize, Serialize};

/// PID controller configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PidController {
    /// Proportional gain (% per °C).
    pub kp: f64,
    /// Integral gain (% per °C·s).
    pub ki: f64,
    /// Derivative gain (% per °C/s).
    pub kd: f64,
    /// Derivative filter time constant (seconds). Zero disables filtering.
    pub td_filter: f64,
    /// Target temperature.
    pub setpoint: f64,
    /// Minimum output value.
    pub out_min: f64,
    /// Maximum output value.
    pub out_max: f64,
    /// Integral windup limit. If None, derived from the output span.
    pub integral_limit: Option<f64>,
}

impl PidController {
    /// Create a new PID controller.
    ///
    /// # Arguments
    ///
    /// * `kp` - Proportional gain
    /// * `ki` - Integral gain
    /// * `kd` - Derivative gain
    /// * `setpoint` - Target temperature
    /// * `out_min` - Minimum output
    /// * `out_max` - Maximum output
    pub fn new(
        kp: f64,
        ki: f64,
        kd: f64,
        setpoint: f64,
        out_min: f64,
        out_max: f64,
    ) -> ControlResult<Self> {
        for gain in [kp, ki, kd] {
            if !gain.is_finite() || gain < 0.0 {
                return Err(ControlError::InvalidArg {
                    what: "gains must be finite and non-negative",
                });
            }
        }
        if !setpoint.is_finite() {
            return Err(ControlError::InvalidArg {
                what: "setpoint must be finite",
            });
        }
        if !(out_min.is_finite() && out_max.is_finite()) || out_min >= out_max {
            return Err(ControlError::InvalidArg {
                what: "out_min must be less than out_max",
            });
        }
        Ok(Self {
            kp,
            ki,
            kd,
            td_filter: 0.0,
            setpoint,
            out_min,
            out_max,
            integral_limit: None,
        })
    }

    /// Set integral windup limit.
    pub fn with_integral_limit(mut self, limit: f64) -> ControlResult<Self> {
        if !limit.is_finite() || limit < 0.0 {
            return Err(ControlError::InvalidArg {
                what: "integral_limit must be finite and non-negative",
            });
        }
        self.integral_limit = Some(limit);
        Ok(self)
    }

    /// Set derivative filter time constant.
    pub fn with_derivative_filter(mut self, td_filter: f64) -> ControlResult<Self> {
        if !td_filter.is_finite() || td_filter < 0.0 {
            return Err(ControlError::InvalidArg {
                what: "td_filter must be finite and non-negative",
            });
        }
        self.td_filter = td_filter;
        Ok(self)
    }

    /// Bound on `|integral|`.
    ///
    /// Without an explicit limit the integral term alone may span the full
    /// output range and no more.
    pub fn effective_integral_limit(&self) -> f64 {
        match self.integral_limit {
            Some(limit) => limit,
            None if self.ki > 0.0 => (self.out_max - self.out_min) / self.ki,
            None => 0.0,
        }
    }

    /// Compute controller output for a measured temperature.
    ///
    /// # Arguments
    ///
    /// * `state` - Controller state (integral and derivative filter)
    /// * `pv` - Aggregated zone temperature
    /// * `dt` - Time since last evaluated sample (seconds)
    ///
    /// # Returns
    ///
    /// Updated state and output value.
    pub fn update(&self, state: &ControlState, pv: f64, dt: f64) -> (ControlState, f64) {
        if !pv.is_finite() {
            // Unusable reading: full output, state untouched.
            return (state.clone(), self.out_max);
        }
        let dt = if dt.is_finite() && dt > 0.0 { dt } else { 0.0 };
        let error = pv - self.setpoint;

        let p_term = self.kp * error;

        let limit = self.effective_integral_limit();
        let new_integral = (state.integral + error * dt).clamp(-limit, limit);
        let i_term = self.ki * new_integral;

        // First sample seeds the filter so the derivative starts at zero.
        let filtered_error = if state.primed && dt > 0.0 {
            let alpha = self.td_filter / (self.td_filter + dt);
            alpha * state.filtered_error + (1.0 - alpha) * error
        } else if state.primed {
            state.filtered_error
        } else {
            error
        };
        let d_term = if state.primed && dt > 0.0 {
            self.kd * (filtered_error - state.filtered_error) / dt
        } else {
            0.0
        };

        let output_raw = p_term + i_term + d_term;
        // A non-finite result drives the fans to full.
        let output = clamp_or(output_raw, self.out_min, self.out_max, self.out_max);

        // Conditional integration: hold the integral when it would push
        // further into saturation.
        let winding_up = (output_raw > self.out_max && error > 0.0)
            || (output_raw < self.out_min && error < 0.0);
        let integral = if winding_up {
            state.integral.clamp(-limit, limit)
        } else {
            new_integral
        };

        let new_state = ControlState {
            integral,
            filtered_error,
            primed: true,
        };

        (new_state, output)
    }
}

impl ControlAlgorithm for PidController {
    fn kind(&self) -> AlgorithmKind {
        AlgorithmKind::Pid
    }

    fn output_bounds(&self) -> (f64, f64) {
        (self.out_min, self.out_max)
    }

    fn compute(&self, state: &ControlState, input: f64, dt: f64) -> (ControlState, f64) {
        self.update(state, input, dt)
    }
}
