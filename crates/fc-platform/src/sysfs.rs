//! PWM actuator writing duty values into per-fan files.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use fc_controls::{ActuatorError, FanActuator};
use fc_core::WriteMode;
use tracing::{debug, info};

/// Writes `round(output / 100 * pwm_max)` into `<root>/<fan>`.
#[derive(Debug, Clone)]
pub struct SysfsPwmActuator {
    root: PathBuf,
    pwm_max: u32,
}

impl SysfsPwmActuator {
    pub fn new(root: impl Into<PathBuf>, pwm_max: u32) -> Self {
        Self {
            root: root.into(),
            pwm_max: pwm_max.max(1),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Duty value for a percent output.
    pub fn duty(&self, output: f64) -> u32 {
        let fraction = output.clamp(0.0, 100.0) / 100.0;
        (fraction * f64::from(self.pwm_max)).round() as u32
    }
}

impl FanActuator for SysfsPwmActuator {
    fn write(&mut self, fan: &str, output: f64, mode: WriteMode) -> Result<(), ActuatorError> {
        if fan.is_empty() || fan.contains('/') || fan.contains("..") {
            return Err(ActuatorError::Rejected {
                fan: fan.to_string(),
                what: "fan name is not a plain file name".to_string(),
            });
        }
        let output = fc_core::ensure_in_range(output, 0.0, 100.0, "fan output").map_err(|e| {
            ActuatorError::Rejected {
                fan: fan.to_string(),
                what: e.to_string(),
            }
        })?;
        let duty = self.duty(output);
        let path = self.root.join(fan);
        if mode.is_simulated() {
            info!(fan, output, duty, path = %path.display(), "simulated fan write");
            return Ok(());
        }
        std::fs::write(&path, format!("{duty}\n")).map_err(|source| match source.kind() {
            ErrorKind::NotFound => ActuatorError::Unreachable {
                fan: fan.to_string(),
                what: format!("{} not found", path.display()),
            },
            _ => ActuatorError::Io {
                fan: fan.to_string(),
                source,
            },
        })?;
        debug!(fan, duty, "pwm written");
        Ok(())
    }
}
