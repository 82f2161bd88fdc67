//! Platform capabilities.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use fc_config::ActuatorDef;
use fc_controls::{FanActuator, RecordingActuator};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{PlatformError, PlatformResult};
use crate::product::ProductInfo;
use crate::sysfs::SysfsPwmActuator;

/// Switch ASIC family driven by a platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AsicKind {
    Trident2,
    Tomahawk,
    Tomahawk3,
    Tomahawk4,
    Tomahawk5,
    EbbTide,
    /// No hardware.
    Fake,
}

impl fmt::Display for AsicKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Trident2 => "trident2",
            Self::Tomahawk => "tomahawk",
            Self::Tomahawk3 => "tomahawk3",
            Self::Tomahawk4 => "tomahawk4",
            Self::Tomahawk5 => "tomahawk5",
            Self::EbbTide => "ebb_tide",
            Self::Fake => "fake",
        };
        f.write_str(name)
    }
}

/// What the fan service needs from a hardware platform.
pub trait Platform: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    fn asic(&self) -> AsicKind;

    fn product_info(&self) -> &ProductInfo;

    /// Put status LEDs into their boot state.
    fn init_leds(&self) -> PlatformResult<()>;

    /// Build the fan actuator for this platform.
    fn fan_actuator(&self, actuator: &ActuatorDef) -> PlatformResult<Box<dyn FanActuator>>;
}

/// Static facts about a hardware switch model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformDescriptor {
    pub name: &'static str,
    pub asic: AsicKind,
    /// Front panel LEDs are driven by the service.
    pub has_leds: bool,
}

/// A physical switch; fans are driven through sysfs PWM files.
#[derive(Debug)]
pub struct SwitchPlatform {
    descriptor: PlatformDescriptor,
    product: ProductInfo,
}

impl SwitchPlatform {
    pub fn new(descriptor: PlatformDescriptor, product: ProductInfo) -> Self {
        Self {
            descriptor,
            product,
        }
    }
}

impl Platform for SwitchPlatform {
    fn name(&self) -> &str {
        self.descriptor.name
    }

    fn asic(&self) -> AsicKind {
        self.descriptor.asic
    }

    fn product_info(&self) -> &ProductInfo {
        &self.product
    }

    fn init_leds(&self) -> PlatformResult<()> {
        if self.descriptor.has_leds {
            info!(platform = self.descriptor.name, "status LEDs initialized");
        } else {
            debug!(platform = self.descriptor.name, "no service-managed LEDs");
        }
        Ok(())
    }

    fn fan_actuator(&self, actuator: &ActuatorDef) -> PlatformResult<Box<dyn FanActuator>> {
        let root = actuator.pwm_root.as_ref().ok_or_else(|| PlatformError::Init {
            platform: self.descriptor.name.to_string(),
            what: "actuator.pwm_root is required on hardware platforms".to_string(),
        })?;
        Ok(Box::new(SysfsPwmActuator::new(root, actuator.pwm_max)))
    }
}

/// Hardware-free platform for development hosts.
///
/// Uses a [`RecordingActuator`] unless a `pwm_root` is configured.
#[derive(Debug)]
pub struct SimPlatform {
    product: ProductInfo,
    recorder: RecordingActuator,
    leds_initialized: AtomicBool,
}

impl SimPlatform {
    pub const NAME: &'static str = "sim";

    pub fn new(product: ProductInfo) -> Self {
        Self {
            product,
            recorder: RecordingActuator::new(),
            leds_initialized: AtomicBool::new(false),
        }
    }

    /// Handle observing writes made through [`Platform::fan_actuator`].
    pub fn recorder(&self) -> RecordingActuator {
        self.recorder.clone()
    }

    pub fn leds_initialized(&self) -> bool {
        self.leds_initialized.load(Ordering::SeqCst)
    }
}

impl Platform for SimPlatform {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn asic(&self) -> AsicKind {
        AsicKind::Fake
    }

    fn product_info(&self) -> &ProductInfo {
        &self.product
    }

    fn init_leds(&self) -> PlatformResult<()> {
        self.leds_initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn fan_actuator(&self, actuator: &ActuatorDef) -> PlatformResult<Box<dyn FanActuator>> {
        match &actuator.pwm_root {
            Some(root) => Ok(Box::new(SysfsPwmActuator::new(root, actuator.pwm_max))),
            None => Ok(Box::new(self.recorder.clone())),
        }
    }
}
