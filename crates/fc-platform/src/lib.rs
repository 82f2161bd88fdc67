//! Hardware platform selection for the fan control service.
//!
//! A [`Platform`] is chosen from the product identity in the FRU dump
//! (`fruid.json`) or an explicit override, through a [`PlatformRegistry`].
//! Platforms expose their ASIC, LED bring-up and the [`FanActuator`]
//! implementation fans are driven through.
//!
//! [`FanActuator`]: fc_controls::FanActuator

pub mod error;
pub mod platform;
pub mod product;
pub mod registry;
pub mod sysfs;

pub use error::{PlatformError, PlatformResult};
pub use platform::{AsicKind, Platform, PlatformDescriptor, SimPlatform, SwitchPlatform};
pub use product::{DEFAULT_FRUID_PATH, ProductInfo, normalize_identity};
pub use registry::{BUILTIN_PLATFORMS, PlatformRegistry};
pub use sysfs::SysfsPwmActuator;
