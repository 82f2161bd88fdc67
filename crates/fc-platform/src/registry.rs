//! Platform lookup by product identity.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::info;

use crate::error::{PlatformError, PlatformResult};
use crate::platform::{AsicKind, Platform, PlatformDescriptor, SimPlatform, SwitchPlatform};
use crate::product::{ProductInfo, normalize_identity};

type PlatformCtor = Box<dyn Fn(ProductInfo) -> Box<dyn Platform> + Send + Sync>;

/// Switch models known to this build.
pub const BUILTIN_PLATFORMS: &[PlatformDescriptor] = &[
    PlatformDescriptor {
        name: "wedge",
        asic: AsicKind::Trident2,
        has_leds: false,
    },
    PlatformDescriptor {
        name: "wedge100",
        asic: AsicKind::Tomahawk,
        has_leds: true,
    },
    PlatformDescriptor {
        name: "galaxylc",
        asic: AsicKind::Tomahawk,
        has_leds: false,
    },
    PlatformDescriptor {
        name: "galaxyfc",
        asic: AsicKind::Tomahawk,
        has_leds: false,
    },
    PlatformDescriptor {
        name: "wedge400",
        asic: AsicKind::Tomahawk3,
        has_leds: true,
    },
    PlatformDescriptor {
        name: "wedge400c",
        asic: AsicKind::EbbTide,
        has_leds: true,
    },
    PlatformDescriptor {
        name: "darwin",
        asic: AsicKind::Tomahawk3,
        has_leds: true,
    },
    PlatformDescriptor {
        name: "minipack",
        asic: AsicKind::Tomahawk3,
        has_leds: true,
    },
    PlatformDescriptor {
        name: "yamp",
        asic: AsicKind::Tomahawk3,
        has_leds: false,
    },
    PlatformDescriptor {
        name: "fuji",
        asic: AsicKind::Tomahawk4,
        has_leds: true,
    },
    PlatformDescriptor {
        name: "elbert",
        asic: AsicKind::Tomahawk4,
        has_leds: true,
    },
    PlatformDescriptor {
        name: "montblanc",
        asic: AsicKind::Tomahawk5,
        has_leds: true,
    },
];

/// Maps normalized product identities to platform constructors.
pub struct PlatformRegistry {
    entries: BTreeMap<String, PlatformCtor>,
}

impl std::fmt::Debug for PlatformRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlatformRegistry")
            .field("platforms", &self.names())
            .finish()
    }
}

impl PlatformRegistry {
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Registry holding every built-in switch model plus `sim`.
    pub fn with_builtin() -> Self {
        let mut registry = Self::empty();
        for descriptor in BUILTIN_PLATFORMS {
            let descriptor = *descriptor;
            registry.register(descriptor.name, move |product| {
                Box::new(SwitchPlatform::new(descriptor, product))
            });
        }
        registry.register(SimPlatform::NAME, |product| Box::new(SimPlatform::new(product)));
        registry
    }

    /// Add or replace a platform. `name` is normalized.
    pub fn register<F>(&mut self, name: &str, ctor: F)
    where
        F: Fn(ProductInfo) -> Box<dyn Platform> + Send + Sync + 'static,
    {
        self.entries.insert(normalize_identity(name), Box::new(ctor));
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&normalize_identity(name))
    }

    /// Construct the platform registered under `name`.
    pub fn create(&self, name: &str, product: ProductInfo) -> PlatformResult<Box<dyn Platform>> {
        let key = normalize_identity(name);
        let ctor = self
            .entries
            .get(&key)
            .ok_or_else(|| PlatformError::UnknownPlatform {
                name: name.to_string(),
                known: self.names().join(", "),
            })?;
        Ok(ctor(product))
    }

    /// Construct the platform matching the product's own name.
    pub fn detect(&self, product: ProductInfo) -> PlatformResult<Box<dyn Platform>> {
        let name = product.product_name.clone();
        self.create(&name, product)
    }

    /// Pick a platform: an explicit name wins over the FRU dump.
    ///
    /// With an override the FRU dump is still read when present, for its
    /// serial and version, but its product name is ignored.
    pub fn resolve(
        &self,
        override_name: Option<&str>,
        fruid_path: &Path,
    ) -> PlatformResult<Box<dyn Platform>> {
        let platform = match override_name {
            Some(name) => {
                let product = ProductInfo::from_file(fruid_path)
                    .unwrap_or_else(|_| ProductInfo::named(name));
                self.create(name, product)?
            }
            None => self.detect(ProductInfo::from_file(fruid_path)?)?,
        };
        info!(
            platform = platform.name(),
            asic = %platform.asic(),
            product = %platform.product_info().product_name,
            "platform selected"
        );
        Ok(platform)
    }
}

impl Default for PlatformRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_lookup_is_normalized() {
        let registry = PlatformRegistry::with_builtin();
        let p = registry
            .create("Wedge 400", ProductInfo::named("Wedge 400"))
            .unwrap();
        assert_eq!(p.name(), "wedge400");
        assert_eq!(p.asic(), AsicKind::Tomahawk3);
        assert!(registry.contains("YAMP"));
        assert!(registry.contains("sim"));
    }

    #[test]
    fn unknown_platform_lists_known_names() {
        let registry = PlatformRegistry::with_builtin();
        let err = registry
            .create("toaster", ProductInfo::named("toaster"))
            .unwrap_err();
        match err {
            PlatformError::UnknownPlatform { name, known } => {
                assert_eq!(name, "toaster");
                assert!(known.contains("minipack"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn custom_registration_overrides() {
        let mut registry = PlatformRegistry::empty();
        assert!(registry.names().is_empty());
        registry.register("Lab-Rig", |product| Box::new(SimPlatform::new(product)));
        assert_eq!(registry.names(), vec!["labrig"]);
        let p = registry.create("lab rig", ProductInfo::named("x")).unwrap();
        assert_eq!(p.asic(), AsicKind::Fake);
    }
}
