//! Product identity read from the FRU EEPROM dump.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PlatformError, PlatformResult};

/// Default location of the FRU dump on switch hosts.
pub const DEFAULT_FRUID_PATH: &str = "/var/facebook/fboss/fruid.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductInfo {
    #[serde(rename = "Product Name")]
    pub product_name: String,
    #[serde(rename = "Product Serial Number", default, skip_serializing_if = "Option::is_none")]
    pub serial: Option<String>,
    #[serde(rename = "Product Version", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FruidFile {
    #[serde(rename = "Information")]
    information: ProductInfo,
}

impl ProductInfo {
    /// Identity without a FRU dump, e.g. from a command-line override.
    pub fn named(product_name: impl Into<String>) -> Self {
        Self {
            product_name: product_name.into(),
            serial: None,
            version: None,
        }
    }

    /// Parse `{"Information": {"Product Name": ..}}`.
    pub fn from_file(path: &Path) -> PlatformResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| PlatformError::ProductInfo {
            path: path.display().to_string(),
            what: e.to_string(),
        })?;
        Self::from_json(&content).map_err(|e| PlatformError::ProductInfo {
            path: path.display().to_string(),
            what: e.to_string(),
        })
    }

    pub fn from_json(content: &str) -> PlatformResult<Self> {
        let file: FruidFile = serde_json::from_str(content)?;
        if file.information.product_name.trim().is_empty() {
            return Err(PlatformError::ProductInfo {
                path: "<json>".to_string(),
                what: "empty Product Name".to_string(),
            });
        }
        Ok(file.information)
    }

    /// Registry key for this product.
    pub fn identity(&self) -> String {
        normalize_identity(&self.product_name)
    }
}

/// Lowercase and drop everything but ASCII letters and digits.
///
/// `"Wedge 400"`, `"WEDGE400"` and `"wedge-400"` all map to `"wedge400"`.
pub fn normalize_identity(name: &str) -> String {
    name.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fruid_information() {
        let info = ProductInfo::from_json(
            r#"{"Information": {"Product Name": "MINIPACK", "Product Serial Number": "A123", "Extra": "x"}}"#,
        )
        .unwrap();
        assert_eq!(info.product_name, "MINIPACK");
        assert_eq!(info.serial.as_deref(), Some("A123"));
        assert_eq!(info.identity(), "minipack");
    }

    #[test]
    fn rejects_missing_product_name() {
        assert!(ProductInfo::from_json(r#"{"Information": {}}"#).is_err());
        assert!(ProductInfo::from_json(r#"{"Information": {"Product Name": " "}}"#).is_err());
        assert!(ProductInfo::from_json("not json").is_err());
    }

    #[test]
    fn normalizes_identities() {
        assert_eq!(normalize_identity("Wedge 400"), "wedge400");
        assert_eq!(normalize_identity("wedge-400"), "wedge400");
        assert_eq!(normalize_identity("YAMP"), "yamp");
    }
}
