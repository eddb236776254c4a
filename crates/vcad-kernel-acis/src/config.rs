//! Export options.

use serde::{Deserialize, Serialize};

use crate::error::{AcisError, Result};
use crate::header::{AcisHeader, DEFAULT_PRODUCT_ID};
use crate::version;

/// Settings written into the header of exported files.
///
/// Missing keys take their defaults, so a TOML file only needs the keys it
/// changes:
///
/// ```toml
/// version = 20800
/// product_id = "my modeler"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    /// ACIS version code, 700 or later.
    pub version: i32,
    /// Product id written into the header.
    pub product_id: String,
    /// Model units in millimeters.
    pub units_in_mm: f64,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            version: version::MIN_EXPORT_VERSION,
            product_id: DEFAULT_PRODUCT_ID.to_string(),
            units_in_mm: 1.0,
        }
    }
}

impl ExportOptions {
    /// Default options with another version.
    pub fn with_version(version: i32) -> Self {
        Self {
            version,
            ..Self::default()
        }
    }

    /// Parse options from TOML.
    pub fn from_toml(text: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Serialize options as TOML.
    pub fn to_toml(&self) -> std::result::Result<String, toml::ser::Error> {
        toml::to_string(self)
    }

    /// Header for an export with these options.
    ///
    /// Fails before any work is done if the version cannot be exported.
    pub fn header(&self) -> Result<AcisHeader> {
        if !version::is_valid_export_version(self.version) {
            return Err(AcisError::export(format!(
                "invalid export version: {}",
                self.version
            )));
        }
        let mut header = AcisHeader::default();
        header.set_version(self.version)?;
        header.product_id = self.product_id.clone();
        header.units_in_mm = self.units_in_mm;
        Ok(header)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_uses_defaults() {
        let options = ExportOptions::from_toml("version = 20800\n").unwrap();
        assert_eq!(options.version, 20800);
        assert_eq!(options.product_id, DEFAULT_PRODUCT_ID);
        assert_eq!(options.units_in_mm, 1.0);

        let options = ExportOptions::from_toml("").unwrap();
        assert_eq!(options, ExportOptions::default());
    }

    #[test]
    fn test_toml_round_trip() {
        let options = ExportOptions {
            version: 700,
            product_id: "vcad".into(),
            units_in_mm: 25.4,
        };
        let text = options.to_toml().unwrap();
        assert_eq!(ExportOptions::from_toml(&text).unwrap(), options);
    }

    #[test]
    fn test_header_rejects_versions() {
        for version in [400, 500, 21800] {
            let err = ExportOptions::with_version(version).header().unwrap_err();
            assert!(matches!(err, AcisError::Export(_)));
        }
        let header = ExportOptions::with_version(20800).header().unwrap();
        assert_eq!(header.acis_version, "ACIS 208.00 NT");
        assert!(header.has_asm_header());
    }
}
