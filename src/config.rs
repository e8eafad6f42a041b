//! Dataset construction and merge options

use crate::error::{NataError, Result};
use crate::stock::OverlapPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Options controlling how datasets are built and merged
///
/// Every field has a default, so a partial JSON document is accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetOptions {
    /// What `append` does with an iteration both datasets hold
    pub overlap: OverlapPolicy,

    /// Dataset name used by `from_array`
    pub default_name: String,

    /// Dataset label used by `from_array`
    pub default_label: String,

    /// Dataset unit used by `from_array`
    pub default_unit: String,

    /// Unit of the time axis built by `from_array`
    pub default_time_unit: String,

    /// Prefix of the anonymous axes built by `from_array` ("axis" gives axis0, axis1, ...)
    pub axis_prefix: String,
}

impl Default for DatasetOptions {
    fn default() -> Self {
        Self {
            overlap: OverlapPolicy::Reject,
            default_name: "unnamed".to_string(),
            default_label: "unnamed".to_string(),
            default_unit: String::new(),
            default_time_unit: String::new(),
            axis_prefix: "axis".to_string(),
        }
    }
}

impl DatasetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the overlap policy used by `append`
    pub fn with_overlap(mut self, overlap: OverlapPolicy) -> Self {
        self.overlap = overlap;
        self
    }

    /// Set name, label and unit used by `from_array`
    pub fn with_identity(
        mut self,
        name: impl Into<String>,
        label: impl Into<String>,
        unit: impl Into<String>,
    ) -> Self {
        self.default_name = name.into();
        self.default_label = label.into();
        self.default_unit = unit.into();
        self
    }

    pub fn with_time_unit(mut self, unit: impl Into<String>) -> Self {
        self.default_time_unit = unit.into();
        self
    }

    pub fn with_axis_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.axis_prefix = prefix.into();
        self
    }

    /// Parse options from a JSON document
    pub fn from_json(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Read options from a JSON file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn validate(&self) -> Result<()> {
        if self.axis_prefix.is_empty() {
            return Err(NataError::Configuration(
                "axis_prefix must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
