//! Codec configuration.
//!
//! Every component takes its constants from an explicit [`PdxConfig`] value
//! instead of process-wide globals. Configs round-trip through JSON so a host
//! integration can keep one next to its own settings.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::space::CoordinateSpace;
use crate::util::{Error, Result};

/// Constants shared by the export and import paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PdxConfig {
    /// Decimal digits kept for mesh data, and the dedup precision.
    pub decimal_digits: u32,
    /// Decimal digits kept for animation translation.
    pub round_translation: u32,
    /// Decimal digits kept for animation rotation.
    pub round_rotation: u32,
    /// Decimal digits kept for animation scale.
    pub round_scale: u32,
    /// Packed skin width (influence slots per vertex).
    pub max_influences: usize,
    /// Store rounded values on export. Dedup always compares at
    /// `decimal_digits` regardless.
    pub round_data: bool,
    /// Host <-> file axis convention.
    pub space: CoordinateSpace,
}

impl Default for PdxConfig {
    fn default() -> Self {
        Self {
            decimal_digits: 5,
            round_translation: 3,
            round_rotation: 4,
            round_scale: 2,
            max_influences: 4,
            round_data: true,
            space: CoordinateSpace::MIRROR_Z,
        }
    }
}

impl PdxConfig {
    /// Parse from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(std::io::Error::from)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values no component can work with.
    pub fn validate(&self) -> Result<()> {
        if !self.space.is_valid() {
            return Err(Error::invalid(
                "config",
                "space",
                format!("axis signs {:?} must each be 1 or -1", self.space.axis_signs),
            ));
        }
        if self.max_influences == 0 {
            return Err(Error::invalid("config", "max_influences", "must be at least 1"));
        }
        Ok(())
    }

    /// Load from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

/// What an export writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    pub mesh: bool,
    pub skeleton: bool,
    pub locators: bool,
    /// Merge face-vertices sharing position, normal and UVs. When off every
    /// triangle corner becomes its own vertex.
    pub merge_vertices: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self { mesh: true, skeleton: true, locators: true, merge_vertices: true }
    }
}

/// What an import creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportOptions {
    pub mesh: bool,
    pub skeleton: bool,
    pub locators: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self { mesh: true, skeleton: true, locators: true }
    }
}
