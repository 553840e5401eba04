//! Configuration I/O (YAML loading)
//!
//! Schema v1:
//!
//! ```yaml
//! version: 1
//! preset: balanced
//! overrides:
//!   alias:
//!     mode: object_oriented
//!     max_collect_depth: 16
//!   parallel:
//!     num_workers: 4
//! ```
//!
//! Overrides are partial: listed fields replace the preset's values, the
//! rest keep the preset's.

use super::error::{ConfigError, ConfigResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Supported schema versions
pub const SUPPORTED_VERSIONS: &[u32] = &[1];

/// YAML Schema v1
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigExportV1 {
    /// Schema version (always 1 for v1)
    pub version: u32,

    /// Base preset
    pub preset: String,

    /// Fine-grained overrides
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overrides: Option<ConfigOverrides>,
}

/// Configuration overrides, kept as raw YAML until merged onto a preset
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<serde_yaml::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallel: Option<serde_yaml::Value>,
}

pub(crate) fn check_version(version: u32) -> ConfigResult<()> {
    if !SUPPORTED_VERSIONS.contains(&version) {
        return Err(ConfigError::UnsupportedVersion {
            found: version,
            supported: SUPPORTED_VERSIONS.to_vec(),
        });
    }
    Ok(())
}

/// Overlay the keys of `patch` onto the serialized form of `base`
pub(crate) fn merge_overrides<T>(base: &T, patch: serde_yaml::Value) -> ConfigResult<T>
where
    T: Serialize + DeserializeOwned,
{
    let mut merged = serde_yaml::to_value(base)?;
    match (merged.as_mapping_mut(), patch) {
        (Some(target), serde_yaml::Value::Mapping(entries)) => {
            for (key, value) in entries {
                target.insert(key, value);
            }
        }
        (_, serde_yaml::Value::Null) => {}
        (_, other) => {
            return Err(ConfigError::Validation(format!(
                "override section must be a mapping, found {:?}",
                other
            )))
        }
    }
    Ok(serde_yaml::from_value(merged)?)
}
