//! Analysis configuration
//!
//! ```text
//! AliasSettings
//!  ├─ preset    (fast | balanced | thorough | custom)
//!  ├─ alias     AliasConfig     (mode, refinement, bounds)
//!  └─ parallel  ParallelConfig  (module-level rayon)
//! ```
//!
//! Built from a preset with builder overrides, or loaded from versioned YAML.

pub mod error;
pub mod io;
pub mod preset;
pub mod stage_configs;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use preset::Preset;
pub use stage_configs::{AliasConfig, LanguageMode, ParallelConfig};
pub use validation::Validatable;

use io::{check_version, merge_overrides, ConfigExportV1, ConfigOverrides};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete configuration of an analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AliasSettings {
    pub preset: Preset,
    pub alias: AliasConfig,
    pub parallel: ParallelConfig,
}

impl Default for AliasSettings {
    fn default() -> Self {
        Self::preset(Preset::default())
    }
}

impl AliasSettings {
    pub fn preset(preset: Preset) -> Self {
        Self {
            preset,
            alias: AliasConfig::from_preset(preset),
            parallel: ParallelConfig::from_preset(preset),
        }
    }

    /// Builder: adjust the alias configuration
    pub fn alias<F: FnOnce(AliasConfig) -> AliasConfig>(mut self, f: F) -> Self {
        self.alias = f(self.alias);
        self
    }

    /// Builder: adjust the parallel configuration
    pub fn parallel<F: FnOnce(ParallelConfig) -> ParallelConfig>(mut self, f: F) -> Self {
        self.parallel = f(self.parallel);
        self
    }

    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        let export: ConfigExportV1 = serde_yaml::from_str(content)?;
        check_version(export.version)?;

        let preset = Preset::from_str(&export.preset)
            .map_err(|_| ConfigError::UnknownPreset(export.preset.clone()))?;
        let mut settings = Self::preset(preset);

        if let Some(overrides) = export.overrides {
            if let Some(alias) = overrides.alias {
                settings.alias = merge_overrides(&settings.alias, alias)?;
            }
            if let Some(parallel) = overrides.parallel {
                settings.parallel = merge_overrides(&settings.parallel, parallel)?;
            }
        }

        settings.validate()?;
        Ok(settings)
    }

    pub fn from_yaml<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Export as schema v1 with every field spelled out
    pub fn to_yaml(&self) -> ConfigResult<String> {
        let export = ConfigExportV1 {
            version: 1,
            preset: self.preset.as_str().to_string(),
            overrides: Some(ConfigOverrides {
                alias: Some(serde_yaml::to_value(&self.alias)?),
                parallel: Some(serde_yaml::to_value(&self.parallel)?),
            }),
        };
        Ok(serde_yaml::to_string(&export)?)
    }
}

impl Validatable for AliasSettings {
    fn validate(&self) -> ConfigResult<()> {
        self.alias.validate()?;
        self.parallel.validate()?;
        Ok(())
    }

    fn config_name(&self) -> &'static str {
        "AliasSettings"
    }
}
