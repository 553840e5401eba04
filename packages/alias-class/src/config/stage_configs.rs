//! Analysis configuration types
//!
//! Each config struct has its own presets, builder setters and validation.

use super::error::{ConfigError, ConfigResult};
use super::preset::Preset;
use super::validation::{check_range, Validatable};
use serde::{Deserialize, Serialize};

// ============================================================================
// Language mode
// ============================================================================

/// Source-language family; gates several union rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LanguageMode {
    /// Pointer arithmetic, unions, aggregates copied by value
    C,
    /// Managed references, class hierarchy, final fields
    ObjectOriented,
}

impl LanguageMode {
    pub fn from_str(s: &str) -> ConfigResult<Self> {
        match s.to_lowercase().as_str() {
            "c" => Ok(Self::C),
            "oo" | "object_oriented" | "java" => Ok(Self::ObjectOriented),
            _ => Err(ConfigError::UnknownMode(s.to_string())),
        }
    }

    pub fn is_c(self) -> bool {
        self == Self::C
    }
}

impl Default for LanguageMode {
    fn default() -> Self {
        Self::C
    }
}

// ============================================================================
// Alias analysis configuration
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AliasConfig {
    pub mode: LanguageMode,

    /// Re-partition alias classes by type compatibility
    pub type_based_refinement: bool,

    /// Handled throws get no annotations; unhandled ones are treated as returns
    pub less_throw_alias: bool,

    /// Treat inferred (untrusted) callee summaries as missing
    pub ignore_inferred_summaries: bool,

    /// Assume every callee has side effects regardless of summaries
    pub callee_has_side_effect: bool,

    /// Arrays with more elements than this get `Invalid` index offsets (1..=1_000_000)
    pub array_offset_threshold: u64,

    /// Hard bound on points-to worklist steps (1_000..=100_000_000)
    pub max_propagation_steps: usize,

    /// Hard bound on pass-1 convergence rounds (1..=10_000)
    pub max_pass1_rounds: usize,

    /// Hard bound on pointee levels collected at calls and returns (1..=1024)
    pub max_collect_depth: usize,
}

impl Validatable for AliasConfig {
    fn validate(&self) -> ConfigResult<()> {
        check_range(
            "array_offset_threshold",
            self.array_offset_threshold,
            1,
            1_000_000,
            "Element threshold must be positive and bounded",
        )?;
        check_range(
            "max_propagation_steps",
            self.max_propagation_steps,
            1_000,
            100_000_000,
            "Worklist bound must leave room for real functions",
        )?;
        check_range(
            "max_pass1_rounds",
            self.max_pass1_rounds,
            1,
            10_000,
            "At least one round is required",
        )?;
        check_range(
            "max_collect_depth",
            self.max_collect_depth,
            1,
            1024,
            "Pointee collection needs at least one level",
        )?;
        Ok(())
    }

    fn config_name(&self) -> &'static str {
        "AliasConfig"
    }
}

impl AliasConfig {
    /// Builder: Set mode
    pub fn mode(mut self, v: LanguageMode) -> Self {
        self.mode = v;
        self
    }

    /// Builder: Set type_based_refinement
    pub fn type_based_refinement(mut self, v: bool) -> Self {
        self.type_based_refinement = v;
        self
    }

    /// Builder: Set less_throw_alias
    pub fn less_throw_alias(mut self, v: bool) -> Self {
        self.less_throw_alias = v;
        self
    }

    /// Builder: Set ignore_inferred_summaries
    pub fn ignore_inferred_summaries(mut self, v: bool) -> Self {
        self.ignore_inferred_summaries = v;
        self
    }

    /// Builder: Set callee_has_side_effect
    pub fn callee_has_side_effect(mut self, v: bool) -> Self {
        self.callee_has_side_effect = v;
        self
    }

    /// Builder: Set array_offset_threshold
    pub fn array_offset_threshold(mut self, v: u64) -> Self {
        self.array_offset_threshold = v;
        self
    }

    /// Builder: Set max_propagation_steps
    pub fn max_propagation_steps(mut self, v: usize) -> Self {
        self.max_propagation_steps = v;
        self
    }

    /// Builder: Set max_pass1_rounds
    pub fn max_pass1_rounds(mut self, v: usize) -> Self {
        self.max_pass1_rounds = v;
        self
    }

    /// Builder: Set max_collect_depth
    pub fn max_collect_depth(mut self, v: usize) -> Self {
        self.max_collect_depth = v;
        self
    }

    /// Get preset configuration
    pub fn from_preset(preset: Preset) -> Self {
        match preset {
            Preset::Fast => Self {
                mode: LanguageMode::C,
                type_based_refinement: false,
                less_throw_alias: true,
                ignore_inferred_summaries: false,
                callee_has_side_effect: false,
                array_offset_threshold: 64,
                max_propagation_steps: 100_000,
                max_pass1_rounds: 16,
                max_collect_depth: 8,
            },
            Preset::Balanced | Preset::Custom => Self {
                mode: LanguageMode::C,
                type_based_refinement: false,
                less_throw_alias: true,
                ignore_inferred_summaries: false,
                callee_has_side_effect: false,
                array_offset_threshold: 1024,
                max_propagation_steps: 1_000_000,
                max_pass1_rounds: 64,
                max_collect_depth: 32,
            },
            Preset::Thorough => Self {
                mode: LanguageMode::C,
                type_based_refinement: false,
                less_throw_alias: false,
                ignore_inferred_summaries: true,
                callee_has_side_effect: false,
                array_offset_threshold: 65_536,
                max_propagation_steps: 10_000_000,
                max_pass1_rounds: 256,
                max_collect_depth: 128,
            },
        }
    }
}

impl Default for AliasConfig {
    fn default() -> Self {
        Self::from_preset(Preset::Balanced)
    }
}

// ============================================================================
// Parallel Processing Configuration
// ============================================================================

/// Module-level parallelism
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParallelConfig {
    /// Analyze functions on the rayon pool
    pub enable_rayon: bool,

    /// Worker threads (0 = rayon default, else 1..=256)
    pub num_workers: usize,
}

impl Validatable for ParallelConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.num_workers != 0 {
            check_range(
                "num_workers",
                self.num_workers,
                1,
                256,
                "Use 0 to let rayon decide",
            )?;
        }
        Ok(())
    }

    fn config_name(&self) -> &'static str {
        "ParallelConfig"
    }
}

impl ParallelConfig {
    /// Builder: Set enable_rayon
    pub fn enable_rayon(mut self, v: bool) -> Self {
        self.enable_rayon = v;
        self
    }

    /// Builder: Set num_workers
    pub fn num_workers(mut self, v: usize) -> Self {
        self.num_workers = v;
        self
    }

    pub fn from_preset(preset: Preset) -> Self {
        match preset {
            Preset::Custom => Self {
                enable_rayon: false,
                num_workers: 0,
            },
            Preset::Fast | Preset::Balanced | Preset::Thorough => Self {
                enable_rayon: true,
                num_workers: 0,
            },
        }
    }
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self::from_preset(Preset::Balanced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_validate() {
        for preset in [Preset::Fast, Preset::Balanced, Preset::Thorough, Preset::Custom] {
            AliasConfig::from_preset(preset).validate().unwrap();
            ParallelConfig::from_preset(preset).validate().unwrap();
        }
    }

    #[test]
    fn test_builder_and_range_errors() {
        let config = AliasConfig::default()
            .mode(LanguageMode::ObjectOriented)
            .max_collect_depth(0);
        assert_eq!(config.mode, LanguageMode::ObjectOriented);
        match config.validate() {
            Err(ConfigError::Range { field, .. }) => assert_eq!(field, "max_collect_depth"),
            other => panic!("expected range error, got {:?}", other),
        }

        let parallel = ParallelConfig::default().num_workers(1000);
        assert!(parallel.validate().is_err());
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!(LanguageMode::from_str("C").unwrap(), LanguageMode::C);
        assert_eq!(
            LanguageMode::from_str("object_oriented").unwrap(),
            LanguageMode::ObjectOriented
        );
        assert!(matches!(
            LanguageMode::from_str("cobol"),
            Err(ConfigError::UnknownMode(m)) if m == "cobol"
        ));
    }
}
