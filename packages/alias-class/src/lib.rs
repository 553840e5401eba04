/*
 * alias-class - Alias Classification for a Typed Tree IR
 *
 * Feature-First Hexagonal Architecture:
 * - shared/      : IR models consumed by the analysis (types, symbols, expr/stmt trees)
 * - features/    : alias_analysis (descriptor table → assign sets → points-to → NADS → may-def/use)
 * - config/      : presets, validation, YAML I/O
 *
 * Every function is analyzed by its own context value, so a module's
 * functions can be processed in parallel with rayon.
 */

// Crate-level lint configuration
#![allow(clippy::too_many_arguments)] // Statement handlers thread several sets
#![allow(clippy::type_complexity)]
#![allow(clippy::should_implement_trait)] // from_str naming intentional
#![allow(clippy::new_without_default)]
#![allow(clippy::module_inception)]
#![allow(clippy::collapsible_if)] // Readability over brevity
#![allow(clippy::collapsible_else_if)]
#![allow(clippy::upper_case_acronyms)] // NADS, TBAA naming

pub mod config;
pub mod errors;
pub mod features;
pub mod shared;

pub use errors::{AliasError, AliasResult};
pub use features::alias_analysis::{
    AliasAnalysisResult, AliasAnalyzer, AliasClass, AliasReport, ArgEffect, CalleeSummary,
    NoSummaries, SideEffectOracle, SummaryTable,
};
