//! Ports: what alias analysis consumes from the rest of the compiler
//!
//! - [`SideEffectOracle`]: per-callee side-effect summaries from the call graph
//! - [`ClassHierarchy`]: super/sub-class queries (object-oriented mode)

use crate::shared::models::{FuncId, TyIdx, TypeTable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What a callee does with the memory reachable from one pointer argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgEffect {
    /// Anything, including storing the pointer
    #[default]
    Unknown,
    /// Argument never read
    Unused,
    /// Only the pointer value itself is read
    ReadSelfOnly,
    /// Memory behind the pointer is read, never written
    ReadMemoryOnly,
    /// Memory behind the pointer is written, never read
    WriteMemoryOnly,
}

/// Trusted (hand-written) vs. inferred by an earlier interprocedural pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummarySource {
    #[default]
    Configured,
    Inferred,
}

/// Side-effect summary of one callee
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalleeSummary {
    pub pure: bool,
    #[serde(rename = "const")]
    pub is_const: bool,
    /// Returned pointer aliases nothing visible to the caller
    pub return_no_alias: bool,
    /// Never defines private fields
    pub no_private_def: bool,
    pub args: Vec<ArgEffect>,
    pub source: SummarySource,
    /// Set when the callee is a constructor of this class
    pub constructor_of: Option<TyIdx>,
}

impl CalleeSummary {
    pub fn pure() -> Self {
        Self {
            pure: true,
            ..Self::default()
        }
    }

    pub fn with_args(mut self, args: Vec<ArgEffect>) -> Self {
        self.args = args;
        self
    }

    pub fn inferred(mut self) -> Self {
        self.source = SummarySource::Inferred;
        self
    }

    pub fn arg_effect(&self, index: usize) -> ArgEffect {
        self.args.get(index).copied().unwrap_or_default()
    }

    pub fn has_side_effect(&self) -> bool {
        !(self.pure || self.is_const)
    }
}

/// Source of callee summaries
pub trait SideEffectOracle: Send + Sync {
    fn summary(&self, callee: FuncId) -> Option<CalleeSummary>;
}

/// No callee is known; every call is fully conservative
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSummaries;

impl SideEffectOracle for NoSummaries {
    fn summary(&self, _callee: FuncId) -> Option<CalleeSummary> {
        None
    }
}

/// Summaries keyed by callee id, loadable from JSON
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryTable {
    #[serde(default)]
    summaries: BTreeMap<u32, CalleeSummary>,
}

impl SummaryTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, callee: FuncId, summary: CalleeSummary) -> &mut Self {
        self.summaries.insert(callee.0, summary);
        self
    }

    pub fn with(mut self, callee: FuncId, summary: CalleeSummary) -> Self {
        self.insert(callee, summary);
        self
    }

    pub fn len(&self) -> usize {
        self.summaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.summaries.is_empty()
    }
}

impl SideEffectOracle for SummaryTable {
    fn summary(&self, callee: FuncId) -> Option<CalleeSummary> {
        self.summaries.get(&callee.0).cloned()
    }
}

/// Class-hierarchy queries
pub trait ClassHierarchy: Send + Sync {
    /// `sup` is a strict ancestor of `sub`
    fn is_super_class(&self, sup: TyIdx, sub: TyIdx) -> bool;
}

impl ClassHierarchy for TypeTable {
    fn is_super_class(&self, sup: TyIdx, sub: TyIdx) -> bool {
        TypeTable::is_super_class(self, sup, sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_json() {
        let json = r#"{"summaries": {"3": {"const": true, "args": ["read_self_only"]}}}"#;
        let table: SummaryTable = serde_json::from_str(json).unwrap();
        let s = table.summary(FuncId(3)).unwrap();
        assert!(s.is_const);
        assert!(!s.has_side_effect());
        assert_eq!(s.arg_effect(0), ArgEffect::ReadSelfOnly);
        assert_eq!(s.arg_effect(4), ArgEffect::Unknown);
        assert!(table.summary(FuncId(4)).is_none());
    }
}
