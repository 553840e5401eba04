//! Per-function analysis statistics

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AliasStats {
    pub osts: usize,
    pub vsts: usize,
    pub ost_unions: usize,
    pub vst_unions: usize,
    /// Unions refused because the two locations are final or provably disjoint
    pub refused_unions: usize,
    pub propagation_steps: usize,
    pub pass1_rounds: usize,
    pub nads_count: usize,
    pub may_defs: usize,
    pub may_uses: usize,
    pub duration_ms: f64,
}
