//! High-level alias analyzer
//!
//! Runs the full pipeline on one function, or on every function of a module
//! (in parallel with rayon when enabled). Each function gets a fresh
//! [`AliasClass`] context; nothing is shared between functions except the
//! read-only type table, globals and callee summaries.
//!
//! # Usage
//! ```text
//! use alias_class::{AliasAnalyzer, SummaryTable};
//! use alias_class::config::{AliasSettings, Preset};
//!
//! let analyzer = AliasAnalyzer::from_settings(&AliasSettings::preset(Preset::Balanced))
//!     .with_oracle(SummaryTable::new());
//! let results = analyzer.analyze_module(&mut module)?;
//! assert!(results[0].may_alias(a, b)?);
//! ```

use super::result::AliasAnalysisResult;
use crate::config::{AliasConfig, AliasSettings, ParallelConfig};
use crate::errors::{AliasError, AliasResult};
use crate::features::alias_analysis::infrastructure::AliasClass;
use crate::features::alias_analysis::ports::{NoSummaries, SideEffectOracle};
use crate::shared::models::{Function, Module, Symbol, TypeTable};
use rayon::prelude::*;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Alias analyzer: configuration plus the callee-summary source
#[derive(Clone)]
pub struct AliasAnalyzer {
    config: AliasConfig,
    parallel: ParallelConfig,
    oracle: Arc<dyn SideEffectOracle>,
}

impl Default for AliasAnalyzer {
    fn default() -> Self {
        Self::new(AliasConfig::default())
    }
}

impl AliasAnalyzer {
    pub fn new(config: AliasConfig) -> Self {
        Self {
            config,
            parallel: ParallelConfig::default(),
            oracle: Arc::new(NoSummaries),
        }
    }

    pub fn from_settings(settings: &AliasSettings) -> Self {
        Self {
            config: settings.alias.clone(),
            parallel: settings.parallel.clone(),
            oracle: Arc::new(NoSummaries),
        }
    }

    /// Use `oracle` for callee side-effect summaries
    pub fn with_oracle(mut self, oracle: impl SideEffectOracle + 'static) -> Self {
        self.oracle = Arc::new(oracle);
        self
    }

    pub fn with_parallel(mut self, parallel: ParallelConfig) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn config(&self) -> &AliasConfig {
        &self.config
    }

    /// Analyze one function: both passes, annotations written into `func`
    pub fn analyze_function(
        &self,
        func: &mut Function,
        types: &TypeTable,
        globals: &[Symbol],
    ) -> AliasResult<AliasAnalysisResult> {
        let stmts = func.stmt_count();
        let (env, blocks) = func.split(types, globals);
        debug!(function = env.name, stmts, "alias analysis started");

        let mut ac = AliasClass::new(env, &self.config, self.oracle.as_ref(), types);
        ac.collect(blocks)?;
        ac.propagate()?;
        ac.materialize()?;
        ac.insert_may_def_use(blocks)?;

        let result = AliasAnalysisResult::from_context(ac);
        let stats = result.stats();
        info!(
            function = %result.function_name(),
            osts = stats.osts,
            alias_sets = result.classes().alias_sets.len(),
            nads = stats.nads_count,
            may_defs = stats.may_defs,
            may_uses = stats.may_uses,
            duration_ms = stats.duration_ms,
            "alias analysis finished"
        );
        Ok(result)
    }

    /// Analyze every function of `module`, in module order
    pub fn analyze_module(&self, module: &mut Module) -> AliasResult<Vec<AliasAnalysisResult>> {
        let start = Instant::now();
        let types = &module.types;
        let globals = module.globals.as_slice();
        let functions = &mut module.functions;
        let run = |func: &mut Function| self.analyze_function(func, types, globals);

        let results: Vec<AliasAnalysisResult> = if !self.parallel.enable_rayon || functions.len() < 2 {
            functions.iter_mut().map(run).collect::<AliasResult<_>>()?
        } else if self.parallel.num_workers > 0 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.parallel.num_workers)
                .thread_name(|i| format!("alias-worker-{}", i))
                .build()
                .map_err(|e| AliasError::ThreadPool(e.to_string()))?;
            pool.install(|| functions.par_iter_mut().map(run).collect::<AliasResult<_>>())?
        } else {
            functions.par_iter_mut().map(run).collect::<AliasResult<_>>()?
        };

        info!(
            module = %module.name,
            functions = results.len(),
            parallel = self.parallel.enable_rayon,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "module analyzed"
        );
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::{Expr, FuncId, FunctionBuilder, PrimType};

    fn module_with(n: u32) -> Module {
        let mut types = TypeTable::new();
        let i32_ty = types.prim(PrimType::I32);
        let int_ptr = types.pointer_to(i32_ty);
        let mut module = Module::new("m", types);
        for i in 0..n {
            let mut b = FunctionBuilder::new(FuncId(i), format!("f{}", i));
            let a = b.local("a", i32_ty);
            let p = b.local("p", int_ptr);
            b.dassign(p, Expr::addr_of(a));
            b.iassign(int_ptr, 0, Expr::dread(p, PrimType::Ptr), Expr::constant(PrimType::I32, 1));
            b.ret(vec![]);
            module.add_function(b.build());
        }
        module
    }

    #[test]
    fn test_parallel_and_sequential_agree() {
        let mut sequential = module_with(4);
        let mut parallel = sequential.clone();

        let seq = AliasAnalyzer::default()
            .with_parallel(ParallelConfig {
                enable_rayon: false,
                num_workers: 0,
            })
            .analyze_module(&mut sequential)
            .unwrap();
        let par = AliasAnalyzer::default()
            .with_parallel(ParallelConfig {
                enable_rayon: true,
                num_workers: 2,
            })
            .analyze_module(&mut parallel)
            .unwrap();

        assert_eq!(seq.len(), 4);
        for (s, p) in seq.iter().zip(&par) {
            assert_eq!(s.function_name(), p.function_name());
            assert_eq!(s.alias_partition(), p.alias_partition());
        }
        assert_eq!(sequential, parallel);
    }
}
