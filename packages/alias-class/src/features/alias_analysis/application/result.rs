//! Analysis result and queries
//!
//! [`AliasAnalysisResult`] keeps what survives a function's analysis: the
//! descriptor table, the frozen classes, escape flags and the per-statement
//! annotations. Everything else in the context is dropped.

use crate::errors::AliasResult;
use crate::features::alias_analysis::domain::{AliasStats, OstBase, StmtAnnotations};
use crate::features::alias_analysis::infrastructure::{
    AliasClass, DescriptorTable, FrozenClasses, OstFlags,
};
use crate::shared::models::{FuncId, OstIdx, StmtId, SymbolId, VstIdx};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Serialize)]
pub struct AliasAnalysisResult {
    function_id: FuncId,
    function_name: String,
    table: DescriptorTable,
    classes: FrozenClasses,
    flags: Vec<OstFlags>,
    globals_affected_by_calls: BTreeSet<OstIdx>,
    annotations: BTreeMap<StmtId, StmtAnnotations>,
    stats: AliasStats,
}

/// Human-readable dump of one function's result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AliasReport {
    pub function: String,
    pub stats: AliasStats,
    /// Non-singleton alias sets, by descriptor name
    pub alias_sets: Vec<Vec<String>>,
    /// Non-singleton assign sets, by descriptor name and version
    pub assign_sets: Vec<Vec<String>>,
    pub nads: Vec<String>,
    pub statements: Vec<StmtReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StmtReport {
    pub stmt: StmtId,
    pub may_def: Vec<String>,
    pub may_use: Vec<String>,
}

impl AliasAnalysisResult {
    pub(crate) fn from_context(ac: AliasClass<'_>) -> Self {
        Self {
            function_id: ac.env.id,
            function_name: ac.env.name.to_string(),
            table: ac.table,
            classes: ac.classes,
            flags: ac.flags,
            globals_affected_by_calls: ac.globals_affected_by_calls,
            annotations: ac.annotations,
            stats: ac.stats,
        }
    }

    pub fn function_id(&self) -> FuncId {
        self.function_id
    }

    pub fn function_name(&self) -> &str {
        &self.function_name
    }

    pub fn table(&self) -> &DescriptorTable {
        &self.table
    }

    pub fn classes(&self) -> &FrozenClasses {
        &self.classes
    }

    pub fn stats(&self) -> &AliasStats {
        &self.stats
    }

    pub fn flags(&self, ost: OstIdx) -> Option<OstFlags> {
        self.flags.get(ost.0 as usize).copied()
    }

    pub fn globals_affected_by_calls(&self) -> &BTreeSet<OstIdx> {
        &self.globals_affected_by_calls
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Queries
    // ═══════════════════════════════════════════════════════════════════════

    pub fn may_alias(&self, a: OstIdx, b: OstIdx) -> AliasResult<bool> {
        self.table.get_ost(a)?;
        self.table.get_ost(b)?;
        Ok(self.classes.may_alias(&self.table, a, b))
    }

    /// Alias set of `ost`, itself included
    pub fn alias_set_of(&self, ost: OstIdx) -> AliasResult<Vec<OstIdx>> {
        self.table.get_ost(ost)?;
        Ok(self.classes.alias_members(ost))
    }

    /// Assign set of `vst`, itself included
    pub fn assign_set_of(&self, vst: VstIdx) -> AliasResult<Vec<VstIdx>> {
        self.table.get_vst(vst)?;
        Ok(self.classes.assign_sets.members(vst))
    }

    /// Locations any value in `vst`'s assign set may point to
    pub fn points_to(&self, vst: VstIdx) -> AliasResult<BTreeSet<OstIdx>> {
        self.table.get_vst(vst)?;
        let mut out = BTreeSet::new();
        for member in self.classes.assign_sets.members(vst) {
            for &pointee in self.table.next_level(self.table.ost_of(member)) {
                out.extend(self.classes.alias_members(pointee));
            }
        }
        Ok(out)
    }

    pub fn is_nads(&self, ost: OstIdx) -> bool {
        self.classes.is_nads(ost)
    }

    pub fn nads_set(&self) -> &BTreeSet<OstIdx> {
        &self.classes.nads
    }

    pub fn annotations(&self, stmt: StmtId) -> Option<&StmtAnnotations> {
        self.annotations.get(&stmt)
    }

    pub fn all_annotations(&self) -> &BTreeMap<StmtId, StmtAnnotations> {
        &self.annotations
    }

    /// Descriptor of symbol `sym` (field `field_id`, 0 for the whole symbol)
    pub fn find_symbol_ost(&self, sym: SymbolId, field_id: u32) -> Option<OstIdx> {
        self.table
            .osts()
            .find(|o| o.base == OstBase::Symbol(sym) && o.indirect_lev == 0 && o.field_id == field_id)
            .map(|o| o.index)
    }

    pub fn describe(&self, ost: OstIdx) -> AliasResult<&str> {
        Ok(self.table.get_ost(ost)?.name.as_str())
    }

    /// Every descriptor grouped by alias set, singletons included
    pub fn alias_partition(&self) -> Vec<Vec<OstIdx>> {
        let groups: BTreeSet<Vec<OstIdx>> = self
            .table
            .ost_indices()
            .map(|o| self.classes.alias_members(o))
            .collect();
        groups.into_iter().collect()
    }

    /// Every version grouped by assign set, singletons included
    pub fn assign_partition(&self) -> Vec<Vec<VstIdx>> {
        let groups: BTreeSet<Vec<VstIdx>> = self
            .table
            .vsts()
            .map(|v| self.classes.assign_sets.members(v.index))
            .collect();
        groups.into_iter().collect()
    }

    pub fn report(&self) -> AliasReport {
        let ost_name = |o: &OstIdx| self.table.ost(*o).name.clone();
        let vst_name = |v: &VstIdx| {
            let vst = self.table.vst(*v);
            format!("{}#{}", self.table.ost(vst.ost).name, vst.version)
        };
        AliasReport {
            function: self.function_name.clone(),
            stats: self.stats.clone(),
            alias_sets: self
                .classes
                .alias_sets
                .sets()
                .map(|s| s.iter().map(ost_name).collect())
                .collect(),
            assign_sets: self
                .classes
                .assign_sets
                .sets()
                .map(|s| s.iter().map(vst_name).collect())
                .collect(),
            nads: self.classes.nads.iter().map(ost_name).collect(),
            statements: self
                .annotations
                .iter()
                .map(|(&stmt, ann)| StmtReport {
                    stmt,
                    may_def: ann.may_def_osts().map(|o| ost_name(&o)).collect(),
                    may_use: ann.may_use_osts().map(|o| ost_name(&o)).collect(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::alias_analysis::application::AliasAnalyzer;
    use crate::shared::models::{Expr, FuncId, FunctionBuilder, PrimType, TypeTable};

    #[test]
    fn test_queries_on_pointer_store() {
        let mut types = TypeTable::new();
        let i32_ty = types.prim(PrimType::I32);
        let int_ptr = types.pointer_to(i32_ty);
        let mut b = FunctionBuilder::new(FuncId(0), "f");
        let a = b.local("a", i32_ty);
        let p = b.local("p", int_ptr);
        b.dassign(p, Expr::addr_of(a));
        let store = b.iassign(int_ptr, 0, Expr::dread(p, PrimType::Ptr), Expr::constant(PrimType::I32, 1));
        let mut func = b.build();

        let result = AliasAnalyzer::default().analyze_function(&mut func, &types, &[]).unwrap();
        let ao = result.find_symbol_ost(a, 0).unwrap();
        let po = result.find_symbol_ost(p, 0).unwrap();
        assert_eq!(result.describe(ao).unwrap(), "a");

        let p_vst = result.table().ost(po).zero_version;
        assert!(result.points_to(p_vst).unwrap().contains(&ao));
        assert!(result.annotations(store).unwrap().defines(ao));
        assert!(!result.may_alias(ao, po).unwrap());
        assert!(result.alias_set_of(OstIdx(10_000)).is_err());

        let report = result.report();
        assert_eq!(report.function, "f");
        assert!(report.statements.iter().any(|s| s.may_def.contains(&"a".to_string())));
        assert!(serde_json::to_string(&report).is_ok());
    }
}
