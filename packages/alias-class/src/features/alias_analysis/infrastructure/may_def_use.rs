//! Pass 2: may-def / may-use insertion
//!
//! A second walk over the statements, reading only the frozen classes. Every
//! statement gets an annotation entry (possibly empty) and every indirect
//! read is stamped with the location it resolves to.

use super::context::{AliasClass, Phase};
use super::intrinsics::describe;
use crate::errors::{AliasError, AliasResult};
use crate::features::alias_analysis::domain::{MayDefNode, MayUseNode, StmtAnnotations};
use crate::features::alias_analysis::ports::{ArgEffect, CalleeSummary};
use crate::shared::models::{
    AsmNode, BasicBlock, BlockKind, CallNode, CallTarget, Expr, IntrinsicCallNode, LValue, OstIdx,
    Stmt, StmtId, StmtKind, VstIdx,
};
use std::collections::{BTreeSet, VecDeque};
use tracing::debug;

/// Annotations of one statement while they are being gathered
#[derive(Debug, Default)]
struct Pending {
    defs: BTreeSet<OstIdx>,
    uses: BTreeSet<OstIdx>,
    /// Final locations this statement may legitimately define
    final_defs_allowed: BTreeSet<OstIdx>,
}

impl Pending {
    fn both(&mut self, osts: impl IntoIterator<Item = OstIdx>) {
        for ost in osts {
            self.uses.insert(ost);
            self.defs.insert(ost);
        }
    }
}

impl<'a> AliasClass<'a> {
    /// Materialized → Annotated
    pub fn insert_may_def_use(&mut self, blocks: &mut [BasicBlock]) -> AliasResult<()> {
        self.require("insert_may_def_use", Phase::Materialized)?;
        for block in blocks.iter_mut() {
            let kind = block.kind;
            for stmt in block.stmts.iter_mut() {
                for expr in stmt.exprs_mut() {
                    self.stamp_ireads(expr)?;
                }
                let pending = self.annotate(stmt, kind)?;
                let annotations = self.finish(stmt.id, pending)?;
                self.stats.may_defs += annotations.may_defs.len();
                self.stats.may_uses += annotations.may_uses.len();
                self.annotations.insert(stmt.id, annotations);
            }
        }
        self.phase = Phase::Annotated;
        self.finish_stats();
        debug!(
            function = self.env.name,
            stmts = self.annotations.len(),
            may_defs = self.stats.may_defs,
            may_uses = self.stats.may_uses,
            duration_ms = self.stats.duration_ms,
            "may-def/may-use inserted"
        );
        Ok(())
    }

    pub fn annotations(&self) -> &std::collections::BTreeMap<StmtId, StmtAnnotations> {
        &self.annotations
    }

    fn stamp_ireads(&mut self, expr: &mut Expr) -> AliasResult<()> {
        for opnd in expr.operands_mut() {
            self.stamp_ireads(opnd)?;
        }
        if let Expr::Iread(node) = expr {
            let ost = match self.indirect_ost(node.ty, node.field_id, &node.addr, node.prim)? {
                Some(ost) => ost,
                None => self.nads_dummy(),
            };
            node.ssa_var = Some(self.table.zero_version(ost));
        }
        Ok(())
    }

    fn annotate(&mut self, stmt: &Stmt, block_kind: BlockKind) -> AliasResult<Pending> {
        let mut pending = Pending::default();
        match &stmt.kind {
            StmtKind::Dassign { lhs, .. } => {
                let ost = self
                    .lvalue_ost(&LValue::Var(*lhs))?
                    .ok_or_else(|| AliasError::invariant(format!("{}: assigned variable has no descriptor", stmt.id)))?;
                pending.defs.extend(self.aliased_others(ost));
            }
            StmtKind::Regassign { lhs, .. } => {
                if let Some(ost) = self.lvalue_ost(&LValue::Reg(*lhs))? {
                    pending.defs.extend(self.aliased_others(ost));
                }
            }
            StmtKind::Iassign {
                ty,
                field_id,
                addr,
                rhs,
            } => {
                let ost = match self.indirect_ost(*ty, *field_id, addr, rhs.prim())? {
                    Some(ost) => ost,
                    None => self.nads_dummy(),
                };
                let members = self.classes.alias_members(ost);
                if members.len() == 1 {
                    pending.defs.insert(ost);
                    pending.final_defs_allowed.insert(ost);
                } else {
                    pending.defs.extend(members.into_iter().filter(|&m| {
                        !self.table.ost(m).is_final && self.classes.may_alias(&self.table, ost, m)
                    }));
                    if pending.defs.is_empty() {
                        return Err(AliasError::invariant(format!(
                            "{}: indirect write to {} defines nothing",
                            stmt.id,
                            self.table.ost(ost).name
                        )));
                    }
                }
            }
            StmtKind::Call(call) => self.annotate_call(call, &mut pending)?,
            StmtKind::IntrinsicCall(call) => self.annotate_intrinsic(call, &mut pending)?,
            StmtKind::Asm(asm) => self.annotate_asm(asm, &mut pending)?,
            StmtKind::Return { values } => {
                pending.uses.extend(self.return_base_uses()?);
                for value in values {
                    pending.uses.extend(self.returned_pointees(value)?);
                }
            }
            StmtKind::Throw { value } => {
                if self.config.less_throw_alias {
                    if block_kind != BlockKind::Goto {
                        pending.uses.extend(self.return_base_uses()?);
                        pending.uses.extend(self.returned_pointees(value)?);
                    }
                } else {
                    pending.uses.extend(self.table.osts().filter_map(|o| {
                        (o.indirect_lev >= 0 && !o.is_preg()).then_some(o.index)
                    }));
                }
            }
            StmtKind::SyncEnter { opnds } | StmtKind::SyncExit { opnds } => {
                let mut touched = self.nads_set();
                for opnd in opnds {
                    let info = self.expr_alias_info(opnd)?;
                    let Some(vst) = info.vst else {
                        continue;
                    };
                    let ost = self.table.ost_of(vst);
                    if self.table.ost(ost).is_address_view() {
                        for &target in self.table.next_level(ost) {
                            touched.extend(self.classes.alias_members(target));
                        }
                    } else {
                        touched.extend(self.one_level(vst));
                    }
                }
                pending.both(touched.into_iter().filter(|&o| !self.table.ost(o).is_final));
            }
            StmtKind::Eval { .. } | StmtKind::CondGoto { .. } | StmtKind::Goto { .. } => {}
        }
        Ok(pending)
    }

    fn finish(&self, stmt: StmtId, pending: Pending) -> AliasResult<StmtAnnotations> {
        let mut annotations = StmtAnnotations::default();
        for ost in pending.defs {
            let o = self.table.ost(ost);
            if o.is_final && !pending.final_defs_allowed.contains(&ost) {
                return Err(AliasError::invariant(format!(
                    "{}: final location {} in may-def set",
                    stmt, o.name
                )));
            }
            annotations.insert_may_def(MayDefNode {
                ost,
                opnd: o.zero_version,
                stmt,
            });
        }
        for ost in pending.uses {
            annotations.insert_may_use(MayUseNode {
                ost,
                opnd: self.table.zero_version(ost),
            });
        }
        Ok(annotations)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Calls
    // ═══════════════════════════════════════════════════════════════════════

    fn annotate_call(&mut self, call: &CallNode, pending: &mut Pending) -> AliasResult<()> {
        let summary = match &call.target {
            CallTarget::Direct { callee } => self.summary_of(*callee),
            _ => None,
        };
        let side_effect = self.call_has_side_effect(summary.as_ref());
        let attrs = self.env.attrs;
        let same_class_constructor = attrs.is_constructor
            && attrs.class_ty.is_some()
            && summary.as_ref().and_then(|s| s.constructor_of) == attrs.class_ty;

        for (i, arg) in call.args.iter().enumerate() {
            if !arg.prim().is_potential_address() {
                continue;
            }
            let effect = summary.as_ref().map_or(ArgEffect::Unknown, |s| s.arg_effect(i));
            if matches!(effect, ArgEffect::Unused | ArgEffect::ReadSelfOnly) {
                continue;
            }
            let Some(vst) = self.expr_alias_info(arg)?.vst else {
                continue;
            };
            // pointees of escaped pointers are covered by the NADS set below
            if self.next_lev_nads(self.table.ost_of(vst)) {
                continue;
            }
            let allow_final = i == 0 && same_class_constructor;
            let reached = self.reachable_from(vst, allow_final)?;
            if allow_final {
                pending.final_defs_allowed.extend(
                    reached.iter().copied().filter(|&o| self.table.ost(o).is_final),
                );
            }
            match effect {
                ArgEffect::ReadMemoryOnly => pending.uses.extend(reached),
                ArgEffect::WriteMemoryOnly => pending.defs.extend(reached),
                _ => {
                    if side_effect {
                        pending.defs.extend(reached.iter().copied());
                    }
                    pending.uses.extend(reached);
                }
            }
        }

        self.add_opaque_effects(pending, side_effect);
        if side_effect {
            for lhs in &call.return_values {
                self.add_must_def_aliases(lhs, pending)?;
            }
        }
        if summary.as_ref().is_some_and(|s: &CalleeSummary| s.no_private_def) {
            pending.defs.retain(|&o| !self.table.ost(o).is_private);
        }
        Ok(())
    }

    fn annotate_intrinsic(&mut self, call: &IntrinsicCallNode, pending: &mut Pending) -> AliasResult<()> {
        let desc = describe(call.intrinsic);
        let side_effect = !desc.no_side_effect || self.config.callee_has_side_effect;
        let mut infos = Vec::with_capacity(call.args.len());
        for arg in &call.args {
            infos.push(self.expr_alias_info(arg)?);
        }
        for &i in desc.reads {
            if let Some(vst) = infos.get(i).and_then(|info| info.vst) {
                pending.uses.extend(self.one_level(vst));
            }
        }
        for &i in desc.writes {
            if let Some(vst) = infos.get(i).and_then(|info| info.vst) {
                pending.defs.extend(self.one_level(vst));
            }
        }
        self.add_opaque_effects(pending, side_effect || desc.atomic);
        if side_effect {
            for lhs in &call.return_values {
                self.add_must_def_aliases(lhs, pending)?;
            }
        }
        Ok(())
    }

    fn annotate_asm(&mut self, asm: &AsmNode, pending: &mut Pending) -> AliasResult<()> {
        if asm.clobbers_memory() {
            for input in &asm.inputs {
                if !input.expr.prim().is_potential_address() {
                    continue;
                }
                if let Some(vst) = self.expr_alias_info(&input.expr)?.vst {
                    pending.both(self.reachable_from(vst, false)?);
                }
            }
            self.add_opaque_effects(pending, true);
        } else {
            for input in &asm.inputs {
                if !input.constraint.contains('m') {
                    continue;
                }
                if let Some(vst) = self.expr_alias_info(&input.expr)?.vst {
                    pending.uses.extend(self.one_level(vst));
                }
            }
        }
        for output in &asm.outputs {
            let Some(ost) = self.lvalue_ost(&output.lhs)? else {
                continue;
            };
            pending.defs.extend(self.aliased_others(ost));
            if output.constraint.starts_with('+') {
                pending.uses.insert(ost);
            }
        }
        Ok(())
    }

    /// Effects of an opaque callee: reads of every escaped location and
    /// every global, and writes to them when it has side effects
    fn add_opaque_effects(&self, pending: &mut Pending, side_effect: bool) {
        let finals_excluded = self
            .classes
            .nads
            .iter()
            .chain(&self.globals_affected_by_calls)
            .copied()
            .filter(|&o| !self.table.ost(o).is_final);
        for ost in finals_excluded {
            pending.uses.insert(ost);
            if side_effect {
                pending.defs.insert(ost);
            }
        }
        // final globals are still read
        pending.uses.extend(self.globals_affected_by_calls.iter().copied());
    }

    /// A call's must-def may also change locations aliasing it that have the same type
    fn add_must_def_aliases(&mut self, lhs: &LValue, pending: &mut Pending) -> AliasResult<()> {
        let Some(ost) = self.lvalue_ost(lhs)? else {
            return Ok(());
        };
        if self.classes.is_nads(ost) {
            return Ok(());
        }
        let ty = self.table.ost(ost).ty;
        pending.defs.extend(self.classes.alias_members(ost).into_iter().filter(|&m| {
            let o = self.table.ost(m);
            m != ost && o.ty == ty && !o.is_final
        }));
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Returns
    // ═══════════════════════════════════════════════════════════════════════

    /// Locations a caller may observe after the function returns
    fn return_base_uses(&mut self) -> AliasResult<BTreeSet<OstIdx>> {
        let mut uses = self.nads_set();
        uses.extend(self.globals_affected_by_calls.iter().copied());
        let env = self.env;
        for (id, sym) in env.formals() {
            if !sym.attrs.noalias {
                continue;
            }
            if let Some(ost) = self.symbol_ost(id, 0)? {
                uses.extend(self.one_level(self.table.zero_version(ost)));
            }
        }
        if let (true, Some(class_ty)) = (env.attrs.is_constructor, env.attrs.class_ty) {
            let types = env.types;
            uses.extend(self.table.osts().filter_map(|o| {
                let owner = o.prev_level.map(|p| self.table.ost(p).ty)?;
                (o.is_final && types.pointee(owner) == Some(class_ty)).then_some(o.index)
            }));
        }
        Ok(uses)
    }

    /// Pointees of a returned pointer whose targets are all known
    fn returned_pointees(&mut self, value: &Expr) -> AliasResult<BTreeSet<OstIdx>> {
        if !value.prim().is_potential_address() {
            return Ok(BTreeSet::new());
        }
        let Some(vst) = self.expr_alias_info(value)?.vst else {
            return Ok(BTreeSet::new());
        };
        let ost = self.table.ost_of(vst);
        if self.next_lev_nads(ost) || self.is_read_only_address(ost) {
            return Ok(BTreeSet::new());
        }
        Ok(self
            .one_level(vst)
            .into_iter()
            .filter(|&o| !self.classes.is_nads(o))
            .collect())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Closures over the frozen classes
    // ═══════════════════════════════════════════════════════════════════════

    fn nads_set(&self) -> BTreeSet<OstIdx> {
        self.classes.nads.clone()
    }

    /// Members of `ost`'s alias set that may overlap it, excluding itself and finals
    fn aliased_others(&self, ost: OstIdx) -> Vec<OstIdx> {
        self.classes
            .alias_members(ost)
            .into_iter()
            .filter(|&m| {
                m != ost
                    && !self.table.ost(m).is_final
                    && self.classes.may_alias(&self.table, ost, m)
            })
            .collect()
    }

    /// Pointees of every value in `vst`'s assign set, expanded by alias set
    fn pointee_aliases(&self, vst: VstIdx) -> BTreeSet<OstIdx> {
        let mut out = BTreeSet::new();
        for member in self.classes.assign_sets.members(vst) {
            for &pointee in self.table.next_level(self.table.ost_of(member)) {
                out.extend(self.classes.alias_members(pointee));
            }
        }
        out.retain(|&o| !self.table.ost(o).is_address_view());
        out
    }

    /// One dereference level, finals excluded
    fn one_level(&self, vst: VstIdx) -> BTreeSet<OstIdx> {
        let mut out = self.pointee_aliases(vst);
        out.retain(|&o| !self.table.ost(o).is_final);
        out
    }

    /// Every location reachable through `vst`, level by level, stopping at
    /// locations whose deeper levels are already covered by NADS
    fn reachable_from(&self, vst: VstIdx, allow_final: bool) -> AliasResult<BTreeSet<OstIdx>> {
        let limit = self.config.max_collect_depth;
        let mut reached = BTreeSet::new();
        let mut visited = BTreeSet::new();
        let mut frontier: VecDeque<(OstIdx, usize)> =
            self.pointee_aliases(vst).into_iter().map(|o| (o, 1)).collect();
        while let Some((ost, depth)) = frontier.pop_front() {
            if !visited.insert(ost) {
                continue;
            }
            if depth > limit {
                return Err(AliasError::IterationLimit {
                    phase: "pointee collection",
                    limit,
                });
            }
            let o = self.table.ost(ost);
            if o.is_final && !allow_final {
                continue;
            }
            reached.insert(ost);
            if self.classes.is_nads(ost) || self.next_lev_nads(ost) {
                continue;
            }
            for next in self.pointee_aliases(o.zero_version) {
                if !visited.contains(&next) {
                    frontier.push_back((next, depth + 1));
                }
            }
        }
        Ok(reached)
    }
}

#[cfg(test)]
mod tests {
    use crate::config::AliasConfig;
    use crate::features::alias_analysis::infrastructure::context::{AliasClass, Phase};
    use crate::features::alias_analysis::ports::NoSummaries;
    use crate::shared::models::{
        Expr, FuncId, FunctionBuilder, PrimType, StmtId, StmtKind, TypeTable,
    };

    #[test]
    fn test_store_through_pointer_defines_target_and_stamps_reads() {
        let mut types = TypeTable::new();
        let i32_ty = types.prim(PrimType::I32);
        let int_ptr = types.pointer_to(i32_ty);
        let mut b = FunctionBuilder::new(FuncId(0), "f");
        let a = b.local("a", i32_ty);
        let p = b.local("p", int_ptr);
        let v = b.local("v", i32_ty);
        b.dassign(p, Expr::addr_of(a));
        let store = b.iassign(int_ptr, 0, Expr::dread(p, PrimType::Ptr), Expr::constant(PrimType::I32, 1));
        let load = b.dassign(v, Expr::iread(int_ptr, 0, PrimType::I32, Expr::dread(p, PrimType::Ptr)));
        let mut func = b.build();

        let config = AliasConfig::default();
        {
            let (env, blocks) = func.split(&types, &[]);
            let mut ac = AliasClass::new(env, &config, &NoSummaries, &types);
            ac.collect(blocks).unwrap();
            ac.propagate().unwrap();
            ac.materialize().unwrap();
            ac.insert_may_def_use(blocks).unwrap();
            assert_eq!(ac.phase(), Phase::Annotated);

            let ao = ac.symbol_ost(a, 0).unwrap().unwrap();
            assert!(ac.annotations()[&store].defines(ao));
            assert!(ac.annotations()[&load].may_defs.is_empty());
            assert_eq!(ac.annotations().len(), 3);
            assert!(ac.annotations().contains_key(&StmtId(0)));
        }

        let StmtKind::Dassign { rhs: Expr::Iread(node), .. } = &func.blocks[0].stmts[2].kind else {
            panic!("expected a load");
        };
        assert!(node.ssa_var.is_some());
    }
}
