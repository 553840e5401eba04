//! Pass 1: collect descriptors, assign sets and escapes
//!
//! Walks every phi and statement once. Copy-like assignments and phis put
//! their two sides in one assign set; everything that lets a pointer leave
//! the analysis's sight marks the pointer's pointees as escaped.

use super::context::{AliasClass, Phase};
use super::intrinsics::describe;
use crate::errors::AliasResult;
use crate::features::alias_analysis::domain::{AliasInfo, OffsetType};
use crate::features::alias_analysis::ports::{ArgEffect, CalleeSummary, SummarySource};
use crate::shared::models::{
    BasicBlock, CallNode, CallTarget, Expr, FuncId, IntrinsicCallNode, LValue, OstIdx, Phi,
    PrimType, Stmt, StmtKind, VstIdx,
};
use tracing::{debug, trace};

impl<'a> AliasClass<'a> {
    /// Pass 1 over the whole function
    pub fn collect(&mut self, blocks: &[BasicBlock]) -> AliasResult<()> {
        self.require("collect", Phase::Fresh)?;
        for block in blocks {
            for phi in &block.phis {
                self.collect_phi(phi)?;
            }
            for stmt in &block.stmts {
                self.collect_stmt(stmt)?;
            }
        }
        self.nads_dummy();
        self.phase = Phase::Collected;
        debug!(
            function = self.env.name,
            osts = self.table.num_osts(),
            vsts = self.table.num_vsts(),
            vst_unions = self.stats.vst_unions,
            "collected assign sets"
        );
        Ok(())
    }

    fn collect_phi(&mut self, phi: &Phi) -> AliasResult<()> {
        let Some(lhs) = self.lvalue_vst(&phi.lhs)? else {
            return Ok(());
        };
        for opnd in &phi.opnds {
            if let Some(vst) = self.lvalue_vst(opnd)? {
                self.union_vsts(lhs, vst);
            }
        }
        Ok(())
    }

    fn collect_stmt(&mut self, stmt: &Stmt) -> AliasResult<()> {
        match &stmt.kind {
            StmtKind::Dassign { lhs, rhs } => {
                let info = self.expr_alias_info(rhs)?;
                self.assign_direct(&LValue::Var(*lhs), rhs, info)
            }
            StmtKind::Regassign { lhs, rhs } => {
                let info = self.expr_alias_info(rhs)?;
                self.assign_direct(&LValue::Reg(*lhs), rhs, info)
            }
            StmtKind::Iassign {
                ty,
                field_id,
                addr,
                rhs,
            } => {
                let lhs = self.indirect_ost(*ty, *field_id, addr, rhs.prim())?;
                let info = self.expr_alias_info(rhs)?;
                match lhs {
                    Some(ost) => {
                        let vst = self.table.zero_version(ost);
                        let prim = self.env.types.prim_of(self.table.ost(ost).ty);
                        self.copy(ost, vst, prim, rhs, info);
                    }
                    // stored somewhere untracked
                    None => {
                        if rhs.prim().is_pointer_shaped() {
                            if let Some(vst) = info.vst {
                                let ost = self.table.ost_of(vst);
                                self.mark_next_lev_nads(ost);
                            }
                        }
                    }
                }
                Ok(())
            }
            StmtKind::Call(call) => self.collect_call(call),
            StmtKind::IntrinsicCall(call) => self.collect_intrinsic_call(call),
            StmtKind::Asm(asm) => {
                let clobbers_memory = asm.clobbers_memory();
                for input in &asm.inputs {
                    let info = self.expr_alias_info(&input.expr)?;
                    if clobbers_memory && input.expr.prim().is_potential_address() {
                        self.escape_info(info);
                    }
                }
                for output in &asm.outputs {
                    if let Some(ost) = self.lvalue_ost(&output.lhs)? {
                        self.lvalue_vst(&output.lhs)?;
                        if self.lvalue_prim(&output.lhs).is_pointer_shaped() {
                            self.mark_next_lev_nads(ost);
                        }
                    }
                }
                Ok(())
            }
            StmtKind::Throw { value } => {
                let info = self.expr_alias_info(value)?;
                if value.prim().is_potential_address() {
                    self.escape_info(info);
                }
                Ok(())
            }
            StmtKind::Return { .. }
            | StmtKind::SyncEnter { .. }
            | StmtKind::SyncExit { .. }
            | StmtKind::Eval { .. }
            | StmtKind::CondGoto { .. }
            | StmtKind::Goto { .. } => {
                for expr in stmt.exprs() {
                    self.expr_alias_info(expr)?;
                }
                Ok(())
            }
        }
    }

    fn assign_direct(&mut self, lhs: &LValue, rhs: &Expr, info: AliasInfo) -> AliasResult<()> {
        let Some(ost) = self.lvalue_ost(lhs)? else {
            return Ok(());
        };
        let Some(vst) = self.lvalue_vst(lhs)? else {
            return Ok(());
        };
        let prim = self.lvalue_prim(lhs);
        self.copy(ost, vst, prim, rhs, info);
        Ok(())
    }

    /// Copy rule: `lhs = rhs` where `rhs` resolved to `info`
    fn copy(&mut self, lhs_ost: OstIdx, lhs_vst: VstIdx, lhs_prim: PrimType, rhs: &Expr, info: AliasInfo) {
        // a null pointer aliases nothing; any other constant is an address we cannot see
        if rhs.is_const_zero() {
            return;
        }
        let rhs_prim = rhs.prim();
        if lhs_prim == PrimType::Agg && rhs_prim == PrimType::Agg {
            if let Some(rhs_vst) = info.vst {
                self.deferred_agg_copies.push((lhs_vst, rhs_vst));
            }
            return;
        }
        let lhs_ptr = lhs_prim.is_pointer_shaped();
        let Some(rhs_vst) = info.vst else {
            if lhs_ptr {
                self.mark_next_lev_nads(lhs_ost);
            }
            return;
        };
        let rhs_ptr = rhs_prim.is_pointer_shaped();
        if lhs_ptr != rhs_ptr {
            if lhs_ptr {
                self.mark_next_lev_nads(lhs_ost);
            } else {
                let rhs_ost = self.table.ost_of(rhs_vst);
                self.mark_next_lev_nads(rhs_ost);
            }
            return;
        }
        if !lhs_ptr {
            return;
        }
        let rhs_ost = self.table.ost_of(rhs_vst);
        if rhs.has_side_effect() || self.is_read_only_address(rhs_ost) {
            self.mark_next_lev_nads(lhs_ost);
            return;
        }
        self.union_vsts(lhs_vst, rhs_vst);
        if info.offset != OffsetType::ZERO || info.field_id != 0 {
            trace!(lhs = %self.table.ost(lhs_ost).name, offset = %info.offset, "shifted pointer");
            self.shifted_pointers.insert(lhs_vst);
        }
    }

    fn collect_call(&mut self, call: &CallNode) -> AliasResult<()> {
        if let CallTarget::Indirect { target } = &call.target {
            self.expr_alias_info(target)?;
        }
        let summary = match &call.target {
            CallTarget::Direct { callee } => self.summary_of(*callee),
            _ => None,
        };
        for (i, arg) in call.args.iter().enumerate() {
            let info = self.expr_alias_info(arg)?;
            if !arg.prim().is_potential_address() {
                continue;
            }
            let Some(vst) = info.vst else {
                continue;
            };
            let ost = self.table.ost_of(vst);
            let escapes = match &summary {
                Some(s) => matches!(s.arg_effect(i), ArgEffect::Unknown | ArgEffect::WriteMemoryOnly),
                None => true,
            };
            if !escapes || self.is_read_only_address(ost) {
                continue;
            }
            if summary.as_ref().is_some_and(|s| s.no_private_def) && self.is_private_target(ost) {
                continue;
            }
            self.mark_next_lev_nads(ost);
        }
        let return_no_alias = summary.as_ref().is_some_and(|s| s.return_no_alias);
        for lhs in &call.return_values {
            self.collect_must_def(lhs, return_no_alias)?;
        }
        Ok(())
    }

    fn collect_intrinsic_call(&mut self, call: &IntrinsicCallNode) -> AliasResult<()> {
        let desc = describe(call.intrinsic);
        let mut infos = Vec::with_capacity(call.args.len());
        for arg in &call.args {
            infos.push(self.expr_alias_info(arg)?);
        }
        if let Some((dst, src)) = desc.copies_memory {
            if let (Some(d), Some(s)) = (
                infos.get(dst).and_then(|i| i.vst),
                infos.get(src).and_then(|i| i.vst),
            ) {
                self.memory_copies.push((d, s));
            }
        }
        for &i in desc.escapes {
            if let Some(info) = infos.get(i) {
                self.escape_info(*info);
            }
        }
        for lhs in &call.return_values {
            self.collect_must_def(lhs, desc.no_side_effect)?;
        }
        Ok(())
    }

    fn collect_must_def(&mut self, lhs: &LValue, no_alias: bool) -> AliasResult<()> {
        let Some(ost) = self.lvalue_ost(lhs)? else {
            return Ok(());
        };
        self.lvalue_vst(lhs)?;
        if !no_alias && self.lvalue_prim(lhs).is_pointer_shaped() {
            self.mark_next_lev_nads(ost);
        }
        Ok(())
    }

    fn escape_info(&mut self, info: AliasInfo) {
        if let Some(vst) = info.vst {
            let ost = self.table.ost_of(vst);
            if !self.is_read_only_address(ost) {
                self.mark_next_lev_nads(ost);
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Shared helpers (both passes)
    // ═══════════════════════════════════════════════════════════════════════

    /// Summary of a direct callee, minus untrusted ones when configured
    pub(crate) fn summary_of(&self, callee: FuncId) -> Option<CalleeSummary> {
        self.oracle.summary(callee).filter(|s| {
            !(self.config.ignore_inferred_summaries && s.source == SummarySource::Inferred)
        })
    }

    pub(crate) fn call_has_side_effect(&self, summary: Option<&CalleeSummary>) -> bool {
        self.config.callee_has_side_effect || summary.map_or(true, CalleeSummary::has_side_effect)
    }

    /// `&x` where `x` is constant-initialized
    pub(crate) fn is_read_only_address(&self, ost: OstIdx) -> bool {
        self.table.ost(ost).is_address_view()
            && self
                .table
                .next_level(ost)
                .first()
                .is_some_and(|&t| self.table.ost(t).read_only)
    }

    fn is_private_target(&self, ost: OstIdx) -> bool {
        let o = self.table.ost(ost);
        o.is_private
            || (o.is_address_view()
                && self
                    .table
                    .next_level(ost)
                    .first()
                    .is_some_and(|&t| self.table.ost(t).is_private))
    }

    pub(crate) fn lvalue_prim(&self, lhs: &LValue) -> PrimType {
        let types = self.env.types;
        match lhs {
            LValue::Var(var) => self
                .env
                .symbol(var.sym)
                .and_then(|s| types.field(s.ty, var.field_id))
                .map_or(PrimType::Void, |f| types.prim_of(f.ty)),
            LValue::Reg(reg) => self.env.preg(reg.preg).map_or(PrimType::Void, |p| p.prim),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AliasConfig;
    use crate::features::alias_analysis::ports::{NoSummaries, SummaryTable};
    use crate::shared::models::{
        AllocKind, BinaryOp, CvtKind, FunctionBuilder, MirType, SymbolId, TyIdx, TypeTable, VarRef,
    };

    fn types() -> (TypeTable, TyIdx) {
        let mut types = TypeTable::new();
        let i32_ty = types.prim(PrimType::I32);
        let int_ptr = types.pointer_to(i32_ty);
        (types, int_ptr)
    }

    fn vst_of(ac: &mut AliasClass<'_>, sym: SymbolId) -> VstIdx {
        let ost = ac.symbol_ost(sym, 0).unwrap().unwrap();
        ac.table.zero_version(ost)
    }

    #[test]
    fn test_pointer_copies_share_an_assign_set() {
        let (types, int_ptr) = types();
        let i32_ty = types.prim(PrimType::I32);
        let mut b = FunctionBuilder::new(FuncId(0), "f");
        let a = b.local("a", i32_ty);
        let p = b.local("p", int_ptr);
        let q = b.local("q", int_ptr);
        let n = b.local("n", int_ptr);
        b.dassign(p, Expr::addr_of(a));
        b.dassign(q, Expr::dread(p, PrimType::Ptr));
        b.dassign(n, Expr::constant(PrimType::Ptr, 0));
        let mut func = b.build();

        let config = AliasConfig::default();
        let (env, blocks) = func.split(&types, &[]);
        let mut ac = AliasClass::new(env, &config, &NoSummaries, &types);
        ac.collect(blocks).unwrap();
        assert_eq!(ac.phase(), Phase::Collected);

        let (pv, qv, nv) = (vst_of(&mut ac, p), vst_of(&mut ac, q), vst_of(&mut ac, n));
        assert!(ac.vst_uf.connected(pv.0, qv.0));
        assert!(!ac.vst_uf.connected(pv.0, nv.0));
        assert!(ac.shifted_pointers.is_empty());
    }

    #[test]
    fn test_escapes_instead_of_unions() {
        let (mut types, int_ptr) = types();
        let heap = types.add(MirType::Scalar { prim: PrimType::I64 });
        let mut b = FunctionBuilder::new(FuncId(0), "f");
        let p = b.local("p", int_ptr);
        let q = b.local("q", int_ptr);
        let r = b.local("r", int_ptr);
        // side-effecting right-hand side
        b.dassign(
            p,
            Expr::cvt(
                CvtKind::Retype,
                PrimType::Ptr,
                PrimType::Ptr,
                Expr::alloc(AllocKind::Heap, heap, Expr::dread(q, PrimType::Ptr)),
            ),
        );
        // unresolved right-hand side
        b.dassign(r, Expr::binary(BinaryOp::And, PrimType::Ptr, Expr::dread(q, PrimType::Ptr), Expr::constant(PrimType::I64, -8)));
        let mut func = b.build();

        let config = AliasConfig::default();
        let (env, blocks) = func.split(&types, &[]);
        let mut ac = AliasClass::new(env, &config, &NoSummaries, &types);
        ac.collect(blocks).unwrap();

        let (po, ro) = (ac.symbol_ost(p, 0).unwrap().unwrap(), ac.symbol_ost(r, 0).unwrap().unwrap());
        assert!(ac.next_lev_nads(po));
        assert!(ac.next_lev_nads(ro));
        assert_eq!(ac.stats.vst_unions, 0);
    }

    #[test]
    fn test_only_null_constant_keeps_pointee_private() {
        let (types, int_ptr) = types();
        let i32_ty = types.prim(PrimType::I32);
        let mut b = FunctionBuilder::new(FuncId(0), "f");
        let raw = b.local("raw", int_ptr);
        let cast = b.local("cast", int_ptr);
        let fresh = b.local("fresh", int_ptr);
        let fresh_cast = b.local("fresh_cast", int_ptr);
        let null = b.local("null", int_ptr);
        let size = || Expr::constant(PrimType::I64, 4);
        b.dassign(raw, Expr::constant(PrimType::Ptr, 4096));
        b.dassign(
            cast,
            Expr::cvt(CvtKind::Retype, PrimType::I64, PrimType::Ptr, Expr::constant(PrimType::I64, 4096)),
        );
        b.dassign(fresh, Expr::alloc(AllocKind::Heap, i32_ty, size()));
        b.dassign(
            fresh_cast,
            Expr::cvt(CvtKind::Retype, PrimType::Ptr, PrimType::Ptr, Expr::alloc(AllocKind::Heap, i32_ty, size())),
        );
        b.dassign(null, Expr::constant(PrimType::Ptr, 0));
        let mut func = b.build();

        let config = AliasConfig::default();
        let (env, blocks) = func.split(&types, &[]);
        let mut ac = AliasClass::new(env, &config, &NoSummaries, &types);
        ac.collect(blocks).unwrap();

        for sym in [raw, cast, fresh, fresh_cast] {
            let ost = ac.symbol_ost(sym, 0).unwrap().unwrap();
            assert!(ac.next_lev_nads(ost), "{:?}", ac.table.ost(ost).name);
        }
        let null_ost = ac.symbol_ost(null, 0).unwrap().unwrap();
        assert!(!ac.next_lev_nads(null_ost));
    }

    #[test]
    fn test_call_argument_escapes_depend_on_summary() {
        let (types, _) = types();
        let i32_ty = types.prim(PrimType::I32);
        let mut b = FunctionBuilder::new(FuncId(0), "f");
        let x = b.local("x", i32_ty);
        let y = b.local("y", i32_ty);
        b.call(FuncId(1), vec![Expr::addr_of(x)]);
        b.call(FuncId(2), vec![Expr::addr_of(y)]);
        let mut func = b.build();

        let summaries = SummaryTable::new().with(
            FuncId(2),
            CalleeSummary::default().with_args(vec![ArgEffect::ReadSelfOnly]),
        );
        let config = AliasConfig::default();
        let (env, blocks) = func.split(&types, &[]);
        let mut ac = AliasClass::new(env, &config, &summaries, &types);
        ac.collect(blocks).unwrap();

        let xo = ac.symbol_ost(x, 0).unwrap().unwrap();
        let yo = ac.symbol_ost(y, 0).unwrap().unwrap();
        assert!(ac.next_lev_nads(ac.table.addrof_of(xo).unwrap()));
        assert!(!ac.next_lev_nads(ac.table.addrof_of(yo).unwrap()));
    }

    #[test]
    fn test_collect_runs_once() {
        let types = TypeTable::new();
        let mut func = FunctionBuilder::new(FuncId(0), "f").build();
        let config = AliasConfig::default();
        let (env, blocks) = func.split(&types, &[]);
        let mut ac = AliasClass::new(env, &config, &NoSummaries, &types);
        ac.collect(blocks).unwrap();
        assert!(matches!(
            ac.collect(blocks),
            Err(crate::errors::AliasError::PhaseOrder { operation: "collect", .. })
        ));
    }

    #[test]
    fn test_phi_unions_operands() {
        let (types, int_ptr) = types();
        let mut b = FunctionBuilder::new(FuncId(0), "f");
        let p = b.local("p", int_ptr);
        let block = b.block(crate::shared::models::BlockKind::Fallthrough);
        b.phi(
            block,
            LValue::Var(VarRef::new(p).versioned(3)),
            vec![
                LValue::Var(VarRef::new(p).versioned(1)),
                LValue::Var(VarRef::new(p).versioned(2)),
            ],
        );
        let mut func = b.build();
        let config = AliasConfig::default();
        let (env, blocks) = func.split(&types, &[]);
        let mut ac = AliasClass::new(env, &config, &NoSummaries, &types);
        ac.collect(blocks).unwrap();

        let po = ac.symbol_ost(p, 0).unwrap().unwrap();
        let v1 = ac.table.version(po, 1).unwrap();
        let v3 = ac.table.version(po, 3).unwrap();
        assert!(ac.vst_uf.connected(v1.0, v3.0));
    }
}
