//! Per-function analysis context
//!
//! [`AliasClass`] owns everything one function's analysis needs: the
//! descriptor table, the union-find over versions (assign sets), the
//! union-find over descriptors (alias sets), escape flags and the frozen
//! result. It is built fresh per function and dropped when the function is
//! done, so functions can be analyzed on independent threads.
//!
//! The phases run strictly in order:
//!
//! ```text
//! Fresh --collect--> Collected --propagate--> Converged
//!       --materialize--> Materialized --insert_may_def_use--> Annotated
//! ```
//!
//! Descriptors, versions and escape flags are only created while collecting;
//! later phases resolve expressions against the finished table.

use super::descriptor_table::{DescriptorTable, OstAttrs};
use super::materialize::FrozenClasses;
use super::union_find::UnionFind;
use crate::config::AliasConfig;
use crate::errors::{AliasError, AliasResult};
use crate::features::alias_analysis::domain::{
    AliasStats, OffsetType, OriginalSt, OstBase, OstKey, StmtAnnotations,
};
use crate::features::alias_analysis::ports::{ClassHierarchy, SideEffectOracle};
use crate::shared::models::{
    FunctionEnv, LValue, OstIdx, PregIdx, PrimType, StmtId, SymbolId, VstIdx,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;
use tracing::trace;

/// Escape state of one descriptor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OstFlags {
    /// Not every write to this location is visible
    pub nads: bool,
    /// Not every write to the locations this one points to is visible
    pub next_lev_nads: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Fresh,
    Collected,
    Converged,
    Materialized,
    Annotated,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Fresh => "fresh",
            Phase::Collected => "collected",
            Phase::Converged => "converged",
            Phase::Materialized => "materialized",
            Phase::Annotated => "annotated",
        }
    }
}

pub struct AliasClass<'a> {
    pub(crate) env: FunctionEnv<'a>,
    pub(crate) config: &'a AliasConfig,
    pub(crate) oracle: &'a dyn SideEffectOracle,
    pub(crate) hierarchy: &'a dyn ClassHierarchy,

    pub(crate) table: DescriptorTable,
    /// Over version indices: may hold the same value
    pub(crate) vst_uf: UnionFind,
    /// Over descriptor indices: may overlap in memory
    pub(crate) ost_uf: UnionFind,
    /// Indexed by descriptor
    pub(crate) flags: Vec<OstFlags>,
    /// NADS state of a whole alias group; only meaningful at roots
    pub(crate) group_nads: Vec<bool>,

    pub(crate) globals_affected_by_calls: BTreeSet<OstIdx>,
    /// (lhs, rhs) versions of whole-aggregate copies
    pub(crate) deferred_agg_copies: Vec<(VstIdx, VstIdx)>,
    /// (destination, source) pointer versions of memory-copy intrinsics
    pub(crate) memory_copies: Vec<(VstIdx, VstIdx)>,
    /// Pointers assigned from an address with a non-zero or unknown offset
    pub(crate) shifted_pointers: BTreeSet<VstIdx>,
    pub(crate) nads_dummy: Option<OstIdx>,

    pub(crate) classes: FrozenClasses,
    pub(crate) annotations: BTreeMap<StmtId, StmtAnnotations>,
    pub(crate) stats: AliasStats,
    pub(crate) phase: Phase,
    pub(crate) started: Instant,
}

impl<'a> AliasClass<'a> {
    pub fn new(
        env: FunctionEnv<'a>,
        config: &'a AliasConfig,
        oracle: &'a dyn SideEffectOracle,
        hierarchy: &'a dyn ClassHierarchy,
    ) -> Self {
        Self {
            env,
            config,
            oracle,
            hierarchy,
            table: DescriptorTable::new(),
            vst_uf: UnionFind::empty(),
            ost_uf: UnionFind::empty(),
            flags: Vec::new(),
            group_nads: Vec::new(),
            globals_affected_by_calls: BTreeSet::new(),
            deferred_agg_copies: Vec::new(),
            memory_copies: Vec::new(),
            shifted_pointers: BTreeSet::new(),
            nads_dummy: None,
            classes: FrozenClasses::default(),
            annotations: BTreeMap::new(),
            stats: AliasStats::default(),
            phase: Phase::Fresh,
            started: Instant::now(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn table(&self) -> &DescriptorTable {
        &self.table
    }

    pub fn stats(&self) -> &AliasStats {
        &self.stats
    }

    pub(crate) fn require(&self, operation: &'static str, required: Phase) -> AliasResult<()> {
        if self.phase == required {
            Ok(())
        } else {
            Err(AliasError::PhaseOrder {
                operation,
                required: required.as_str(),
                current: self.phase.as_str(),
            })
        }
    }

    #[inline]
    pub(crate) fn collecting(&self) -> bool {
        self.phase == Phase::Fresh
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Descriptor creation
    // ═══════════════════════════════════════════════════════════════════════

    /// Registers a new descriptor with both union-finds and applies the
    /// storage-class escape rules
    fn register_ost(&mut self, idx: OstIdx) {
        let ost = self.table.ost(idx);
        self.ost_uf.new_member(idx.0);
        self.vst_uf.new_member(ost.zero_version.0);
        if self.flags.len() <= idx.0 as usize {
            self.flags.resize(idx.0 as usize + 1, OstFlags::default());
            self.group_nads.resize(idx.0 as usize + 1, false);
        }
        if ost.indirect_lev < 0 || ost.is_nads_dummy() {
            return;
        }

        // loaded pointers come from memory the analysis does not track
        let mut next_lev = ost.indirect_lev > 0;
        let mut affected_by_calls = false;
        if let Some(sym) = ost.symbol().and_then(|id| self.env.symbol(id)) {
            if sym.storage.is_global() && !sym.attrs.read_only && !sym.attrs.is_tmp {
                next_lev = true;
                affected_by_calls = !ost.is_final || self.env.attrs.is_constructor;
            }
            if ost.indirect_lev == 0 && sym.is_formal() && !sym.attrs.noalias {
                next_lev = true;
            }
        }
        if affected_by_calls {
            self.globals_affected_by_calls.insert(idx);
        }
        if next_lev {
            self.flags[idx.0 as usize].next_lev_nads = true;
        }
        trace!(ost = %idx, name = %self.table.ost(idx).name, next_lev, "new descriptor");
    }

    /// Creates while collecting; afterwards only finds
    pub(crate) fn find_or_create_ost(&mut self, key: OstKey, attrs: OstAttrs) -> Option<OstIdx> {
        if !self.collecting() {
            return self.table.lookup(&key);
        }
        let (idx, created) = self.table.find_or_create(key, attrs);
        if created {
            self.register_ost(idx);
        }
        Some(idx)
    }

    /// Descriptor of a symbol or one of its fields
    pub(crate) fn symbol_ost(&mut self, id: SymbolId, field_id: u32) -> AliasResult<Option<OstIdx>> {
        let sym = self.env.symbol(id).ok_or_else(|| AliasError::IndexOutOfRange {
            kind: "Symbol",
            index: match id {
                SymbolId::Global(i) | SymbolId::Local(i) => i as usize,
            },
            len: match id {
                SymbolId::Global(_) => self.env.globals.len(),
                SymbolId::Local(_) => self.env.locals.len(),
            },
        })?;
        let types = self.env.types;
        let field = types.field(sym.ty, field_id).ok_or_else(|| {
            AliasError::malformed_expr(format!(
                "field {} does not exist in type {} of {}",
                field_id,
                types.name(sym.ty),
                sym.name
            ))
        })?;
        let key = OstKey {
            base: OstBase::Symbol(id),
            indirect_lev: 0,
            field_id,
            offset: OffsetType::from_bits(field.bit_offset),
            ty: field.ty,
            prev: None,
        };
        let name = if field_id == 0 {
            sym.name.clone()
        } else {
            format!("{}.{}", sym.name, field_id)
        };
        let attrs = OstAttrs {
            bit_size: nonzero(types.bit_size(field.ty)),
            is_final: sym.attrs.is_final || field.is_final,
            is_private: sym.attrs.is_private || field.is_private,
            read_only: sym.attrs.read_only,
            name,
        };
        Ok(self.find_or_create_ost(key, attrs))
    }

    /// Descriptor of a register; special registers have none
    pub(crate) fn preg_ost(&mut self, idx: PregIdx) -> AliasResult<Option<OstIdx>> {
        let preg = self.env.preg(idx).ok_or(AliasError::IndexOutOfRange {
            kind: "Preg",
            index: idx.0 as usize,
            len: self.env.pregs.len(),
        })?;
        if preg.special {
            return Ok(None);
        }
        let key = OstKey {
            base: OstBase::Preg(idx),
            indirect_lev: 0,
            field_id: 0,
            offset: OffsetType::ZERO,
            ty: self.env.types.prim(preg.prim),
            prev: None,
        };
        let attrs = OstAttrs {
            bit_size: nonzero(preg.prim.bit_size()),
            name: format!("%{}", idx.0),
            ..OstAttrs::default()
        };
        Ok(self.find_or_create_ost(key, attrs))
    }

    /// "Address of `target`" descriptor
    pub(crate) fn addrof_ost(&mut self, target: OstIdx) -> Option<OstIdx> {
        if !self.collecting() {
            return self.table.addrof_of(target);
        }
        let ptr_ty = self.env.types.prim(PrimType::Ptr);
        let (idx, created) = self.table.find_or_create_addrof(target, ptr_ty);
        if created {
            self.register_ost(idx);
        }
        Some(idx)
    }

    pub(crate) fn lvalue_ost(&mut self, lvalue: &LValue) -> AliasResult<Option<OstIdx>> {
        match lvalue {
            LValue::Var(var) => self.symbol_ost(var.sym, var.field_id),
            LValue::Reg(reg) => self.preg_ost(reg.preg),
        }
    }

    /// Version occurrence of `ost`; falls back to the zero version once
    /// collection is over
    pub(crate) fn version_of(&mut self, ost: OstIdx, version: u32) -> VstIdx {
        if !self.collecting() {
            return self
                .table
                .version(ost, version)
                .unwrap_or_else(|| self.table.zero_version(ost));
        }
        let (vst, created) = self.table.find_or_create_version(ost, version);
        if created {
            self.vst_uf.new_member(vst.0);
        }
        vst
    }

    pub(crate) fn lvalue_vst(&mut self, lvalue: &LValue) -> AliasResult<Option<VstIdx>> {
        let version = match lvalue {
            LValue::Var(var) => var.version,
            LValue::Reg(reg) => reg.version,
        };
        Ok(self.lvalue_ost(lvalue)?.map(|ost| self.version_of(ost, version)))
    }

    /// Synthetic stand-in for every location with unseen definitions
    pub(crate) fn nads_dummy(&mut self) -> OstIdx {
        if let Some(dummy) = self.nads_dummy {
            return dummy;
        }
        let key = OstKey {
            base: OstBase::NadsDummy,
            indirect_lev: 0,
            field_id: 0,
            offset: OffsetType::ZERO,
            ty: self.env.types.prim(PrimType::Void),
            prev: None,
        };
        let attrs = OstAttrs {
            name: "nads_dummy".to_string(),
            ..OstAttrs::default()
        };
        let (idx, created) = self.table.find_or_create(key, attrs);
        if created {
            self.register_ost(idx);
        }
        self.flags[idx.0 as usize].nads = true;
        let root = self.ost_uf.root(idx.0);
        self.group_nads[root as usize] = true;
        self.nads_dummy = Some(idx);
        idx
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Escape state
    // ═══════════════════════════════════════════════════════════════════════

    pub(crate) fn mark_next_lev_nads(&mut self, ost: OstIdx) {
        self.flags[ost.0 as usize].next_lev_nads = true;
    }

    /// Returns true when the flags changed
    pub(crate) fn mark_nads(&mut self, ost: OstIdx) -> bool {
        let flags = &mut self.flags[ost.0 as usize];
        let changed = !(flags.nads && flags.next_lev_nads);
        flags.nads = true;
        flags.next_lev_nads = true;
        changed
    }

    pub fn is_nads(&self, ost: OstIdx) -> bool {
        self.flags[ost.0 as usize].nads || self.group_nads[self.ost_uf.find(ost.0) as usize]
    }

    #[inline]
    pub(crate) fn next_lev_nads(&self, ost: OstIdx) -> bool {
        self.flags[ost.0 as usize].next_lev_nads
    }

    pub fn nads_osts(&self) -> BTreeSet<OstIdx> {
        self.table.ost_indices().filter(|&o| self.is_nads(o)).collect()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Unions
    // ═══════════════════════════════════════════════════════════════════════

    /// Union two alias groups unless the pair must stay apart: the same
    /// descriptor, a final or address-of view, or provably disjoint storage.
    /// Returns true when the groups were merged.
    pub(crate) fn union_osts(&mut self, a: OstIdx, b: OstIdx) -> bool {
        if a == b {
            return false;
        }
        let (oa, ob) = (self.table.ost(a), self.table.ost(b));
        if refuses_union(oa, ob) {
            self.stats.refused_unions += 1;
            trace!(a = %oa.name, b = %ob.name, "union refused");
            return false;
        }
        let ra = self.ost_uf.root(a.0);
        let rb = self.ost_uf.root(b.0);
        if ra == rb {
            return false;
        }
        let nads = self.group_nads[ra as usize] || self.group_nads[rb as usize];
        let root = self.ost_uf.union(ra, rb);
        self.group_nads[root as usize] = nads;
        self.stats.ost_unions += 1;
        true
    }

    /// Returns true when the groups were merged
    pub(crate) fn union_vsts(&mut self, a: VstIdx, b: VstIdx) -> bool {
        let ra = self.vst_uf.root(a.0);
        let rb = self.vst_uf.root(b.0);
        if ra == rb {
            return false;
        }
        self.vst_uf.union(ra, rb);
        self.stats.vst_unions += 1;
        true
    }

    /// Every pointee of every member of `vst`'s assign group
    pub(crate) fn group_pointees(&self, vst: VstIdx) -> BTreeSet<OstIdx> {
        self.vst_uf
            .members(vst.0)
            .into_iter()
            .flat_map(|m| self.table.next_level(self.table.ost_of(VstIdx(m))).iter().copied())
            .collect()
    }

    pub(crate) fn finish_stats(&mut self) {
        self.stats.osts = self.table.num_osts();
        self.stats.vsts = self.table.num_vsts();
        self.stats.duration_ms = self.started.elapsed().as_secs_f64() * 1000.0;
    }
}

/// Pairs the alias union-find must never merge directly
pub(crate) fn refuses_union(a: &OriginalSt, b: &OriginalSt) -> bool {
    a.is_final || b.is_final || a.is_address_view() || b.is_address_view() || a.known_disjoint(b)
}

#[inline]
fn nonzero(bits: u64) -> Option<u64> {
    (bits != 0).then_some(bits)
}
