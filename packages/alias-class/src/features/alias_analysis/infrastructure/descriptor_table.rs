//! Descriptor table
//!
//! Hash-consed arena of [`OriginalSt`]s and their [`VersionSt`]s. Creating a
//! descriptor with an existing key returns the existing index, so a location
//! is never described twice. Every descriptor gets its zero version on
//! creation; other versions are created on demand.

use crate::errors::{AliasError, AliasResult};
use crate::features::alias_analysis::domain::{OriginalSt, OstKey, VersionSt};
use crate::shared::models::{OstIdx, TyIdx, VstIdx, POINTER_BITS};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Attributes recorded when a descriptor is first created
#[derive(Debug, Clone, Default)]
pub struct OstAttrs {
    pub bit_size: Option<u64>,
    pub is_final: bool,
    pub is_private: bool,
    pub read_only: bool,
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DescriptorTable {
    osts: Vec<OriginalSt>,
    vsts: Vec<VersionSt>,
    #[serde(skip)]
    ost_index: FxHashMap<OstKey, OstIdx>,
    #[serde(skip)]
    vst_index: FxHashMap<(OstIdx, u32), VstIdx>,
    /// Address-of descriptor of each target
    #[serde(skip)]
    addrof_index: FxHashMap<OstIdx, OstIdx>,
}

impl DescriptorTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, key: &OstKey) -> Option<OstIdx> {
        self.ost_index.get(key).copied()
    }

    /// Find or create the descriptor for `key`; the flag is true when created
    pub fn find_or_create(&mut self, key: OstKey, attrs: OstAttrs) -> (OstIdx, bool) {
        if let Some(idx) = self.ost_index.get(&key) {
            return (*idx, false);
        }
        let idx = self.push_ost(key, attrs);
        self.ost_index.insert(key, idx);
        if let Some(prev) = key.prev {
            self.add_next_level(prev, idx);
        }
        (idx, true)
    }

    /// Find or create the "address of `target`" descriptor (indirect level -1)
    pub fn find_or_create_addrof(&mut self, target: OstIdx, ptr_ty: TyIdx) -> (OstIdx, bool) {
        if let Some(idx) = self.addrof_index.get(&target) {
            return (*idx, false);
        }
        let t = self.ost(target);
        let key = OstKey {
            base: t.base,
            indirect_lev: -1,
            field_id: t.field_id,
            offset: t.offset,
            ty: ptr_ty,
            prev: None,
        };
        let attrs = OstAttrs {
            bit_size: Some(POINTER_BITS),
            name: format!("&{}", t.name),
            ..OstAttrs::default()
        };
        let idx = self.push_ost(key, attrs);
        self.addrof_index.insert(target, idx);
        self.add_next_level(idx, target);
        self.ost_mut(target).address_taken = true;
        (idx, true)
    }

    pub fn addrof_of(&self, target: OstIdx) -> Option<OstIdx> {
        self.addrof_index.get(&target).copied()
    }

    fn push_ost(&mut self, key: OstKey, attrs: OstAttrs) -> OstIdx {
        let idx = OstIdx(self.osts.len() as u32);
        let zero = VstIdx(self.vsts.len() as u32);
        self.vsts.push(VersionSt {
            index: zero,
            ost: idx,
            version: 0,
        });
        self.vst_index.insert((idx, 0), zero);
        self.osts.push(OriginalSt {
            index: idx,
            base: key.base,
            indirect_lev: key.indirect_lev,
            field_id: key.field_id,
            offset: key.offset,
            ty: key.ty,
            bit_size: attrs.bit_size,
            is_final: attrs.is_final,
            is_private: attrs.is_private,
            read_only: attrs.read_only,
            address_taken: false,
            prev_level: key.prev,
            next_level: Vec::new(),
            zero_version: zero,
            name: attrs.name,
        });
        idx
    }

    /// Record `next` as a pointee of `ost`
    pub fn add_next_level(&mut self, ost: OstIdx, next: OstIdx) {
        let list = &mut self.osts[ost.0 as usize].next_level;
        if !list.contains(&next) {
            list.push(next);
        }
    }

    pub fn version(&self, ost: OstIdx, version: u32) -> Option<VstIdx> {
        self.vst_index.get(&(ost, version)).copied()
    }

    /// Find or create a version; the flag is true when created
    pub fn find_or_create_version(&mut self, ost: OstIdx, version: u32) -> (VstIdx, bool) {
        if let Some(idx) = self.vst_index.get(&(ost, version)) {
            return (*idx, false);
        }
        let idx = VstIdx(self.vsts.len() as u32);
        self.vsts.push(VersionSt {
            index: idx,
            ost,
            version,
        });
        self.vst_index.insert((ost, version), idx);
        (idx, true)
    }

    #[inline]
    pub fn ost(&self, idx: OstIdx) -> &OriginalSt {
        &self.osts[idx.0 as usize]
    }

    #[inline]
    pub fn ost_mut(&mut self, idx: OstIdx) -> &mut OriginalSt {
        &mut self.osts[idx.0 as usize]
    }

    #[inline]
    pub fn vst(&self, idx: VstIdx) -> &VersionSt {
        &self.vsts[idx.0 as usize]
    }

    /// Checked lookup for indices coming from outside the analysis
    pub fn get_ost(&self, idx: OstIdx) -> AliasResult<&OriginalSt> {
        self.osts.get(idx.0 as usize).ok_or(AliasError::IndexOutOfRange {
            kind: "OriginalSt",
            index: idx.0 as usize,
            len: self.osts.len(),
        })
    }

    pub fn get_vst(&self, idx: VstIdx) -> AliasResult<&VersionSt> {
        self.vsts.get(idx.0 as usize).ok_or(AliasError::IndexOutOfRange {
            kind: "VersionSt",
            index: idx.0 as usize,
            len: self.vsts.len(),
        })
    }

    #[inline]
    pub fn ost_of(&self, vst: VstIdx) -> OstIdx {
        self.vsts[vst.0 as usize].ost
    }

    #[inline]
    pub fn zero_version(&self, ost: OstIdx) -> VstIdx {
        self.osts[ost.0 as usize].zero_version
    }

    #[inline]
    pub fn next_level(&self, ost: OstIdx) -> &[OstIdx] {
        &self.osts[ost.0 as usize].next_level
    }

    #[inline]
    pub fn prev_level(&self, ost: OstIdx) -> Option<OstIdx> {
        self.osts[ost.0 as usize].prev_level
    }

    pub fn num_osts(&self) -> usize {
        self.osts.len()
    }

    pub fn num_vsts(&self) -> usize {
        self.vsts.len()
    }

    pub fn osts(&self) -> impl Iterator<Item = &OriginalSt> {
        self.osts.iter()
    }

    pub fn vsts(&self) -> impl Iterator<Item = &VersionSt> {
        self.vsts.iter()
    }

    pub fn ost_indices(&self) -> impl Iterator<Item = OstIdx> {
        (0..self.osts.len() as u32).map(OstIdx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::alias_analysis::domain::{OffsetType, OstBase};
    use crate::shared::models::SymbolId;

    fn key(sym: u32, lev: i32, field_id: u32, prev: Option<OstIdx>) -> OstKey {
        OstKey {
            base: OstBase::Symbol(SymbolId::Local(sym)),
            indirect_lev: lev,
            field_id,
            offset: OffsetType::ZERO,
            ty: TyIdx(6),
            prev,
        }
    }

    #[test]
    fn test_hash_consing() {
        let mut table = DescriptorTable::new();
        let (a, created) = table.find_or_create(key(0, 0, 0, None), OstAttrs::default());
        assert!(created);
        let (b, created) = table.find_or_create(key(0, 0, 0, None), OstAttrs::default());
        assert!(!created);
        assert_eq!(a, b);
        assert_eq!(table.num_osts(), 1);
        assert_eq!(table.num_vsts(), 1);
        assert_eq!(table.ost_of(table.zero_version(a)), a);
    }

    #[test]
    fn test_levels_link_both_ways() {
        let mut table = DescriptorTable::new();
        let (p, _) = table.find_or_create(key(0, 0, 0, None), OstAttrs::default());
        let (deref, _) = table.find_or_create(key(0, 1, 0, Some(p)), OstAttrs::default());
        let (field, _) = table.find_or_create(key(0, 1, 2, Some(p)), OstAttrs::default());
        assert_eq!(table.next_level(p), &[deref, field]);
        assert_eq!(table.prev_level(field), Some(p));
        assert!(table.get_ost(OstIdx(9)).is_err());
    }

    #[test]
    fn test_versions() {
        let mut table = DescriptorTable::new();
        let (x, _) = table.find_or_create(key(1, 0, 0, None), OstAttrs::default());
        let (v1, created) = table.find_or_create_version(x, 1);
        assert!(created);
        assert_eq!(table.find_or_create_version(x, 1), (v1, false));
        assert_eq!(table.find_or_create_version(x, 0).0, table.zero_version(x));
        assert_eq!(table.vst(v1).version, 1);
        assert_eq!(table.version(x, 1), Some(v1));
        assert_eq!(table.version(x, 2), None);
    }

    #[test]
    fn test_addrof_descriptor_points_at_target() {
        let mut table = DescriptorTable::new();
        let (a, _) = table.find_or_create(
            key(0, 0, 0, None),
            OstAttrs {
                name: "a".into(),
                ..OstAttrs::default()
            },
        );
        let (addr, created) = table.find_or_create_addrof(a, TyIdx(12));
        assert!(created);
        assert_eq!(table.find_or_create_addrof(a, TyIdx(12)), (addr, false));
        assert_eq!(table.ost(addr).indirect_lev, -1);
        assert_eq!(table.ost(addr).name, "&a");
        assert_eq!(table.next_level(addr), &[a]);
        assert!(table.ost(a).address_taken);
        assert_eq!(table.addrof_of(a), Some(addr));
    }
}
