//! Storage-location descriptors
//!
//! An [`OriginalSt`] names one distinct storage location: a symbol or
//! register, a field of it, or a location reached through `n` dereferences.
//! A [`VersionSt`] is one SSA occurrence of such a location.
//!
//! Descriptors form a graph (pointer → pointees). Pointee lists are owned by
//! the descriptor; the back edge to the previous level is a plain index.

use super::offset::{ranges_disjoint, OffsetType};
use crate::shared::models::{OstIdx, PregIdx, SymbolId, TyIdx, VstIdx};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OstBase {
    Symbol(SymbolId),
    Preg(PregIdx),
    /// Synthetic stand-in for every location whose defs are not all seen
    NadsDummy,
}

/// Hash-consing key; two descriptors with equal keys are the same location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OstKey {
    pub base: OstBase,
    pub indirect_lev: i32,
    pub field_id: u32,
    pub offset: OffsetType,
    pub ty: TyIdx,
    pub prev: Option<OstIdx>,
}

/// Group of descriptors whose storage is laid out relative to one another
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Container {
    /// Fields of one symbol or register
    Base(OstBase),
    /// Locations reached through one pointer descriptor
    Deref(OstIdx),
    /// Address-of views have no storage
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OriginalSt {
    pub index: OstIdx,
    pub base: OstBase,
    /// 0 = the symbol, n = n dereferences, -1 = "address of"
    pub indirect_lev: i32,
    pub field_id: u32,
    pub offset: OffsetType,
    pub ty: TyIdx,
    /// Storage size in bits; `None` when unknown
    pub bit_size: Option<u64>,
    pub is_final: bool,
    pub is_private: bool,
    /// Constant-initialized symbol
    pub read_only: bool,
    pub address_taken: bool,
    /// Descriptor one dereference up (weak back edge)
    pub prev_level: Option<OstIdx>,
    /// Descriptors one dereference down
    pub next_level: Vec<OstIdx>,
    pub zero_version: VstIdx,
    /// Display name, e.g. `s.2`, `*p+32`, `&x`
    pub name: String,
}

impl OriginalSt {
    #[inline]
    pub fn is_address_view(&self) -> bool {
        self.indirect_lev < 0
    }

    #[inline]
    pub fn is_preg(&self) -> bool {
        matches!(self.base, OstBase::Preg(_))
    }

    #[inline]
    pub fn is_nads_dummy(&self) -> bool {
        self.base == OstBase::NadsDummy
    }

    pub fn symbol(&self) -> Option<SymbolId> {
        match self.base {
            OstBase::Symbol(sym) => Some(sym),
            _ => None,
        }
    }

    pub fn container(&self) -> Container {
        if self.indirect_lev < 0 {
            return Container::None;
        }
        match (self.indirect_lev, self.prev_level) {
            (0, _) => Container::Base(self.base),
            (_, Some(prev)) => Container::Deref(prev),
            (_, None) => Container::Base(self.base),
        }
    }

    /// Same container and provably non-overlapping bit ranges
    pub fn known_disjoint(&self, other: &OriginalSt) -> bool {
        let container = self.container();
        container != Container::None
            && container == other.container()
            && ranges_disjoint(self.offset, self.bit_size, other.offset, other.bit_size)
    }
}

/// One SSA occurrence of a location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionSt {
    pub index: VstIdx,
    pub ost: OstIdx,
    pub version: u32,
}

impl VersionSt {
    #[inline]
    pub fn is_zero_version(&self) -> bool {
        self.version == 0
    }
}
