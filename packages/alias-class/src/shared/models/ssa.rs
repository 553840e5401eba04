//! Descriptor indices shared between alias analysis and SSA construction

use serde::{Deserialize, Serialize};
use std::fmt;

/// Dense arena index
pub trait ArenaIndex: Copy + Ord {
    fn from_index(index: usize) -> Self;
    fn index(self) -> usize;
}

/// Index of an `OriginalSt` (storage-location descriptor)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OstIdx(pub u32);

/// Index of a `VersionSt` (one SSA occurrence of a location)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VstIdx(pub u32);

impl ArenaIndex for OstIdx {
    #[inline]
    fn from_index(index: usize) -> Self {
        OstIdx(index as u32)
    }
    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl ArenaIndex for VstIdx {
    #[inline]
    fn from_index(index: usize) -> Self {
        VstIdx(index as u32)
    }
    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for OstIdx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ost{}", self.0)
    }
}

impl fmt::Display for VstIdx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vst{}", self.0)
    }
}
