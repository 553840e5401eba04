//! Symbols and pseudo-registers

use super::types::{PrimType, TyIdx};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Module-level or function-local symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolId {
    Global(u32),
    Local(u32),
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global(i) => write!(f, "g{}", i),
            Self::Local(i) => write!(f, "l{}", i),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageClass {
    Global,
    FileStatic,
    Local,
    Formal,
}

impl StorageClass {
    /// Storage visible outside the current function
    pub fn is_global(self) -> bool {
        matches!(self, Self::Global | Self::FileStatic)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SymbolAttrs {
    /// Constant-initialized, never written
    pub read_only: bool,
    /// Compiler temporary
    pub is_tmp: bool,
    pub is_final: bool,
    pub is_private: bool,
    /// Restrict-qualified formal
    pub noalias: bool,
    pub volatile: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub ty: TyIdx,
    pub storage: StorageClass,
    #[serde(default)]
    pub attrs: SymbolAttrs,
}

impl Symbol {
    pub fn new(name: impl Into<String>, ty: TyIdx, storage: StorageClass) -> Self {
        Self {
            name: name.into(),
            ty,
            storage,
            attrs: SymbolAttrs::default(),
        }
    }

    pub fn with_attrs(mut self, attrs: SymbolAttrs) -> Self {
        self.attrs = attrs;
        self
    }

    pub fn is_formal(&self) -> bool {
        self.storage == StorageClass::Formal
    }
}

/// Index of a pseudo-register within its function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PregIdx(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preg {
    pub prim: PrimType,
    /// Return-value or thrown-value register; never a storage location
    #[serde(default)]
    pub special: bool,
}
