//! Intrinsic operations

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intrinsic {
    Memcpy,
    Memmove,
    Memset,
    Strlen,
    Strcpy,
    AtomicLoad,
    AtomicStore,
    AtomicExchange,
    AtomicFetchAdd,
    AtomicCompareExchange,
    VaStart,
    Alloca,
    Prefetch,
    Expect,
    ReadVtableEntry,
    Sqrt,
    Fabs,
}

impl Intrinsic {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Memcpy => "memcpy",
            Self::Memmove => "memmove",
            Self::Memset => "memset",
            Self::Strlen => "strlen",
            Self::Strcpy => "strcpy",
            Self::AtomicLoad => "atomic_load",
            Self::AtomicStore => "atomic_store",
            Self::AtomicExchange => "atomic_exchange",
            Self::AtomicFetchAdd => "atomic_fetch_add",
            Self::AtomicCompareExchange => "atomic_compare_exchange",
            Self::VaStart => "va_start",
            Self::Alloca => "alloca",
            Self::Prefetch => "prefetch",
            Self::Expect => "expect",
            Self::ReadVtableEntry => "read_vtable_entry",
            Self::Sqrt => "sqrt",
            Self::Fabs => "fabs",
        }
    }

    /// Observable effect beyond computing a value
    pub fn has_side_effect(self) -> bool {
        !matches!(
            self,
            Self::Strlen
                | Self::Expect
                | Self::ReadVtableEntry
                | Self::Sqrt
                | Self::Fabs
                | Self::Prefetch
        )
    }

    pub fn is_atomic(self) -> bool {
        matches!(
            self,
            Self::AtomicLoad
                | Self::AtomicStore
                | Self::AtomicExchange
                | Self::AtomicFetchAdd
                | Self::AtomicCompareExchange
        )
    }
}
