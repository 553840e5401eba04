//! Statically known bit offsets

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;

/// Known signed bit offset, or `Invalid` when it cannot be determined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OffsetType {
    Known(i64),
    Invalid,
}

impl OffsetType {
    pub const ZERO: OffsetType = OffsetType::Known(0);

    pub fn from_bits(bits: u64) -> Self {
        i64::try_from(bits).map_or(Self::Invalid, Self::Known)
    }

    pub fn from_bytes(bytes: i64) -> Self {
        bytes.checked_mul(8).map_or(Self::Invalid, Self::Known)
    }

    #[inline]
    pub fn is_invalid(self) -> bool {
        self == Self::Invalid
    }

    #[inline]
    pub fn known(self) -> Option<i64> {
        match self {
            Self::Known(v) => Some(v),
            Self::Invalid => None,
        }
    }

    pub fn negate(self) -> Self {
        match self {
            Self::Known(v) => v.checked_neg().map_or(Self::Invalid, Self::Known),
            Self::Invalid => Self::Invalid,
        }
    }
}

impl Default for OffsetType {
    fn default() -> Self {
        Self::ZERO
    }
}

impl Add for OffsetType {
    type Output = OffsetType;

    fn add(self, rhs: OffsetType) -> OffsetType {
        match (self, rhs) {
            (Self::Known(a), Self::Known(b)) => a.checked_add(b).map_or(Self::Invalid, Self::Known),
            _ => Self::Invalid,
        }
    }
}

impl fmt::Display for OffsetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(v) => write!(f, "{}", v),
            Self::Invalid => f.write_str("?"),
        }
    }
}

/// Bit ranges `[a, a+a_bits)` and `[b, b+b_bits)` are provably disjoint.
/// Unknown offsets or sizes are never disjoint.
pub fn ranges_disjoint(a: OffsetType, a_bits: Option<u64>, b: OffsetType, b_bits: Option<u64>) -> bool {
    let (Some(a), Some(b)) = (a.known(), b.known()) else {
        return false;
    };
    let (Some(a_bits), Some(b_bits)) = (a_bits, b_bits) else {
        return false;
    };
    if a_bits == 0 || b_bits == 0 {
        return false;
    }
    let a_end = a as i128 + a_bits as i128;
    let b_end = b as i128 + b_bits as i128;
    a_end <= b as i128 || b_end <= a as i128
}
