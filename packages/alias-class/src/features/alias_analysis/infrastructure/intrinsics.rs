//! Static alias behaviour of every intrinsic
//!
//! Operand indices refer to the argument list of the intrinsic call (or the
//! operand list of the intrinsic expression).

use crate::shared::models::Intrinsic;

/// What an intrinsic expression evaluates to, for aliasing purposes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprEffect {
    /// Result is operand `n` unchanged
    PassThrough(usize),
    /// Memory behind every pointer operand escapes
    PointeeEscaped,
    /// Result is not an address
    Ignore,
}

#[derive(Debug, Clone, Copy)]
pub struct IntrinsicDesc {
    pub expr_effect: ExprEffect,
    /// Operands whose pointees are read
    pub reads: &'static [usize],
    /// Operands whose pointees are written
    pub writes: &'static [usize],
    /// Operands whose value is stored somewhere the analysis cannot see
    pub escapes: &'static [usize],
    /// (destination, source) of a memory copy
    pub copies_memory: Option<(usize, usize)>,
    pub no_side_effect: bool,
    pub atomic: bool,
}

const NONE: &[usize] = &[];

const PURE: IntrinsicDesc = IntrinsicDesc {
    expr_effect: ExprEffect::Ignore,
    reads: NONE,
    writes: NONE,
    escapes: NONE,
    copies_memory: None,
    no_side_effect: true,
    atomic: false,
};

const ATOMIC_RMW: IntrinsicDesc = IntrinsicDesc {
    expr_effect: ExprEffect::Ignore,
    reads: &[0],
    writes: &[0],
    escapes: &[1],
    copies_memory: None,
    no_side_effect: false,
    atomic: true,
};

pub fn describe(intrinsic: Intrinsic) -> IntrinsicDesc {
    match intrinsic {
        Intrinsic::Memcpy | Intrinsic::Memmove | Intrinsic::Strcpy => IntrinsicDesc {
            expr_effect: ExprEffect::PassThrough(0),
            reads: &[1],
            writes: &[0],
            escapes: NONE,
            copies_memory: Some((0, 1)),
            no_side_effect: false,
            atomic: false,
        },
        Intrinsic::Memset => IntrinsicDesc {
            expr_effect: ExprEffect::PassThrough(0),
            writes: &[0],
            no_side_effect: false,
            ..PURE
        },
        Intrinsic::Strlen => IntrinsicDesc {
            reads: &[0],
            ..PURE
        },
        Intrinsic::AtomicLoad => IntrinsicDesc {
            reads: &[0],
            no_side_effect: false,
            atomic: true,
            ..PURE
        },
        Intrinsic::AtomicStore => IntrinsicDesc {
            reads: NONE,
            ..ATOMIC_RMW
        },
        Intrinsic::AtomicExchange | Intrinsic::AtomicFetchAdd => ATOMIC_RMW,
        Intrinsic::AtomicCompareExchange => IntrinsicDesc {
            reads: &[0, 1],
            writes: &[0, 1],
            escapes: &[2],
            ..ATOMIC_RMW
        },
        Intrinsic::VaStart => IntrinsicDesc {
            expr_effect: ExprEffect::PointeeEscaped,
            writes: &[0],
            escapes: &[0],
            no_side_effect: false,
            ..PURE
        },
        Intrinsic::Alloca => IntrinsicDesc {
            no_side_effect: false,
            ..PURE
        },
        Intrinsic::Expect => IntrinsicDesc {
            expr_effect: ExprEffect::PassThrough(0),
            ..PURE
        },
        Intrinsic::ReadVtableEntry => IntrinsicDesc {
            expr_effect: ExprEffect::PassThrough(0),
            reads: &[0],
            ..PURE
        },
        Intrinsic::Prefetch | Intrinsic::Sqrt | Intrinsic::Fabs => PURE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_agrees_with_side_effect_flag() {
        let all = [
            Intrinsic::Memcpy,
            Intrinsic::Memmove,
            Intrinsic::Memset,
            Intrinsic::Strlen,
            Intrinsic::Strcpy,
            Intrinsic::AtomicLoad,
            Intrinsic::AtomicStore,
            Intrinsic::AtomicExchange,
            Intrinsic::AtomicFetchAdd,
            Intrinsic::AtomicCompareExchange,
            Intrinsic::VaStart,
            Intrinsic::Alloca,
            Intrinsic::Prefetch,
            Intrinsic::Expect,
            Intrinsic::ReadVtableEntry,
            Intrinsic::Sqrt,
            Intrinsic::Fabs,
        ];
        for intrinsic in all {
            let desc = describe(intrinsic);
            assert_eq!(desc.no_side_effect, !intrinsic.has_side_effect(), "{:?}", intrinsic);
            assert_eq!(desc.atomic, intrinsic.is_atomic(), "{:?}", intrinsic);
        }
    }

    #[test]
    fn test_memcpy_copies_source_into_destination() {
        let desc = describe(Intrinsic::Memcpy);
        assert_eq!(desc.copies_memory, Some((0, 1)));
        assert_eq!(desc.writes, &[0]);
        assert_eq!(desc.reads, &[1]);
    }
}
