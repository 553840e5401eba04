//! Expression trees

use super::intrinsic::Intrinsic;
use super::ssa::VstIdx;
use super::symbol::{PregIdx, SymbolId};
use super::types::{PrimType, TyIdx};
use serde::{Deserialize, Serialize};

/// Occurrence of a symbol (optionally one of its fields)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VarRef {
    pub sym: SymbolId,
    #[serde(default)]
    pub field_id: u32,
    #[serde(default)]
    pub version: u32,
}

impl VarRef {
    pub fn new(sym: SymbolId) -> Self {
        Self {
            sym,
            field_id: 0,
            version: 0,
        }
    }

    pub fn field(sym: SymbolId, field_id: u32) -> Self {
        Self {
            sym,
            field_id,
            version: 0,
        }
    }

    pub fn versioned(mut self, version: u32) -> Self {
        self.version = version;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegRef {
    pub preg: PregIdx,
    #[serde(default)]
    pub version: u32,
}

impl RegRef {
    pub fn new(preg: PregIdx) -> Self {
        Self { preg, version: 0 }
    }
}

/// Assignment target of a direct write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LValue {
    Var(VarRef),
    Reg(RegRef),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOp {
    Neg,
    Not,
    Abs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CvtKind {
    Cvt,
    Retype,
    Trunc,
    Extend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocKind {
    Heap,
    Stack,
}

/// Load through an address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IreadNode {
    /// Pointer type of `addr`
    pub ty: TyIdx,
    #[serde(default)]
    pub field_id: u32,
    pub prim: PrimType,
    pub addr: Box<Expr>,
    /// Location resolved by alias analysis, consumed by SSA renaming
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssa_var: Option<VstIdx>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Expr {
    Const {
        prim: PrimType,
        value: i64,
    },
    AddrOf {
        var: VarRef,
    },
    /// `&base->field`
    IaddrOf {
        ty: TyIdx,
        field_id: u32,
        base: Box<Expr>,
    },
    Dread {
        var: VarRef,
        prim: PrimType,
    },
    Regread {
        reg: RegRef,
        prim: PrimType,
    },
    Iread(IreadNode),
    Binary {
        #[serde(rename = "operator")]
        op: BinaryOp,
        prim: PrimType,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary {
        #[serde(rename = "operator")]
        op: UnaryOp,
        prim: PrimType,
        opnd: Box<Expr>,
    },
    Cvt {
        kind: CvtKind,
        from: PrimType,
        prim: PrimType,
        opnd: Box<Expr>,
    },
    /// Element address; `ty` is a pointer to the array type
    Array {
        ty: TyIdx,
        #[serde(default)]
        bounds_check: bool,
        base: Box<Expr>,
        indices: Vec<Expr>,
    },
    Select {
        prim: PrimType,
        cond: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },
    IntrinsicOp {
        intrinsic: Intrinsic,
        prim: PrimType,
        opnds: Vec<Expr>,
    },
    Alloc {
        kind: AllocKind,
        ty: TyIdx,
        size: Box<Expr>,
    },
}

impl Expr {
    // ═══════════════════════════════════════════════════════════════════════
    // Constructors
    // ═══════════════════════════════════════════════════════════════════════

    pub fn constant(prim: PrimType, value: i64) -> Self {
        Expr::Const { prim, value }
    }

    pub fn addr_of(sym: SymbolId) -> Self {
        Expr::AddrOf {
            var: VarRef::new(sym),
        }
    }

    pub fn addr_of_field(sym: SymbolId, field_id: u32) -> Self {
        Expr::AddrOf {
            var: VarRef::field(sym, field_id),
        }
    }

    pub fn dread(sym: SymbolId, prim: PrimType) -> Self {
        Expr::Dread {
            var: VarRef::new(sym),
            prim,
        }
    }

    pub fn dread_field(sym: SymbolId, field_id: u32, prim: PrimType) -> Self {
        Expr::Dread {
            var: VarRef::field(sym, field_id),
            prim,
        }
    }

    pub fn regread(preg: PregIdx, prim: PrimType) -> Self {
        Expr::Regread {
            reg: RegRef::new(preg),
            prim,
        }
    }

    pub fn iread(ptr_ty: TyIdx, field_id: u32, prim: PrimType, addr: Expr) -> Self {
        Expr::Iread(IreadNode {
            ty: ptr_ty,
            field_id,
            prim,
            addr: Box::new(addr),
            ssa_var: None,
        })
    }

    pub fn iaddr_of(ptr_ty: TyIdx, field_id: u32, base: Expr) -> Self {
        Expr::IaddrOf {
            ty: ptr_ty,
            field_id,
            base: Box::new(base),
        }
    }

    pub fn binary(op: BinaryOp, prim: PrimType, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary {
            op,
            prim,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn add(prim: PrimType, lhs: Expr, rhs: Expr) -> Self {
        Self::binary(BinaryOp::Add, prim, lhs, rhs)
    }

    pub fn cvt(kind: CvtKind, from: PrimType, prim: PrimType, opnd: Expr) -> Self {
        Expr::Cvt {
            kind,
            from,
            prim,
            opnd: Box::new(opnd),
        }
    }

    pub fn select(prim: PrimType, cond: Expr, then_expr: Expr, else_expr: Expr) -> Self {
        Expr::Select {
            prim,
            cond: Box::new(cond),
            then_expr: Box::new(then_expr),
            else_expr: Box::new(else_expr),
        }
    }

    pub fn array(ptr_ty: TyIdx, base: Expr, indices: Vec<Expr>) -> Self {
        Expr::Array {
            ty: ptr_ty,
            bounds_check: false,
            base: Box::new(base),
            indices,
        }
    }

    pub fn intrinsic(intrinsic: Intrinsic, prim: PrimType, opnds: Vec<Expr>) -> Self {
        Expr::IntrinsicOp {
            intrinsic,
            prim,
            opnds,
        }
    }

    pub fn alloc(kind: AllocKind, ty: TyIdx, size: Expr) -> Self {
        Expr::Alloc {
            kind,
            ty,
            size: Box::new(size),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Queries
    // ═══════════════════════════════════════════════════════════════════════

    /// Primitive kind of the produced value
    pub fn prim(&self) -> PrimType {
        match self {
            Expr::Const { prim, .. }
            | Expr::Dread { prim, .. }
            | Expr::Regread { prim, .. }
            | Expr::Binary { prim, .. }
            | Expr::Unary { prim, .. }
            | Expr::Cvt { prim, .. }
            | Expr::Select { prim, .. }
            | Expr::IntrinsicOp { prim, .. } => *prim,
            Expr::Iread(node) => node.prim,
            Expr::AddrOf { .. }
            | Expr::IaddrOf { .. }
            | Expr::Array { .. }
            | Expr::Alloc { .. } => PrimType::Ptr,
        }
    }

    pub fn is_const_zero(&self) -> bool {
        matches!(self, Expr::Const { value: 0, .. })
    }

    /// Evaluating this tree may do more than compute a value
    pub fn has_side_effect(&self) -> bool {
        let own = match self {
            Expr::Alloc { .. } => true,
            Expr::Array { bounds_check, .. } => *bounds_check,
            Expr::IntrinsicOp { intrinsic, .. } => intrinsic.has_side_effect(),
            _ => false,
        };
        own || self.operands().into_iter().any(Expr::has_side_effect)
    }

    pub fn operands(&self) -> Vec<&Expr> {
        match self {
            Expr::Const { .. } | Expr::AddrOf { .. } | Expr::Dread { .. } | Expr::Regread { .. } => {
                Vec::new()
            }
            Expr::IaddrOf { base, .. } => vec![base.as_ref()],
            Expr::Iread(node) => vec![node.addr.as_ref()],
            Expr::Binary { lhs, rhs, .. } => vec![lhs.as_ref(), rhs.as_ref()],
            Expr::Unary { opnd, .. } | Expr::Cvt { opnd, .. } => vec![opnd.as_ref()],
            Expr::Array { base, indices, .. } => {
                let mut out = vec![base.as_ref()];
                out.extend(indices.iter());
                out
            }
            Expr::Select {
                cond,
                then_expr,
                else_expr,
                ..
            } => vec![cond.as_ref(), then_expr.as_ref(), else_expr.as_ref()],
            Expr::IntrinsicOp { opnds, .. } => opnds.iter().collect(),
            Expr::Alloc { size, .. } => vec![size.as_ref()],
        }
    }

    pub fn operands_mut(&mut self) -> Vec<&mut Expr> {
        match self {
            Expr::Const { .. } | Expr::AddrOf { .. } | Expr::Dread { .. } | Expr::Regread { .. } => {
                Vec::new()
            }
            Expr::IaddrOf { base, .. } => vec![base.as_mut()],
            Expr::Iread(node) => vec![node.addr.as_mut()],
            Expr::Binary { lhs, rhs, .. } => vec![lhs.as_mut(), rhs.as_mut()],
            Expr::Unary { opnd, .. } | Expr::Cvt { opnd, .. } => vec![opnd.as_mut()],
            Expr::Array { base, indices, .. } => {
                let mut out = vec![base.as_mut()];
                out.extend(indices.iter_mut());
                out
            }
            Expr::Select {
                cond,
                then_expr,
                else_expr,
                ..
            } => vec![cond.as_mut(), then_expr.as_mut(), else_expr.as_mut()],
            Expr::IntrinsicOp { opnds, .. } => opnds.iter_mut().collect(),
            Expr::Alloc { size, .. } => vec![size.as_mut()],
        }
    }

    /// Visit every indirect read in the tree, operands before parents
    pub fn for_each_iread<F: FnMut(&IreadNode)>(&self, f: &mut F) {
        for opnd in self.operands() {
            opnd.for_each_iread(f);
        }
        if let Expr::Iread(node) = self {
            f(node);
        }
    }
}
