//! Statements

use super::expr::{Expr, LValue, RegRef, VarRef};
use super::function::{BlockId, FuncId};
use super::intrinsic::Intrinsic;
use super::types::TyIdx;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable statement identity within a function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StmtId(pub u32);

impl fmt::Display for StmtId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CallTarget {
    Direct { callee: FuncId },
    Virtual { method: FuncId },
    Interface { method: FuncId },
    Indirect { target: Box<Expr> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallNode {
    pub target: CallTarget,
    #[serde(default)]
    pub args: Vec<Expr>,
    /// Must-defs written by the call
    #[serde(default)]
    pub return_values: Vec<LValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntrinsicCallNode {
    pub intrinsic: Intrinsic,
    #[serde(default)]
    pub args: Vec<Expr>,
    #[serde(default)]
    pub return_values: Vec<LValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AsmInput {
    pub constraint: String,
    pub expr: Expr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AsmOutput {
    /// `=r`, `+m` ...; a leading `+` marks read-modify-write
    pub constraint: String,
    pub lhs: LValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AsmNode {
    #[serde(default)]
    pub inputs: Vec<AsmInput>,
    #[serde(default)]
    pub outputs: Vec<AsmOutput>,
    #[serde(default)]
    pub clobbers: Vec<String>,
}

impl AsmNode {
    pub fn clobbers_memory(&self) -> bool {
        self.clobbers.iter().any(|c| c == "memory")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum StmtKind {
    Dassign {
        lhs: VarRef,
        rhs: Expr,
    },
    Regassign {
        lhs: RegRef,
        rhs: Expr,
    },
    /// `*(addr).field = rhs`; `ty` is the pointer type of `addr`
    Iassign {
        ty: TyIdx,
        #[serde(default)]
        field_id: u32,
        addr: Expr,
        rhs: Expr,
    },
    Call(CallNode),
    IntrinsicCall(IntrinsicCallNode),
    Asm(AsmNode),
    Return {
        #[serde(default)]
        values: Vec<Expr>,
    },
    Throw {
        value: Expr,
    },
    SyncEnter {
        opnds: Vec<Expr>,
    },
    SyncExit {
        opnds: Vec<Expr>,
    },
    Eval {
        value: Expr,
    },
    CondGoto {
        cond: Expr,
        target: BlockId,
    },
    Goto {
        target: BlockId,
    },
}

impl StmtKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Dassign { .. } => "dassign",
            Self::Regassign { .. } => "regassign",
            Self::Iassign { .. } => "iassign",
            Self::Call(_) => "call",
            Self::IntrinsicCall(_) => "intrinsiccall",
            Self::Asm(_) => "asm",
            Self::Return { .. } => "return",
            Self::Throw { .. } => "throw",
            Self::SyncEnter { .. } => "syncenter",
            Self::SyncExit { .. } => "syncexit",
            Self::Eval { .. } => "eval",
            Self::CondGoto { .. } => "condgoto",
            Self::Goto { .. } => "goto",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stmt {
    pub id: StmtId,
    #[serde(flatten)]
    pub kind: StmtKind,
}

impl Stmt {
    /// Top-level operand trees, in evaluation order
    pub fn exprs(&self) -> Vec<&Expr> {
        match &self.kind {
            StmtKind::Dassign { rhs, .. } | StmtKind::Regassign { rhs, .. } => vec![rhs],
            StmtKind::Iassign { addr, rhs, .. } => vec![addr, rhs],
            StmtKind::Call(call) => {
                let mut out = Vec::with_capacity(call.args.len() + 1);
                if let CallTarget::Indirect { target } = &call.target {
                    out.push(target.as_ref());
                }
                out.extend(call.args.iter());
                out
            }
            StmtKind::IntrinsicCall(call) => call.args.iter().collect(),
            StmtKind::Asm(asm) => asm.inputs.iter().map(|i| &i.expr).collect(),
            StmtKind::Return { values } => values.iter().collect(),
            StmtKind::SyncEnter { opnds } | StmtKind::SyncExit { opnds } => opnds.iter().collect(),
            StmtKind::Throw { value } | StmtKind::Eval { value } => vec![value],
            StmtKind::CondGoto { cond, .. } => vec![cond],
            StmtKind::Goto { .. } => Vec::new(),
        }
    }

    pub fn exprs_mut(&mut self) -> Vec<&mut Expr> {
        match &mut self.kind {
            StmtKind::Dassign { rhs, .. } | StmtKind::Regassign { rhs, .. } => vec![rhs],
            StmtKind::Iassign { addr, rhs, .. } => vec![addr, rhs],
            StmtKind::Call(call) => {
                let mut out = Vec::with_capacity(call.args.len() + 1);
                if let CallTarget::Indirect { target } = &mut call.target {
                    out.push(target.as_mut());
                }
                out.extend(call.args.iter_mut());
                out
            }
            StmtKind::IntrinsicCall(call) => call.args.iter_mut().collect(),
            StmtKind::Asm(asm) => asm.inputs.iter_mut().map(|i| &mut i.expr).collect(),
            StmtKind::Return { values } => values.iter_mut().collect(),
            StmtKind::SyncEnter { opnds } | StmtKind::SyncExit { opnds } => {
                opnds.iter_mut().collect()
            }
            StmtKind::Throw { value } | StmtKind::Eval { value } => vec![value],
            StmtKind::CondGoto { cond, .. } => vec![cond],
            StmtKind::Goto { .. } => Vec::new(),
        }
    }
}
