//! IR models consumed by alias analysis
//!
//! A module holds a type table, globals and functions; a function is a list
//! of basic blocks of statement trees. Alias analysis reads everything and
//! writes back only the resolved location of each indirect read.

pub mod builder;
pub mod expr;
pub mod function;
pub mod intrinsic;
pub mod ssa;
pub mod stmt;
pub mod symbol;
pub mod types;

pub use builder::FunctionBuilder;
pub use expr::{
    AllocKind, BinaryOp, CvtKind, Expr, IreadNode, LValue, RegRef, UnaryOp, VarRef,
};
pub use function::{
    BasicBlock, BlockId, BlockKind, FuncAttrs, FuncId, Function, FunctionEnv, Module, Phi,
};
pub use intrinsic::Intrinsic;
pub use ssa::{ArenaIndex, OstIdx, VstIdx};
pub use stmt::{
    AsmInput, AsmNode, AsmOutput, CallNode, CallTarget, IntrinsicCallNode, Stmt, StmtId, StmtKind,
};
pub use symbol::{Preg, PregIdx, StorageClass, Symbol, SymbolAttrs, SymbolId};
pub use types::{AggKind, FieldDecl, FieldInfo, MirType, PrimType, TyIdx, TypeTable, POINTER_BITS};
