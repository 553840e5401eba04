//! Programmatic construction of functions
//!
//! Hands out symbol, register, block and statement ids so fixtures and
//! front ends never number anything by hand.

use super::expr::{Expr, LValue, RegRef, VarRef};
use super::function::{BasicBlock, BlockId, BlockKind, FuncId, Function, Phi};
use super::stmt::{CallNode, CallTarget, Stmt, StmtId, StmtKind};
use super::symbol::{Preg, PregIdx, StorageClass, Symbol, SymbolAttrs, SymbolId};
use super::types::{PrimType, TyIdx};

pub struct FunctionBuilder {
    func: Function,
    next_stmt: u32,
}

impl FunctionBuilder {
    pub fn new(id: FuncId, name: impl Into<String>) -> Self {
        Self {
            func: Function::new(id, name),
            next_stmt: 0,
        }
    }

    pub fn constructor_of(mut self, class_ty: TyIdx) -> Self {
        self.func.attrs.is_constructor = true;
        self.func.attrs.class_ty = Some(class_ty);
        self
    }

    pub fn method_of(mut self, class_ty: TyIdx) -> Self {
        self.func.attrs.class_ty = Some(class_ty);
        self
    }

    pub fn local(&mut self, name: impl Into<String>, ty: TyIdx) -> SymbolId {
        self.symbol(Symbol::new(name, ty, StorageClass::Local))
    }

    pub fn formal(&mut self, name: impl Into<String>, ty: TyIdx) -> SymbolId {
        self.symbol(Symbol::new(name, ty, StorageClass::Formal))
    }

    pub fn formal_with(&mut self, name: impl Into<String>, ty: TyIdx, attrs: SymbolAttrs) -> SymbolId {
        self.symbol(Symbol::new(name, ty, StorageClass::Formal).with_attrs(attrs))
    }

    pub fn symbol(&mut self, symbol: Symbol) -> SymbolId {
        self.func.locals.push(symbol);
        SymbolId::Local(self.func.locals.len() as u32 - 1)
    }

    pub fn preg(&mut self, prim: PrimType) -> PregIdx {
        self.func.pregs.push(Preg {
            prim,
            special: false,
        });
        PregIdx(self.func.pregs.len() as u32 - 1)
    }

    pub fn special_preg(&mut self, prim: PrimType) -> PregIdx {
        self.func.pregs.push(Preg { prim, special: true });
        PregIdx(self.func.pregs.len() as u32 - 1)
    }

    pub fn block(&mut self, kind: BlockKind) -> BlockId {
        let id = BlockId(self.func.blocks.len() as u32);
        self.func.blocks.push(BasicBlock {
            id,
            kind,
            phis: Vec::new(),
            stmts: Vec::new(),
        });
        id
    }

    /// Append to the last block, opening a fallthrough block if there is none
    pub fn push(&mut self, kind: StmtKind) -> StmtId {
        if self.func.blocks.is_empty() {
            self.block(BlockKind::Fallthrough);
        }
        let block = BlockId(self.func.blocks.len() as u32 - 1);
        self.push_to(block, kind)
    }

    pub fn push_to(&mut self, block: BlockId, kind: StmtKind) -> StmtId {
        let id = StmtId(self.next_stmt);
        self.next_stmt += 1;
        self.func.blocks[block.0 as usize].stmts.push(Stmt { id, kind });
        id
    }

    pub fn phi(&mut self, block: BlockId, lhs: LValue, opnds: Vec<LValue>) {
        self.func.blocks[block.0 as usize].phis.push(Phi { lhs, opnds });
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Statement shorthands
    // ═══════════════════════════════════════════════════════════════════════

    pub fn dassign(&mut self, lhs: SymbolId, rhs: Expr) -> StmtId {
        self.push(StmtKind::Dassign {
            lhs: VarRef::new(lhs),
            rhs,
        })
    }

    pub fn dassign_field(&mut self, lhs: SymbolId, field_id: u32, rhs: Expr) -> StmtId {
        self.push(StmtKind::Dassign {
            lhs: VarRef::field(lhs, field_id),
            rhs,
        })
    }

    pub fn regassign(&mut self, lhs: PregIdx, rhs: Expr) -> StmtId {
        self.push(StmtKind::Regassign {
            lhs: RegRef::new(lhs),
            rhs,
        })
    }

    pub fn iassign(&mut self, ptr_ty: TyIdx, field_id: u32, addr: Expr, rhs: Expr) -> StmtId {
        self.push(StmtKind::Iassign {
            ty: ptr_ty,
            field_id,
            addr,
            rhs,
        })
    }

    pub fn call(&mut self, callee: FuncId, args: Vec<Expr>) -> StmtId {
        self.push(StmtKind::Call(CallNode {
            target: CallTarget::Direct { callee },
            args,
            return_values: Vec::new(),
        }))
    }

    pub fn call_assigned(&mut self, callee: FuncId, args: Vec<Expr>, ret: LValue) -> StmtId {
        self.push(StmtKind::Call(CallNode {
            target: CallTarget::Direct { callee },
            args,
            return_values: vec![ret],
        }))
    }

    pub fn ret(&mut self, values: Vec<Expr>) -> StmtId {
        self.push(StmtKind::Return { values })
    }

    pub fn eval(&mut self, value: Expr) -> StmtId {
        self.push(StmtKind::Eval { value })
    }

    pub fn build(self) -> Function {
        self.func
    }
}
