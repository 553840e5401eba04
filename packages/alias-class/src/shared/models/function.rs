//! Functions, basic blocks and modules

use super::expr::LValue;
use super::stmt::Stmt;
use super::symbol::{Preg, PregIdx, Symbol, SymbolId};
use super::types::{TyIdx, TypeTable};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FuncId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    #[default]
    Fallthrough,
    /// Ends in an unconditional jump; a throw here is handled locally
    Goto,
    CondGoto,
    Return,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phi {
    pub lhs: LValue,
    pub opnds: Vec<LValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasicBlock {
    pub id: BlockId,
    #[serde(default)]
    pub kind: BlockKind,
    #[serde(default)]
    pub phis: Vec<Phi>,
    #[serde(default)]
    pub stmts: Vec<Stmt>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FuncAttrs {
    pub is_constructor: bool,
    /// Enclosing class of a method
    pub class_ty: Option<TyIdx>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub id: FuncId,
    pub name: String,
    #[serde(default)]
    pub attrs: FuncAttrs,
    /// Locals and formals
    #[serde(default)]
    pub locals: Vec<Symbol>,
    #[serde(default)]
    pub pregs: Vec<Preg>,
    #[serde(default)]
    pub blocks: Vec<BasicBlock>,
}

/// Read-only view of everything but the statement bodies
#[derive(Debug, Clone, Copy)]
pub struct FunctionEnv<'a> {
    pub id: FuncId,
    pub name: &'a str,
    pub attrs: &'a FuncAttrs,
    pub locals: &'a [Symbol],
    pub pregs: &'a [Preg],
    pub types: &'a TypeTable,
    pub globals: &'a [Symbol],
}

impl<'a> FunctionEnv<'a> {
    pub fn symbol(&self, id: SymbolId) -> Option<&'a Symbol> {
        match id {
            SymbolId::Global(i) => self.globals.get(i as usize),
            SymbolId::Local(i) => self.locals.get(i as usize),
        }
    }

    pub fn preg(&self, idx: PregIdx) -> Option<&'a Preg> {
        self.pregs.get(idx.0 as usize)
    }

    pub fn formals(&self) -> impl Iterator<Item = (SymbolId, &'a Symbol)> + 'a {
        self.locals
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_formal())
            .map(|(i, s)| (SymbolId::Local(i as u32), s))
    }
}

impl Function {
    pub fn new(id: FuncId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            attrs: FuncAttrs::default(),
            locals: Vec::new(),
            pregs: Vec::new(),
            blocks: Vec::new(),
        }
    }

    /// Split into the read-only environment and the mutable bodies
    pub fn split<'a>(
        &'a mut self,
        types: &'a TypeTable,
        globals: &'a [Symbol],
    ) -> (FunctionEnv<'a>, &'a mut [BasicBlock]) {
        let env = FunctionEnv {
            id: self.id,
            name: &self.name,
            attrs: &self.attrs,
            locals: &self.locals,
            pregs: &self.pregs,
            types,
            globals,
        };
        (env, &mut self.blocks)
    }

    pub fn stmt_count(&self) -> usize {
        self.blocks.iter().map(|b| b.stmts.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    #[serde(default)]
    pub types: TypeTable,
    #[serde(default)]
    pub globals: Vec<Symbol>,
    #[serde(default)]
    pub functions: Vec<Function>,
}

impl Module {
    pub fn new(name: impl Into<String>, types: TypeTable) -> Self {
        Self {
            name: name.into(),
            types,
            globals: Vec::new(),
            functions: Vec::new(),
        }
    }

    pub fn add_global(&mut self, symbol: Symbol) -> SymbolId {
        self.globals.push(symbol);
        SymbolId::Global(self.globals.len() as u32 - 1)
    }

    pub fn add_function(&mut self, function: Function) {
        self.functions.push(function);
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }
}
