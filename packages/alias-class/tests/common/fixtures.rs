//! Fixture programs
//!
//! Each fixture builds a module with one function and returns the handles a
//! test needs to query the result.

use alias_class::shared::models::{
    AggKind, AllocKind, BlockKind, CvtKind, Expr, FieldDecl, FuncId, FunctionBuilder, MirType,
    Module, PrimType, StmtId, StmtKind, StorageClass, Symbol, SymbolAttrs, SymbolId, TyIdx,
    TypeTable,
};
use alias_class::{ArgEffect, CalleeSummary, SummaryTable};

pub const UNKNOWN_CALLEE: FuncId = FuncId(100);
pub const READ_SELF_CALLEE: FuncId = FuncId(101);

pub fn summaries() -> SummaryTable {
    SummaryTable::new().with(
        READ_SELF_CALLEE,
        CalleeSummary::default().with_args(vec![ArgEffect::ReadSelfOnly]),
    )
}

fn int_types() -> (TypeTable, TyIdx, TyIdx) {
    let mut types = TypeTable::new();
    let i32_ty = types.prim(PrimType::I32);
    let int_ptr = types.pointer_to(i32_ty);
    (types, i32_ty, int_ptr)
}

/// `struct S { int x, y; } s; int *p = c ? &s.x : &s.y; int v = *p;`
pub struct SelectFixture {
    pub module: Module,
    pub s: SymbolId,
    pub p: SymbolId,
    pub load: StmtId,
}

pub fn select_of_fields() -> SelectFixture {
    let (mut types, i32_ty, int_ptr) = int_types();
    let pair = types.add(MirType::Aggregate {
        name: "S".into(),
        agg: AggKind::Struct,
        fields: vec![FieldDecl::new("x", i32_ty), FieldDecl::new("y", i32_ty)],
        parent: None,
    });
    let mut b = FunctionBuilder::new(FuncId(0), "select_fields");
    let s = b.local("s", pair);
    let c = b.local("c", i32_ty);
    let p = b.local("p", int_ptr);
    let v = b.local("v", i32_ty);
    b.dassign(
        p,
        Expr::select(
            PrimType::Ptr,
            Expr::dread(c, PrimType::I32),
            Expr::addr_of_field(s, 1),
            Expr::addr_of_field(s, 2),
        ),
    );
    let load = b.dassign(v, Expr::iread(int_ptr, 0, PrimType::I32, Expr::dread(p, PrimType::Ptr)));
    b.ret(vec![]);

    let mut module = Module::new("scenario_a", types);
    module.add_function(b.build());
    SelectFixture { module, s, p, load }
}

/// `int a; int *p = &a; *p = 1; int b = a;`
pub struct StoreFixture {
    pub module: Module,
    pub a: SymbolId,
    pub store: StmtId,
}

pub fn store_through_pointer() -> StoreFixture {
    let (types, i32_ty, int_ptr) = int_types();
    let mut b = FunctionBuilder::new(FuncId(0), "store_through_pointer");
    let a = b.local("a", i32_ty);
    let p = b.local("p", int_ptr);
    let bv = b.local("b", i32_ty);
    b.dassign(p, Expr::addr_of(a));
    let store = b.iassign(int_ptr, 0, Expr::dread(p, PrimType::Ptr), Expr::constant(PrimType::I32, 1));
    b.dassign(bv, Expr::dread(a, PrimType::I32));
    b.ret(vec![]);

    let mut module = Module::new("scenario_b", types);
    module.add_function(b.build());
    StoreFixture { module, a, store }
}

/// `int x; int *p = &x; callee(p); int v = *p;`
pub struct CallFixture {
    pub module: Module,
    pub x: SymbolId,
    pub p: SymbolId,
    pub call: StmtId,
    pub load: StmtId,
}

pub fn address_passed_to(callee: FuncId) -> CallFixture {
    let (types, i32_ty, int_ptr) = int_types();
    let mut b = FunctionBuilder::new(FuncId(0), "pass_address");
    let x = b.local("x", i32_ty);
    let p = b.local("p", int_ptr);
    let v = b.local("v", i32_ty);
    b.dassign(p, Expr::addr_of(x));
    let call = b.call(callee, vec![Expr::dread(p, PrimType::Ptr)]);
    let load = b.dassign(v, Expr::iread(int_ptr, 0, PrimType::I32, Expr::dread(p, PrimType::Ptr)));
    b.ret(vec![]);

    let mut module = Module::new("scenario_c", types);
    module.add_function(b.build());
    CallFixture {
        module,
        x,
        p,
        call,
        load,
    }
}

/// A mutable global `g`, a final global `k`, a call and a return
pub struct GlobalsFixture {
    pub module: Module,
    pub g: SymbolId,
    pub k: SymbolId,
    pub call: StmtId,
    pub ret: StmtId,
}

pub fn globals_and_call() -> GlobalsFixture {
    let (types, i32_ty, _) = int_types();
    let mut module = Module::new("globals", types);
    let g = module.add_global(Symbol::new("g", i32_ty, StorageClass::Global));
    let k = module.add_global(Symbol::new("k", i32_ty, StorageClass::Global).with_attrs(SymbolAttrs {
        is_final: true,
        ..SymbolAttrs::default()
    }));

    let mut b = FunctionBuilder::new(FuncId(0), "touch_globals");
    let v = b.local("v", i32_ty);
    b.dassign(g, Expr::constant(PrimType::I32, 1));
    b.dassign(v, Expr::dread(k, PrimType::I32));
    let call = b.call(UNKNOWN_CALLEE, vec![]);
    let ret = b.ret(vec![Expr::dread(v, PrimType::I32)]);
    module.add_function(b.build());
    GlobalsFixture {
        module,
        g,
        k,
        call,
        ret,
    }
}

/// A throw of a local's address, in a block of the given kind
pub struct ThrowFixture {
    pub module: Module,
    pub e: SymbolId,
    pub throw: StmtId,
}

pub fn throw_in(kind: BlockKind) -> ThrowFixture {
    let (types, i32_ty, _) = int_types();
    let mut b = FunctionBuilder::new(FuncId(0), "thrower");
    let e = b.local("e", i32_ty);
    b.dassign(e, Expr::constant(PrimType::I32, 7));
    b.block(kind);
    let throw = b.push(StmtKind::Throw {
        value: Expr::dread(e, PrimType::I32),
    });
    let mut module = Module::new("throw", types);
    module.add_function(b.build());
    ThrowFixture { module, e, throw }
}

/// `int *p = (int *)4096; int *q = (int *)4096; int *n = 0; *p = 1; v = *q; v = *n;`
pub struct ConstantAddressFixture {
    pub module: Module,
    pub p: SymbolId,
    pub q: SymbolId,
    pub n: SymbolId,
    pub store: StmtId,
}

pub fn constant_addresses() -> ConstantAddressFixture {
    let (types, i32_ty, int_ptr) = int_types();
    let mut b = FunctionBuilder::new(FuncId(0), "constant_addresses");
    let p = b.local("p", int_ptr);
    let q = b.local("q", int_ptr);
    let n = b.local("n", int_ptr);
    let v = b.local("v", i32_ty);
    b.dassign(
        p,
        Expr::cvt(CvtKind::Retype, PrimType::I64, PrimType::Ptr, Expr::constant(PrimType::I64, 4096)),
    );
    b.dassign(q, Expr::constant(PrimType::Ptr, 4096));
    b.dassign(n, Expr::constant(PrimType::Ptr, 0));
    let store = b.iassign(int_ptr, 0, Expr::dread(p, PrimType::Ptr), Expr::constant(PrimType::I32, 1));
    b.dassign(v, Expr::iread(int_ptr, 0, PrimType::I32, Expr::dread(q, PrimType::Ptr)));
    b.dassign(v, Expr::iread(int_ptr, 0, PrimType::I32, Expr::dread(n, PrimType::Ptr)));
    b.ret(vec![]);

    let mut module = Module::new("constant_addresses", types);
    module.add_function(b.build());
    ConstantAddressFixture {
        module,
        p,
        q,
        n,
        store,
    }
}

/// `int *p = alloc(4); int *q = (int *)alloc(4); *p = 1; *q = 2;`
pub struct AllocFixture {
    pub module: Module,
    pub p: SymbolId,
    pub q: SymbolId,
}

pub fn fresh_allocations() -> AllocFixture {
    let (types, i32_ty, int_ptr) = int_types();
    let mut b = FunctionBuilder::new(FuncId(0), "fresh_allocations");
    let p = b.local("p", int_ptr);
    let q = b.local("q", int_ptr);
    let size = || Expr::constant(PrimType::I64, 4);
    b.dassign(p, Expr::alloc(AllocKind::Heap, i32_ty, size()));
    b.dassign(
        q,
        Expr::cvt(
            CvtKind::Retype,
            PrimType::Ptr,
            PrimType::Ptr,
            Expr::alloc(AllocKind::Heap, i32_ty, size()),
        ),
    );
    b.iassign(int_ptr, 0, Expr::dread(p, PrimType::Ptr), Expr::constant(PrimType::I32, 1));
    b.iassign(int_ptr, 0, Expr::dread(q, PrimType::Ptr), Expr::constant(PrimType::I32, 2));
    b.ret(vec![]);

    let mut module = Module::new("fresh_allocations", types);
    module.add_function(b.build());
    AllocFixture { module, p, q }
}

/// `struct S { int x, y; } *p, *q; S w = *p; int x = q->x; int y = q->y; p = q;`
pub struct MixedPointeeFixture {
    pub module: Module,
    pub p: SymbolId,
    pub q: SymbolId,
}

pub fn whole_and_field_pointees() -> MixedPointeeFixture {
    let (mut types, i32_ty, _) = int_types();
    let pair = types.add(MirType::Aggregate {
        name: "S".into(),
        agg: AggKind::Struct,
        fields: vec![FieldDecl::new("x", i32_ty), FieldDecl::new("y", i32_ty)],
        parent: None,
    });
    let pair_ptr = types.pointer_to(pair);
    let mut b = FunctionBuilder::new(FuncId(0), "whole_and_fields");
    let p = b.local("p", pair_ptr);
    let q = b.local("q", pair_ptr);
    let w = b.local("w", pair);
    let x = b.local("x", i32_ty);
    let y = b.local("y", i32_ty);
    b.dassign(w, Expr::iread(pair_ptr, 0, PrimType::Agg, Expr::dread(p, PrimType::Ptr)));
    b.dassign(x, Expr::iread(pair_ptr, 1, PrimType::I32, Expr::dread(q, PrimType::Ptr)));
    b.dassign(y, Expr::iread(pair_ptr, 2, PrimType::I32, Expr::dread(q, PrimType::Ptr)));
    b.dassign(p, Expr::dread(q, PrimType::Ptr));
    b.ret(vec![]);

    let mut module = Module::new("whole_and_fields", types);
    module.add_function(b.build());
    MixedPointeeFixture { module, p, q }
}

/// A chain of `n` pointers: `p0 = &x; p1 = &p0; ...`, then a store through `p{n-1}`
pub fn pointer_chain(n: usize) -> Module {
    let mut types = TypeTable::new();
    let mut ty = types.prim(PrimType::I32);
    let mut b = FunctionBuilder::new(FuncId(0), "chain");
    let mut prev = b.local("x", ty);
    for i in 0..n {
        let ptr = types.pointer_to(ty);
        let p = b.local(format!("p{}", i), ptr);
        b.dassign(p, Expr::addr_of(prev));
        prev = p;
        ty = ptr;
    }
    let last_ty = types.pointer_to(ty);
    let q = b.local("q", last_ty);
    b.dassign(q, Expr::addr_of(prev));
    b.iassign(last_ty, 0, Expr::dread(q, PrimType::Ptr), Expr::constant(PrimType::Ptr, 0));
    b.ret(vec![]);
    let mut module = Module::new("chain", types);
    module.add_function(b.build());
    module
}
