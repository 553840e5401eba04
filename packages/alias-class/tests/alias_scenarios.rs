//! End-to-end alias scenarios
//!
//! Each test runs the full pipeline (collect, propagate, materialize,
//! may-def/may-use) through `AliasAnalyzer` on a fixture module.

mod common;

use alias_class::config::{AliasConfig, ParallelConfig};
use alias_class::shared::models::{
    BlockKind, Expr, FuncId, FunctionBuilder, Intrinsic, IntrinsicCallNode, Module, PrimType,
    StmtId, StmtKind, TypeTable, VstIdx,
};
use alias_class::AliasAnalyzer;
use common::*;
use pretty_assertions::assert_eq;

fn sequential(config: AliasConfig) -> AliasAnalyzer {
    AliasAnalyzer::new(config).with_parallel(ParallelConfig {
        enable_rayon: false,
        num_workers: 0,
    })
}

fn stamped_location(module: &Module, stmt: StmtId) -> VstIdx {
    let stmt = module.functions[0]
        .blocks
        .iter()
        .flat_map(|b| &b.stmts)
        .find(|s| s.id == stmt)
        .expect("statement exists");
    match &stmt.kind {
        StmtKind::Dassign {
            rhs: Expr::Iread(node),
            ..
        } => node.ssa_var.expect("indirect read is stamped"),
        other => panic!("expected a load, got {:?}", other.name()),
    }
}

#[test]
fn test_select_of_field_addresses_aliases_both_fields() {
    let mut fx = select_of_fields();
    let results = sequential(AliasConfig::default()).analyze_module(&mut fx.module).unwrap();
    let result = &results[0];

    let x = result.find_symbol_ost(fx.s, 1).unwrap();
    let y = result.find_symbol_ost(fx.s, 2).unwrap();
    let p = result.find_symbol_ost(fx.p, 0).unwrap();
    let deref = result.table().next_level(p)[0];

    let set = result.alias_set_of(deref).unwrap();
    assert!(set.contains(&x));
    assert!(set.contains(&y));
    assert!(!result.may_alias(x, y).unwrap());

    let loaded = stamped_location(&fx.module, fx.load);
    assert_eq!(result.table().ost_of(loaded), deref);
}

#[test]
fn test_store_through_pointer_defines_pointee() {
    let mut fx = store_through_pointer();
    let results = sequential(AliasConfig::default()).analyze_module(&mut fx.module).unwrap();
    let result = &results[0];

    let a = result.find_symbol_ost(fx.a, 0).unwrap();
    assert_may_def(result, fx.store, a);
    assert_fully_annotated(result, 4);
    assert!(!result.is_nads(a));
}

#[test]
fn test_address_passed_to_unknown_callee_escapes() {
    let mut fx = address_passed_to(UNKNOWN_CALLEE);
    let results = sequential(AliasConfig::default()).analyze_module(&mut fx.module).unwrap();
    let result = &results[0];

    let x = result.find_symbol_ost(fx.x, 0).unwrap();
    assert!(result.is_nads(x));
    assert_may_def(result, fx.call, x);
    assert_may_use(result, fx.call, x);

    // the later load resolves into the escaped class
    let loaded = result.table().ost_of(stamped_location(&fx.module, fx.load));
    assert!(result.is_nads(loaded));
    assert!(result.may_alias(loaded, x).unwrap());
    assert!(result.flags(result.find_symbol_ost(fx.p, 0).unwrap()).unwrap().next_lev_nads);
}

#[test]
fn test_read_self_only_callee_does_not_define_argument_pointee() {
    let mut fx = address_passed_to(READ_SELF_CALLEE);
    let results = sequential(AliasConfig::default())
        .with_oracle(summaries())
        .analyze_module(&mut fx.module)
        .unwrap();
    let result = &results[0];

    let x = result.find_symbol_ost(fx.x, 0).unwrap();
    assert!(!result.is_nads(x));
    assert_no_may_def(result, fx.call, x);
}

#[test]
fn test_globals_are_used_and_defined_by_calls() {
    let mut fx = globals_and_call();
    let results = sequential(AliasConfig::default()).analyze_module(&mut fx.module).unwrap();
    let result = &results[0];

    let g = result.find_symbol_ost(fx.g, 0).unwrap();
    let k = result.find_symbol_ost(fx.k, 0).unwrap();
    assert!(result.globals_affected_by_calls().contains(&g));
    assert!(!result.globals_affected_by_calls().contains(&k));

    assert_may_def(result, fx.call, g);
    assert_may_use(result, fx.call, g);
    assert_no_may_def(result, fx.call, k);
    assert_may_use(result, fx.ret, g);
    assert!(!result.may_alias(k, g).unwrap());
}

#[test]
fn test_throw_in_goto_block_is_handled_locally() {
    let mut fx = throw_in(BlockKind::Goto);
    let config = AliasConfig::default().less_throw_alias(true);
    let results = sequential(config).analyze_module(&mut fx.module).unwrap();
    assert!(results[0].annotations(fx.throw).unwrap().is_empty());
}

#[test]
fn test_unhandled_throw_uses_every_location() {
    let mut fx = throw_in(BlockKind::Fallthrough);
    let config = AliasConfig::default().less_throw_alias(false);
    let results = sequential(config).analyze_module(&mut fx.module).unwrap();
    let result = &results[0];
    let e = result.find_symbol_ost(fx.e, 0).unwrap();
    assert_may_use(result, fx.throw, e);
}

#[test]
fn test_memcpy_defines_destination_and_uses_source() {
    let mut types = TypeTable::new();
    let i32_ty = types.prim(PrimType::I32);
    let mut b = FunctionBuilder::new(FuncId(0), "copy");
    let a = b.local("a", i32_ty);
    let src = b.local("b", i32_ty);
    b.dassign(src, Expr::constant(PrimType::I32, 3));
    let copy = b.push(StmtKind::IntrinsicCall(IntrinsicCallNode {
        intrinsic: Intrinsic::Memcpy,
        args: vec![
            Expr::addr_of(a),
            Expr::addr_of(src),
            Expr::constant(PrimType::U64, 4),
        ],
        return_values: Vec::new(),
    }));
    b.ret(vec![]);
    let mut func = b.build();

    let result = sequential(AliasConfig::default())
        .analyze_function(&mut func, &types, &[])
        .unwrap();
    let ao = result.find_symbol_ost(a, 0).unwrap();
    let bo = result.find_symbol_ost(src, 0).unwrap();
    assert_may_def(&result, copy, ao);
    assert_may_use(&result, copy, bo);
    assert_no_may_def(&result, copy, bo);
}

#[test]
fn test_two_runs_produce_identical_partitions() {
    let fx = select_of_fields();
    let mut first = fx.module.clone();
    let mut second = fx.module;

    let analyzer = sequential(AliasConfig::default());
    let a = analyzer.analyze_module(&mut first).unwrap();
    let b = analyzer.analyze_module(&mut second).unwrap();

    assert_eq!(a[0].alias_partition(), b[0].alias_partition());
    assert_eq!(a[0].assign_partition(), b[0].assign_partition());
    assert_eq!(a[0].all_annotations(), b[0].all_annotations());
    assert_eq!(a[0].report().alias_sets, b[0].report().alias_sets);
    assert_eq!(first, second);
}

#[test]
fn test_constant_address_escapes_but_null_does_not() {
    let mut fx = constant_addresses();
    let results = sequential(AliasConfig::default()).analyze_module(&mut fx.module).unwrap();
    let result = &results[0];

    let deref = |sym| result.table().next_level(result.find_symbol_ost(sym, 0).unwrap())[0];
    let (p, q, n) = (deref(fx.p), deref(fx.q), deref(fx.n));

    assert!(result.is_nads(p));
    assert!(result.is_nads(q));
    assert!(result.may_alias(p, q).unwrap());
    assert_may_def(result, fx.store, q);
    assert!(!result.is_nads(n));
    assert!(!result.may_alias(p, n).unwrap());
}

#[test]
fn test_allocation_is_treated_alike_with_or_without_cast() {
    let mut fx = fresh_allocations();
    let results = sequential(AliasConfig::default()).analyze_module(&mut fx.module).unwrap();
    let result = &results[0];

    let deref = |sym| result.table().next_level(result.find_symbol_ost(sym, 0).unwrap())[0];
    let (p, q) = (deref(fx.p), deref(fx.q));
    assert_eq!(result.is_nads(p), result.is_nads(q));
    assert!(result.is_nads(p));
}

#[test]
fn test_whole_object_aliases_each_field_through_copied_pointer() {
    let mut fx = whole_and_field_pointees();
    let results = sequential(AliasConfig::default()).analyze_module(&mut fx.module).unwrap();
    let result = &results[0];

    let p = result.find_symbol_ost(fx.p, 0).unwrap();
    let q = result.find_symbol_ost(fx.q, 0).unwrap();
    let whole = result.table().next_level(p)[0];
    let fields = result.table().next_level(q).to_vec();
    assert_eq!(fields.len(), 2);

    for &field in &fields {
        assert!(result.may_alias(whole, field).unwrap());
    }
    assert!(!result.may_alias(fields[0], fields[1]).unwrap());
}
