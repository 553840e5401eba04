//! Assertions over analysis results

use alias_class::shared::models::{OstIdx, StmtId};
use alias_class::AliasAnalysisResult;

pub fn assert_may_def(result: &AliasAnalysisResult, stmt: StmtId, ost: OstIdx) {
    let ann = result
        .annotations(stmt)
        .unwrap_or_else(|| panic!("no annotations for {}", stmt));
    assert!(
        ann.defines(ost),
        "expected {} in may-def of {}, got {:?}",
        result.describe(ost).unwrap(),
        stmt,
        ann.may_def_osts().collect::<Vec<_>>()
    );
}

pub fn assert_no_may_def(result: &AliasAnalysisResult, stmt: StmtId, ost: OstIdx) {
    let ann = result
        .annotations(stmt)
        .unwrap_or_else(|| panic!("no annotations for {}", stmt));
    assert!(
        !ann.defines(ost),
        "unexpected {} in may-def of {}",
        result.describe(ost).unwrap(),
        stmt
    );
}

pub fn assert_may_use(result: &AliasAnalysisResult, stmt: StmtId, ost: OstIdx) {
    let ann = result
        .annotations(stmt)
        .unwrap_or_else(|| panic!("no annotations for {}", stmt));
    assert!(
        ann.uses(ost),
        "expected {} in may-use of {}, got {:?}",
        result.describe(ost).unwrap(),
        stmt,
        ann.may_use_osts().collect::<Vec<_>>()
    );
}

/// Every statement of the function carries an annotation entry
pub fn assert_fully_annotated(result: &AliasAnalysisResult, stmts: usize) {
    assert_eq!(result.all_annotations().len(), stmts);
}
