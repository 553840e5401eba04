//! # Alias Classification
//!
//! Flow-insensitive, equality-based alias analysis over a typed tree IR,
//! run once per function ahead of SSA construction.
//!
//! - **Pass 1**: union versions connected by copies into assign sets, union
//!   the pointees of each assign set into alias sets, and spread escape
//!   ("not all defs seen") state to a fixed point.
//! - **Materialization**: freeze both partitions into shared sets.
//! - **Pass 2**: attach may-def / may-use annotations to every statement and
//!   stamp every indirect read with the location it resolves to.
//!
//! ## Usage
//! ```text
//! use alias_class::AliasAnalyzer;
//!
//! let result = AliasAnalyzer::default().analyze_function(&mut func, &types, &globals)?;
//! let a = result.find_symbol_ost(sym_a, 0).unwrap();
//! assert!(result.annotations(store).unwrap().defines(a));
//! ```

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod ports;

pub use application::{AliasAnalysisResult, AliasAnalyzer, AliasReport, StmtReport};
pub use domain::{AliasInfo, AliasStats, MayDefNode, MayUseNode, OffsetType, StmtAnnotations};
pub use infrastructure::{AliasClass, FrozenClasses, Phase};
pub use ports::{
    ArgEffect, CalleeSummary, ClassHierarchy, NoSummaries, SideEffectOracle, SummarySource,
    SummaryTable,
};
#[doc(hidden)]
pub use infrastructure::{DescriptorTable, UnionFind};
