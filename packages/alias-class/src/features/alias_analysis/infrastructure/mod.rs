//! Infrastructure layer for alias classification
//!
//! - **UnionFind**: ring-linked disjoint sets (assign sets, alias sets)
//! - **DescriptorTable**: hash-consed location/value descriptors
//! - **AliasClass**: per-function context driving the two passes
//!   - pass 1: `collect` → `propagate` (storage overlap, points-to, NADS, type refinement)
//!   - `materialize`: freeze the classes
//!   - pass 2: `insert_may_def_use`

pub mod assign_sets;
pub mod context;
pub mod descriptor_table;
pub mod expr_builder;
pub mod intrinsics;
pub mod materialize;
pub mod may_def_use;
pub mod nads;
pub mod points_to;
pub mod storage_overlap;
pub mod type_refinement;
pub mod union_find;

pub use context::{AliasClass, OstFlags, Phase};
pub use descriptor_table::{DescriptorTable, OstAttrs};
pub use intrinsics::{describe, ExprEffect, IntrinsicDesc};
pub use materialize::FrozenClasses;
pub use union_find::UnionFind;
