//! Domain model: descriptors, offsets, shared sets, annotations, statistics

pub mod alias_info;
pub mod annotations;
pub mod offset;
pub mod original_st;
pub mod shared_sets;
pub mod stats;

pub use alias_info::AliasInfo;
pub use annotations::{MayDefNode, MayUseNode, StmtAnnotations};
pub use offset::{ranges_disjoint, OffsetType};
pub use original_st::{Container, OriginalSt, OstBase, OstKey, VersionSt};
pub use shared_sets::{SetHandle, SharedSets};
pub use stats::AliasStats;
