//! Application layer for alias classification
//!
//! - **AliasAnalyzer**: runs both passes on a function or a whole module
//! - **AliasAnalysisResult**: frozen classes, annotations and queries

pub mod analyzer;
pub mod result;

pub use analyzer::AliasAnalyzer;
pub use result::{AliasAnalysisResult, AliasReport, StmtReport};
