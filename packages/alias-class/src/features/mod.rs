//! Feature slices

pub mod alias_analysis;
