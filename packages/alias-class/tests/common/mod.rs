//! Common test utilities for alias-class
//!
//! Fixture programs (the classic alias scenarios) and assertions over
//! analysis results.

#![allow(dead_code)]

mod assertions;
mod fixtures;

pub use assertions::*;
pub use fixtures::*;
