//! Shared models consumed by every feature

pub mod models;
