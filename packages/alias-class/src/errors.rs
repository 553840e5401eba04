//! Error types for alias-class
//!
//! Uncertainty (unknown offsets, unknown callee effects) is never an error:
//! the analysis absorbs it conservatively. The variants here are the fatal
//! conditions that abort the current compilation unit.

use crate::config::ConfigError;
use thiserror::Error;

/// Main error type for alias analysis operations
#[derive(Debug, Error)]
pub enum AliasError {
    /// Expression with an unexpected shape or operand count
    #[error("Malformed expression: {0}")]
    MalformedExpr(String),

    /// Statement with an unexpected shape or operand count
    #[error("Malformed statement {stmt}: {reason}")]
    MalformedStmt { stmt: u32, reason: String },

    /// Table lookup outside its bounds
    #[error("{kind} index {index} out of range (len {len})")]
    IndexOutOfRange {
        kind: &'static str,
        index: usize,
        len: usize,
    },

    /// An analysis invariant observed broken
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// A worklist or fixed-point loop hit its hard bound
    #[error("Iteration limit {limit} exceeded in {phase}")]
    IterationLimit { phase: &'static str, limit: usize },

    /// Operation called before the phase it depends on has finished
    #[error("Phase order: {operation} requires {required}, current phase is {current}")]
    PhaseOrder {
        operation: &'static str,
        required: &'static str,
        current: &'static str,
    },

    /// Worker pool could not be created
    #[error("Thread pool error: {0}")]
    ThreadPool(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AliasError {
    /// Create a malformed-expression error
    pub fn malformed_expr(msg: impl Into<String>) -> Self {
        AliasError::MalformedExpr(msg.into())
    }

    /// Create a malformed-statement error
    pub fn malformed_stmt(stmt: u32, reason: impl Into<String>) -> Self {
        AliasError::MalformedStmt {
            stmt,
            reason: reason.into(),
        }
    }

    /// Create an invariant-violation error
    pub fn invariant(msg: impl Into<String>) -> Self {
        AliasError::InvariantViolation(msg.into())
    }
}

/// Result type alias for alias analysis operations
pub type AliasResult<T> = std::result::Result<T, AliasError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AliasError::IterationLimit {
            phase: "points-to propagation",
            limit: 10,
        };
        assert_eq!(
            err.to_string(),
            "Iteration limit 10 exceeded in points-to propagation"
        );

        let err = AliasError::malformed_stmt(7, "call without target");
        assert!(err.to_string().contains("statement 7"));
    }
}
