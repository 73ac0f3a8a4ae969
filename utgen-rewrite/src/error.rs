//! Rewrite engine errors

use thiserror::Error;
use utgen_core::Type;

/// Errors raised while normalizing or instrumenting a method body
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RewriteError {
    /// The fixpoint loop did not converge within the configured rounds
    #[error("rewrite did not reach a fixpoint after {iterations} iterations (limit {limit})")]
    IterationCapExceeded {
        /// Rounds executed
        iterations: usize,
        /// Configured limit
        limit: usize,
    },

    /// The unrolled body grew past the configured size
    #[error("rewritten body has {nodes} nodes, exceeding the limit of {limit}")]
    ExpansionLimitExceeded {
        /// Node count after the offending round
        nodes: usize,
        /// Configured limit
        limit: usize,
    },

    /// The unrolling bound must be positive
    #[error("invalid unrolling bound {0}: must be at least 1")]
    InvalidBound(usize),

    /// A user label collides with the generated label namespace
    #[error("label `{0}` uses the reserved `__` prefix")]
    ReservedLabel(String),

    /// A local is declared twice with different types
    #[error("local `{name}` is declared as both {first} and {second}")]
    ConflictingLocal {
        /// Variable name
        name: String,
        /// Type of the first declaration
        first: Type,
        /// Type of the conflicting declaration
        second: Type,
    },

    /// A compound assignment or increment targets an undeclared name
    #[error("assignment to undeclared variable `{0}`")]
    UnknownVariable(String),

    /// Cancellation was requested between rounds
    #[error("rewrite cancelled")]
    Cancelled,
}

impl RewriteError {
    /// Whether the error comes from the fixpoint driver's caps
    pub fn is_cap_exceeded(&self) -> bool {
        matches!(
            self,
            RewriteError::IterationCapExceeded { .. } | RewriteError::ExpansionLimitExceeded { .. }
        )
    }
}

/// Result alias for the rewrite engine
pub type Result<T> = std::result::Result<T, RewriteError>;
