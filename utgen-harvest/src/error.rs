//! Harvesting errors

use crate::tuple::InputTuple;
use thiserror::Error;
use utgen_core::Type;
use utgen_vm::{ResolveError, VmError};

/// Constraint solving failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    #[error("evaluation budget of {budget} exhausted with {pending} targets pending")]
    BudgetExhausted { budget: u64, pending: usize },

    #[error("constraint cannot be evaluated: {0}")]
    Unevaluable(String),
}

/// Why harvesting a method stopped early
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HarvestError {
    #[error("cannot resolve method: {0}")]
    Resolve(#[from] ResolveError),

    #[error("execution failed: {0}")]
    Execution(#[from] VmError),

    #[error("solver failed: {0}")]
    Solver(#[from] SolverError),

    #[error("parameter type {ty} of {method} has no sample strategy")]
    UnsupportedType { method: String, ty: Type },

    #[error("harvest timed out after {limit_ms} ms")]
    Timeout { limit_ms: u64 },

    #[error("harvest cancelled")]
    Cancelled,
}

impl HarvestError {
    pub fn unsupported(method: impl Into<String>, ty: &Type) -> Self {
        HarvestError::UnsupportedType {
            method: method.into(),
            ty: ty.clone(),
        }
    }
}

/// A harvest error together with the tuples found before it
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{error} ({} inputs harvested before failing)", .partial.len())]
pub struct HarvestFailure {
    #[source]
    pub error: HarvestError,
    pub partial: Vec<InputTuple>,
}

impl HarvestFailure {
    pub fn new(error: HarvestError, partial: Vec<InputTuple>) -> Self {
        Self { error, partial }
    }
}

impl From<HarvestError> for HarvestFailure {
    fn from(error: HarvestError) -> Self {
        Self::new(error, Vec::new())
    }
}

pub type Result<T> = std::result::Result<T, HarvestFailure>;
