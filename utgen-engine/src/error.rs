//! Engine error types
//!
//! [`PipelineError`] aborts a whole run; [`MethodError`] is caught at the
//! method boundary and turned into a report entry; [`RenderError`] only
//! drops the offending test case.

use crate::config::ConfigError;
use crate::report::{MethodStage, RunReport};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::PathBuf;
use thiserror::Error;
use utgen_core::Type;
use utgen_harvest::{HarvestError, SolverError};
use utgen_parser::ParseError;
use utgen_rewrite::RewriteError;
use utgen_vm::BuildError;

/// Failure to load a source class
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{}:{line}:{column}: {source}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        column: usize,
        #[source]
        source: ParseError,
    },
}

/// Run-fatal failures
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("no method selected")]
    NoMethodSelected,

    #[error("{class} has no method {signature}")]
    UnknownMethod { class: String, signature: String },

    #[error("run directory {}: {source}", path.display())]
    Workspace {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("run cancelled before any method completed")]
    Cancelled,

    #[error("all {} selected methods failed", report.methods.len())]
    AllMethodsFailed { report: Box<RunReport> },
}

impl PipelineError {
    pub(crate) fn workspace(path: impl Into<PathBuf>, source: io::Error) -> Self {
        PipelineError::Workspace {
            path: path.into(),
            source,
        }
    }
}

/// Coarse category of a per-method failure, as shown in reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Rewrite,
    Storage,
    Compile,
    Resolve,
    Execution,
    Solver,
    UnsupportedType,
    Timeout,
    Cancelled,
}

/// Why one method left the pipeline early
#[derive(Error, Debug)]
pub enum MethodError {
    #[error("rewrite failed: {0}")]
    Rewrite(RewriteError),

    #[error("cannot store {}: {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("build failed: {0}")]
    Build(#[from] BuildError),

    #[error("{0}")]
    Harvest(HarvestError),

    #[error("{stage} exceeded its deadline of {limit_ms} ms")]
    Timeout { stage: MethodStage, limit_ms: u64 },

    #[error("cancelled")]
    Cancelled,
}

impl MethodError {
    pub(crate) fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        MethodError::Storage {
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            MethodError::Rewrite(_) => FailureKind::Rewrite,
            MethodError::Storage { .. } => FailureKind::Storage,
            MethodError::Build(_) => FailureKind::Compile,
            MethodError::Harvest(err) => match err {
                HarvestError::Resolve(_) => FailureKind::Resolve,
                HarvestError::Execution(_) => FailureKind::Execution,
                HarvestError::Solver(_) => FailureKind::Solver,
                HarvestError::UnsupportedType { .. } => FailureKind::UnsupportedType,
                HarvestError::Timeout { .. } => FailureKind::Timeout,
                HarvestError::Cancelled => FailureKind::Cancelled,
            },
            MethodError::Timeout { .. } => FailureKind::Timeout,
            MethodError::Cancelled => FailureKind::Cancelled,
        }
    }

    /// Compiler messages, for build failures
    pub fn diagnostics(&self) -> Vec<String> {
        match self {
            MethodError::Build(err) => err.diagnostics().iter().map(|d| d.to_string()).collect(),
            _ => Vec::new(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, MethodError::Cancelled)
    }
}

impl From<RewriteError> for MethodError {
    fn from(err: RewriteError) -> Self {
        match err {
            RewriteError::Cancelled => MethodError::Cancelled,
            other => MethodError::Rewrite(other),
        }
    }
}

impl From<HarvestError> for MethodError {
    fn from(err: HarvestError) -> Self {
        match err {
            HarvestError::Cancelled => MethodError::Cancelled,
            HarvestError::Timeout { limit_ms } => MethodError::Timeout {
                stage: MethodStage::Executed,
                limit_ms,
            },
            other => MethodError::Harvest(other),
        }
    }
}

impl From<SolverError> for MethodError {
    fn from(err: SolverError) -> Self {
        MethodError::Harvest(err.into())
    }
}

/// A test case that cannot be written as source
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("{method} takes {expected} arguments, got {found}")]
    ArityMismatch {
        method: String,
        expected: usize,
        found: usize,
    },

    #[error("argument {index} of {method} must be {expected}, got {value}")]
    ArgumentType {
        method: String,
        index: usize,
        expected: Type,
        value: String,
    },

    #[error("{method} returns {expected}, observed {value}")]
    ReturnType {
        method: String,
        expected: Type,
        value: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancellation_collapses() {
        assert!(MethodError::from(RewriteError::Cancelled).is_cancelled());
        assert!(MethodError::from(HarvestError::Cancelled).is_cancelled());
        assert_eq!(
            MethodError::from(RewriteError::InvalidBound(0)).kind(),
            FailureKind::Rewrite
        );
    }

    #[test]
    fn test_harvest_timeout_is_attributed_to_execution() {
        let err = MethodError::from(HarvestError::Timeout { limit_ms: 5 });
        assert_eq!(err.kind(), FailureKind::Timeout);
        assert_eq!(err.to_string(), "executed exceeded its deadline of 5 ms");
    }

    #[test]
    fn test_harvest_kinds() {
        let err = MethodError::from(HarvestError::unsupported("f(Widget)", &Type::Reference("Widget".into())));
        assert_eq!(err.kind(), FailureKind::UnsupportedType);
        let err = MethodError::from(SolverError::BudgetExhausted { budget: 10, pending: 2 });
        assert_eq!(err.kind(), FailureKind::Solver);
        assert!(err.diagnostics().is_empty());
    }
}
