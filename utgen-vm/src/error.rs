//! Compiler diagnostics and runtime errors

use crate::ops::OpError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use utgen_core::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
}

/// One compiler message, attributed to a method when it has one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub method: Option<String>,
    pub message: String,
}

impl Diagnostic {
    pub fn error(method: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            method: method.map(str::to_string),
            message: message.into(),
        }
    }

    pub fn warning(method: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            method: method.map(str::to_string),
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        match &self.method {
            Some(method) => write!(f, "{} in {}: {}", level, method, self.message),
            None => write!(f, "{}: {}", level, self.message),
        }
    }
}

/// Compilation failed with at least one error-severity diagnostic
#[derive(Error, Debug, Clone, PartialEq)]
#[error("compilation failed: {}", summarize(.diagnostics))]
pub struct CompileError {
    pub diagnostics: Vec<Diagnostic>,
}

impl CompileError {
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }
}

fn summarize(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .filter(|d| d.is_error())
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Runtime faults and execution limits
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VmError {
    #[error("division by zero in {method}")]
    DivisionByZero { method: String },

    #[error("null dereference in {method}: {operation}")]
    NullPointer { method: String, operation: String },

    #[error("{method} reached its end without returning a value")]
    MissingReturn { method: String },

    #[error("step limit of {limit} exceeded")]
    StepLimitExceeded { limit: u64 },

    #[error("call depth limit of {limit} exceeded")]
    CallDepthExceeded { limit: usize },

    #[error("{method} expects {expected} arguments, got {got}")]
    ArityMismatch {
        method: String,
        expected: usize,
        got: usize,
    },

    #[error("argument {index} of {method} must be {expected}, got {got}")]
    ArgumentType {
        method: String,
        index: usize,
        expected: Type,
        got: String,
    },

    #[error("type error in {method}: {detail}")]
    TypeMismatch { method: String, detail: String },

    #[error("stack underflow in {0}")]
    StackUnderflow(String),

    #[error("invalid chunk index {0}")]
    InvalidChunk(usize),

    #[error("invalid constant index {0}")]
    InvalidConstant(u32),

    #[error("invalid local slot {0}")]
    InvalidLocal(u32),

    #[error("invalid jump target {0}")]
    InvalidJump(usize),
}

impl VmError {
    /// Attach the executing method to an operator fault
    pub fn from_op(err: OpError, method: &str) -> Self {
        match err {
            OpError::DivisionByZero => VmError::DivisionByZero {
                method: method.to_string(),
            },
            OpError::NullPointer(operation) => VmError::NullPointer {
                method: method.to_string(),
                operation: operation.to_string(),
            },
            other => VmError::TypeMismatch {
                method: method.to_string(),
                detail: other.to_string(),
            },
        }
    }

    /// Faults a Java program could raise, as opposed to broken bytecode
    pub fn is_runtime_fault(&self) -> bool {
        matches!(
            self,
            VmError::DivisionByZero { .. }
                | VmError::NullPointer { .. }
                | VmError::MissingReturn { .. }
                | VmError::StepLimitExceeded { .. }
                | VmError::CallDepthExceeded { .. }
        )
    }
}

pub type VmResult<T> = std::result::Result<T, VmError>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
