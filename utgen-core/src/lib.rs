//! Core types and data structures for utgen
//!
//! This crate provides the building blocks shared by the rewrite engine,
//! the compiler/VM and the orchestrator:
//! - AST of the accepted Java subset and a re-parseable printer
//! - Runtime value representation
//! - Error types and cooperative cancellation

pub mod ast;
pub mod cancel;
pub mod error;
pub mod printer;
pub mod value;

pub use ast::{
    AssignOp, BinaryOp, Block, ClassDecl, CompilationUnit, Expr, Literal, MethodDecl,
    MethodSignature, Modifier, Param, ProbeId, ProbeKind, Step, Stmt, Type, UnaryOp,
};
pub use cancel::CancellationToken;
pub use error::{Error, Result};
pub use value::Value;
