//! Parser for the Java subset consumed by the test input generator
//!
//! The grammar covers one class with methods over primitive types and
//! `String`, plus the intrinsics emitted by the rewrite engine
//! (`__probe`, `__probe_value`, `__bound_exceeded`).

pub mod error;
pub mod lexer;
pub mod parser;

#[cfg(test)]
mod parser_tests;

pub use error::{line_col, ErrorKind, ParseError};
pub use parser::{ParseResult, Parser, DEFAULT_MAX_DEPTH};

use utgen_core::ast::CompilationUnit;

/// Parse a source file into a compilation unit
pub fn parse(source: &str) -> Result<CompilationUnit, ParseError> {
    let unit = Parser::new(source).parse()?;
    tracing::trace!(
        class = %unit.class.name,
        methods = unit.class.methods.len(),
        "parsed compilation unit"
    );
    Ok(unit)
}

/// Parse with custom depth limit to prevent stack overflow
pub fn parse_with_depth_limit(source: &str, max_depth: usize) -> Result<CompilationUnit, ParseError> {
    Parser::new(source).with_max_depth(max_depth).parse()
}
