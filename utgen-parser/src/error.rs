//! Parser error types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Unexpected token at position {position}: expected {expected}, found {found}")]
    UnexpectedToken {
        position: usize,
        expected: String,
        found: String,
    },

    #[error("Unexpected end of input")]
    UnexpectedEof,

    #[error("Invalid number literal: {0}")]
    InvalidNumber(String),

    #[error("Invalid escape sequence in string: {0}")]
    InvalidEscape(String),

    #[error("Unclosed delimiter: {0}")]
    UnclosedDelimiter(String),

    #[error("Invalid syntax: {0}")]
    InvalidSyntax(String),

    #[error("Unsupported construct at position {position}: {construct}")]
    Unsupported { position: usize, construct: String },

    #[error("Maximum parsing depth exceeded: depth {depth} exceeds limit of {max_depth}")]
    MaxDepthExceeded { depth: usize, max_depth: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UnexpectedToken,
    UnexpectedEof,
    InvalidNumber,
    InvalidEscape,
    UnclosedDelimiter,
    InvalidSyntax,
    Unsupported,
    MaxDepthExceeded,
}

impl ParseError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ParseError::UnexpectedToken { .. } => ErrorKind::UnexpectedToken,
            ParseError::UnexpectedEof => ErrorKind::UnexpectedEof,
            ParseError::InvalidNumber(_) => ErrorKind::InvalidNumber,
            ParseError::InvalidEscape(_) => ErrorKind::InvalidEscape,
            ParseError::UnclosedDelimiter(_) => ErrorKind::UnclosedDelimiter,
            ParseError::InvalidSyntax(_) => ErrorKind::InvalidSyntax,
            ParseError::Unsupported { .. } => ErrorKind::Unsupported,
            ParseError::MaxDepthExceeded { .. } => ErrorKind::MaxDepthExceeded,
        }
    }

    /// Byte offset the error points at, if any
    pub fn position(&self) -> Option<usize> {
        match self {
            ParseError::UnexpectedToken { position, .. }
            | ParseError::Unsupported { position, .. } => Some(*position),
            _ => None,
        }
    }
}

impl From<ParseError> for utgen_core::Error {
    fn from(err: ParseError) -> Self {
        utgen_core::Error::Parse(err.to_string())
    }
}

/// 1-based line and column of a byte offset
pub fn line_col(source: &str, position: usize) -> (usize, usize) {
    let position = position.min(source.len());
    let prefix = &source[..position];
    let line = prefix.matches('\n').count() + 1;
    let column = prefix.rfind('\n').map_or(position, |i| position - i - 1) + 1;
    (line, column)
}
