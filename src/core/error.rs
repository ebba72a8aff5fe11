// This module defines error types for memaccess using the thiserror crate for idiomatic
// Rust error handling. Classification itself never fails (an unrecognized instruction is
// an absent descriptor, not an error), so the errors here cover the surrounding plumbing:
// LayoutError for malformed target data-layout strings, ParseError for the textual test
// IR (syntax errors, undefined or duplicate symbols, each with line and column), and
// CheckError for FileCheck-style directive mismatches in file tests.

//! Error types for memaccess.
//!
//! Using thiserror for more idiomatic error handling.

use thiserror::Error;

/// Errors raised while parsing a target data-layout string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    #[error("Invalid data layout token '{token}': {reason}")]
    InvalidToken {
        token: String,
        reason: String,
    },

    #[error("Unknown data layout specifier '{token}'")]
    UnknownSpecifier {
        token: String,
    },
}

/// Errors raised while parsing test IR.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("{line}:{column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("{line}:{column}: use of undefined value '{name}'")]
    UndefinedValue {
        line: usize,
        column: usize,
        name: String,
    },

    #[error("use of undefined block '^{name}' in function '{function}'")]
    UndefinedBlock {
        function: String,
        name: String,
    },

    #[error("call to undefined function '@{name}'")]
    UndefinedFunction {
        name: String,
    },

    #[error("{line}:{column}: redefinition of '{name}'")]
    Redefinition {
        line: usize,
        column: usize,
        name: String,
    },

    #[error("{line}:{column}: {source}")]
    Layout {
        line: usize,
        column: usize,
        source: LayoutError,
    },
}

/// Errors raised while validating output against CHECK directives.
#[derive(Error, Debug)]
pub enum CheckError {
    #[error("failed to parse test input: {0}")]
    Parse(#[from] ParseError),

    #[error("test has no RUN directive")]
    MissingRun,

    #[error("unknown RUN option '{0}'")]
    UnknownOption(String),

    #[error("CHECK{kind}: '{pattern}' not found after line {line}\noutput:\n{output}")]
    NotFound {
        kind: &'static str,
        pattern: String,
        line: usize,
        output: String,
    },

    #[error("CHECK-NOT: '{pattern}' found on line {line}\noutput:\n{output}")]
    Excluded {
        pattern: String,
        line: usize,
        output: String,
    },
}

/// Result type alias for test IR parsing.
pub type ParseResult<T> = Result<T, ParseError>;
