//! Error types for log line parsing

use thiserror::Error;

/// Errors while parsing a single raw log line. The line is dropped, the stream continues.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("line too short: {len} bytes, need at least {min}")]
    TooShort { len: usize, min: usize },

    #[error("malformed hex in {field}: {value:?}")]
    MalformedHex { field: &'static str, value: String },

    #[error("expected at least {expected} fields, found {found}")]
    TooFewFields { expected: usize, found: usize },

    #[error("line does not match the {kind} pattern")]
    NoMatch { kind: &'static str },
}
