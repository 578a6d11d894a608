//! Error types for the wire codec

use thiserror::Error;

/// Errors while encoding, decoding or (de)compressing wire records.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("empty buffer")]
    Empty,

    #[error("unexpected record tag {found:#04x}, expected {expected:#04x}")]
    WrongTag { expected: u8, found: u8 },

    #[error("unknown record tag {0:#04x}")]
    UnknownTag(u8),

    #[error("unsupported protocol version {version} (accepted {min}..={max})")]
    UnsupportedVersion { version: i32, min: i32, max: i32 },

    #[error("buffer truncated at offset {offset}: needed {needed} bytes, {remaining} remaining")]
    Truncated {
        offset: usize,
        needed: usize,
        remaining: usize,
    },

    #[error("invalid utf-8 in string field at offset {offset}")]
    InvalidUtf8 {
        offset: usize,
        #[source]
        source: std::str::Utf8Error,
    },

    #[error("invalid timestamp {value:?}")]
    InvalidTimestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("invalid boolean byte {0}")]
    InvalidBool(u8),

    #[error("invalid encounter outcome byte {0}")]
    InvalidOutcome(u8),

    #[error("compression stream error")]
    Compression(#[source] std::io::Error),
}
