//! Error types for the encounter archive

use std::path::PathBuf;
use thiserror::Error;

use crate::wire::CodecError;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to create directory {path}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("record {index} out of range, archive holds {len}")]
    OutOfRange { index: u64, len: u64 },

    #[error("corrupt archive {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("failed to decode archived record")]
    Codec(#[from] CodecError),
}
