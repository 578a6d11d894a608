//! Error types for context operations

use std::path::PathBuf;
use thiserror::Error;

/// Errors during configuration operations
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration from {path}")]
    LoadPath {
        path: PathBuf,
        #[source]
        source: confy::ConfyError,
    },

    #[error("invalid configuration: {reason}")]
    Invalid { reason: String },
}
