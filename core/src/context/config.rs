//! Server configuration
//!
//! Re-exports the shared types from parsecast-types and adds persistence
//! through confy plus the platform-specific data directory default.

use std::path::{Path, PathBuf};

pub use parsecast_types::{EncounterTimings, ServerConfig, SessionTimings, UploadKeyEntry};

use super::ConfigError;
use crate::storage::default_data_dir;

pub const APP_NAME: &str = "parsecast";
pub const CONFIG_NAME: &str = "config";

/// Extension trait for ServerConfig persistence
pub trait ServerConfigExt: Sized {
    /// Load the user config, falling back to defaults if it cannot be read.
    fn load() -> Self;
    fn load_from(path: &Path) -> Result<Self, ConfigError>;
    fn data_dir(&self) -> PathBuf;
    fn validate(&self) -> Result<(), ConfigError>;
}

impl ServerConfigExt for ServerConfig {
    fn load() -> Self {
        match confy::load(APP_NAME, CONFIG_NAME) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(error = %err, "Failed to load config, using defaults");
                ServerConfig::default()
            }
        }
    }

    fn load_from(path: &Path) -> Result<Self, ConfigError> {
        confy::load_path(path).map_err(|source| ConfigError::LoadPath {
            path: path.to_path_buf(),
            source,
        })
    }

    fn data_dir(&self) -> PathBuf {
        if self.data_directory.trim().is_empty() {
            default_data_dir()
        } else {
            PathBuf::from(&self.data_directory)
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: &str| {
            Err(ConfigError::Invalid {
                reason: reason.to_string(),
            })
        };
        if self.min_protocol_version > self.max_protocol_version {
            return invalid("min_protocol_version is above max_protocol_version");
        }
        if self.publish_interval_ms == 0 {
            return invalid("publish_interval_ms must be positive");
        }
        if self.session.inbox_capacity == 0 {
            return invalid("session.inbox_capacity must be positive");
        }
        if self.timings.min_duration_ms > self.timings.max_duration_ms {
            return invalid("timings.min_duration_ms is above timings.max_duration_ms");
        }
        Ok(())
    }
}
