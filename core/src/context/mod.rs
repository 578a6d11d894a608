mod config;
mod error;

pub use config::{APP_NAME, CONFIG_NAME, ServerConfigExt};
pub use error::ConfigError;
