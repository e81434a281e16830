//! Error types for aptflow infrastructure (configuration)

use thiserror::Error;

/// Main error type for aptflow infrastructure operations
#[derive(Error, Debug)]
pub enum Error {
    /// A loaded configuration value is out of range
    #[error("Configuration error: {0}")]
    Config(String),

    /// A configuration source could not be read or deserialized
    #[error("Settings error: {0}")]
    Settings(#[from] config::ConfigError),
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }
}
