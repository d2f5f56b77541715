//! Configuration errors.

use thiserror::Error;

/// Raised when a configuration key is read.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The key is absent or null.
    #[error("Missing configuration key '{0}'")]
    MissingKey(String),

    /// The key holds a value of the wrong shape.
    #[error("Invalid value for configuration key '{key}': {reason}")]
    InvalidValue {
        /// Flattened key.
        key: String,
        /// What was wrong with it.
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(key: &str, reason: impl ToString) -> Self {
        Self::InvalidValue {
            key: key.to_string(),
            reason: reason.to_string(),
        }
    }
}
