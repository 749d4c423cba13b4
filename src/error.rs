//! Error types for the papaw CLI.
//!
//! Messages follow the `"<operation> failed: <reason>"` / `"invalid <thing>: <reason>"`
//! style, all lowercase.

use papaw_pack::PackError;
use thiserror::Error;

/// Result type alias using papaw's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in papaw operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A packing stage failed.
    #[error(transparent)]
    Pack(#[from] PackError),

    /// A configuration value is unusable.
    #[error("invalid configuration: {key}: {reason}")]
    Config {
        /// Name of the setting.
        key: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// The pack report could not be rendered.
    #[error("report rendering failed: {0}")]
    Report(#[from] serde_json::Error),
}

impl Error {
    /// Create a configuration error.
    pub fn config(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Config {
            key,
            reason: reason.into(),
        }
    }
}
