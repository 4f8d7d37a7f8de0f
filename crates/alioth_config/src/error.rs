//! Errors raised while loading or validating `alioth.toml`.

use std::io;
use std::path::PathBuf;

/// Errors that can occur when loading or validating a harness configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Read {
        /// File that was requested.
        path: PathBuf,
        /// The underlying I/O failure.
        source: io::Error,
    },

    /// An I/O error unrelated to a specific configuration file.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The TOML content is malformed or has unknown keys.
    #[error("malformed configuration: {0}")]
    Parse(String),

    /// A value parsed but cannot drive a run.
    #[error("invalid `{key}`: {reason}")]
    Invalid {
        /// Dotted key of the offending setting.
        key: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            key,
            reason: reason.into(),
        }
    }
}
