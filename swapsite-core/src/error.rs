//! Error types for swapsite-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise while loading settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure reading a settings file.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error on load; includes file path and line context from serde_yaml.
    #[error("failed to parse settings at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The merged document did not match the settings schema.
    #[error("settings do not match the expected schema: {0}")]
    Schema(#[source] serde_yaml::Error),

    /// The required defaults file does not exist.
    #[error("settings not found at {path}")]
    NotFound { path: PathBuf },

    /// A value parsed but is unusable.
    #[error("invalid setting `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}
