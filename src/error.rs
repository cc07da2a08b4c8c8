//! Crate-level error types that are not tied to a single subsystem.

use thiserror::Error;

/// Errors raised while resolving configuration from the environment or a
/// sidecar manifest.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable or manifest field holds an unusable value.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// An environment variable is present but not valid unicode.
    #[error("Environment variable {key} is not valid unicode")]
    NotUnicode { key: String },

    /// The manifest file could not be read.
    #[error("Failed to read manifest {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The manifest file is not valid TOML for the expected schema.
    #[error("Failed to parse manifest {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}
