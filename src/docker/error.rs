//! Error types for the Docker adapters.

use std::time::Duration;

use thiserror::Error;

/// Result type for adapter operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors surfaced by the container engine, volume and job adapters.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Docker is not available.
    #[error("Docker not available: {reason}")]
    DockerNotAvailable {
        /// Reason why Docker is unavailable.
        reason: String,
    },

    /// The image is not present locally and pulling is disabled.
    #[error("Image '{image}' not found locally and auto_pull is disabled")]
    ImageNotFound { image: String },

    /// Failed to pull the image.
    #[error("Failed to pull image '{image}': {reason}")]
    ImagePullFailed { image: String, reason: String },

    /// A container with the same name already exists.
    #[error("Container '{name}' already exists")]
    AlreadyExists { name: String },

    /// The named container or volume does not exist.
    #[error("'{name}' not found")]
    NotFound { name: String },

    /// The container exists but is not running.
    #[error("Container '{name}' is not running (status: {status}, exit code: {exit_code:?})")]
    NotRunning {
        name: String,
        status: String,
        exit_code: Option<i64>,
    },

    /// The requested file does not exist inside the volume.
    #[error("File '{path}' not found in volume '{volume}'")]
    FileNotFound { volume: String, path: String },

    /// A volume-relative path was absolute or escaped the volume.
    #[error("Invalid volume path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// An archive exchanged with the daemon could not be built or read.
    #[error("Archive error for '{path}': {reason}")]
    Archive { path: String, reason: String },

    /// A one-shot job exited with a non-zero status.
    #[error("Command exited with code {code}")]
    ExitStatus { code: i64 },

    /// A one-shot job did not finish in time.
    #[error("Command timed out after {0:?}")]
    Timeout(Duration),

    /// Any other daemon error, passed through unchanged.
    #[error(transparent)]
    Docker(#[from] bollard::errors::Error),
}

impl EngineError {
    /// HTTP status code reported by the daemon, if this is a daemon response.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            EngineError::Docker(bollard::errors::Error::DockerResponseServerError {
                status_code,
                ..
            }) => Some(*status_code),
            _ => None,
        }
    }

    /// Map a bollard error for the named object onto the typed variants.
    pub(crate) fn from_docker(name: &str, err: bollard::errors::Error) -> Self {
        match &err {
            bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            } => EngineError::NotFound {
                name: name.to_string(),
            },
            bollard::errors::Error::DockerResponseServerError {
                status_code: 409, ..
            } => EngineError::AlreadyExists {
                name: name.to_string(),
            },
            _ => EngineError::Docker(err),
        }
    }
}
