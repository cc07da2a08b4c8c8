//! Error types for sidecar orchestration.

use thiserror::Error;

use crate::docker::EngineError;

/// Result type for sidecar operations.
pub type Result<T> = std::result::Result<T, SidecarError>;

/// Errors that can occur while driving a sidecar.
#[derive(Debug, Error)]
pub enum SidecarError {
    /// An identity component cannot be used in a container name.
    #[error("Invalid sidecar {field} '{value}': {reason}")]
    InvalidName {
        /// Which input was rejected (`chain_id`, `process_name`, ...).
        field: &'static str,
        /// The rejected value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Error reported by a Docker adapter, unchanged.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Reading a file from the sidecar volume failed.
    #[error("failed to read file at {path}: {source}")]
    ReadFailed {
        /// Path relative to the sidecar home directory.
        path: String,
        #[source]
        source: EngineError,
    },

    /// The local source of a copy could not be read.
    #[error("failed to read local file {path}: {source}")]
    CopySource {
        /// Host filesystem path.
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A start was already issued for this sidecar.
    #[error("Sidecar '{name}' has already been started")]
    AlreadyStarted {
        /// Container name.
        name: String,
    },

    /// The operation is not valid in the sidecar's current lifecycle state.
    #[error("Cannot {operation} sidecar '{name}' while it is {state}")]
    InvalidTransition {
        /// Container name.
        name: String,
        /// Attempted operation.
        operation: &'static str,
        /// Lifecycle state at the time of the call.
        state: String,
    },

    /// Two sidecars in one collection derived the same container name.
    #[error("Duplicate sidecar '{name}'")]
    DuplicateSidecar {
        /// Container name.
        name: String,
    },

    /// No sidecar in the collection matches the requested name.
    #[error("No sidecar named '{name}'")]
    UnknownSidecar {
        /// Requested container or process name.
        name: String,
    },
}
