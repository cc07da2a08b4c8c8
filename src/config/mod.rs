//! Configuration for the sidecar harness.
//!
//! Two sources feed a run:
//! - environment variables (`SIDECAR_*`), optionally loaded from `.env` by the
//!   binary, tune the Docker adapters;
//! - a TOML manifest describes the chain, the test run and its sidecars.

pub(crate) mod helpers;
mod manifest;
mod sidecar;

pub use manifest::SidecarManifest;
pub use sidecar::{DEFAULT_HELPER_IMAGE, DEFAULT_HOME_ROOT, SidecarRuntimeConfig};

use crate::error::ConfigError;

/// Top-level configuration resolved from the environment.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub sidecar: SidecarRuntimeConfig,
}

impl Config {
    /// Resolve every section from the current process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            sidecar: SidecarRuntimeConfig::resolve()?,
        })
    }
}
