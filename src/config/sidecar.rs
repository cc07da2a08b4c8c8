use std::time::Duration;

use crate::config::helpers::{optional_env, parse_bool_env, parse_optional_env};
use crate::error::ConfigError;

/// Default image for the throw-away containers that touch volume files.
pub const DEFAULT_HELPER_IMAGE: &str = "busybox:stable";

/// Default parent directory for sidecar home directories inside containers.
pub const DEFAULT_HOME_ROOT: &str = "/var/sidecar-processes";

/// Runtime settings for the Docker-backed sidecar adapters.
///
/// Resolved from `SIDECAR_*` environment variables. Everything here tunes the
/// adapters; sidecar identity always comes from the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidecarRuntimeConfig {
    /// Image used for volume file reads and writes.
    pub helper_image: String,
    /// Pull images that are not present locally before creating containers.
    pub auto_pull: bool,
    /// Grace period given to a container on stop before it is killed.
    pub stop_timeout_secs: u64,
    /// Upper bound on a one-shot exec job, including image pull.
    pub job_timeout_secs: u64,
    /// Parent of every sidecar home directory (`<root>/<process_name>`).
    pub home_root: String,
}

impl Default for SidecarRuntimeConfig {
    fn default() -> Self {
        Self {
            helper_image: DEFAULT_HELPER_IMAGE.to_string(),
            auto_pull: true,
            stop_timeout_secs: 10,
            job_timeout_secs: 300,
            home_root: DEFAULT_HOME_ROOT.to_string(),
        }
    }
}

impl SidecarRuntimeConfig {
    pub(crate) fn resolve() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let helper_image = optional_env("SIDECAR_HELPER_IMAGE")?
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(defaults.helper_image);

        let home_root = optional_env("SIDECAR_HOME_ROOT")?
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(defaults.home_root);
        if !home_root.starts_with('/') {
            return Err(ConfigError::InvalidValue {
                key: "SIDECAR_HOME_ROOT".to_string(),
                message: format!("must be an absolute container path, got '{home_root}'"),
            });
        }

        Ok(Self {
            helper_image,
            auto_pull: parse_bool_env("SIDECAR_AUTO_PULL", defaults.auto_pull)?,
            stop_timeout_secs: parse_optional_env(
                "SIDECAR_STOP_TIMEOUT_SECS",
                defaults.stop_timeout_secs,
            )?,
            job_timeout_secs: parse_optional_env(
                "SIDECAR_JOB_TIMEOUT_SECS",
                defaults.job_timeout_secs,
            )?,
            home_root,
        })
    }

    /// Grace period before a stopping container is killed.
    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_secs)
    }

    /// Upper bound on one exec job.
    pub fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.job_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SidecarRuntimeConfig::default();

        assert_eq!(config.helper_image, "busybox:stable");
        assert!(config.auto_pull);
        assert_eq!(config.stop_timeout(), Duration::from_secs(10));
        assert_eq!(config.home_root, "/var/sidecar-processes");
    }
}
