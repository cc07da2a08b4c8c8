//! Docker daemon connection with socket fallbacks.
//!
//! bollard's local defaults honour `DOCKER_HOST` and the standard
//! `/var/run/docker.sock`. Rootless Docker and Docker Desktop listen
//! elsewhere, so those sockets are probed when the default fails.

use std::path::PathBuf;

use bollard::{API_DEFAULT_VERSION, Docker};

use crate::docker::error::{EngineError, Result};

/// Seconds bollard waits on a single daemon request.
const CONNECT_TIMEOUT_SECS: u64 = 120;

/// Connect to the Docker daemon and verify it answers a ping.
pub async fn connect_docker() -> Result<Docker> {
    let mut last_error = match Docker::connect_with_local_defaults() {
        Ok(docker) => match docker.ping().await {
            Ok(_) => return Ok(docker),
            Err(e) => e.to_string(),
        },
        Err(e) => e.to_string(),
    };

    for socket in fallback_sockets() {
        if !socket.exists() {
            continue;
        }
        let Some(path) = socket.to_str() else {
            continue;
        };

        tracing::debug!("Trying Docker socket at {}", path);
        match Docker::connect_with_socket(path, CONNECT_TIMEOUT_SECS, API_DEFAULT_VERSION) {
            Ok(docker) => match docker.ping().await {
                Ok(_) => return Ok(docker),
                Err(e) => last_error = e.to_string(),
            },
            Err(e) => last_error = e.to_string(),
        }
    }

    Err(EngineError::DockerNotAvailable { reason: last_error })
}

fn fallback_sockets() -> Vec<PathBuf> {
    let mut sockets = Vec::new();
    if let Some(runtime_dir) = std::env::var_os("XDG_RUNTIME_DIR") {
        sockets.push(PathBuf::from(runtime_dir).join("docker.sock"));
    }
    if let Some(home) = dirs::home_dir() {
        sockets.push(home.join(".docker").join("run").join("docker.sock"));
        sockets.push(home.join(".colima").join("default").join("docker.sock"));
    }
    sockets
}
