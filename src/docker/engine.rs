//! Container lifecycle primitives keyed by container name.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use bollard::Docker;
use bollard::container::{
    Config, CreateContainerOptions, InspectContainerOptions, ListContainersOptions,
    RemoveContainerOptions, StartContainerOptions, StopContainerOptions,
};
use bollard::image::CreateImageOptions;
use bollard::models::{HostConfig, PortBinding};
use bollard::network::{CreateNetworkOptions, InspectNetworkOptions, ListNetworksOptions};
use bollard::volume::{CreateVolumeOptions, ListVolumesOptions, RemoveVolumeOptions};
use futures::StreamExt;

use crate::config::SidecarRuntimeConfig;
use crate::docker::error::{EngineError, Result};
use crate::docker::image::{DockerImage, normalize_port};

/// Label carrying the test run a resource belongs to.
pub const LABEL_TEST: &str = "sidecar-harness.test";
/// Label carrying the chain a resource belongs to.
pub const LABEL_CHAIN: &str = "sidecar-harness.chain";

/// Everything needed to create a sidecar's primary container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    pub name: String,
    /// Network to attach to. Empty uses the daemon default.
    pub network_id: String,
    pub image: DockerImage,
    /// Declared container ports in `<port>/<proto>` form.
    pub ports: Vec<String>,
    pub hostname: String,
    /// `volume:container_path` bind specs.
    pub binds: Vec<String>,
    pub cmd: Vec<String>,
    pub entrypoint: Vec<String>,
    /// `KEY=VALUE` pairs.
    pub env: Vec<String>,
    pub labels: HashMap<String, String>,
}

/// Engine primitives a sidecar delegates its container lifecycle to.
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// Allocate the container without starting it.
    async fn create_container(&self, spec: &ContainerSpec) -> Result<()>;

    async fn start_container(&self, name: &str) -> Result<()>;

    async fn stop_container(&self, name: &str) -> Result<()>;

    async fn remove_container(&self, name: &str) -> Result<()>;

    /// `Ok(())` if the container is currently running, otherwise an error
    /// describing its state.
    async fn running(&self, name: &str) -> Result<()>;
}

/// What [`DockerEngine::cleanup_test_resources`] removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub containers: usize,
    pub volumes: usize,
    pub networks: usize,
}

/// bollard-backed [`ContainerEngine`].
#[derive(Clone)]
pub struct DockerEngine {
    docker: Docker,
    auto_pull: bool,
    stop_timeout: Duration,
}

impl DockerEngine {
    /// Engine using `docker`, with pull and stop settings from `config`.
    pub fn new(docker: Docker, config: &SidecarRuntimeConfig) -> Self {
        Self {
            docker,
            auto_pull: config.auto_pull,
            stop_timeout: config.stop_timeout(),
        }
    }

    /// The underlying client, for sharing with the other adapters.
    pub fn docker(&self) -> &Docker {
        &self.docker
    }

    /// Create a named volume. An existing volume with the same name is reused.
    pub async fn create_volume(&self, name: &str, labels: &HashMap<String, String>) -> Result<()> {
        let options = CreateVolumeOptions {
            name: name.to_string(),
            labels: labels.clone(),
            ..Default::default()
        };
        self.docker
            .create_volume(options)
            .await
            .map_err(|e| EngineError::from_docker(name, e))?;

        tracing::debug!("Created volume {}", name);
        Ok(())
    }

    /// Force-remove a named volume.
    pub async fn remove_volume(&self, name: &str) -> Result<()> {
        self.docker
            .remove_volume(name, Some(RemoveVolumeOptions { force: true }))
            .await
            .map_err(|e| EngineError::from_docker(name, e))
    }

    /// Create a user-defined network unless one with this name already exists.
    pub async fn ensure_network(&self, name: &str, labels: &HashMap<String, String>) -> Result<()> {
        match self
            .docker
            .inspect_network(name, None::<InspectNetworkOptions<String>>)
            .await
        {
            Ok(_) => return Ok(()),
            Err(e) => match EngineError::from_docker(name, e) {
                EngineError::NotFound { .. } => {}
                other => return Err(other),
            },
        }

        let options = CreateNetworkOptions {
            name: name.to_string(),
            labels: labels.clone(),
            ..Default::default()
        };
        self.docker
            .create_network(options)
            .await
            .map_err(|e| EngineError::from_docker(name, e))?;

        tracing::info!("Created network {}", name);
        Ok(())
    }

    /// Force-remove every container labelled with `test_name`, and with
    /// `include_volumes` its volumes and networks as well.
    pub async fn cleanup_test_resources(
        &self,
        test_name: &str,
        include_volumes: bool,
    ) -> Result<CleanupReport> {
        let mut report = CleanupReport::default();
        let mut filters = HashMap::new();
        filters.insert(
            "label".to_string(),
            vec![format!("{}={}", LABEL_TEST, test_name)],
        );

        let containers = self
            .docker
            .list_containers(Some(ListContainersOptions {
                all: true,
                filters: filters.clone(),
                ..Default::default()
            }))
            .await?;
        for summary in containers {
            let Some(id) = summary.id else { continue };
            self.docker
                .remove_container(
                    &id,
                    Some(RemoveContainerOptions {
                        force: true,
                        ..Default::default()
                    }),
                )
                .await
                .map_err(|e| EngineError::from_docker(&id, e))?;
            report.containers += 1;
        }

        if !include_volumes {
            tracing::info!(
                test = %test_name,
                containers = report.containers,
                "Removed test containers"
            );
            return Ok(report);
        }

        let volumes = self
            .docker
            .list_volumes(Some(ListVolumesOptions {
                filters: filters.clone(),
            }))
            .await?;
        for volume in volumes.volumes.unwrap_or_default() {
            self.remove_volume(&volume.name).await?;
            report.volumes += 1;
        }

        let networks = self
            .docker
            .list_networks(Some(ListNetworksOptions { filters }))
            .await?;
        for network in networks {
            let Some(name) = network.name else { continue };
            self.docker
                .remove_network(&name)
                .await
                .map_err(|e| EngineError::from_docker(&name, e))?;
            report.networks += 1;
        }

        tracing::info!(
            test = %test_name,
            containers = report.containers,
            volumes = report.volumes,
            networks = report.networks,
            "Cleaned up test resources"
        );
        Ok(report)
    }
}

/// Make sure `image` is available locally, pulling it if allowed.
pub(crate) async fn ensure_image(docker: &Docker, image: &DockerImage, auto_pull: bool) -> Result<()> {
    let reference = image.reference();
    if docker.inspect_image(&reference).await.is_ok() {
        tracing::debug!("Image '{}' exists locally", reference);
        return Ok(());
    }

    if !auto_pull {
        return Err(EngineError::ImageNotFound { image: reference });
    }

    tracing::info!("Pulling image: {}", reference);

    let options = CreateImageOptions {
        from_image: reference.clone(),
        ..Default::default()
    };
    let mut stream = docker.create_image(Some(options), None, None);

    while let Some(result) = stream.next().await {
        match result {
            Ok(info) => {
                if let Some(status) = info.status {
                    tracing::trace!("Pull status: {}", status);
                }
            }
            Err(e) => {
                return Err(EngineError::ImagePullFailed {
                    image: reference,
                    reason: e.to_string(),
                });
            }
        }
    }

    tracing::info!("Pulled image: {}", reference);
    Ok(())
}

/// Stop grace period in the signed seconds the daemon expects, saturating
/// instead of wrapping.
fn grace_secs(timeout: Duration) -> i64 {
    i64::try_from(timeout.as_secs()).unwrap_or(i64::MAX)
}

/// Build the bollard create body for a sidecar container.
fn container_config(spec: &ContainerSpec) -> Config<String> {
    let mut port_bindings = HashMap::new();
    let mut exposed_ports = HashMap::new();
    for port in &spec.ports {
        let port = normalize_port(port);
        exposed_ports.insert(port.clone(), HashMap::new());
        // Empty host port lets the daemon pick a free one.
        port_bindings.insert(
            port,
            Some(vec![PortBinding {
                host_ip: Some("0.0.0.0".to_string()),
                host_port: Some(String::new()),
            }]),
        );
    }

    let host_config = HostConfig {
        binds: non_empty(&spec.binds),
        port_bindings: if port_bindings.is_empty() {
            None
        } else {
            Some(port_bindings)
        },
        network_mode: if spec.network_id.is_empty() {
            None
        } else {
            Some(spec.network_id.clone())
        },
        auto_remove: Some(false),
        ..Default::default()
    };

    Config {
        image: Some(spec.image.reference()),
        hostname: Some(spec.hostname.clone()),
        cmd: non_empty(&spec.cmd),
        entrypoint: non_empty(&spec.entrypoint),
        env: non_empty(&spec.env),
        exposed_ports: if exposed_ports.is_empty() {
            None
        } else {
            Some(exposed_ports)
        },
        labels: if spec.labels.is_empty() {
            None
        } else {
            Some(spec.labels.clone())
        },
        host_config: Some(host_config),
        ..Default::default()
    }
}

pub(crate) fn non_empty(values: &[String]) -> Option<Vec<String>> {
    if values.is_empty() {
        None
    } else {
        Some(values.to_vec())
    }
}

#[async_trait]
impl ContainerEngine for DockerEngine {
    async fn create_container(&self, spec: &ContainerSpec) -> Result<()> {
        ensure_image(&self.docker, &spec.image, self.auto_pull).await?;

        let options = CreateContainerOptions {
            name: spec.name.clone(),
            ..Default::default()
        };
        let response = self
            .docker
            .create_container(Some(options), container_config(spec))
            .await
            .map_err(|e| EngineError::from_docker(&spec.name, e))?;

        for warning in &response.warnings {
            tracing::warn!(container = %spec.name, "Docker warning: {}", warning);
        }
        tracing::debug!(container = %spec.name, id = %response.id, "Created container");
        Ok(())
    }

    async fn start_container(&self, name: &str) -> Result<()> {
        self.docker
            .start_container(name, None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| EngineError::from_docker(name, e))?;

        tracing::info!("Started container: {}", name);
        Ok(())
    }

    async fn stop_container(&self, name: &str) -> Result<()> {
        let options = StopContainerOptions {
            t: grace_secs(self.stop_timeout),
        };
        match self.docker.stop_container(name, Some(options)).await {
            Ok(()) => {}
            // Already stopped.
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 304, ..
            }) => {}
            Err(e) => return Err(EngineError::from_docker(name, e)),
        }

        tracing::info!("Stopped container: {}", name);
        Ok(())
    }

    async fn remove_container(&self, name: &str) -> Result<()> {
        // `v: false` keeps named volumes; they belong to the test run.
        self.docker
            .remove_container(
                name,
                Some(RemoveContainerOptions {
                    force: true,
                    v: false,
                    ..Default::default()
                }),
            )
            .await
            .map_err(|e| EngineError::from_docker(name, e))?;

        tracing::info!("Removed container: {}", name);
        Ok(())
    }

    async fn running(&self, name: &str) -> Result<()> {
        let info = self
            .docker
            .inspect_container(name, None::<InspectContainerOptions>)
            .await
            .map_err(|e| EngineError::from_docker(name, e))?;

        let state = info.state.unwrap_or_default();
        if state.running == Some(true) {
            return Ok(());
        }

        Err(EngineError::NotRunning {
            name: name.to_string(),
            status: state
                .status
                .map(|s| format!("{:?}", s).to_lowercase())
                .unwrap_or_else(|| "unknown".to_string()),
            exit_code: state.exit_code,
        })
    }
}
