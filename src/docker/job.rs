//! One-shot command execution in disposable containers.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use bollard::Docker;
use bollard::container::{
    Config, CreateContainerOptions, LogOutput, LogsOptions, RemoveContainerOptions,
    StartContainerOptions, WaitContainerOptions,
};
use bollard::models::HostConfig;
use futures::{Stream, StreamExt};

use crate::config::SidecarRuntimeConfig;
use crate::docker::engine::{ensure_image, non_empty};
use crate::docker::error::{EngineError, Result};
use crate::docker::image::DockerImage;

/// Settings for a single job container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobOptions {
    /// `KEY=VALUE` pairs.
    pub env: Vec<String>,
    /// `volume:container_path` bind specs.
    pub binds: Vec<String>,
    /// Entrypoint override. Empty keeps the image default.
    pub entrypoint: Vec<String>,
    /// Network to attach to. Empty uses the daemon default.
    pub network_id: String,
    /// Prefix for the generated container name.
    pub name_prefix: String,
    pub labels: HashMap<String, String>,
}

/// Captured result of a job. Output is kept even when the job failed.
#[derive(Debug)]
pub struct JobOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// Exit code, if the container ran to completion.
    pub exit_code: Option<i64>,
    /// `Err` for a non-zero exit or any failure setting up the job.
    pub result: Result<()>,
}

impl JobOutput {
    /// A job that failed before producing output.
    pub fn failed(err: EngineError) -> Self {
        Self {
            stdout: Vec::new(),
            stderr: Vec::new(),
            exit_code: None,
            result: Err(err),
        }
    }

    /// A job that ran to completion with `exit_code`.
    pub fn completed(stdout: Vec<u8>, stderr: Vec<u8>, exit_code: i64) -> Self {
        let result = if exit_code == 0 {
            Ok(())
        } else {
            Err(EngineError::ExitStatus { code: exit_code })
        };
        Self {
            stdout,
            stderr,
            exit_code: Some(exit_code),
            result,
        }
    }
}

/// Runs a command to completion in a fresh container.
#[async_trait]
pub trait JobRunner: Send + Sync {
    async fn run(&self, image: &DockerImage, command: &[String], options: &JobOptions) -> JobOutput;
}

/// bollard-backed [`JobRunner`].
#[derive(Clone)]
pub struct DockerJobRunner {
    docker: Docker,
    auto_pull: bool,
    timeout: Duration,
}

impl DockerJobRunner {
    pub fn new(docker: Docker, config: &SidecarRuntimeConfig) -> Self {
        Self {
            docker,
            auto_pull: config.auto_pull,
            timeout: config.job_timeout(),
        }
    }

    async fn create_and_start(
        &self,
        name: &str,
        image: &DockerImage,
        command: &[String],
        options: &JobOptions,
    ) -> Result<()> {
        let config = Config {
            image: Some(image.reference()),
            cmd: non_empty(command),
            entrypoint: non_empty(&options.entrypoint),
            env: non_empty(&options.env),
            labels: if options.labels.is_empty() {
                None
            } else {
                Some(options.labels.clone())
            },
            host_config: Some(HostConfig {
                binds: non_empty(&options.binds),
                network_mode: if options.network_id.is_empty() {
                    None
                } else {
                    Some(options.network_id.clone())
                },
                auto_remove: Some(false),
                ..Default::default()
            }),
            ..Default::default()
        };

        self.docker
            .create_container(
                Some(CreateContainerOptions {
                    name: name.to_string(),
                    ..Default::default()
                }),
                config,
            )
            .await
            .map_err(|e| EngineError::from_docker(name, e))?;

        self.docker
            .start_container(name, None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| EngineError::from_docker(name, e))
    }

    /// Block until the container exits and return its exit code.
    async fn wait_exit(&self, name: &str) -> Result<i64> {
        let stream = self.docker.wait_container(
            name,
            Some(WaitContainerOptions {
                condition: "not-running",
            }),
        );
        let mut stream = std::pin::pin!(stream);

        let mut exit_code = None;
        while let Some(next) = stream.next().await {
            match next {
                Ok(response) => exit_code = Some(response.status_code),
                // bollard reports non-zero exits as an error item.
                Err(bollard::errors::Error::DockerContainerWaitError { code, .. }) => {
                    exit_code = Some(code)
                }
                Err(e) => return Err(EngineError::from_docker(name, e)),
            }
        }

        exit_code.ok_or_else(|| EngineError::NotFound {
            name: name.to_string(),
        })
    }

    async fn collect_logs(&self, name: &str) -> CollectedLogs {
        let stream = self.docker.logs(
            name,
            Some(LogsOptions::<String> {
                stdout: true,
                stderr: true,
                follow: false,
                ..Default::default()
            }),
        );
        drain_logs(name, stream).await
    }

    async fn remove(&self, name: &str) {
        if let Err(e) = self
            .docker
            .remove_container(
                name,
                Some(RemoveContainerOptions {
                    force: true,
                    ..Default::default()
                }),
            )
            .await
        {
            tracing::warn!("Failed to remove job container {}: {}", name, e);
        }
    }
}

#[async_trait]
impl JobRunner for DockerJobRunner {
    async fn run(&self, image: &DockerImage, command: &[String], options: &JobOptions) -> JobOutput {
        if let Err(e) = ensure_image(&self.docker, image, self.auto_pull).await {
            return JobOutput::failed(e);
        }

        let prefix = if options.name_prefix.is_empty() {
            "sidecar"
        } else {
            options.name_prefix.as_str()
        };
        let id = uuid::Uuid::new_v4().simple().to_string();
        let name = format!("{}-job-{}", prefix, &id[..8]);

        tracing::debug!(job = %name, image = %image, command = ?command, "Running job");

        if let Err(e) = self.create_and_start(&name, image, command, options).await {
            self.remove(&name).await;
            return JobOutput::failed(e);
        }

        let waited = match tokio::time::timeout(self.timeout, self.wait_exit(&name)).await {
            Ok(waited) => waited,
            Err(_) => Err(EngineError::Timeout(self.timeout)),
        };
        let logs = self.collect_logs(&name).await;
        self.remove(&name).await;

        finish(waited, logs)
    }
}

/// Demultiplexed output of a job container. Buffers hold everything read
/// before `error`, if the stream failed part way.
#[derive(Debug, Default)]
struct CollectedLogs {
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    error: Option<EngineError>,
}

async fn drain_logs<S>(name: &str, stream: S) -> CollectedLogs
where
    S: Stream<Item = std::result::Result<LogOutput, bollard::errors::Error>>,
{
    let mut stream = std::pin::pin!(stream);
    let mut logs = CollectedLogs::default();
    while let Some(next) = stream.next().await {
        match next {
            Ok(LogOutput::StdOut { message }) | Ok(LogOutput::Console { message }) => {
                logs.stdout.extend_from_slice(&message)
            }
            Ok(LogOutput::StdErr { message }) => logs.stderr.extend_from_slice(&message),
            Ok(LogOutput::StdIn { .. }) => {}
            Err(e) => {
                logs.error = Some(EngineError::from_docker(name, e));
                break;
            }
        }
    }
    logs
}

/// Combine the wait result with the collected output. A log failure after a
/// clean exit becomes the job's error; the partial output is kept.
fn finish(waited: Result<i64>, logs: CollectedLogs) -> JobOutput {
    let CollectedLogs {
        stdout,
        stderr,
        error,
    } = logs;
    match (waited, error) {
        (Ok(0), Some(e)) => JobOutput {
            stdout,
            stderr,
            exit_code: Some(0),
            result: Err(e),
        },
        (Ok(code), _) => JobOutput::completed(stdout, stderr, code),
        (Err(e), _) => JobOutput {
            stdout,
            stderr,
            exit_code: None,
            result: Err(e),
        },
    }
}
