//! In-memory adapters for exercising sidecars without a Docker daemon.
//!
//! Provides:
//! - [`StubEngine`]: records lifecycle calls and tracks which containers exist
//! - [`InMemoryVolumes`]: a map-backed volume store
//! - [`StubJobRunner`]: returns a canned job result and records invocations
//! - [`stub_deps`]: all three wired into [`SidecarDeps`]
//!
//! # Usage
//!
//! ```rust
//! use sidecar_harness::testing::stub_deps;
//!
//! let (deps, engine, volumes, jobs) = stub_deps();
//! engine.set_fail_start(true);
//! jobs.respond(b"out".to_vec(), Vec::new(), 0);
//! # let _ = (deps, volumes);
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::docker::{
    ContainerEngine, ContainerSpec, DockerImage, EngineError, JobOptions, JobOutput, JobRunner,
    Result, VolumeFiles, volume_path,
};
use crate::sidecar::SidecarDeps;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A lifecycle call observed by [`StubEngine`], keyed by container name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    Create(String),
    Start(String),
    Stop(String),
    Remove(String),
    Running(String),
}

/// A [`ContainerEngine`] that keeps containers in memory.
///
/// Creating an existing name fails with [`EngineError::AlreadyExists`], and
/// operations on unknown names fail with [`EngineError::NotFound`], matching
/// the Docker adapter.
#[derive(Debug, Default)]
pub struct StubEngine {
    calls: Mutex<Vec<EngineCall>>,
    specs: Mutex<Vec<ContainerSpec>>,
    /// Container name → running.
    containers: Mutex<HashMap<String, bool>>,
    fail_create: AtomicBool,
    fail_start: AtomicBool,
}

impl StubEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent creates fail as if the image could not be resolved.
    pub fn set_fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent starts fail with a daemon error.
    pub fn set_fail_start(&self, fail: bool) {
        self.fail_start.store(fail, Ordering::SeqCst);
    }

    /// Every call in the order it was made.
    pub fn calls(&self) -> Vec<EngineCall> {
        lock(&self.calls).clone()
    }

    /// Number of start calls, successful or not.
    pub fn start_count(&self) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|c| matches!(c, EngineCall::Start(_)))
            .count()
    }

    /// Specs of successfully created containers.
    pub fn created_specs(&self) -> Vec<ContainerSpec> {
        lock(&self.specs).clone()
    }

    /// Names of containers that exist and have not been removed.
    pub fn live_containers(&self) -> Vec<String> {
        let mut names: Vec<String> = lock(&self.containers).keys().cloned().collect();
        names.sort();
        names
    }

    fn record(&self, call: EngineCall) {
        lock(&self.calls).push(call);
    }

    fn not_found(name: &str) -> EngineError {
        EngineError::NotFound {
            name: name.to_string(),
        }
    }
}

#[async_trait]
impl ContainerEngine for StubEngine {
    async fn create_container(&self, spec: &ContainerSpec) -> Result<()> {
        self.record(EngineCall::Create(spec.name.clone()));
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(EngineError::ImageNotFound {
                image: spec.image.reference(),
            });
        }

        let mut containers = lock(&self.containers);
        if containers.contains_key(&spec.name) {
            return Err(EngineError::AlreadyExists {
                name: spec.name.clone(),
            });
        }
        containers.insert(spec.name.clone(), false);
        lock(&self.specs).push(spec.clone());
        Ok(())
    }

    async fn start_container(&self, name: &str) -> Result<()> {
        self.record(EngineCall::Start(name.to_string()));
        if self.fail_start.load(Ordering::SeqCst) {
            return Err(EngineError::Docker(
                bollard::errors::Error::DockerResponseServerError {
                    status_code: 500,
                    message: "stub start failure".to_string(),
                },
            ));
        }

        match lock(&self.containers).get_mut(name) {
            Some(running) => {
                *running = true;
                Ok(())
            }
            None => Err(Self::not_found(name)),
        }
    }

    async fn stop_container(&self, name: &str) -> Result<()> {
        self.record(EngineCall::Stop(name.to_string()));
        match lock(&self.containers).get_mut(name) {
            Some(running) => {
                *running = false;
                Ok(())
            }
            None => Err(Self::not_found(name)),
        }
    }

    async fn remove_container(&self, name: &str) -> Result<()> {
        self.record(EngineCall::Remove(name.to_string()));
        match lock(&self.containers).remove(name) {
            Some(_) => Ok(()),
            None => Err(Self::not_found(name)),
        }
    }

    async fn running(&self, name: &str) -> Result<()> {
        self.record(EngineCall::Running(name.to_string()));
        match lock(&self.containers).get(name) {
            Some(true) => Ok(()),
            Some(false) => Err(EngineError::NotRunning {
                name: name.to_string(),
                status: "exited".to_string(),
                exit_code: Some(0),
            }),
            None => Err(Self::not_found(name)),
        }
    }
}

/// A [`VolumeFiles`] backed by a map of `(volume, path)` to content.
#[derive(Debug, Default)]
pub struct InMemoryVolumes {
    files: Mutex<HashMap<(String, String), Vec<u8>>>,
    writes: AtomicUsize,
}

impl InMemoryVolumes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful writes.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Content stored at `rel_path` in `volume`, if any.
    pub fn file(&self, volume: &str, rel_path: &str) -> Option<Vec<u8>> {
        let path = volume_path(rel_path).ok()?;
        lock(&self.files).get(&(volume.to_string(), path)).cloned()
    }
}

#[async_trait]
impl VolumeFiles for InMemoryVolumes {
    async fn write_file(
        &self,
        volume: &str,
        rel_path: &str,
        content: &[u8],
        _owner: Option<(u64, u64)>,
    ) -> Result<()> {
        let path = volume_path(rel_path)?;
        lock(&self.files).insert((volume.to_string(), path), content.to_vec());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn single_file_content(&self, volume: &str, rel_path: &str) -> Result<Vec<u8>> {
        let path = volume_path(rel_path)?;
        lock(&self.files)
            .get(&(volume.to_string(), path.clone()))
            .cloned()
            .ok_or_else(|| EngineError::FileNotFound {
                volume: volume.to_string(),
                path,
            })
    }
}

/// One invocation seen by [`StubJobRunner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRun {
    pub image: DockerImage,
    pub command: Vec<String>,
    pub options: JobOptions,
}

/// A [`JobRunner`] that returns a fixed result.
#[derive(Debug, Default)]
pub struct StubJobRunner {
    response: Mutex<(Vec<u8>, Vec<u8>, i64)>,
    runs: Mutex<Vec<JobRun>>,
}

impl StubJobRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the stdout, stderr and exit code returned by later runs.
    pub fn respond(&self, stdout: Vec<u8>, stderr: Vec<u8>, exit_code: i64) {
        *lock(&self.response) = (stdout, stderr, exit_code);
    }

    /// Every run in the order it was made.
    pub fn runs(&self) -> Vec<JobRun> {
        lock(&self.runs).clone()
    }
}

#[async_trait]
impl JobRunner for StubJobRunner {
    async fn run(&self, image: &DockerImage, command: &[String], options: &JobOptions) -> JobOutput {
        lock(&self.runs).push(JobRun {
            image: image.clone(),
            command: command.to_vec(),
            options: options.clone(),
        });
        let (stdout, stderr, exit_code) = lock(&self.response).clone();
        JobOutput::completed(stdout, stderr, exit_code)
    }
}

/// Stub adapters wired into [`SidecarDeps`], with handles for inspection.
pub fn stub_deps() -> (
    SidecarDeps,
    Arc<StubEngine>,
    Arc<InMemoryVolumes>,
    Arc<StubJobRunner>,
) {
    let engine = Arc::new(StubEngine::new());
    let volumes = Arc::new(InMemoryVolumes::new());
    let jobs = Arc::new(StubJobRunner::new());
    let deps = SidecarDeps {
        engine: engine.clone(),
        volumes: volumes.clone(),
        jobs: jobs.clone(),
    };
    (deps, engine, volumes, jobs)
}
