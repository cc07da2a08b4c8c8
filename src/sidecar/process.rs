//! A single sidecar process and its container lifecycle.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::Arc;

use bollard::Docker;
use tokio::sync::RwLock;

use crate::config::SidecarRuntimeConfig;
use crate::docker::{
    ContainerEngine, ContainerSpec, DockerEngine, DockerImage, DockerJobRunner,
    DockerVolumeFiles, JobOptions, JobRunner, LABEL_CHAIN, LABEL_TEST, VolumeFiles,
    normalize_port,
};
use crate::sidecar::config::SidecarSpec;
use crate::sidecar::error::{Result, SidecarError};
use crate::sidecar::naming::{self, SidecarScope};

/// The chain or validator a sidecar accompanies, as far as naming needs.
pub trait SidecarOwner {
    fn chain_id(&self) -> &str;
    fn test_name(&self) -> &str;
}

/// Owned snapshot of a [`SidecarOwner`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OwnerRef {
    pub chain_id: String,
    pub test_name: String,
}

impl OwnerRef {
    /// Owner identified by chain id and raw test name.
    pub fn new(chain_id: impl Into<String>, test_name: impl Into<String>) -> Self {
        Self {
            chain_id: chain_id.into(),
            test_name: test_name.into(),
        }
    }

    /// Snapshot any [`SidecarOwner`].
    pub fn of(owner: &impl SidecarOwner) -> Self {
        Self::new(owner.chain_id(), owner.test_name())
    }

    /// Labels attached to every Docker resource of this owner.
    pub fn labels(&self) -> HashMap<String, String> {
        HashMap::from([
            (LABEL_TEST.to_string(), self.test_name.clone()),
            (LABEL_CHAIN.to_string(), self.chain_id.clone()),
        ])
    }
}

impl SidecarOwner for OwnerRef {
    fn chain_id(&self) -> &str {
        &self.chain_id
    }

    fn test_name(&self) -> &str {
        &self.test_name
    }
}

/// Engine capabilities a sidecar delegates to.
#[derive(Clone)]
pub struct SidecarDeps {
    pub engine: Arc<dyn ContainerEngine>,
    pub volumes: Arc<dyn VolumeFiles>,
    pub jobs: Arc<dyn JobRunner>,
}

impl SidecarDeps {
    /// Docker-backed adapters sharing one client.
    pub fn docker(docker: Docker, config: &SidecarRuntimeConfig, owner: &OwnerRef) -> Self {
        Self {
            engine: Arc::new(DockerEngine::new(docker.clone(), config)),
            volumes: Arc::new(
                DockerVolumeFiles::new(docker.clone(), config).with_labels(owner.labels()),
            ),
            jobs: Arc::new(DockerJobRunner::new(docker, config)),
        }
    }
}

/// Lifecycle state of a sidecar's primary container, as last confirmed by the
/// engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Constructed; no container yet.
    Pending,
    /// Container allocated but not running.
    Created,
    /// Start confirmed by the engine.
    Started,
    /// Stop confirmed by the engine.
    Stopped,
    /// Container removed. Terminal.
    Removed,
}

impl LifecycleState {
    /// Lowercase name, as used in error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Pending => "pending",
            LifecycleState::Created => "created",
            LifecycleState::Started => "started",
            LifecycleState::Stopped => "stopped",
            LifecycleState::Removed => "removed",
        }
    }

    /// Whether a container exists engine-side in this state.
    pub fn has_container(&self) -> bool {
        matches!(
            self,
            LifecycleState::Created | LifecycleState::Started | LifecycleState::Stopped
        )
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
struct Lifecycle {
    state: LifecycleState,
    /// One-way latch: set when a start is issued, whether or not it succeeds.
    started: bool,
}

/// Output of [`SidecarProcess::exec`]. Captured output is kept even when the
/// command failed.
#[derive(Debug)]
pub struct ExecOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_code: Option<i64>,
    pub result: Result<()>,
}

impl ExecOutput {
    /// Stdout as text, replacing invalid UTF-8.
    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    /// Stderr as text, replacing invalid UTF-8.
    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).to_string()
    }

    /// Drop the output on failure, keep it on success.
    pub fn into_result(self) -> Result<(Vec<u8>, Vec<u8>)> {
        self.result.map(|()| (self.stdout, self.stderr))
    }
}

/// A companion process running in its own container next to a chain or one
/// of its validators.
///
/// Identity (name, hostname, volume) is fixed at construction. Lifecycle
/// calls on one instance are expected to be issued in order by the caller;
/// file and exec operations never touch the primary container and may run at
/// any time.
pub struct SidecarProcess {
    owner: OwnerRef,
    process_name: String,
    scope: SidecarScope,
    pre_start: bool,
    image: DockerImage,
    ports: BTreeSet<String>,
    start_cmd: Vec<String>,
    entrypoint: Vec<String>,
    env: Vec<String>,
    home_dir: String,
    volume_name: String,
    network_id: String,
    name: String,
    hostname: String,
    deps: SidecarDeps,
    lifecycle: RwLock<Lifecycle>,
}

impl std::fmt::Debug for SidecarProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SidecarProcess")
            .field("name", &self.name)
            .field("scope", &self.scope)
            .field("pre_start", &self.pre_start)
            .field("image", &self.image)
            .field("volume_name", &self.volume_name)
            .finish_non_exhaustive()
    }
}

impl SidecarProcess {
    /// Validate `spec` and derive the sidecar's identity.
    pub fn new(spec: SidecarSpec, deps: SidecarDeps) -> Result<Self> {
        naming::validate_component("chain_id", &spec.owner.chain_id)?;
        naming::validate_component("process_name", &spec.process_name)?;
        if !spec.home_dir.starts_with('/') {
            return Err(SidecarError::InvalidName {
                field: "home_dir",
                value: spec.home_dir,
                reason: "must be an absolute path".to_string(),
            });
        }

        let name = naming::container_name(
            &spec.owner.chain_id,
            &spec.process_name,
            spec.scope,
            &spec.owner.test_name,
        );
        let hostname = naming::hostname(&name);
        let volume_name = match spec.volume_name {
            Some(volume) => {
                naming::validate_component("volume_name", &volume)?;
                volume
            }
            None => name.clone(),
        };

        Ok(Self {
            owner: spec.owner,
            process_name: spec.process_name,
            scope: spec.scope,
            pre_start: spec.pre_start,
            image: spec.image,
            ports: spec.ports.iter().map(|p| normalize_port(p)).collect(),
            start_cmd: spec.start_cmd,
            entrypoint: spec.entrypoint,
            env: spec.env,
            home_dir: spec.home_dir,
            volume_name,
            network_id: spec.network_id,
            name,
            hostname,
            deps,
            lifecycle: RwLock::new(Lifecycle {
                state: LifecycleState::Pending,
                started: false,
            }),
        })
    }

    /// Container name, unique within the test run.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// DNS-safe hostname derived from the container name.
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// The chain and test run this sidecar belongs to.
    pub fn owner(&self) -> &OwnerRef {
        &self.owner
    }

    /// Logical process name, shared by every instance of one config.
    pub fn process_name(&self) -> &str {
        &self.process_name
    }

    /// Whether this sidecar serves the chain or one validator.
    pub fn scope(&self) -> SidecarScope {
        self.scope
    }

    /// Chain index or validator index, depending on the scope.
    pub fn index(&self) -> usize {
        self.scope.index()
    }

    /// Whether this sidecar is bound to a validator.
    pub fn is_validator_process(&self) -> bool {
        self.scope.is_validator()
    }

    /// Whether this sidecar must be running before its owner starts.
    pub fn pre_start(&self) -> bool {
        self.pre_start
    }

    /// Image used for the primary container and for exec jobs.
    pub fn image(&self) -> &DockerImage {
        &self.image
    }

    /// Declared ports in `<port>/<proto>` form.
    pub fn ports(&self) -> impl Iterator<Item = &str> {
        self.ports.iter().map(String::as_str)
    }

    /// Named volume holding the home directory.
    pub fn volume_name(&self) -> &str {
        &self.volume_name
    }

    /// Network the containers join. Empty means the daemon default.
    pub fn network_id(&self) -> &str {
        &self.network_id
    }

    /// Where the volume is mounted inside the container.
    pub fn home_dir(&self) -> &str {
        &self.home_dir
    }

    /// Bind specs mounting the sidecar volume at its home directory.
    pub fn bind(&self) -> Vec<String> {
        vec![format!("{}:{}", self.volume_name, self.home_dir)]
    }

    /// Get the last confirmed lifecycle state.
    pub async fn state(&self) -> LifecycleState {
        self.lifecycle.read().await.state
    }

    /// Whether a start has ever been issued. A `true` here does not mean the
    /// container is running; use [`running`](Self::running) for that.
    pub async fn is_started(&self) -> bool {
        self.lifecycle.read().await.started
    }

    fn container_spec(&self) -> ContainerSpec {
        ContainerSpec {
            name: self.name.clone(),
            network_id: self.network_id.clone(),
            image: self.image.clone(),
            ports: self.ports.iter().cloned().collect(),
            hostname: self.hostname.clone(),
            binds: self.bind(),
            cmd: self.start_cmd.clone(),
            entrypoint: self.entrypoint.clone(),
            env: self.env.clone(),
            labels: self.owner.labels(),
        }
    }

    fn invalid(&self, operation: &'static str, state: LifecycleState) -> SidecarError {
        SidecarError::InvalidTransition {
            name: self.name.clone(),
            operation,
            state: state.to_string(),
        }
    }

    /// Allocate the primary container without starting it.
    ///
    /// A second call is forwarded to the engine, which rejects the duplicate
    /// name.
    pub async fn create_container(&self) -> Result<()> {
        let state = self.state().await;
        if state == LifecycleState::Removed {
            return Err(self.invalid("create", state));
        }

        tracing::debug!(
            process_name = %self.process_name,
            test = %self.owner.test_name,
            container = %self.name,
            "Creating sidecar container"
        );
        self.deps
            .engine
            .create_container(&self.container_spec())
            .await?;

        let mut lifecycle = self.lifecycle.write().await;
        if lifecycle.state == LifecycleState::Pending {
            lifecycle.state = LifecycleState::Created;
        }
        Ok(())
    }

    /// Start the primary container. Only one start is ever issued.
    ///
    /// The start latch is set before the engine call, so a failed start still
    /// blocks later attempts through this wrapper.
    pub async fn start_container(&self) -> Result<()> {
        {
            let mut lifecycle = self.lifecycle.write().await;
            if lifecycle.started {
                return Err(SidecarError::AlreadyStarted {
                    name: self.name.clone(),
                });
            }
            if !lifecycle.state.has_container() {
                return Err(self.invalid("start", lifecycle.state));
            }
            lifecycle.started = true;
        }

        if let Err(e) = self.deps.engine.start_container(&self.name).await {
            tracing::warn!(
                process_name = %self.process_name,
                test = %self.owner.test_name,
                "Sidecar {} failed to start, it will not be started again: {}",
                self.name,
                e
            );
            return Err(e.into());
        }

        self.lifecycle.write().await.state = LifecycleState::Started;
        tracing::info!(
            process_name = %self.process_name,
            test = %self.owner.test_name,
            "Started sidecar {}",
            self.name
        );
        Ok(())
    }

    /// Stop the primary container, giving it the configured grace period.
    pub async fn stop_container(&self) -> Result<()> {
        let state = self.state().await;
        if !state.has_container() {
            return Err(self.invalid("stop", state));
        }

        self.deps.engine.stop_container(&self.name).await?;
        self.lifecycle.write().await.state = LifecycleState::Stopped;
        Ok(())
    }

    /// Remove the primary container. The volume is left in place.
    pub async fn remove_container(&self) -> Result<()> {
        let state = self.state().await;
        if !state.has_container() {
            return Err(self.invalid("remove", state));
        }

        self.deps.engine.remove_container(&self.name).await?;
        self.lifecycle.write().await.state = LifecycleState::Removed;
        Ok(())
    }

    /// `Ok(())` if the engine reports the container running.
    pub async fn running(&self) -> Result<()> {
        self.deps.engine.running(&self.name).await?;
        Ok(())
    }

    /// Write `content` to `rel_path` under the home directory.
    pub async fn write_file(&self, content: &[u8], rel_path: &str) -> Result<()> {
        self.deps
            .volumes
            .write_file(&self.volume_name, rel_path, content, self.image.owner_ids())
            .await?;
        Ok(())
    }

    /// Copy a host file to `dst_rel_path` under the home directory.
    pub async fn copy_file(&self, src: impl AsRef<Path>, dst_rel_path: &str) -> Result<()> {
        let src = src.as_ref();
        let content = tokio::fs::read(src)
            .await
            .map_err(|e| SidecarError::CopySource {
                path: src.display().to_string(),
                source: e,
            })?;
        self.write_file(&content, dst_rel_path).await
    }

    /// Read the single file at `rel_path` under the home directory.
    pub async fn read_file(&self, rel_path: &str) -> Result<Vec<u8>> {
        self.deps
            .volumes
            .single_file_content(&self.volume_name, rel_path)
            .await
            .map_err(|e| SidecarError::ReadFailed {
                path: rel_path.to_string(),
                source: e,
            })
    }

    /// Run `command` to completion in a fresh container built from the
    /// sidecar's image, with the sidecar volume mounted.
    pub async fn exec(&self, command: &[String], env: &[String]) -> ExecOutput {
        let options = JobOptions {
            env: env.to_vec(),
            binds: self.bind(),
            entrypoint: self.entrypoint.clone(),
            network_id: self.network_id.clone(),
            name_prefix: naming::sanitize_test_name(&self.owner.test_name),
            labels: self.owner.labels(),
        };

        let output = self.deps.jobs.run(&self.image, command, &options).await;
        ExecOutput {
            stdout: output.stdout,
            stderr: output.stderr,
            exit_code: output.exit_code,
            result: output.result.map_err(SidecarError::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docker::EngineError;
    use crate::testing::{EngineCall, StubEngine, StubJobRunner, stub_deps};
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn spec(scope: SidecarScope) -> SidecarSpec {
        let mut spec = SidecarSpec::new(
            OwnerRef::new("chain-1", "My Test!!"),
            "oracle",
            scope,
            DockerImage::new("ghcr.io/acme/oracle", "v1"),
        );
        spec.ports = vec!["7171".to_string()];
        spec.start_cmd = vec!["oracle".to_string(), "start".to_string()];
        spec
    }

    fn sidecar() -> (SidecarProcess, Arc<StubEngine>) {
        let (deps, engine, _, _) = stub_deps();
        let process = SidecarProcess::new(spec(SidecarScope::Validator { index: 2 }), deps).unwrap();
        (process, engine)
    }

    #[test]
    fn test_identity() {
        let (process, _) = sidecar();

        assert_eq!(process.name(), "chain-1-oracle-val-2-my-test");
        assert_eq!(process.hostname(), "chain-1-oracle-val-2-my-test");
        assert_eq!(process.volume_name(), process.name());
        assert_eq!(process.home_dir(), "/var/sidecar-processes/oracle");
        assert_eq!(
            process.bind(),
            vec!["chain-1-oracle-val-2-my-test:/var/sidecar-processes/oracle".to_string()]
        );
        assert_eq!(process.ports().collect::<Vec<_>>(), vec!["7171/tcp"]);
    }

    #[test]
    fn test_rejects_bad_identity() {
        let (deps, ..) = stub_deps();
        let mut bad = spec(SidecarScope::Chain { index: 0 });
        bad.process_name = "price feed".to_string();
        assert!(matches!(
            SidecarProcess::new(bad, deps.clone()),
            Err(SidecarError::InvalidName { field: "process_name", .. })
        ));

        let mut relative = spec(SidecarScope::Chain { index: 0 });
        relative.home_dir = "home/oracle".to_string();
        assert!(matches!(
            SidecarProcess::new(relative, deps),
            Err(SidecarError::InvalidName { field: "home_dir", .. })
        ));
    }

    #[tokio::test]
    async fn test_create_passes_full_spec() {
        let (process, engine) = sidecar();
        process.create_container().await.unwrap();

        let created = engine.created_specs();
        assert_eq!(created.len(), 1);
        let spec = &created[0];
        assert_eq!(spec.name, process.name());
        assert_eq!(spec.hostname, process.hostname());
        assert_eq!(spec.binds, process.bind());
        assert_eq!(spec.cmd, vec!["oracle", "start"]);
        assert_eq!(spec.labels.get(LABEL_TEST).map(String::as_str), Some("My Test!!"));
        assert_eq!(process.state().await, LifecycleState::Created);
    }

    #[tokio::test]
    async fn test_create_failure_surfaces_engine_error() {
        let (process, engine) = sidecar();
        engine.set_fail_create(true);

        let err = process.create_container().await.unwrap_err();
        assert!(matches!(
            err,
            SidecarError::Engine(EngineError::ImageNotFound { .. })
        ));
        assert_eq!(process.state().await, LifecycleState::Pending);
        assert!(!process.is_started().await);

        assert!(matches!(
            process.start_container().await,
            Err(SidecarError::InvalidTransition { operation: "start", .. })
        ));
        assert!(!process.is_started().await);
        assert!(
            !engine
                .calls()
                .iter()
                .any(|call| matches!(call, EngineCall::Start(_)))
        );
    }

    #[tokio::test]
    async fn test_create_twice_surfaces_engine_error() {
        let (process, _) = sidecar();
        process.create_container().await.unwrap();

        let err = process.create_container().await.unwrap_err();
        assert!(matches!(
            err,
            SidecarError::Engine(EngineError::AlreadyExists { .. })
        ));
    }

    #[tokio::test]
    async fn test_full_lifecycle() {
        let (process, engine) = sidecar();

        process.create_container().await.unwrap();
        process.start_container().await.unwrap();
        assert!(process.is_started().await);
        assert!(process.running().await.is_ok());

        process.stop_container().await.unwrap();
        assert_eq!(process.state().await, LifecycleState::Stopped);
        assert!(process.running().await.is_err());

        process.remove_container().await.unwrap();
        assert_eq!(process.state().await, LifecycleState::Removed);

        let name = process.name().to_string();
        assert_eq!(
            engine.calls(),
            vec![
                EngineCall::Create(name.clone()),
                EngineCall::Start(name.clone()),
                EngineCall::Running(name.clone()),
                EngineCall::Stop(name.clone()),
                EngineCall::Running(name.clone()),
                EngineCall::Remove(name),
            ]
        );
    }

    #[tokio::test]
    async fn test_second_start_is_not_issued() {
        let (process, engine) = sidecar();
        process.create_container().await.unwrap();
        process.start_container().await.unwrap();

        let err = process.start_container().await.unwrap_err();
        assert!(matches!(err, SidecarError::AlreadyStarted { .. }));
        assert_eq!(engine.start_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_start_still_latches() {
        let (process, engine) = sidecar();
        process.create_container().await.unwrap();
        engine.set_fail_start(true);

        let err = process.start_container().await.unwrap_err();
        assert!(matches!(err, SidecarError::Engine(_)));
        assert!(process.is_started().await);
        assert_eq!(process.state().await, LifecycleState::Created);

        engine.set_fail_start(false);
        assert!(matches!(
            process.start_container().await,
            Err(SidecarError::AlreadyStarted { .. })
        ));
        assert_eq!(engine.start_count(), 1);
    }

    #[tokio::test]
    async fn test_operations_before_create_are_typed_errors() {
        let (process, engine) = sidecar();

        for result in [
            process.start_container().await,
            process.stop_container().await,
            process.remove_container().await,
        ] {
            assert!(matches!(
                result,
                Err(SidecarError::InvalidTransition { ref state, .. }) if state == "pending"
            ));
        }
        assert!(engine.calls().is_empty());
        assert!(!process.is_started().await);
    }

    #[tokio::test]
    async fn test_create_after_remove_rejected() {
        let (process, _) = sidecar();
        process.create_container().await.unwrap();
        process.remove_container().await.unwrap();

        assert!(matches!(
            process.create_container().await,
            Err(SidecarError::InvalidTransition { operation: "create", .. })
        ));
    }

    #[tokio::test]
    async fn test_running_does_not_mutate_state() {
        let (process, engine) = sidecar();
        process.create_container().await.unwrap();

        let err = process.running().await.unwrap_err();
        assert!(matches!(
            err,
            SidecarError::Engine(EngineError::NotRunning { .. })
        ));
        assert_eq!(process.state().await, LifecycleState::Created);
        assert!(!process.is_started().await);
        assert_eq!(engine.start_count(), 0);
    }

    #[tokio::test]
    async fn test_file_round_trip_without_container() {
        let (process, engine) = sidecar();

        process
            .write_file(b"price = 42\n", "config/oracle.toml")
            .await
            .unwrap();
        let content = process.read_file("config/oracle.toml").await.unwrap();

        assert_eq!(content, b"price = 42\n");
        assert!(engine.calls().is_empty());
    }

    #[tokio::test]
    async fn test_read_missing_file_names_path() {
        let (process, _) = sidecar();

        let err = process.read_file("missing/genesis.json").await.unwrap_err();
        assert!(matches!(err, SidecarError::ReadFailed { .. }));
        assert!(err.to_string().contains("missing/genesis.json"));
    }

    #[tokio::test]
    async fn test_copy_file() {
        let (process, _) = sidecar();
        let mut src = tempfile::NamedTempFile::new().unwrap();
        src.write_all(b"{\"feeds\":[]}").unwrap();

        process.copy_file(src.path(), "feeds.json").await.unwrap();
        assert_eq!(process.read_file("feeds.json").await.unwrap(), b"{\"feeds\":[]}");
    }

    #[tokio::test]
    async fn test_copy_missing_source_skips_volume() {
        let (deps, _, volumes, _) = stub_deps();
        let process = SidecarProcess::new(spec(SidecarScope::Chain { index: 0 }), deps).unwrap();
        let dir = tempfile::tempdir().unwrap();

        let err = process
            .copy_file(dir.path().join("nope.json"), "nope.json")
            .await
            .unwrap_err();
        assert!(matches!(err, SidecarError::CopySource { .. }));
        assert_eq!(volumes.write_count(), 0);
    }

    #[tokio::test]
    async fn test_exec_uses_disposable_container() {
        let (deps, engine, _, jobs) = stub_deps();
        jobs.respond(b"partial".to_vec(), b"bad flag".to_vec(), 2);
        let process = SidecarProcess::new(spec(SidecarScope::Chain { index: 0 }), deps).unwrap();

        let output = process
            .exec(
                &["oracle".to_string(), "query".to_string()],
                &["FOO=bar".to_string()],
            )
            .await;

        assert_eq!(output.stdout_lossy(), "partial");
        assert_eq!(output.stderr_lossy(), "bad flag");
        assert_eq!(output.exit_code, Some(2));
        assert!(matches!(
            output.result,
            Err(SidecarError::Engine(EngineError::ExitStatus { code: 2 }))
        ));

        let runs = jobs.runs();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].image, *process.image());
        assert_eq!(runs[0].options.binds, process.bind());
        assert_eq!(runs[0].options.env, vec!["FOO=bar"]);
        assert_eq!(runs[0].options.name_prefix, "my-test");

        assert!(engine.calls().is_empty());
        assert!(!process.is_started().await);
        assert_eq!(process.state().await, LifecycleState::Pending);
    }

    #[tokio::test]
    async fn test_exec_success_into_result() {
        let jobs = Arc::new(StubJobRunner::default());
        jobs.respond(b"ok\n".to_vec(), Vec::new(), 0);
        let (mut deps, ..) = stub_deps();
        deps.jobs = jobs;
        let process = SidecarProcess::new(spec(SidecarScope::Chain { index: 0 }), deps).unwrap();

        let (stdout, stderr) = process
            .exec(&["true".to_string()], &[])
            .await
            .into_result()
            .unwrap();
        assert_eq!(stdout, b"ok\n");
        assert!(stderr.is_empty());
    }
}
