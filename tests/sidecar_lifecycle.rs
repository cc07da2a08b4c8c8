//! Sidecar lifecycle tests against in-memory engines.
//!
//! Covers start ordering across a whole test run, isolation between runs that
//! share a chain id, and cancellation of in-flight engine calls.
//!
//! Mock engines:
//! - `StubEngine` (from `sidecar_harness::testing`) -- records every call
//! - `HangingEngine` -- never answers `start` (tests caller-side timeout)

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;

use sidecar_harness::docker::{ContainerEngine, ContainerSpec, DockerImage, EngineError, Result};
use sidecar_harness::sidecar::{
    LifecycleState, OwnerRef, SidecarConfig, SidecarError, SidecarProcess, SidecarProcesses,
    SidecarScope, SidecarSpec, StartPhase,
};
use sidecar_harness::testing::{EngineCall, stub_deps};

// ---------------------------------------------------------------------------
// Mock engines
// ---------------------------------------------------------------------------

/// Engine whose `start` never completes.
struct HangingEngine {
    start_calls: AtomicU32,
}

#[async_trait]
impl ContainerEngine for HangingEngine {
    async fn create_container(&self, _spec: &ContainerSpec) -> Result<()> {
        Ok(())
    }

    async fn start_container(&self, _name: &str) -> Result<()> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        std::future::pending::<()>().await;
        Ok(())
    }

    async fn stop_container(&self, _name: &str) -> Result<()> {
        Ok(())
    }

    async fn remove_container(&self, _name: &str) -> Result<()> {
        Ok(())
    }

    async fn running(&self, name: &str) -> Result<()> {
        Err(EngineError::NotRunning {
            name: name.to_string(),
            status: "created".to_string(),
            exit_code: None,
        })
    }
}

fn oracle_config() -> SidecarConfig {
    let mut config = SidecarConfig::new("oracle", DockerImage::new("ghcr.io/acme/oracle", "v1"));
    config.validator_process = true;
    config.pre_start = true;
    config.ports = vec!["7171".to_string()];
    config
}

fn feed_config() -> SidecarConfig {
    SidecarConfig::new("price-feed", DockerImage::new("acme/feed", "v2"))
}

// ── Start ordering ─────────────────────────────────────────────────────────

#[tokio::test]
async fn pre_start_sidecars_run_before_post_start_ones() {
    let (deps, engine, ..) = stub_deps();
    let owner = OwnerRef::new("chain-1", "TestOrdering");
    let processes = SidecarProcesses::from_configs(
        &owner,
        &[feed_config(), oracle_config()],
        2,
        "",
        "/var/sidecar-processes",
        &deps,
    )
    .unwrap();

    processes.start_phase(StartPhase::PreStart).await.unwrap();
    // The owning chain would start here.
    processes.start_phase(StartPhase::PostStart).await.unwrap();

    let starts: Vec<String> = engine
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            EngineCall::Start(name) => Some(name),
            _ => None,
        })
        .collect();
    assert_eq!(starts.len(), 3);

    let feed_position = starts
        .iter()
        .position(|n| n == "chain-1-price-feed-0-testordering")
        .unwrap();
    assert_eq!(feed_position, 2, "post-start sidecar must start last");
}

#[tokio::test]
async fn every_started_sidecar_is_running() {
    let (deps, ..) = stub_deps();
    let owner = OwnerRef::new("chain-1", "TestRunning");
    let processes = SidecarProcesses::from_configs(
        &owner,
        &[oracle_config(), feed_config()],
        3,
        "",
        "/var/sidecar-processes",
        &deps,
    )
    .unwrap();

    processes.start_phase(StartPhase::PreStart).await.unwrap();
    processes.start_phase(StartPhase::PostStart).await.unwrap();

    for process in processes.iter() {
        assert_eq!(process.state().await, LifecycleState::Started);
        assert!(process.running().await.is_ok(), "{} not running", process.name());
    }
}

// ── Isolation between test runs ────────────────────────────────────────────

#[tokio::test]
async fn concurrent_runs_on_one_engine_do_not_collide() {
    let (deps, engine, ..) = stub_deps();

    let mut runs = Vec::new();
    for test_name in ["TestAlpha", "TestBeta"] {
        let owner = OwnerRef::new("chain-1", test_name);
        runs.push(
            SidecarProcesses::from_configs(
                &owner,
                &[oracle_config()],
                2,
                "",
                "/var/sidecar-processes",
                &deps,
            )
            .unwrap(),
        );
    }

    let (a, b) = tokio::join!(
        runs[0].start_phase(StartPhase::PreStart),
        runs[1].start_phase(StartPhase::PreStart)
    );
    assert_eq!(a.unwrap(), 2);
    assert_eq!(b.unwrap(), 2);

    assert_eq!(
        engine.live_containers(),
        vec![
            "chain-1-oracle-val-0-testalpha",
            "chain-1-oracle-val-0-testbeta",
            "chain-1-oracle-val-1-testalpha",
            "chain-1-oracle-val-1-testbeta",
        ]
    );
}

#[tokio::test]
async fn file_io_and_lifecycle_interleave() {
    let (deps, ..) = stub_deps();
    let spec = SidecarSpec::new(
        OwnerRef::new("chain-1", "TestInterleave"),
        "signer",
        SidecarScope::Chain { index: 0 },
        DockerImage::new("acme/signer", "v1").with_uid_gid("1025:1025"),
    );
    let process = Arc::new(SidecarProcess::new(spec, deps).unwrap());

    process.create_container().await.unwrap();
    let writer = {
        let process = Arc::clone(&process);
        tokio::spawn(async move { process.write_file(b"key = 1\n", "keys/signer.toml").await })
    };
    process.start_container().await.unwrap();
    writer.await.unwrap().unwrap();

    assert_eq!(
        process.read_file("keys/signer.toml").await.unwrap(),
        b"key = 1\n"
    );
    assert_eq!(process.state().await, LifecycleState::Started);
}

// ── Cancellation ───────────────────────────────────────────────────────────

#[tokio::test]
async fn dropped_start_leaves_latch_set() {
    let (mut deps, ..) = stub_deps();
    let hanging = Arc::new(HangingEngine {
        start_calls: AtomicU32::new(0),
    });
    deps.engine = hanging.clone();

    let spec = SidecarSpec::new(
        OwnerRef::new("chain-1", "TestCancel"),
        "oracle",
        SidecarScope::Validator { index: 0 },
        DockerImage::new("acme/oracle", "v1"),
    );
    let process = SidecarProcess::new(spec, deps).unwrap();
    process.create_container().await.unwrap();

    let result = tokio::time::timeout(Duration::from_millis(50), process.start_container()).await;
    assert!(result.is_err(), "start should still be pending");
    assert_eq!(hanging.start_calls.load(Ordering::SeqCst), 1);

    // The engine was asked once; the wrapper refuses to ask again.
    assert!(process.is_started().await);
    assert_eq!(process.state().await, LifecycleState::Created);
    assert!(matches!(
        process.start_container().await,
        Err(SidecarError::AlreadyStarted { .. })
    ));
    assert_eq!(hanging.start_calls.load(Ordering::SeqCst), 1);

    // Teardown still works from the confirmed state.
    process.remove_container().await.unwrap();
    assert_eq!(process.state().await, LifecycleState::Removed);
}

#[test]
fn blocking_runtime_drives_exec() {
    let (deps, _, _, jobs) = stub_deps();
    jobs.respond(b"v1.0.0\n".to_vec(), Vec::new(), 0);
    let spec = SidecarSpec::new(
        OwnerRef::new("chain-1", "TestExec"),
        "oracle",
        SidecarScope::Chain { index: 0 },
        DockerImage::new("acme/oracle", "v1"),
    );
    let process = SidecarProcess::new(spec, deps).unwrap();

    let output = tokio_test::block_on(process.exec(&["oracle".to_string(), "version".to_string()], &[]));

    assert_eq!(output.stdout_lossy(), "v1.0.0\n");
    assert_eq!(jobs.runs()[0].command, vec!["oracle", "version"]);
}
