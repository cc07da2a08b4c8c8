//! Sidecar processes for chain integration tests.
//!
//! A sidecar is a companion container attached either to a whole chain or to
//! one validator of it: a price feeder, an oracle, a signer. This module owns
//! how sidecars are named, when they start relative to their owner, and how
//! their files and commands are reached. All engine work is delegated to the
//! traits in [`crate::docker`].
//!
//! # Lifecycle
//!
//! ```text
//!   Pending ──create──▶ Created ──start──▶ Started ──stop──▶ Stopped
//!                          │                  │                 │
//!                          └──────────────────┴─────remove──────┴──▶ Removed
//! ```
//!
//! `start` is issued at most once per sidecar. File access and `exec` work in
//! every state, since they go through the volume or a disposable container.
//!
//! # Start order
//!
//! Sidecars flagged `pre_start` are created and started before their owner;
//! the rest are started after it. [`SidecarProcesses::start_phase`] runs one
//! half of that order for a whole test run.
//!
//! # Example
//!
//! ```rust,no_run
//! use sidecar_harness::docker::{DockerImage, connect_docker};
//! use sidecar_harness::config::SidecarRuntimeConfig;
//! use sidecar_harness::sidecar::{
//!     OwnerRef, SidecarDeps, SidecarProcess, SidecarScope, SidecarSpec,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let owner = OwnerRef::new("chain-1", "TestOracle");
//! let docker = connect_docker().await?;
//! let deps = SidecarDeps::docker(docker, &SidecarRuntimeConfig::default(), &owner);
//!
//! let spec = SidecarSpec::new(
//!     owner,
//!     "oracle",
//!     SidecarScope::Validator { index: 0 },
//!     DockerImage::new("ghcr.io/acme/oracle", "v1.0.0"),
//! );
//! let oracle = SidecarProcess::new(spec, deps)?;
//!
//! oracle.write_file(b"interval = 5\n", "config.toml").await?;
//! oracle.create_container().await?;
//! oracle.start_container().await?;
//! oracle.running().await?;
//! # Ok(())
//! # }
//! ```

mod collection;
pub mod config;
pub mod error;
pub mod naming;
mod process;

pub use collection::{SidecarProcesses, StartPhase};
pub use config::{SidecarConfig, SidecarSpec};
pub use error::{Result, SidecarError};
pub use naming::SidecarScope;
pub use process::{
    ExecOutput, LifecycleState, OwnerRef, SidecarDeps, SidecarOwner, SidecarProcess,
};
