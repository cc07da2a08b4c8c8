//! Docker adapters behind the sidecar core.
//!
//! The sidecar core only talks to three traits:
//! - [`ContainerEngine`]: create/start/stop/remove/inspect keyed by name
//! - [`VolumeFiles`]: single-file reads and writes inside a named volume
//! - [`JobRunner`]: one-shot commands in disposable containers
//!
//! This module provides bollard implementations of each, plus connection
//! handling and test-run cleanup. Tests substitute the stubs in
//! [`crate::testing`].

mod connect;
pub mod engine;
pub mod error;
pub mod image;
pub mod job;
pub mod volume;

pub use connect::connect_docker;
pub use engine::{
    CleanupReport, ContainerEngine, ContainerSpec, DockerEngine, LABEL_CHAIN, LABEL_TEST,
};
pub use error::{EngineError, Result};
pub use image::{DockerImage, normalize_port};
pub use job::{DockerJobRunner, JobOptions, JobOutput, JobRunner};
pub use volume::{DockerVolumeFiles, VolumeFiles, volume_path};
