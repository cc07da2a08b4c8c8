//! Sidecar container management for blockchain integration tests.
//!
//! - [`sidecar`]: naming, lifecycle and start ordering of sidecar processes
//! - [`docker`]: the engine, volume and job adapters sidecars delegate to
//! - [`config`]: environment settings and sidecar manifests
//! - [`testing`]: in-memory adapters for tests

pub mod cli;
pub mod config;
pub mod docker;
pub mod error;
pub mod sidecar;
pub mod testing;
