//! Configuration types for sidecar processes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_HOME_ROOT;
use crate::docker::DockerImage;
use crate::sidecar::naming::SidecarScope;
use crate::sidecar::process::OwnerRef;

/// Declarative description of a sidecar, as written in a manifest.
///
/// One config becomes one sidecar for chain-scoped processes, or one sidecar
/// per validator when `validator_process` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SidecarConfig {
    /// Logical name of the process (used in container naming).
    pub process_name: String,
    /// Image to run.
    pub image: DockerImage,
    /// Container ports to expose, e.g. `"7171"` or `"26657/tcp"`.
    #[serde(default)]
    pub ports: Vec<String>,
    /// Arguments passed as the container command.
    #[serde(default)]
    pub start_cmd: Vec<String>,
    /// Entrypoint override. Empty keeps the image default.
    #[serde(default)]
    pub entrypoint: Vec<String>,
    /// Environment variables for the primary container.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Home directory inside the container. Defaults to
    /// `<home_root>/<process_name>`.
    #[serde(default)]
    pub home_dir: Option<String>,
    /// Start before the owning chain or validator instead of after it.
    #[serde(default)]
    pub pre_start: bool,
    /// Run one instance per validator instead of one for the chain.
    #[serde(default)]
    pub validator_process: bool,
}

impl SidecarConfig {
    pub fn new(process_name: impl Into<String>, image: DockerImage) -> Self {
        Self {
            process_name: process_name.into(),
            image,
            ports: Vec::new(),
            start_cmd: Vec::new(),
            entrypoint: Vec::new(),
            env: BTreeMap::new(),
            home_dir: None,
            pre_start: false,
            validator_process: false,
        }
    }

    /// Environment as `KEY=VALUE` strings, in key order.
    pub fn env_pairs(&self) -> Vec<String> {
        self.env
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect()
    }

    /// Home directory for this process under `home_root`.
    pub fn resolved_home_dir(&self, home_root: &str) -> String {
        match &self.home_dir {
            Some(dir) => dir.clone(),
            None => format!(
                "{}/{}",
                home_root.trim_end_matches('/'),
                self.process_name
            ),
        }
    }

    /// Build the construction input for one instance of this sidecar.
    pub fn to_spec(
        &self,
        owner: &OwnerRef,
        scope: SidecarScope,
        network_id: &str,
        home_root: &str,
    ) -> SidecarSpec {
        SidecarSpec {
            owner: owner.clone(),
            process_name: self.process_name.clone(),
            scope,
            pre_start: self.pre_start,
            image: self.image.clone(),
            ports: self.ports.clone(),
            start_cmd: self.start_cmd.clone(),
            entrypoint: self.entrypoint.clone(),
            env: self.env_pairs(),
            home_dir: self.resolved_home_dir(home_root),
            network_id: network_id.to_string(),
            volume_name: None,
        }
    }
}

/// Fully resolved construction input for a single
/// [`SidecarProcess`](crate::sidecar::SidecarProcess).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidecarSpec {
    pub owner: OwnerRef,
    pub process_name: String,
    pub scope: SidecarScope,
    pub pre_start: bool,
    pub image: DockerImage,
    pub ports: Vec<String>,
    pub start_cmd: Vec<String>,
    pub entrypoint: Vec<String>,
    /// `KEY=VALUE` pairs.
    pub env: Vec<String>,
    /// Absolute path the volume is mounted at.
    pub home_dir: String,
    /// Network to attach to. Empty uses the daemon default.
    pub network_id: String,
    /// Volume holding the home directory. Defaults to the container name.
    pub volume_name: Option<String>,
}

impl SidecarSpec {
    /// Minimal spec with default home directory and no ports or commands.
    pub fn new(
        owner: OwnerRef,
        process_name: impl Into<String>,
        scope: SidecarScope,
        image: DockerImage,
    ) -> Self {
        let process_name = process_name.into();
        Self {
            home_dir: format!("{}/{}", DEFAULT_HOME_ROOT, process_name),
            owner,
            process_name,
            scope,
            pre_start: false,
            image,
            ports: Vec::new(),
            start_cmd: Vec::new(),
            entrypoint: Vec::new(),
            env: Vec::new(),
            network_id: String::new(),
            volume_name: None,
        }
    }
}
