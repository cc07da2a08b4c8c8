//! The ordered set of sidecars belonging to one test run.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;

use crate::sidecar::config::SidecarConfig;
use crate::sidecar::error::{Result, SidecarError};
use crate::sidecar::naming::SidecarScope;
use crate::sidecar::process::{LifecycleState, OwnerRef, SidecarDeps, SidecarProcess};

/// Which half of the start order to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartPhase {
    /// Sidecars that must be up before their owner starts.
    PreStart,
    /// Sidecars started after their owner.
    PostStart,
}

impl StartPhase {
    fn includes(&self, process: &SidecarProcess) -> bool {
        match self {
            StartPhase::PreStart => process.pre_start(),
            StartPhase::PostStart => !process.pre_start(),
        }
    }
}

/// Sidecars of one test run, in insertion order, with unique names.
#[derive(Debug, Default)]
pub struct SidecarProcesses {
    processes: Vec<Arc<SidecarProcess>>,
    names: HashSet<String>,
}

impl SidecarProcesses {
    /// Empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Expand manifest configs into sidecars.
    ///
    /// Validator processes get one instance per validator (`0..validators`).
    /// Chain processes are indexed by how many chain sidecars with the same
    /// process name precede them.
    pub fn from_configs(
        owner: &OwnerRef,
        configs: &[SidecarConfig],
        validators: usize,
        network_id: &str,
        home_root: &str,
        deps: &SidecarDeps,
    ) -> Result<Self> {
        let mut processes = Self::new();

        for config in configs {
            if config.validator_process {
                if validators == 0 {
                    tracing::warn!(
                        "Validator sidecar '{}' configured for chain {} with no validators",
                        config.process_name,
                        owner.chain_id
                    );
                }
                for index in 0..validators {
                    let spec = config.to_spec(
                        owner,
                        SidecarScope::Validator { index },
                        network_id,
                        home_root,
                    );
                    processes.push(SidecarProcess::new(spec, deps.clone())?)?;
                }
            } else {
                let index = processes
                    .chain_scoped()
                    .filter(|p| p.process_name() == config.process_name)
                    .count();
                let spec =
                    config.to_spec(owner, SidecarScope::Chain { index }, network_id, home_root);
                processes.push(SidecarProcess::new(spec, deps.clone())?)?;
            }
        }

        Ok(processes)
    }

    /// Add a sidecar, rejecting a second sidecar with the same name.
    pub fn push(&mut self, process: SidecarProcess) -> Result<Arc<SidecarProcess>> {
        if !self.names.insert(process.name().to_string()) {
            return Err(SidecarError::DuplicateSidecar {
                name: process.name().to_string(),
            });
        }
        let process = Arc::new(process);
        self.processes.push(Arc::clone(&process));
        Ok(process)
    }

    /// Number of sidecars.
    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    /// Sidecars in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<SidecarProcess>> {
        self.processes.iter()
    }

    /// Look up by exact container name.
    pub fn get(&self, name: &str) -> Option<&Arc<SidecarProcess>> {
        self.processes.iter().find(|p| p.name() == name)
    }

    /// Look up by container name, or by process name when exactly one
    /// sidecar carries it.
    pub fn find(&self, name: &str) -> Result<&Arc<SidecarProcess>> {
        if let Some(process) = self.get(name) {
            return Ok(process);
        }

        let mut matches = self.processes.iter().filter(|p| p.process_name() == name);
        match (matches.next(), matches.next()) {
            (Some(process), None) => Ok(process),
            _ => Err(SidecarError::UnknownSidecar {
                name: name.to_string(),
            }),
        }
    }

    /// Sidecars that must run before their owner starts.
    pub fn pre_start(&self) -> impl Iterator<Item = &Arc<SidecarProcess>> {
        self.processes.iter().filter(|p| p.pre_start())
    }

    /// Sidecars started after their owner.
    pub fn post_start(&self) -> impl Iterator<Item = &Arc<SidecarProcess>> {
        self.processes.iter().filter(|p| !p.pre_start())
    }

    /// Sidecars shared by the whole chain.
    pub fn chain_scoped(&self) -> impl Iterator<Item = &Arc<SidecarProcess>> {
        self.processes.iter().filter(|p| !p.is_validator_process())
    }

    /// Sidecars bound to the validator at `index`.
    pub fn for_validator(&self, index: usize) -> impl Iterator<Item = &Arc<SidecarProcess>> {
        self.processes
            .iter()
            .filter(move |p| p.scope() == SidecarScope::Validator { index })
    }

    /// Create and start every not-yet-started sidecar of `phase`.
    pub async fn start_phase(&self, phase: StartPhase) -> Result<usize> {
        self.start_where(phase, |_| true).await
    }

    /// Create and start the not-yet-started sidecars of `phase` accepted by
    /// `filter`, concurrently. Sidecars that already have a container are
    /// only started. Returns how many were started; on failure every attempt
    /// still runs to completion and the first error is returned.
    pub async fn start_where<F>(&self, phase: StartPhase, filter: F) -> Result<usize>
    where
        F: Fn(&SidecarProcess) -> bool,
    {
        let mut selected = Vec::new();
        for process in &self.processes {
            if !phase.includes(process) || !filter(&**process) {
                continue;
            }
            if !process.is_started().await {
                selected.push(Arc::clone(process));
            }
        }

        tracing::debug!("Starting {} sidecar(s) in {:?} phase", selected.len(), phase);

        let results = join_all(selected.iter().map(|process| async move {
            if !process.state().await.has_container() {
                process.create_container().await?;
            }
            process.start_container().await
        }))
        .await;

        let started = results.iter().filter(|r| r.is_ok()).count();
        results.into_iter().collect::<Result<Vec<()>>>()?;
        Ok(started)
    }

    /// Stop every sidecar whose start was confirmed.
    pub async fn stop_all(&self) -> Result<()> {
        let mut running = Vec::new();
        for process in &self.processes {
            if process.state().await == LifecycleState::Started {
                running.push(Arc::clone(process));
            }
        }

        join_all(running.iter().map(|p| p.stop_container()))
            .await
            .into_iter()
            .collect::<Result<Vec<()>>>()?;
        Ok(())
    }

    /// Remove every sidecar that still has a container.
    pub async fn remove_all(&self) -> Result<()> {
        let mut existing = Vec::new();
        for process in &self.processes {
            if process.state().await.has_container() {
                existing.push(Arc::clone(process));
            }
        }

        join_all(existing.iter().map(|p| p.remove_container()))
            .await
            .into_iter()
            .collect::<Result<Vec<()>>>()?;
        Ok(())
    }
}
