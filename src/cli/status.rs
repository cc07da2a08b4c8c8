//! `status` command: ask the engine about every sidecar of a manifest.

use serde::Serialize;

use crate::docker::EngineError;
use crate::sidecar::{SidecarError, SidecarProcesses};

/// Engine view of one sidecar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SidecarStatus {
    pub name: String,
    pub process_name: String,
    pub scope: String,
    pub image: String,
    pub hostname: String,
    /// `running`, `missing`, the container status reported by the engine, or
    /// `error`.
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Query the engine for each sidecar, in collection order. Never mutates the
/// sidecars' own lifecycle state.
pub async fn probe_status(processes: &SidecarProcesses) -> Vec<SidecarStatus> {
    let mut statuses = Vec::with_capacity(processes.len());

    for process in processes.iter() {
        let (state, exit_code, error) = match process.running().await {
            Ok(()) => ("running".to_string(), None, None),
            Err(SidecarError::Engine(EngineError::NotFound { .. })) => {
                ("missing".to_string(), None, None)
            }
            Err(SidecarError::Engine(EngineError::NotRunning {
                status, exit_code, ..
            })) => (status, exit_code, None),
            Err(e) => ("error".to_string(), None, Some(e.to_string())),
        };

        statuses.push(SidecarStatus {
            name: process.name().to_string(),
            process_name: process.process_name().to_string(),
            scope: process.scope().to_string(),
            image: process.image().to_string(),
            hostname: process.hostname().to_string(),
            state,
            exit_code,
            error,
        });
    }

    statuses
}

/// Names of sidecars whose container already exists in any state.
pub fn existing_containers(statuses: &[SidecarStatus]) -> Vec<&str> {
    statuses
        .iter()
        .filter(|s| s.state != "missing")
        .map(|s| s.name.as_str())
        .collect()
}

pub(super) fn print_table(statuses: &[SidecarStatus]) {
    if statuses.is_empty() {
        println!("No sidecars declared.");
        return;
    }

    let width = statuses.iter().map(|s| s.name.len()).max().unwrap_or(0);
    for status in statuses {
        let mut line = format!(
            "  {:width$}  {:14}  {}",
            status.name,
            status.scope,
            status.state,
            width = width
        );
        if let Some(code) = status.exit_code {
            line.push_str(&format!(" (exit {})", code));
        }
        if let Some(err) = &status.error {
            line.push_str(&format!(": {}", err));
        }
        println!("{}", line);
    }
}
