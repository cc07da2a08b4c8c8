//! CLI command handling.
//!
//! Every subcommand works on the sidecars declared in one manifest:
//! - Bringing them up in start order (`up`)
//! - Tearing down everything labelled with the test name (`down`)
//! - Reporting container state (`status`)
//! - Running a one-off command against a sidecar's volume (`exec`)
//! - Reading and copying files in a sidecar's home directory (`cat`, `cp`)

mod status;

pub use status::{SidecarStatus, existing_containers, probe_status};

use std::io::Write;
use std::path::PathBuf;

use clap::{ColorChoice, Parser, Subcommand};

use crate::config::{Config, SidecarManifest};
use crate::docker::{DockerEngine, connect_docker};
use crate::sidecar::{SidecarDeps, SidecarProcesses, StartPhase};

#[derive(Parser, Debug)]
#[command(name = "sidecar-harness")]
#[command(about = "Manage sidecar containers for chain integration tests")]
#[command(
    long_about = "Creates, starts and inspects the sidecar containers declared in a manifest.\nExamples:\n  sidecar-harness up\n  sidecar-harness exec oracle -- oracle version"
)]
#[command(version)]
#[command(color = ColorChoice::Auto)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Sidecar manifest (TOML)
    #[arg(
        short,
        long,
        global = true,
        env = "SIDECAR_MANIFEST",
        default_value = "sidecars.toml"
    )]
    pub manifest: PathBuf,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Provision volumes and start every sidecar, pre-start ones first.
    /// Refuses to run while any sidecar container of the run exists.
    Up,

    /// Remove every container of the test run
    Down {
        /// Also remove volumes and networks
        #[arg(long)]
        volumes: bool,
    },

    /// Show whether each sidecar's container is running
    Status {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run a command in a disposable container with the sidecar's volume
    Exec {
        /// Container name, or process name when unambiguous
        sidecar: String,

        /// Extra environment variable (KEY=VALUE), repeatable
        #[arg(short, long = "env", value_name = "KEY=VALUE")]
        env: Vec<String>,

        /// Command and arguments
        #[arg(last = true, required = true)]
        command: Vec<String>,
    },

    /// Print a file from the sidecar's home directory
    Cat {
        sidecar: String,

        /// Path relative to the home directory
        path: String,
    },

    /// Copy a host file into the sidecar's home directory
    Cp {
        sidecar: String,

        /// Host file
        src: PathBuf,

        /// Destination relative to the home directory
        dst: String,
    },
}

/// Run a CLI command against the manifest at `manifest_path`.
pub async fn run_command(
    command: Command,
    manifest_path: PathBuf,
    config: Config,
) -> anyhow::Result<()> {
    let manifest = SidecarManifest::load(&manifest_path)?;
    let owner = manifest.owner();
    let docker = connect_docker().await?;
    let engine = DockerEngine::new(docker.clone(), &config.sidecar);
    let deps = SidecarDeps::docker(docker, &config.sidecar, &owner);
    let processes = SidecarProcesses::from_configs(
        &owner,
        &manifest.sidecars,
        manifest.validators,
        manifest.network_id(),
        &config.sidecar.home_root,
        &deps,
    )?;

    match command {
        Command::Up => {
            let statuses = probe_status(&processes).await;
            let existing = existing_containers(&statuses);
            if !existing.is_empty() {
                anyhow::bail!(
                    "Sidecar container(s) already exist for {}: {}. Run `down` first.",
                    manifest.test_name,
                    existing.join(", ")
                );
            }

            if let Some(network) = &manifest.network {
                engine.ensure_network(network, &owner.labels()).await?;
            }
            for process in processes.iter() {
                engine
                    .create_volume(process.volume_name(), &owner.labels())
                    .await?;
            }

            let pre = processes.start_phase(StartPhase::PreStart).await?;
            let post = processes.start_phase(StartPhase::PostStart).await?;
            println!(
                "Started {} sidecar(s) for {} ({} pre-start, {} post-start)",
                pre + post,
                manifest.test_name,
                pre,
                post
            );
            Ok(())
        }
        Command::Down { volumes } => {
            let report = engine
                .cleanup_test_resources(&manifest.test_name, volumes)
                .await?;
            if volumes {
                println!(
                    "Removed {} container(s), {} volume(s), {} network(s)",
                    report.containers, report.volumes, report.networks
                );
            } else {
                println!("Removed {} container(s)", report.containers);
            }
            Ok(())
        }
        Command::Status { json } => {
            let statuses = probe_status(&processes).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&statuses)?);
            } else {
                status::print_table(&statuses);
            }
            Ok(())
        }
        Command::Exec {
            sidecar,
            env,
            command,
        } => {
            if let Some(bad) = env.iter().find(|e| !e.contains('=')) {
                anyhow::bail!("Invalid --env '{}', expected KEY=VALUE", bad);
            }
            let process = processes.find(&sidecar)?;
            let output = process.exec(&command, &env).await;

            std::io::stdout().write_all(&output.stdout)?;
            std::io::stderr().write_all(&output.stderr)?;
            output.result?;
            Ok(())
        }
        Command::Cat { sidecar, path } => {
            let content = processes.find(&sidecar)?.read_file(&path).await?;

            std::io::stdout().write_all(&content)?;
            Ok(())
        }
        Command::Cp { sidecar, src, dst } => {
            let process = processes.find(&sidecar)?;
            process.copy_file(&src, &dst).await?;
            println!(
                "Copied {} to {}:{}/{}",
                src.display(),
                process.name(),
                process.home_dir(),
                dst
            );
            Ok(())
        }
    }
}
