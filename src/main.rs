//! sidecar-harness - command-line entry point.

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use sidecar_harness::{
    cli::{Cli, run_command},
    config::Config,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present, before clap reads SIDECAR_MANIFEST
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sidecar_harness=info"));

    // Logs go to stderr so `cat` and `exec` output stays clean on stdout.
    if cli.log_json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }

    let config = Config::from_env()?;
    tracing::debug!(
        helper_image = %config.sidecar.helper_image,
        auto_pull = config.sidecar.auto_pull,
        "Loaded configuration"
    );

    run_command(cli.command, cli.manifest, config).await
}
