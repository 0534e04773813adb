//! Stats Operator - keeps Stats resources in sync with cluster workloads

use clap::{Parser, Subcommand};
use kube::{Client, CustomResourceExt};
use tokio_util::sync::CancellationToken;

use stats_common::crd::Stats;
use stats_common::telemetry::init_telemetry;
use stats_operator::config::OperatorConfig;
use stats_operator::controller_runner::build_stats_controller;
use stats_operator::rbac::cluster_role;
use stats_operator::startup::{cancel_on_signal, ensure_crds_installed};

/// Stats - summarizes running pods and workload controllers into Stats resources
#[derive(Parser, Debug)]
#[command(name = "stats-operator", version, about, long_about = None)]
struct Cli {
    /// Generate CRD manifests and exit
    #[arg(long)]
    crd: bool,

    /// Generate the controller's ClusterRole and exit
    #[arg(long, conflicts_with = "crd")]
    rbac: bool,

    #[command(flatten)]
    config: OperatorConfig,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Commands {
    /// Run as controller (default mode)
    ///
    /// Watches Stats CRDs and rewrites their status with the current
    /// running pod count and workload names, on every change and on a
    /// fixed resync period.
    Controller,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.crd {
        let crd = serde_yaml::to_string(&Stats::crd())
            .map_err(|e| anyhow::anyhow!("Failed to serialize CRD: {}", e))?;
        println!("{crd}");
        return Ok(());
    }

    if cli.rbac {
        let role = serde_yaml::to_string(&cluster_role())
            .map_err(|e| anyhow::anyhow!("Failed to serialize ClusterRole: {}", e))?;
        println!("{role}");
        return Ok(());
    }

    match cli.command {
        Some(Commands::Controller) | None => run_controller(cli.config).await,
    }
}

async fn run_controller(config: OperatorConfig) -> anyhow::Result<()> {
    config.validate()?;
    init_telemetry(config.telemetry())?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting Stats controller");

    let client = Client::try_default()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create Kubernetes client: {}", e))?;

    if config.install_crds {
        ensure_crds_installed(&client).await?;
    }

    let shutdown = CancellationToken::new();
    tokio::spawn(cancel_on_signal(shutdown.clone()));

    build_stats_controller(client, &config, shutdown.clone()).await;

    shutdown.cancel();
    tracing::info!("Stats controller stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn controller_is_the_default_mode() {
        let cli = Cli::try_parse_from(["stats-operator"]).unwrap();
        assert!(!cli.crd);
        assert!(!cli.rbac);
        assert_eq!(cli.command, None);
    }

    #[test]
    fn manifest_flags_parse() {
        let cli = Cli::try_parse_from(["stats-operator", "--crd"]).unwrap();
        assert!(cli.crd);

        let cli = Cli::try_parse_from(["stats-operator", "--rbac"]).unwrap();
        assert!(cli.rbac);

        assert!(Cli::try_parse_from(["stats-operator", "--crd", "--rbac"]).is_err());
    }

    #[test]
    fn controller_subcommand_takes_config_flags() {
        let cli = Cli::try_parse_from([
            "stats-operator",
            "--resync-interval-secs",
            "30",
            "controller",
        ])
        .unwrap();
        assert_eq!(cli.command, Some(Commands::Controller));
        assert_eq!(cli.config.resync_interval_secs, 30);
    }

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
