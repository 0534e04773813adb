//! Startup utilities for the Stats operator
//!
//! CRD installation using server-side apply, and the shutdown signal that
//! aborts in-flight reconciliations.

use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::api::{Api, Patch, PatchParams};
use kube::{Client, CustomResourceExt};
use tokio_util::sync::CancellationToken;

use stats_common::crd::Stats;
use stats_common::FIELD_MANAGER;

/// Ensure the Stats CRD is installed
///
/// The operator installs its own CRD on startup using server-side apply.
/// This ensures the CRD version always matches the operator version.
pub async fn ensure_crds_installed(client: &Client) -> anyhow::Result<()> {
    let crds: Api<CustomResourceDefinition> = Api::all(client.clone());
    let params = PatchParams::apply(FIELD_MANAGER).force();

    tracing::info!("Installing {} CRD...", Stats::crd_name());
    crds.patch(Stats::crd_name(), &params, &Patch::Apply(&Stats::crd()))
        .await
        .map_err(|e| anyhow::anyhow!("failed to install {} CRD: {}", Stats::crd_name(), e))?;
    tracing::info!("Stats CRD installed/updated");

    Ok(())
}

/// Cancel `token` on SIGINT or SIGTERM
///
/// Runs alongside the controller's own signal handling so reconciliations
/// that are mid-flight abort instead of finishing their API calls.
pub async fn cancel_on_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("Received terminate signal, shutting down"),
        _ = token.cancelled() => return,
    }
    token.cancel();
}
