//! Stats controller implementation
//!
//! Every reconciliation recomputes the status from scratch:
//! fetch target → list pods → list each workload kind → replace status.
//!
//! A failed listing aborts the pass before anything is written, so the stored
//! status is always the last complete observation. Retries come from the
//! error policy, never from a local loop.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use kube::runtime::controller::Action;
use kube::{Client, ResourceExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use stats_common::crd::{Stats, StatsStatus};
use stats_common::{metrics, Error, Result};

use crate::aggregate::{count_running, names_of, Observation};
use crate::backoff::{delay_for, BackoffTracker};
use crate::client::{KubeStatsClient, StatsClient};

/// Shared context for the Stats controller
pub struct Context {
    /// API client capability (trait object for testability)
    pub client: Arc<dyn StatsClient>,
    /// Consecutive failures per Stats object, drives the requeue delay
    pub backoff: BackoffTracker,
    /// Cancelled on shutdown; every reconciliation runs under a child token
    pub shutdown: CancellationToken,
}

impl Context {
    /// Create a context backed by the real Kubernetes API
    pub fn new(client: Client) -> Self {
        Self::with_client(Arc::new(KubeStatsClient::new(client)))
    }

    /// Create a context around any client implementation
    pub fn with_client(client: Arc<dyn StatsClient>) -> Self {
        Self {
            client,
            backoff: BackoffTracker::new(),
            shutdown: CancellationToken::new(),
        }
    }

    /// Use the given token as the shutdown signal
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }
}

/// Result of a reconciliation that did not fail
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    /// Status was replaced with the contained record
    Updated(StatsStatus),
    /// The Stats object no longer exists; nothing was written
    TargetMissing,
}

/// Identity used for logs, metrics and backoff bookkeeping
pub fn stats_key(namespace: &str, name: &str) -> String {
    format!("{namespace}/{name}")
}

/// Run one step unless cancellation has been requested.
///
/// The step is not started at all once the token is cancelled, and an
/// in-flight step is dropped as soon as cancellation is observed.
async fn cancellable<T, F, Fut>(cancel: &CancellationToken, stage: &str, step: F) -> Result<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    if cancel.is_cancelled() {
        return Err(Error::cancelled(stage));
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::cancelled(stage)),
        result = step() => result,
    }
}

fn log_list_failure(kind: &'static str) -> impl Fn(&Error) {
    move |e| {
        if !e.is_cancelled() {
            error!(error = %e, "failed to list {}", kind);
        }
    }
}

/// Recompute and write the status of one Stats object.
///
/// Steps run strictly in order and any failure aborts the remaining ones:
/// 1. Fetch the target; a missing target is success with nothing to do
/// 2. List pods and count the running ones
/// 3. List Deployments, DaemonSets, StatefulSets and ReplicaSets
/// 4. Replace the whole status in one update call
///
/// Update conflicts are returned to the caller like any other error; the next
/// attempt starts over from step 1.
#[instrument(skip(ctx, cancel))]
pub async fn reconcile_stats(
    namespace: &str,
    name: &str,
    ctx: &Context,
    cancel: &CancellationToken,
) -> Result<Outcome> {
    let client = ctx.client.as_ref();
    info!("reconciling stats");

    let fetched = cancellable(cancel, "get stats", || client.get_stats(namespace, name)).await;
    let mut stats = match fetched {
        Ok(Some(stats)) => stats,
        Ok(None) => {
            debug!("stats object not found, assuming deleted");
            return Ok(Outcome::TargetMissing);
        }
        Err(e) if e.is_not_found() => {
            debug!("stats object not found, assuming deleted");
            return Ok(Outcome::TargetMissing);
        }
        Err(e) => return Err(e),
    };

    let pods = cancellable(cancel, "list pods", || client.list_pods())
        .await
        .inspect_err(log_list_failure("pods"))?;
    let running_pods = count_running(&pods);

    let deployments = cancellable(cancel, "list deployments", || client.list_deployments())
        .await
        .inspect_err(log_list_failure("deployments"))?;

    let daemon_sets = cancellable(cancel, "list daemon sets", || client.list_daemon_sets())
        .await
        .inspect_err(log_list_failure("daemonsets"))?;

    let stateful_sets = cancellable(cancel, "list stateful sets", || {
        client.list_stateful_sets()
    })
    .await
    .inspect_err(log_list_failure("statefulsets"))?;

    let replica_sets = cancellable(cancel, "list replica sets", || client.list_replica_sets())
        .await
        .inspect_err(log_list_failure("replicasets"))?;

    let status = Observation {
        running_pods,
        deployments: names_of(&deployments),
        daemon_sets: names_of(&daemon_sets),
        stateful_sets: names_of(&stateful_sets),
        replica_sets: names_of(&replica_sets),
    }
    .into_status();

    stats.status = Some(status.clone());
    cancellable(cancel, "update status", || client.replace_status(&stats))
        .await
        .inspect_err(|e| {
            if e.is_conflict() {
                warn!(error = %e, "stats status changed underneath us, will retry");
            } else if !e.is_cancelled() {
                error!(error = %e, "failed to update stats status");
            }
        })?;

    info!(
        running_pods = status.running_pod_count,
        deployments = status.deployment_count,
        daemon_sets = status.daemon_set_count,
        stateful_sets = status.stateful_set_count,
        replica_sets = status.replica_set_count,
        "stats status updated"
    );

    Ok(Outcome::Updated(status))
}

/// Reconcile a Stats resource
///
/// Entry point for kube-runtime. Success does not request a requeue: the next
/// pass comes from a watch event or the periodic resync.
pub async fn reconcile(stats: Arc<Stats>, ctx: Arc<Context>) -> Result<Action> {
    let name = stats.name_any();
    let namespace = stats.namespace().ok_or_else(|| {
        Error::internal_with_context("reconciler", format!("Stats {name} has no namespace"))
    })?;
    let key = stats_key(&namespace, &name);

    let started = Instant::now();
    let cancel = ctx.shutdown.child_token();
    let result = reconcile_stats(&namespace, &name, &ctx, &cancel).await;
    let elapsed = started.elapsed().as_secs_f64();

    match result {
        Ok(outcome) => {
            ctx.backoff.reset(&key);
            metrics::record_reconcile(elapsed, "success");
            if let Outcome::Updated(status) = &outcome {
                metrics::record_status(&key, status);
            }
            Ok(Action::await_change())
        }
        Err(e) => {
            metrics::record_reconcile(elapsed, "error");
            metrics::record_error(e.metric_label());
            Err(e)
        }
    }
}

/// Forget backoff state of Stats objects that no longer exist
///
/// `live` is the current set of known Stats objects, typically the
/// controller's reflector store. Returns the number of entries dropped.
pub fn forget_deleted(ctx: &Context, live: &[Arc<Stats>]) -> usize {
    let known: HashSet<String> = live
        .iter()
        .filter_map(|stats| Some(stats_key(&stats.namespace()?, &stats.name_any())))
        .collect();
    let dropped = ctx.backoff.retain(|key| known.contains(key));
    if dropped > 0 {
        debug!(dropped, "cleared backoff state of deleted stats objects");
    }
    dropped
}

/// Error policy for Stats reconciliation
///
/// Requeues with a per-object exponential backoff. Cancelled attempts are
/// retried after the base delay without counting as failures.
pub fn error_policy(stats: Arc<Stats>, error: &Error, ctx: Arc<Context>) -> Action {
    let key = stats_key(
        stats.namespace().as_deref().unwrap_or_default(),
        &stats.name_any(),
    );

    if error.is_cancelled() {
        debug!(stats = %key, %error, "stats reconciliation aborted");
        return Action::requeue(delay_for(0));
    }

    if !error.is_retryable() {
        error!(stats = %key, %error, "stats reconciliation failed permanently");
        return Action::await_change();
    }

    let delay = ctx.backoff.next_delay(&key);
    error!(
        stats = %key,
        %error,
        failures = ctx.backoff.failures(&key),
        delay_secs = delay.as_secs(),
        "stats reconciliation failed"
    );
    Action::requeue(delay)
}
