//! Controller runner - builds the Stats controller future
//!
//! The returned future drives the kube-runtime controller together with the
//! backoff pruning task, and completes when the controller shuts down.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use kube::runtime::controller::{Action, Error as ControllerError};
use kube::runtime::reflector::{ObjectRef, Store};
use kube::runtime::watcher::{self, Config as WatcherConfig};
use kube::runtime::Controller;
use kube::{Api, Client};
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tokio_stream::wrappers::IntervalStream;
use tokio_util::sync::CancellationToken;

use stats_common::crd::Stats;
use stats_controller::{error_policy, forget_deleted, reconcile, Context, Error};

use crate::config::OperatorConfig;

/// Build the Stats controller future
///
/// Only Stats objects are watched. Workload changes are picked up by the
/// periodic resync, which re-reconciles every known Stats object once per
/// `resync_interval_secs`. The same period drives pruning of backoff state
/// for deleted objects.
pub fn build_stats_controller(
    client: Client,
    config: &OperatorConfig,
    shutdown: CancellationToken,
) -> Pin<Box<dyn Future<Output = ()> + Send>> {
    let ctx = Arc::new(Context::new(client.clone()).with_shutdown(shutdown));
    let stats: Api<Stats> = Api::all(client);

    let period = config.resync_interval();
    let resync = IntervalStream::new(resync_ticker(period)).map(|_| ());

    tracing::info!(
        resync_secs = config.resync_interval_secs,
        watch_timeout_secs = config.watch_timeout_secs,
        "- Stats controller"
    );

    let controller = Controller::new(
        stats,
        WatcherConfig::default().timeout(config.watch_timeout_secs),
    );
    let store = controller.store();

    let run = controller
        .reconcile_all_on(resync)
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx.clone())
        .for_each(log_reconcile_result("Stats"));

    Box::pin(async move {
        tokio::select! {
            _ = run => {}
            _ = prune_backoff(ctx, store, period) => {}
        }
    })
}

fn resync_ticker(period: Duration) -> Interval {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

/// Periodically drop backoff entries of Stats objects no longer in the store
async fn prune_backoff(ctx: Arc<Context>, store: Store<Stats>, period: Duration) {
    // The writer only goes away with the controller itself
    if store.wait_until_ready().await.is_err() {
        return std::future::pending().await;
    }
    let mut ticker = resync_ticker(period);
    loop {
        ticker.tick().await;
        forget_deleted(&ctx, &store.state());
    }
}

type ReconcileResult = Result<(ObjectRef<Stats>, Action), ControllerError<Error, watcher::Error>>;

/// Log each reconciliation outcome; aborted passes are not errors
fn log_reconcile_result(
    controller_name: &'static str,
) -> impl Fn(ReconcileResult) -> std::future::Ready<()> {
    move |result| {
        match result {
            Ok(action) => tracing::debug!(?action, "{} reconciliation completed", controller_name),
            Err(ControllerError::ReconcilerFailed(e, obj)) if e.is_cancelled() => {
                tracing::debug!(object = %obj, error = %e, "{} reconciliation aborted", controller_name)
            }
            Err(e) => tracing::error!(error = ?e, "{} reconciliation error", controller_name),
        }
        std::future::ready(())
    }
}
