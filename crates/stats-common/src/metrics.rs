//! Metrics registry for Stats observability
//!
//! Provides OpenTelemetry instruments for:
//! - Reconciliation (duration, errors)
//! - Observed cluster state (running pods, workloads by kind)
//!
//! Instruments are no-ops until a meter provider is installed by
//! [`crate::telemetry::init_telemetry`].

use once_cell::sync::Lazy;
use opentelemetry::metrics::{Counter, Gauge, Histogram, Meter};
use opentelemetry::{global, KeyValue};

use crate::crd::{StatsStatus, WorkloadKind};

/// Global meter for Stats metrics
static METER: Lazy<Meter> = Lazy::new(|| global::meter("stats"));

/// Histogram of reconciliation duration
///
/// Labels:
/// - `result`: success, error
pub static RECONCILE_DURATION: Lazy<Histogram<f64>> = Lazy::new(|| {
    METER
        .f64_histogram("stats_reconcile_duration_seconds")
        .with_description("Duration of Stats reconciliation in seconds")
        .with_unit("s")
        .build()
});

/// Counter of reconciliation errors
///
/// Labels:
/// - `error_type`: list, status_update, kube, cancelled, other
pub static RECONCILE_ERRORS: Lazy<Counter<u64>> = Lazy::new(|| {
    METER
        .u64_counter("stats_reconcile_errors_total")
        .with_description("Total number of Stats reconciliation errors")
        .with_unit("{errors}")
        .build()
});

/// Gauge of running pods seen by the last successful reconciliation
///
/// Labels:
/// - `stats`: namespace/name of the Stats object
pub static RUNNING_PODS: Lazy<Gauge<i64>> = Lazy::new(|| {
    METER
        .i64_gauge("stats_running_pods")
        .with_description("Pods in phase Running at the last reconciliation")
        .with_unit("{pods}")
        .build()
});

/// Gauge of workloads by kind seen by the last successful reconciliation
///
/// Labels:
/// - `stats`: namespace/name of the Stats object
/// - `kind`: Deployment, DaemonSet, StatefulSet, ReplicaSet
pub static WORKLOADS: Lazy<Gauge<i64>> = Lazy::new(|| {
    METER
        .i64_gauge("stats_workloads")
        .with_description("Workload controllers by kind at the last reconciliation")
        .with_unit("{workloads}")
        .build()
});

/// Record the outcome and duration of one reconciliation
pub fn record_reconcile(seconds: f64, result: &'static str) {
    RECONCILE_DURATION.record(seconds, &[KeyValue::new("result", result)]);
}

/// Count a failed reconciliation
pub fn record_error(error_type: &'static str) {
    RECONCILE_ERRORS.add(1, &[KeyValue::new("error_type", error_type)]);
}

/// Publish the observed counts from a freshly written status
pub fn record_status(stats: &str, status: &StatsStatus) {
    RUNNING_PODS.record(
        status.running_pod_count,
        &[KeyValue::new("stats", stats.to_string())],
    );
    for kind in WorkloadKind::ALL {
        WORKLOADS.record(
            status.count_for(kind),
            &[
                KeyValue::new("stats", stats.to_string()),
                KeyValue::new("kind", kind.to_string()),
            ],
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Without a meter provider the instruments are no-ops; recording must
    // still be safe from any context.
    #[test]
    fn recording_without_provider_is_harmless() {
        record_reconcile(0.25, "success");
        record_error("list");
        record_status(
            "default/cluster-stats",
            &StatsStatus::from_observation(3, vec!["web".to_string()], vec![], vec![], vec![]),
        );
    }
}
