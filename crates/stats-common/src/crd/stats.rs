//! Stats CRD types
//!
//! Defines `Stats`, a summary of cluster workload state. The spec is
//! user-owned and never read by the controller; the status is derived on every
//! reconciliation and replaced wholesale.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// =============================================================================
// Workload kinds
// =============================================================================

/// Higher-level workload controller kinds summarized in the status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WorkloadKind {
    /// apps/v1 Deployment
    Deployment,
    /// apps/v1 DaemonSet
    DaemonSet,
    /// apps/v1 StatefulSet
    StatefulSet,
    /// apps/v1 ReplicaSet
    ReplicaSet,
}

impl WorkloadKind {
    /// All kinds, in the order they are enumerated during reconciliation
    pub const ALL: [WorkloadKind; 4] = [
        WorkloadKind::Deployment,
        WorkloadKind::DaemonSet,
        WorkloadKind::StatefulSet,
        WorkloadKind::ReplicaSet,
    ];
}

impl std::fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Deployment => write!(f, "Deployment"),
            Self::DaemonSet => write!(f, "DaemonSet"),
            Self::StatefulSet => write!(f, "StatefulSet"),
            Self::ReplicaSet => write!(f, "ReplicaSet"),
        }
    }
}

// =============================================================================
// CRD
// =============================================================================

/// Cluster-wide workload summary
///
/// Example:
/// ```yaml
/// apiVersion: monitoring.io/v1
/// kind: Stats
/// metadata:
///   name: cluster-stats
///   namespace: default
/// spec:
///   description: workload overview for the platform team
/// ```
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "monitoring.io",
    version = "v1",
    kind = "Stats",
    plural = "stats",
    shortname = "st",
    namespaced,
    status = "StatsStatus",
    printcolumn = r#"{"name":"Running Pods","type":"integer","jsonPath":".status.runningPodCount"}"#,
    printcolumn = r#"{"name":"Deployments","type":"integer","jsonPath":".status.deploymentCount"}"#,
    printcolumn = r#"{"name":"DaemonSets","type":"integer","jsonPath":".status.daemonSetCount"}"#,
    printcolumn = r#"{"name":"StatefulSets","type":"integer","jsonPath":".status.statefulSetCount"}"#,
    printcolumn = r#"{"name":"ReplicaSets","type":"integer","jsonPath":".status.replicaSetCount"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct StatsSpec {
    /// Free-form description. Not interpreted by the controller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Observed workload counts and names
///
/// For every kind with a name list, the count equals the list length.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatsStatus {
    /// Pods in phase `Running` at enumeration time
    #[serde(default)]
    pub running_pod_count: i64,

    /// Number of Deployments
    #[serde(default)]
    pub deployment_count: i64,
    /// Deployment names, in store order
    #[serde(default)]
    pub deployment_names: Vec<String>,

    /// Number of DaemonSets
    #[serde(default)]
    pub daemon_set_count: i64,
    /// DaemonSet names, in store order
    #[serde(default)]
    pub daemon_set_names: Vec<String>,

    /// Number of StatefulSets
    #[serde(default)]
    pub stateful_set_count: i64,
    /// StatefulSet names, in store order
    #[serde(default)]
    pub stateful_set_names: Vec<String>,

    /// Number of ReplicaSets
    #[serde(default)]
    pub replica_set_count: i64,
    /// ReplicaSet names, in store order
    #[serde(default)]
    pub replica_set_names: Vec<String>,
}

impl StatsStatus {
    /// Build a status record from one observation of the cluster.
    ///
    /// Counts are taken from the name lists so they can never disagree.
    pub fn from_observation(
        running_pods: i64,
        deployments: Vec<String>,
        daemon_sets: Vec<String>,
        stateful_sets: Vec<String>,
        replica_sets: Vec<String>,
    ) -> Self {
        Self {
            running_pod_count: running_pods,
            deployment_count: len_i64(&deployments),
            deployment_names: deployments,
            daemon_set_count: len_i64(&daemon_sets),
            daemon_set_names: daemon_sets,
            stateful_set_count: len_i64(&stateful_sets),
            stateful_set_names: stateful_sets,
            replica_set_count: len_i64(&replica_sets),
            replica_set_names: replica_sets,
        }
    }

    /// Names recorded for the given workload kind
    pub fn names_for(&self, kind: WorkloadKind) -> &[String] {
        match kind {
            WorkloadKind::Deployment => &self.deployment_names,
            WorkloadKind::DaemonSet => &self.daemon_set_names,
            WorkloadKind::StatefulSet => &self.stateful_set_names,
            WorkloadKind::ReplicaSet => &self.replica_set_names,
        }
    }

    /// Count recorded for the given workload kind
    pub fn count_for(&self, kind: WorkloadKind) -> i64 {
        match kind {
            WorkloadKind::Deployment => self.deployment_count,
            WorkloadKind::DaemonSet => self.daemon_set_count,
            WorkloadKind::StatefulSet => self.stateful_set_count,
            WorkloadKind::ReplicaSet => self.replica_set_count,
        }
    }

    /// True when every count matches the length of its name list
    pub fn is_consistent(&self) -> bool {
        WorkloadKind::ALL
            .iter()
            .all(|&kind| self.count_for(kind) == len_i64(self.names_for(kind)))
    }
}

fn len_i64(names: &[String]) -> i64 {
    i64::try_from(names.len()).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::CustomResourceExt;

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn counts_follow_name_lists() {
        let status = StatsStatus::from_observation(
            7,
            names(&["web", "api"]),
            names(&["node-exporter"]),
            vec![],
            names(&["web-5d9c", "api-77f1", "api-6b2a"]),
        );

        assert_eq!(status.running_pod_count, 7);
        assert_eq!(status.deployment_count, 2);
        assert_eq!(status.daemon_set_count, 1);
        assert_eq!(status.stateful_set_count, 0);
        assert_eq!(status.replica_set_count, 3);
        assert!(status.is_consistent());
    }

    #[test]
    fn accessors_cover_every_kind() {
        let status = StatsStatus::from_observation(
            0,
            names(&["d"]),
            names(&["ds1", "ds2"]),
            names(&["ss1", "ss2", "ss3"]),
            vec![],
        );

        assert_eq!(status.names_for(WorkloadKind::Deployment), ["d"]);
        assert_eq!(status.count_for(WorkloadKind::DaemonSet), 2);
        assert_eq!(status.count_for(WorkloadKind::StatefulSet), 3);
        assert!(status.names_for(WorkloadKind::ReplicaSet).is_empty());
    }

    #[test]
    fn tampered_count_is_inconsistent() {
        let mut status = StatsStatus::from_observation(0, names(&["web"]), vec![], vec![], vec![]);
        status.deployment_count = 5;
        assert!(!status.is_consistent());
    }

    #[test]
    fn status_serializes_camel_case() {
        let status = StatsStatus::from_observation(2, names(&["web"]), vec![], vec![], vec![]);
        let json = serde_json::to_value(&status).unwrap();

        assert_eq!(json["runningPodCount"], 2);
        assert_eq!(json["deploymentCount"], 1);
        assert_eq!(json["deploymentNames"][0], "web");
        assert_eq!(json["daemonSetNames"], serde_json::json!([]));
    }

    #[test]
    fn empty_status_deserializes_with_defaults() {
        let status: StatsStatus = serde_json::from_str("{}").unwrap();
        assert_eq!(status, StatsStatus::default());
    }

    #[test]
    fn crd_has_status_subresource() {
        let crd = Stats::crd();
        assert_eq!(crd.spec.group, "monitoring.io");
        assert_eq!(crd.spec.names.kind, "Stats");
        assert_eq!(crd.spec.names.plural, "stats");
        assert_eq!(crd.spec.scope, "Namespaced");

        let version = &crd.spec.versions[0];
        assert_eq!(version.name, "v1");
        assert!(version
            .subresources
            .as_ref()
            .and_then(|s| s.status.as_ref())
            .is_some());

        let yaml = serde_yaml::to_string(&crd).unwrap();
        assert!(yaml.contains("runningPodCount"));
    }

    #[test]
    fn workload_kind_display() {
        let rendered: Vec<String> = WorkloadKind::ALL.iter().map(|k| k.to_string()).collect();
        assert_eq!(
            rendered,
            ["Deployment", "DaemonSet", "StatefulSet", "ReplicaSet"]
        );
    }
}
