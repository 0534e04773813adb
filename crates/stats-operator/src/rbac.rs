//! RBAC manifest for the controller's service account
//!
//! Printed by `--rbac` so the role always matches what the binary does.

use k8s_openapi::api::rbac::v1::{ClusterRole, PolicyRule};
use kube::api::ObjectMeta;

use stats_common::{FIELD_MANAGER, STATS_GROUP};

fn rule(api_group: &str, resources: &[&str], verbs: &[&str]) -> PolicyRule {
    PolicyRule {
        api_groups: Some(vec![api_group.to_string()]),
        resources: Some(resources.iter().map(|r| r.to_string()).collect()),
        verbs: verbs.iter().map(|v| v.to_string()).collect(),
        ..Default::default()
    }
}

/// API group of CustomResourceDefinitions
const CRD_GROUP: &str = "apiextensions.k8s.io";

/// ClusterRole granting exactly what the controller touches
///
/// Pods and workload controllers are only enumerated. Stats objects only have
/// their status written. The CRD rule covers the startup install, which is on
/// unless `--install-crds=false`.
pub fn cluster_role() -> ClusterRole {
    ClusterRole {
        metadata: ObjectMeta {
            name: Some(FIELD_MANAGER.to_string()),
            ..Default::default()
        },
        rules: Some(vec![
            rule("", &["pods"], &["list", "watch"]),
            rule(
                "apps",
                &["deployments", "daemonsets", "statefulsets", "replicasets"],
                &["list", "watch"],
            ),
            rule(STATS_GROUP, &["stats"], &["get", "list", "watch"]),
            rule(STATS_GROUP, &["stats/status"], &["get", "update", "patch"]),
            rule(
                CRD_GROUP,
                &["customresourcedefinitions"],
                &["get", "create", "patch"],
            ),
        ]),
        ..Default::default()
    }
}
