//! Pure aggregation over listed resources

use k8s_openapi::api::core::v1::Pod;
use kube::{Resource, ResourceExt};

use stats_common::crd::StatsStatus;

/// Pod phase counted as running
pub const POD_PHASE_RUNNING: &str = "Running";

/// Number of pods whose phase is `Running`.
///
/// Pods without a status or phase are not counted.
pub fn count_running(pods: &[Pod]) -> i64 {
    let running = pods
        .iter()
        .filter(|pod| {
            pod.status
                .as_ref()
                .and_then(|s| s.phase.as_deref())
                .is_some_and(|phase| phase == POD_PHASE_RUNNING)
        })
        .count();
    i64::try_from(running).unwrap_or(i64::MAX)
}

/// Names of the given objects, in the order the store returned them
pub fn names_of<K: Resource>(items: &[K]) -> Vec<String> {
    items.iter().map(|item| item.name_any()).collect()
}

/// Raw results of one pass over the cluster
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Observation {
    /// Pods in phase Running
    pub running_pods: i64,
    /// Deployment names
    pub deployments: Vec<String>,
    /// DaemonSet names
    pub daemon_sets: Vec<String>,
    /// StatefulSet names
    pub stateful_sets: Vec<String>,
    /// ReplicaSet names
    pub replica_sets: Vec<String>,
}

impl Observation {
    /// Convert into the status record written back to the Stats object
    pub fn into_status(self) -> StatsStatus {
        StatsStatus::from_observation(
            self.running_pods,
            self.deployments,
            self.daemon_sets,
            self.stateful_sets,
            self.replica_sets,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::apps::v1::Deployment;
    use k8s_openapi::api::core::v1::PodStatus;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    fn pod(name: &str, phase: Option<&str>) -> Pod {
        Pod {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..Default::default()
            },
            status: phase.map(|p| PodStatus {
                phase: Some(p.to_string()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn deployment(name: &str) -> Deployment {
        Deployment {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some("default".to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn only_running_phase_is_counted() {
        let pods = vec![
            pod("a", Some("Running")),
            pod("b", Some("Running")),
            pod("c", Some("Pending")),
            pod("d", Some("Succeeded")),
            pod("e", Some("Failed")),
            pod("f", Some("Unknown")),
        ];
        assert_eq!(count_running(&pods), 2);
    }

    #[test]
    fn pods_without_status_are_not_running() {
        let pods = vec![pod("a", None), pod("b", Some("Running"))];
        assert_eq!(count_running(&pods), 1);
    }

    #[test]
    fn phase_match_is_exact() {
        let pods = vec![pod("a", Some("running")), pod("b", Some("Running "))];
        assert_eq!(count_running(&pods), 0);
    }

    #[test]
    fn no_pods_counts_zero() {
        assert_eq!(count_running(&[]), 0);
    }

    #[test]
    fn names_keep_store_order() {
        let items = vec![deployment("web"), deployment("api"), deployment("worker")];
        assert_eq!(names_of(&items), ["web", "api", "worker"]);
    }

    #[test]
    fn observation_into_status_is_consistent() {
        let status = Observation {
            running_pods: 4,
            deployments: vec!["web".into(), "api".into()],
            replica_sets: vec!["web-1".into()],
            ..Default::default()
        }
        .into_status();

        assert_eq!(status.running_pod_count, 4);
        assert_eq!(status.deployment_count, 2);
        assert_eq!(status.replica_set_count, 1);
        assert_eq!(status.daemon_set_count, 0);
        assert!(status.is_consistent());
    }
}
