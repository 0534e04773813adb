//! API client capability used by the Stats reconciler
//!
//! The reconciler only ever talks to the cluster through [`StatsClient`], so
//! tests can substitute a mock or an in-memory store for the real API server.

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, ReplicaSet, StatefulSet};
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, ListParams, PostParams};
use kube::{Client, Resource, ResourceExt};
use serde::de::DeserializeOwned;

#[cfg(test)]
use mockall::automock;

use stats_common::crd::Stats;
use stats_common::{Error, Result, FIELD_MANAGER};

/// Trait abstracting Kubernetes client operations for Stats
///
/// This trait allows mocking the Kubernetes client in tests while using
/// the real client in production.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait StatsClient: Send + Sync {
    /// Get a Stats object by namespace and name
    ///
    /// Returns `None` when the object does not exist.
    async fn get_stats(&self, namespace: &str, name: &str) -> Result<Option<Stats>>;

    /// List every Pod in the cluster
    async fn list_pods(&self) -> Result<Vec<Pod>>;

    /// List every Deployment in the cluster
    async fn list_deployments(&self) -> Result<Vec<Deployment>>;

    /// List every DaemonSet in the cluster
    async fn list_daemon_sets(&self) -> Result<Vec<DaemonSet>>;

    /// List every StatefulSet in the cluster
    async fn list_stateful_sets(&self) -> Result<Vec<StatefulSet>>;

    /// List every ReplicaSet in the cluster
    async fn list_replica_sets(&self) -> Result<Vec<ReplicaSet>>;

    /// Replace the status sub-resource of a Stats object
    ///
    /// The object's `resourceVersion` is sent along, so the write is rejected
    /// with 409 Conflict if another writer got there first.
    async fn replace_status(&self, stats: &Stats) -> Result<Stats>;
}

/// Real Kubernetes client implementation
pub struct KubeStatsClient {
    client: Client,
}

impl KubeStatsClient {
    /// Create a new KubeStatsClient wrapping the given kube Client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// One unpaginated cluster-wide list call
    async fn list_all<K>(&self, kind: &str) -> Result<Vec<K>>
    where
        K: Resource<DynamicType = ()> + Clone + DeserializeOwned + std::fmt::Debug,
    {
        let api: Api<K> = Api::all(self.client.clone());
        let list = api
            .list(&ListParams::default())
            .await
            .map_err(|e| Error::list(kind, e))?;
        Ok(list.items)
    }
}

#[async_trait]
impl StatsClient for KubeStatsClient {
    async fn get_stats(&self, namespace: &str, name: &str) -> Result<Option<Stats>> {
        let api: Api<Stats> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }

    async fn list_pods(&self) -> Result<Vec<Pod>> {
        self.list_all("Pod").await
    }

    async fn list_deployments(&self) -> Result<Vec<Deployment>> {
        self.list_all("Deployment").await
    }

    async fn list_daemon_sets(&self) -> Result<Vec<DaemonSet>> {
        self.list_all("DaemonSet").await
    }

    async fn list_stateful_sets(&self) -> Result<Vec<StatefulSet>> {
        self.list_all("StatefulSet").await
    }

    async fn list_replica_sets(&self) -> Result<Vec<ReplicaSet>> {
        self.list_all("ReplicaSet").await
    }

    async fn replace_status(&self, stats: &Stats) -> Result<Stats> {
        let name = stats.name_any();
        let namespace = stats.namespace().ok_or_else(|| {
            Error::internal_with_context("status", format!("Stats {name} has no namespace"))
        })?;
        let api: Api<Stats> = Api::namespaced(self.client.clone(), &namespace);

        let params = PostParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..Default::default()
        };
        let body = serde_json::to_vec(stats)?;
        api.replace_status(&name, &params, body)
            .await
            .map_err(|e| Error::status_update(format!("{namespace}/{name}"), e))
    }
}
