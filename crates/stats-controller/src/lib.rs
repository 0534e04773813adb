//! Stats controller
//!
//! Watches Stats CRDs and keeps their status in sync with the cluster:
//! - Counts pods in phase Running
//! - Records names and counts of Deployments, DaemonSets, StatefulSets and
//!   ReplicaSets
//! - Requeues failed passes with per-object exponential backoff

#![deny(missing_docs)]

pub mod aggregate;
pub mod backoff;
pub mod client;
mod controller;

pub use backoff::BackoffTracker;
pub use client::{KubeStatsClient, StatsClient};
pub use controller::{
    error_policy, forget_deleted, reconcile, reconcile_stats, stats_key, Context, Outcome,
};

// Re-export common error types
pub use stats_common::{Error, Result};
