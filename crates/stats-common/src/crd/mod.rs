//! Custom Resource Definitions for the Stats controller

mod stats;

pub use stats::{Stats, StatsSpec, StatsStatus, WorkloadKind};
