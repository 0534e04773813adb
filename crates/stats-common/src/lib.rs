//! Common types for the Stats controller: CRDs, errors, and telemetry

#![deny(missing_docs)]

pub mod crd;
pub mod error;
pub mod metrics;
pub mod telemetry;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// API group of the Stats custom resource
pub const STATS_GROUP: &str = "monitoring.io";

/// Field manager used for server-side apply and status writes
pub const FIELD_MANAGER: &str = "stats-controller";

/// Initial requeue delay (seconds) after a failed reconciliation
pub const RETRY_BASE_DELAY_SECS: u64 = 5;

/// Upper bound (seconds) on the requeue delay after repeated failures
pub const RETRY_MAX_DELAY_SECS: u64 = 300;
