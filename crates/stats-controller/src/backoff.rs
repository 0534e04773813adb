//! Per-object exponential backoff for failed reconciliations
//!
//! kube-runtime serializes reconciliations per object but leaves the requeue
//! delay to the error policy. The tracker remembers consecutive failures per
//! `namespace/name` so the delay grows from [`RETRY_BASE_DELAY_SECS`] up to
//! [`RETRY_MAX_DELAY_SECS`] and resets on the first success.

use std::time::Duration;

use dashmap::DashMap;

use stats_common::{RETRY_BASE_DELAY_SECS, RETRY_MAX_DELAY_SECS};

/// Consecutive failure counts keyed by object identity
#[derive(Debug, Default)]
pub struct BackoffTracker {
    failures: DashMap<String, u32>,
}

impl BackoffTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure and return the delay before the next attempt
    pub fn next_delay(&self, key: &str) -> Duration {
        let mut entry = self.failures.entry(key.to_string()).or_insert(0);
        let failures = *entry;
        *entry = failures.saturating_add(1);
        delay_for(failures)
    }

    /// Forget all failures for the given object
    pub fn reset(&self, key: &str) {
        self.failures.remove(key);
    }

    /// Drop every entry whose key fails `keep`, returning how many were dropped
    ///
    /// Objects deleted while failing are never reconciled again, so their
    /// entries are only cleared this way.
    pub fn retain(&self, keep: impl Fn(&str) -> bool) -> usize {
        let before = self.failures.len();
        self.failures.retain(|key, _| keep(key));
        before.saturating_sub(self.failures.len())
    }

    /// Consecutive failures recorded for the given object
    pub fn failures(&self, key: &str) -> u32 {
        self.failures.get(key).map(|f| *f).unwrap_or(0)
    }
}

/// Delay after `failures` previous consecutive failures
pub fn delay_for(failures: u32) -> Duration {
    let secs = std::cmp::min(
        RETRY_BASE_DELAY_SECS.saturating_mul(2u64.saturating_pow(failures)),
        RETRY_MAX_DELAY_SECS,
    );
    Duration::from_secs(secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps_at_max_delay() {
        assert_eq!(delay_for(0), Duration::from_secs(5));
        assert_eq!(delay_for(1), Duration::from_secs(10));
        assert_eq!(delay_for(2), Duration::from_secs(20));
        assert_eq!(delay_for(5), Duration::from_secs(160));
        // 5 * 2^6 = 320 → capped at 300
        assert_eq!(delay_for(6), Duration::from_secs(300));
        // Large failure counts are safe (saturating arithmetic)
        assert_eq!(delay_for(100), Duration::from_secs(300));
    }

    #[test]
    fn tracker_grows_per_object() {
        let tracker = BackoffTracker::new();

        assert_eq!(tracker.next_delay("default/a"), Duration::from_secs(5));
        assert_eq!(tracker.next_delay("default/a"), Duration::from_secs(10));
        assert_eq!(tracker.next_delay("default/b"), Duration::from_secs(5));
        assert_eq!(tracker.failures("default/a"), 2);
        assert_eq!(tracker.failures("default/b"), 1);
    }

    #[test]
    fn reset_starts_over() {
        let tracker = BackoffTracker::new();
        tracker.next_delay("default/a");
        tracker.next_delay("default/a");

        tracker.reset("default/a");

        assert_eq!(tracker.failures("default/a"), 0);
        assert_eq!(tracker.next_delay("default/a"), Duration::from_secs(5));
    }

    #[test]
    fn retain_drops_unknown_keys() {
        let tracker = BackoffTracker::new();
        tracker.next_delay("default/live");
        tracker.next_delay("default/deleted");
        tracker.next_delay("other/deleted");

        let dropped = tracker.retain(|key| key == "default/live");

        assert_eq!(dropped, 2);
        assert_eq!(tracker.failures("default/live"), 1);
        assert_eq!(tracker.failures("default/deleted"), 0);
        assert_eq!(tracker.failures("other/deleted"), 0);
    }
}
