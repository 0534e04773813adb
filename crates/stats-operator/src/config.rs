//! Operator configuration
//!
//! Every flag can also be set from the environment.

use std::time::Duration;

use clap::{ArgAction, Args};

use stats_common::telemetry::{LogFormat, TelemetryConfig};

/// Default period between forced reconciliations of every Stats object
pub const DEFAULT_RESYNC_INTERVAL_SECS: u64 = 60;

/// Watcher timeout (seconds) - must be less than client read_timeout (30s)
/// This forces the API server to close the watch before the client times out,
/// preventing "body read timed out" errors on idle watches.
pub const DEFAULT_WATCH_TIMEOUT_SECS: u32 = 25;

/// Runtime configuration of the operator
#[derive(Args, Clone, Debug, PartialEq)]
pub struct OperatorConfig {
    /// Seconds between forced reconciliations of every Stats object
    #[arg(
        long,
        env = "STATS_RESYNC_INTERVAL_SECS",
        default_value_t = DEFAULT_RESYNC_INTERVAL_SECS
    )]
    pub resync_interval_secs: u64,

    /// Server-side timeout for watch requests, in seconds
    #[arg(
        long,
        env = "STATS_WATCH_TIMEOUT_SECS",
        default_value_t = DEFAULT_WATCH_TIMEOUT_SECS
    )]
    pub watch_timeout_secs: u32,

    /// Install or update the Stats CRD on startup
    #[arg(
        long,
        env = "STATS_INSTALL_CRDS",
        default_value_t = true,
        action = ArgAction::Set
    )]
    pub install_crds: bool,

    /// Log line format: json or text
    #[arg(long, env = "STATS_LOG_FORMAT", default_value_t = LogFormat::Json)]
    pub log_format: LogFormat,

    /// OTLP collector endpoint for traces and metrics
    #[arg(long, env = "OTEL_EXPORTER_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,
}

impl OperatorConfig {
    /// Reject settings the controller cannot run with
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.resync_interval_secs > 0,
            "--resync-interval-secs must be greater than zero"
        );
        anyhow::ensure!(
            self.watch_timeout_secs > 0,
            "--watch-timeout-secs must be greater than zero"
        );
        Ok(())
    }

    /// Period of the forced resync
    pub fn resync_interval(&self) -> Duration {
        Duration::from_secs(self.resync_interval_secs)
    }

    /// Telemetry settings derived from this configuration
    pub fn telemetry(&self) -> TelemetryConfig {
        TelemetryConfig {
            service_name: stats_common::FIELD_MANAGER.to_string(),
            otlp_endpoint: self.otlp_endpoint.clone(),
            log_format: self.log_format,
        }
    }
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            resync_interval_secs: DEFAULT_RESYNC_INTERVAL_SECS,
            watch_timeout_secs: DEFAULT_WATCH_TIMEOUT_SECS,
            install_crds: true,
            log_format: LogFormat::Json,
            otlp_endpoint: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        config: OperatorConfig,
    }

    fn parse(args: &[&str]) -> OperatorConfig {
        let argv = std::iter::once("stats-operator").chain(args.iter().copied());
        TestCli::try_parse_from(argv).unwrap().config
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = OperatorConfig::default();
        assert_eq!(config.resync_interval(), Duration::from_secs(60));
        assert_eq!(config.watch_timeout_secs, 25);
        assert!(config.install_crds);
        assert_eq!(config.log_format, LogFormat::Json);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn flags_override_defaults() {
        let config = parse(&[
            "--resync-interval-secs",
            "15",
            "--watch-timeout-secs",
            "10",
            "--install-crds",
            "false",
            "--log-format",
            "text",
            "--otlp-endpoint",
            "http://otel-collector:4317",
        ]);

        assert_eq!(config.resync_interval_secs, 15);
        assert_eq!(config.watch_timeout_secs, 10);
        assert!(!config.install_crds);
        assert_eq!(config.log_format, LogFormat::Text);
        assert_eq!(
            config.telemetry().otlp_endpoint.as_deref(),
            Some("http://otel-collector:4317")
        );
    }

    #[test]
    fn unknown_log_format_is_rejected() {
        let argv = ["stats-operator", "--log-format", "xml"];
        assert!(TestCli::try_parse_from(argv).is_err());
    }

    #[test]
    fn zero_intervals_fail_validation() {
        let config = OperatorConfig {
            resync_interval_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = OperatorConfig {
            watch_timeout_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
