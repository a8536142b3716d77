//! Prometheus metrics for a dashforge run.
//!
//! A run is short-lived, so nothing is scraped: the registry is written once
//! at the end of the command with [`Metrics::write_textfile`], in the format
//! read by the node-exporter textfile collector.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. A registration failure
//! means duplicate metric names, a programming error that should crash on
//! first use rather than silently drop metrics.

use crate::error::TelemetryResult;
use once_cell::sync::Lazy;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge, Encoder,
    HistogramVec, IntCounterVec, IntGauge, TextEncoder,
};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

/// HTTP calls against the dashboard API.
/// Labels: endpoint (folders/dashboard/health), status (HTTP code or "error")
pub static API_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "dashforge_api_requests_total",
        "Total requests sent to the dashboard API",
        &["endpoint", "status"]
    )
    .unwrap()
});

/// API request latency in seconds.
pub static API_REQUEST_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "dashforge_api_request_duration_seconds",
        "Dashboard API request latency in seconds",
        &["endpoint"],
        vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap()
});

/// Distinct recording rules collected during the build.
pub static RECORDED_RULES: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "dashforge_recorded_rules",
        "Distinct recording rules collected while building the dashboard"
    )
    .unwrap()
});

/// Registrations that reused an existing rule under a different name.
pub static ALIASED_RULES: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "dashforge_aliased_rule_registrations",
        "Rule registrations folded into an existing rule with another name"
    )
    .unwrap()
});

/// Panels in the built dashboard.
pub static DASHBOARD_PANELS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("dashforge_dashboard_panels", "Panels in the built dashboard").unwrap()
});

/// Command executions.
/// Labels: command, result (ok/error)
pub static COMMAND_RUNS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "dashforge_command_runs_total",
        "Total CLI command executions",
        &["command", "result"]
    )
    .unwrap()
});

/// Unix time of the last completed run.
pub static LAST_RUN_TIMESTAMP_SECONDS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "dashforge_last_run_timestamp_seconds",
        "Unix time the last command finished"
    )
    .unwrap()
});

/// Metric recording facade.
pub struct Metrics;

impl Metrics {
    /// Record one API request.
    pub fn api_request(endpoint: &str, status: &str, elapsed_secs: f64) {
        API_REQUESTS_TOTAL
            .with_label_values(&[endpoint, status])
            .inc();
        API_REQUEST_DURATION_SECONDS
            .with_label_values(&[endpoint])
            .observe(elapsed_secs);
    }

    /// Record the state of the recording map after the build.
    pub fn rules_recorded(distinct: usize, aliased: usize) {
        RECORDED_RULES.set(i64::try_from(distinct).unwrap_or(i64::MAX));
        ALIASED_RULES.set(i64::try_from(aliased).unwrap_or(i64::MAX));
    }

    pub fn dashboard_built(panels: usize) {
        DASHBOARD_PANELS.set(i64::try_from(panels).unwrap_or(i64::MAX));
    }

    /// Record a finished command.
    pub fn command_finished(command: &str, ok: bool) {
        let result = if ok { "ok" } else { "error" };
        COMMAND_RUNS_TOTAL
            .with_label_values(&[command, result])
            .inc();
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        LAST_RUN_TIMESTAMP_SECONDS.set(i64::try_from(now).unwrap_or(i64::MAX));
    }

    /// Encode the default registry in the Prometheus text format.
    pub fn render() -> TelemetryResult<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&prometheus::gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    /// Write the registry to `path`.
    ///
    /// Written to a sibling temp file first and renamed, so a collector never
    /// reads a partial file.
    pub fn write_textfile(path: &Path) -> TelemetryResult<()> {
        let body = Self::render()?;
        let tmp = path.with_extension("prom.tmp");
        std::fs::write(&tmp, body)?;
        std::fs::rename(&tmp, path)?;
        debug!(path = %path.display(), "Wrote metrics textfile");
        Ok(())
    }
}
