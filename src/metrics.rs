// src/metrics.rs

#[cfg(feature = "observability")]
pub use metrics::{
    counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram,
    increment_counter, Unit,
};

// NOTE: When observability feature is disabled, provide stub implementations
#[cfg(not(feature = "observability"))]
pub enum Unit {}

// Stubs evaluate their arguments so callers compile the same way in both builds.
#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! counter {
    ($name:expr, $value:expr $(, $label:expr => $label_value:expr)* $(,)?) => {{
        let _ = ($name, $value);
        $( let _ = (&$label, &$label_value); )*
    }};
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! gauge {
    ($name:expr, $value:expr $(, $label:expr => $label_value:expr)* $(,)?) => {{
        let _ = ($name, $value);
        $( let _ = (&$label, &$label_value); )*
    }};
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! histogram {
    ($name:expr, $value:expr $(, $label:expr => $label_value:expr)* $(,)?) => {{
        let _ = ($name, $value);
        $( let _ = (&$label, &$label_value); )*
    }};
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! increment_counter {
    ($name:expr $(, $label:expr => $label_value:expr)* $(,)?) => {{
        let _ = $name;
        $( let _ = (&$label, &$label_value); )*
    }};
}

// Macros for describe_* functions when observability is disabled
#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! describe_counter {
    ($name:expr, $unit:expr, $desc:expr) => {};
    ($name:expr, $desc:expr) => {};
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! describe_gauge {
    ($name:expr, $desc:expr) => {};
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! describe_histogram {
    ($name:expr, $unit:expr, $desc:expr) => {};
    ($name:expr, $desc:expr) => {};
}

use std::time::Duration;

/// Initializes the descriptions for all the metrics in the application.
/// This should be called once at startup.
pub fn describe_metrics() {
    describe_gauge!(
        "claims_working_proxies",
        "Number of proxies that passed the liveness probe."
    );
    describe_counter!(
        "claims_proxy_probes_total",
        Unit::Count,
        "Total number of proxy liveness probes, labeled by result (ok, failed)."
    );

    describe_counter!(
        "claims_fetch_attempts_total",
        Unit::Count,
        "Total number of HTTP attempts against claim APIs, labeled by api."
    );
    describe_counter!(
        "claims_fetch_retries_total",
        Unit::Count,
        "Total number of failed attempts that were retried, labeled by api and reason."
    );
    describe_counter!(
        "claims_fetch_results_total",
        Unit::Count,
        "Total number of finished fetches, labeled by api and outcome (payload, empty, failed)."
    );
    describe_counter!(
        "claims_fetch_exhausted_total",
        Unit::Count,
        "Total number of fetches that used up every attempt, labeled by api."
    );
    describe_histogram!(
        "claims_fetch_latency_seconds",
        Unit::Seconds,
        "Latency of a single HTTP attempt in seconds, labeled by api."
    );

    describe_histogram!(
        "claims_batch_duration_seconds",
        Unit::Seconds,
        "Wall-clock duration of one per-API batch, labeled by api."
    );
    describe_gauge!(
        "claims_report_wallets",
        "Number of addresses in the last combined report."
    );
    describe_gauge!(
        "claims_report_total",
        "Sum of all amounts in the last combined report."
    );
    describe_counter!(
        "claims_aggregation_errors_total",
        Unit::Count,
        "Total number of addresses dropped because an amount could not be represented."
    );
}

// --- Helper functions to update metrics ---

pub fn set_working_proxies(count: usize) {
    gauge!("claims_working_proxies", count as f64);
}

pub fn increment_proxy_probe(ok: bool) {
    let result = if ok { "ok" } else { "failed" };
    increment_counter!("claims_proxy_probes_total", "result" => result);
}

pub fn increment_fetch_attempt(api: &'static str) {
    increment_counter!("claims_fetch_attempts_total", "api" => api);
}

pub fn increment_fetch_retry(api: &'static str, reason: &'static str) {
    increment_counter!("claims_fetch_retries_total", "api" => api, "reason" => reason);
}

pub fn increment_fetch_result(api: &'static str, outcome: &'static str) {
    increment_counter!("claims_fetch_results_total", "api" => api, "outcome" => outcome);
}

pub fn increment_fetch_exhausted(api: &'static str) {
    increment_counter!("claims_fetch_exhausted_total", "api" => api);
}

pub fn record_fetch_latency(api: &'static str, duration: Duration) {
    histogram!("claims_fetch_latency_seconds", duration.as_secs_f64(), "api" => api);
}

pub fn record_batch_duration(api: &'static str, duration: Duration) {
    histogram!("claims_batch_duration_seconds", duration.as_secs_f64(), "api" => api);
}

pub fn increment_aggregation_errors() {
    increment_counter!("claims_aggregation_errors_total");
}

pub fn record_report_totals(wallets: usize, total: f64) {
    gauge!("claims_report_wallets", wallets as f64);
    gauge!("claims_report_total", total);
}

/// Serves the Prometheus scrape endpoint on `listen` and describes every metric.
#[cfg(feature = "observability")]
pub fn install_prometheus(listen: &str) -> anyhow::Result<()> {
    use anyhow::Context;
    use metrics_exporter_prometheus::PrometheusBuilder;

    let addr: std::net::SocketAddr = listen
        .parse()
        .with_context(|| format!("invalid prometheus listen address: {}", listen))?;
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("failed to install prometheus exporter")?;
    describe_metrics();
    Ok(())
}
