//! Run-wide metrics collection and end-of-run assertion evaluation.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::info;

use crate::config::AssertionsConfig;
use crate::error::{LoadgenError, Result};

/// Shared collector fed by all virtual user tasks
#[derive(Debug, Clone)]
pub struct MetricsCollector {
    /// Total HTTP requests issued
    requests_total: Arc<AtomicU64>,
    /// Requests whose check failed (bad status or transport error)
    requests_failed: Arc<AtomicU64>,
    /// Largest observed response time in milliseconds
    max_response_time_ms: Arc<AtomicU64>,
    /// Sum of response times, for the mean
    total_response_time_ms: Arc<AtomicU64>,
    /// Virtual users started
    users_started: Arc<AtomicU64>,
    /// Virtual users that finished their flow
    users_completed: Arc<AtomicU64>,
    /// Stamped again when injection begins, so the report measures the
    /// run itself rather than setup time
    start: Arc<Mutex<Instant>>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            requests_total: Arc::new(AtomicU64::new(0)),
            requests_failed: Arc::new(AtomicU64::new(0)),
            max_response_time_ms: Arc::new(AtomicU64::new(0)),
            total_response_time_ms: Arc::new(AtomicU64::new(0)),
            users_started: Arc::new(AtomicU64::new(0)),
            users_completed: Arc::new(AtomicU64::new(0)),
            start: Arc::new(Mutex::new(Instant::now())),
        }
    }

    /// Mark the beginning of the run; call right before injection starts
    pub fn mark_start(&self) {
        let mut start = self.start.lock().unwrap_or_else(|e| e.into_inner());
        *start = Instant::now();
    }

    pub fn user_started(&self) {
        self.users_started.fetch_add(1, Ordering::Relaxed);
        counter!("loadgen_users_started", 1);
    }

    pub fn user_completed(&self) {
        self.users_completed.fetch_add(1, Ordering::Relaxed);
        counter!("loadgen_users_completed", 1);
    }

    /// Record one request outcome. Failed checks count toward the
    /// success-rate assertion; latency is recorded either way.
    pub fn record_request(&self, step: &'static str, elapsed: Duration, passed: bool) {
        let ms = elapsed.as_millis() as u64;
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        self.total_response_time_ms.fetch_add(ms, Ordering::Relaxed);
        self.max_response_time_ms.fetch_max(ms, Ordering::Relaxed);
        if !passed {
            self.requests_failed.fetch_add(1, Ordering::Relaxed);
        }

        counter!("loadgen_requests_total", 1, "step" => step);
        if !passed {
            counter!("loadgen_requests_failed_total", 1, "step" => step);
        }
        histogram!("loadgen_response_time_ms", ms as f64, "step" => step);
    }

    /// Snapshot the aggregate state into an end-of-run report
    pub fn report(&self) -> RunReport {
        let total = self.requests_total.load(Ordering::Relaxed);
        let failed = self.requests_failed.load(Ordering::Relaxed);
        let sum_ms = self.total_response_time_ms.load(Ordering::Relaxed);

        RunReport {
            total_requests: total,
            failed_requests: failed,
            max_response_time_ms: self.max_response_time_ms.load(Ordering::Relaxed),
            mean_response_time_ms: if total > 0 {
                sum_ms as f64 / total as f64
            } else {
                0.0
            },
            users_started: self.users_started.load(Ordering::Relaxed),
            users_completed: self.users_completed.load(Ordering::Relaxed),
            duration: self
                .start
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .elapsed(),
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Aggregate outcome of a completed run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub total_requests: u64,
    pub failed_requests: u64,
    pub max_response_time_ms: u64,
    pub mean_response_time_ms: f64,
    pub users_started: u64,
    pub users_completed: u64,
    pub duration: Duration,
}

impl RunReport {
    /// Percentage of requests whose check passed. An empty run counts as
    /// fully successful so the threshold assertion is vacuously satisfied.
    pub fn success_rate_percent(&self) -> f64 {
        if self.total_requests == 0 {
            return 100.0;
        }
        let passed = self.total_requests - self.failed_requests;
        passed as f64 / self.total_requests as f64 * 100.0
    }

    pub fn log_summary(&self) {
        info!(
            total_requests = self.total_requests,
            failed_requests = self.failed_requests,
            success_rate_percent = format!("{:.2}", self.success_rate_percent()),
            max_response_time_ms = self.max_response_time_ms,
            mean_response_time_ms = format!("{:.2}", self.mean_response_time_ms),
            users_started = self.users_started,
            users_completed = self.users_completed,
            duration_seconds = format!("{:.2}", self.duration.as_secs_f64()),
            "Run complete"
        );
    }
}

/// Result of one global assertion
#[derive(Debug, Clone, PartialEq)]
pub struct AssertionOutcome {
    pub name: &'static str,
    pub passed: bool,
    pub detail: String,
}

/// Evaluate the two global assertions against a finished run
pub fn evaluate_assertions(config: &AssertionsConfig, report: &RunReport) -> Vec<AssertionOutcome> {
    let max_ok = report.max_response_time_ms <= config.max_response_time_ms;
    let rate = report.success_rate_percent();
    let rate_ok = rate >= config.min_success_rate_percent;

    vec![
        AssertionOutcome {
            name: "max response time",
            passed: max_ok,
            detail: format!(
                "max {} ms, threshold {} ms",
                report.max_response_time_ms, config.max_response_time_ms
            ),
        },
        AssertionOutcome {
            name: "success rate",
            passed: rate_ok,
            detail: format!(
                "{:.2}% successful, threshold {:.1}%",
                rate, config.min_success_rate_percent
            ),
        },
    ]
}

pub fn all_passed(outcomes: &[AssertionOutcome]) -> bool {
    outcomes.iter().all(|o| o.passed)
}

/// Register metric descriptions
pub fn initialize_metrics() {
    describe_counter!("loadgen_requests_total", "Total HTTP requests issued");
    describe_counter!(
        "loadgen_requests_failed_total",
        "Requests whose status check failed or that failed at transport level"
    );
    describe_counter!("loadgen_users_started", "Virtual users started");
    describe_counter!(
        "loadgen_users_completed",
        "Virtual users that completed their flow"
    );
    describe_histogram!(
        "loadgen_response_time_ms",
        "Per-request response time in milliseconds"
    );
}

/// Install the Prometheus exporter on the configured listener
pub fn install_prometheus_exporter(listen_addr: SocketAddr) -> Result<()> {
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(listen_addr)
        .install()
        .map_err(|e| LoadgenError::Other(format!("Failed to install Prometheus exporter: {}", e)))?;

    info!(metrics_addr = %listen_addr, "Prometheus exporter started");
    Ok(())
}
