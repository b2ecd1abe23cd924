//! Observability infrastructure for the watcher
//!
//! Provides:
//! - Prometheus metrics (cycle latency, detections, restarts, failures)
//! - Structured JSON logging with tracing

use crate::detection::FailureMatch;
use crate::error::WatchError;
use crate::models::RemediationTarget;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{error, info, warn};

/// Histogram buckets for cycle latency (in seconds)
///
/// A cycle that remediates includes the stagger delay, hence the long tail.
const CYCLE_LATENCY_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<WatcherMetricsInner> = OnceLock::new();

struct WatcherMetricsInner {
    cycle_latency_seconds: Histogram,
    cycles: IntCounter,
    failures_detected: IntCounter,
    controllers_restarted: IntCounter,
    errors: IntCounterVec,
    instances_observed: IntGauge,
    instances_owned: IntGauge,
}

impl WatcherMetricsInner {
    fn new() -> Self {
        Self {
            cycle_latency_seconds: register_histogram!(
                "oom_watcher_cycle_latency_seconds",
                "Time spent in one observe/detect/remediate cycle",
                CYCLE_LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register cycle_latency_seconds"),

            cycles: register_int_counter!(
                "oom_watcher_cycles_total",
                "Total number of watch cycles run"
            )
            .expect("Failed to register cycles_total"),

            failures_detected: register_int_counter!(
                "oom_watcher_failures_detected_total",
                "Cycles in which an OOM termination was detected"
            )
            .expect("Failed to register failures_detected_total"),

            controllers_restarted: register_int_counter!(
                "oom_watcher_controllers_restarted_total",
                "Controllers successfully annotated for a rolling restart"
            )
            .expect("Failed to register controllers_restarted_total"),

            errors: register_int_counter_vec!(
                "oom_watcher_errors_total",
                "Recovered errors by kind (observation, fetch, apply)",
                &["kind"]
            )
            .expect("Failed to register errors_total"),

            instances_observed: register_int_gauge!(
                "oom_watcher_instances_observed",
                "Instances listed in the watched namespace during the last cycle"
            )
            .expect("Failed to register instances_observed"),

            instances_owned: register_int_gauge!(
                "oom_watcher_instances_owned",
                "Instances owned by a target controller during the last cycle"
            )
            .expect("Failed to register instances_owned"),
        }
    }
}

/// Watcher metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct WatcherMetrics {
    _private: (),
}

impl Default for WatcherMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl WatcherMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(WatcherMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &WatcherMetricsInner {
        GLOBAL_METRICS.get_or_init(WatcherMetricsInner::new)
    }

    pub fn observe_cycle_latency(&self, duration_secs: f64) {
        self.inner().cycle_latency_seconds.observe(duration_secs);
    }

    pub fn inc_cycles(&self) {
        self.inner().cycles.inc();
    }

    pub fn inc_failures_detected(&self) {
        self.inner().failures_detected.inc();
    }

    pub fn inc_controllers_restarted(&self) {
        self.inner().controllers_restarted.inc();
    }

    /// Increment the error counter for a recovered error
    pub fn inc_error(&self, err: &WatchError) {
        self.inner().errors.with_label_values(&[err.kind()]).inc();
    }

    pub fn set_instances(&self, observed: usize, owned: usize) {
        self.inner().instances_observed.set(observed as i64);
        self.inner().instances_owned.set(owned as i64);
    }
}

/// Structured logger for watcher events
///
/// Events marked verbose are only emitted when the watcher runs with the
/// verbosity flag set; everything else is always logged.
#[derive(Debug, Clone)]
pub struct StructuredLogger {
    namespace: String,
    verbose: bool,
}

impl StructuredLogger {
    pub fn new(namespace: impl Into<String>, verbose: bool) -> Self {
        Self {
            namespace: namespace.into(),
            verbose,
        }
    }

    /// Log watcher startup
    pub fn log_startup(&self, version: &str, targets: &[String]) {
        info!(
            event = "watcher_started",
            namespace = %self.namespace,
            version = %version,
            targets = ?targets,
            "Start watching StatefulSets"
        );
    }

    /// Log the start of a cycle (verbose)
    pub fn log_cycle_start(&self) {
        if self.verbose {
            info!(
                event = "cycle_started",
                namespace = %self.namespace,
                "Checking pods in namespace"
            );
        }
    }

    /// Log a failed instance listing
    pub fn log_observation_failed(&self, err: &WatchError) {
        error!(
            event = "observation_failed",
            namespace = %self.namespace,
            error = %err,
            "Failed to list pods, skipping cycle"
        );
    }

    /// Log a cycle with no failure signature (verbose)
    pub fn log_no_failure(&self, observed: usize, owned: usize) {
        if self.verbose {
            info!(
                event = "no_failure",
                namespace = %self.namespace,
                pods_observed = observed,
                pods_owned = owned,
                "No restart needed"
            );
        }
    }

    /// Log a detected failure signature
    pub fn log_failure_detected(&self, found: &FailureMatch, observed: usize, owned: usize) {
        warn!(
            event = "failure_detected",
            namespace = %self.namespace,
            pod_name = %found.instance,
            container = %found.container,
            exit_code = found.exit_code,
            reason = %found.reason,
            signature = %found.signature,
            pods_observed = observed,
            pods_owned = owned,
            "OOM termination detected, restarting targets"
        );
    }

    /// Log a successfully annotated controller
    pub fn log_restarted(&self, target: &RemediationTarget, trigger: &str) {
        info!(
            event = "controller_restarted",
            namespace = %target.namespace,
            statefulset = %target.name,
            trigger = %trigger,
            "Restarted StatefulSet"
        );
    }

    /// Log a per-target remediation failure
    pub fn log_remediation_failed(&self, err: &WatchError) {
        error!(
            event = "remediation_failed",
            namespace = %self.namespace,
            kind = err.kind(),
            error = %err,
            "Failed to restart StatefulSet"
        );
    }

    /// Log the stagger pause after the first target (verbose)
    pub fn log_stagger_wait(&self, delay: Duration) {
        if self.verbose {
            info!(
                event = "stagger_wait",
                namespace = %self.namespace,
                delay_secs = delay.as_secs(),
                "Waiting before restarting next StatefulSet"
            );
        }
    }

    /// Log the inter-cycle sleep (verbose)
    pub fn log_cycle_sleep(&self, interval: Duration) {
        if self.verbose {
            info!(
                event = "cycle_sleep",
                namespace = %self.namespace,
                interval_secs = interval.as_secs(),
                "Sleeping until next check"
            );
        }
    }

    /// Log watcher shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "watcher_shutdown",
            namespace = %self.namespace,
            reason = %reason,
            "OOM watcher shutting down"
        );
    }
}
