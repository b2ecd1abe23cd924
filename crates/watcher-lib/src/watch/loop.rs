//! Watch loop driver
//!
//! OBSERVING -> FILTERING -> DECIDING -> (REMEDIATING) -> SLEEPING, forever.

use super::WatchConfig;
use crate::cluster::ClusterClient;
use crate::detection::{FailureDetector, OwnershipFilter};
use crate::error::WatchError;
use crate::health::{components, HealthRegistry};
use crate::observability::{StructuredLogger, WatcherMetrics};
use crate::remediation::{RemediationOrchestrator, RemediationReport};
use std::sync::Arc;
use tokio::time::{sleep, Instant};
use tracing::debug;

/// What happened in one cycle
#[derive(Debug)]
pub enum CycleOutcome {
    /// Instance listing failed; nothing else ran this cycle
    ObservationFailed(WatchError),
    /// No owned instance carried a failure signature
    Healthy { observed: usize, owned: usize },
    /// A failure was detected and the targets were remediated
    Remediated {
        observed: usize,
        owned: usize,
        report: RemediationReport,
    },
}

/// Periodic observe/detect/remediate loop over one namespace
pub struct WatchLoop<C: ClusterClient> {
    client: Arc<C>,
    config: WatchConfig,
    filter: OwnershipFilter,
    detector: FailureDetector,
    orchestrator: RemediationOrchestrator<C>,
    logger: StructuredLogger,
    metrics: WatcherMetrics,
    health: HealthRegistry,
}

impl<C: ClusterClient> WatchLoop<C> {
    pub fn new(client: Arc<C>, config: WatchConfig, health: HealthRegistry) -> Self {
        let logger = StructuredLogger::new(&config.namespace, config.verbose);

        Self {
            filter: OwnershipFilter::statefulsets(config.targets.iter().cloned()),
            detector: FailureDetector::new(config.verbose),
            orchestrator: RemediationOrchestrator::new(client.clone(), logger.clone()),
            client,
            config,
            logger,
            metrics: WatcherMetrics::new(),
            health,
        }
    }

    /// Run cycles until the surrounding task is dropped
    ///
    /// Every cycle, failed or not, is followed by the poll interval sleep.
    pub async fn run(&self) {
        debug!(
            poll_interval_secs = self.config.poll_interval.as_secs(),
            stagger_delay_secs = self.config.stagger_delay.as_secs(),
            "Starting watch loop"
        );

        loop {
            self.run_cycle().await;

            self.logger.log_cycle_sleep(self.config.poll_interval);
            sleep(self.config.poll_interval).await;
        }
    }

    /// Run a single cycle, including any stagger delay inside remediation
    pub async fn run_cycle(&self) -> CycleOutcome {
        let start = Instant::now();
        self.logger.log_cycle_start();

        let outcome = self.observe_and_remediate().await;

        self.metrics.inc_cycles();
        self.metrics
            .observe_cycle_latency(start.elapsed().as_secs_f64());
        outcome
    }

    async fn observe_and_remediate(&self) -> CycleOutcome {
        let namespace = &self.config.namespace;

        let instances = match self.client.list_instances(namespace).await {
            Ok(instances) => instances,
            Err(source) => {
                let err = WatchError::Observation {
                    namespace: namespace.clone(),
                    source,
                };
                self.logger.log_observation_failed(&err);
                self.metrics.inc_error(&err);
                self.health
                    .record_failure(components::OBSERVER, err.to_string())
                    .await;
                return CycleOutcome::ObservationFailed(err);
            }
        };
        self.health.record_success(components::OBSERVER).await;

        let owned = self.filter.filter(&instances);
        let (observed, owned_count) = (instances.len(), owned.len());
        self.metrics.set_instances(observed, owned_count);

        let Some(found) = self.detector.find_failure(owned) else {
            self.logger.log_no_failure(observed, owned_count);
            return CycleOutcome::Healthy {
                observed,
                owned: owned_count,
            };
        };

        self.logger
            .log_failure_detected(&found, observed, owned_count);
        self.metrics.inc_failures_detected();

        let report = self
            .orchestrator
            .remediate(namespace, &self.config.targets, self.config.stagger_delay)
            .await;
        self.record_report(&report).await;

        CycleOutcome::Remediated {
            observed,
            owned: owned_count,
            report,
        }
    }

    async fn record_report(&self, report: &RemediationReport) {
        for _ in report.restarted() {
            self.metrics.inc_controllers_restarted();
        }
        for err in report.failures() {
            self.metrics.inc_error(err);
        }

        let failed = report.failure_count();
        if failed == 0 {
            self.health.record_success(components::REMEDIATOR).await;
        } else {
            self.health
                .record_failure(
                    components::REMEDIATOR,
                    format!("{} of {} targets failed", failed, report.outcomes.len()),
                )
                .await;
        }
    }
}
