//! Staggered restart of target controllers

use crate::cluster::{ClusterClient, PodTemplateAnnotations};
use crate::error::WatchError;
use crate::models::{RemediationTarget, RESTART_ANNOTATION};
use crate::observability::StructuredLogger;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Result of remediating one target
#[derive(Debug)]
pub enum TargetOutcome {
    /// Annotation written and applied
    Restarted(RemediationTarget),
    /// Fetch or apply failed; the target is retried on a later cycle
    Failed(WatchError),
}

impl TargetOutcome {
    pub fn is_restarted(&self) -> bool {
        matches!(self, TargetOutcome::Restarted(_))
    }
}

/// Outcome of one remediation pass, one entry per target in list order
#[derive(Debug)]
pub struct RemediationReport {
    /// Trigger value written to every target in this pass
    pub trigger: String,
    pub outcomes: Vec<TargetOutcome>,
}

impl RemediationReport {
    pub fn restarted(&self) -> impl Iterator<Item = &RemediationTarget> {
        self.outcomes.iter().filter_map(|o| match o {
            TargetOutcome::Restarted(target) => Some(target),
            TargetOutcome::Failed(_) => None,
        })
    }

    pub fn failures(&self) -> impl Iterator<Item = &WatchError> {
        self.outcomes.iter().filter_map(|o| match o {
            TargetOutcome::Failed(err) => Some(err),
            TargetOutcome::Restarted(_) => None,
        })
    }

    pub fn restarted_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_restarted()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.outcomes.len() - self.restarted_count()
    }
}

/// Render a restart trigger: Unix seconds as a decimal string
pub fn trigger_value(now: DateTime<Utc>) -> String {
    now.timestamp().to_string()
}

/// Drives the restart annotation across the target controllers
pub struct RemediationOrchestrator<C: ClusterClient> {
    client: Arc<C>,
    logger: StructuredLogger,
}

impl<C: ClusterClient> RemediationOrchestrator<C> {
    pub fn new(client: Arc<C>, logger: StructuredLogger) -> Self {
        Self { client, logger }
    }

    /// Restart every target in order, pausing `stagger` after the first
    ///
    /// Every controller is re-fetched; a failure on one target never stops
    /// the others.
    pub async fn remediate(
        &self,
        namespace: &str,
        targets: &[String],
        stagger: Duration,
    ) -> RemediationReport {
        self.remediate_with_trigger(namespace, targets, stagger, trigger_value(Utc::now()))
            .await
    }

    /// Same as [`remediate`](Self::remediate) with an explicit trigger value
    pub async fn remediate_with_trigger(
        &self,
        namespace: &str,
        targets: &[String],
        stagger: Duration,
        trigger: String,
    ) -> RemediationReport {
        let mut outcomes = Vec::with_capacity(targets.len());

        for (i, name) in targets.iter().enumerate() {
            let target = RemediationTarget::new(namespace, name.as_str());
            let outcome = self.restart_target(target, &trigger).await;

            match &outcome {
                TargetOutcome::Restarted(target) => self.logger.log_restarted(target, &trigger),
                TargetOutcome::Failed(err) => self.logger.log_remediation_failed(err),
            }
            outcomes.push(outcome);

            // Single gap after the first target only
            if i == 0 && targets.len() > 1 {
                self.logger.log_stagger_wait(stagger);
                tokio::time::sleep(stagger).await;
            }
        }

        RemediationReport { trigger, outcomes }
    }

    async fn restart_target(&self, target: RemediationTarget, trigger: &str) -> TargetOutcome {
        let mut controller = match self
            .client
            .get_controller(&target.namespace, &target.name)
            .await
        {
            Ok(controller) => controller,
            Err(source) => return TargetOutcome::Failed(WatchError::Fetch { target, source }),
        };

        let previous = controller
            .template_annotations_mut()
            .insert(RESTART_ANNOTATION.to_string(), trigger.to_string());
        debug!(
            statefulset = %controller.controller_name(),
            previous = ?previous,
            trigger = %trigger,
            "Set restart annotation"
        );

        match self
            .client
            .apply_controller(&target.namespace, &controller)
            .await
        {
            Ok(()) => TargetOutcome::Restarted(target),
            Err(source) => TargetOutcome::Failed(WatchError::Apply { target, source }),
        }
    }
}
