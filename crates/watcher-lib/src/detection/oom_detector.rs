//! Out-of-memory termination detection
//!
//! A container is considered OOM-affected when either its current
//! termination reason is `OOMKilled`, or it has restarted and its previous
//! life ended with exit code 137.

use crate::models::{
    ContainerObservation, Instance, TerminationRecord, OOM_EXIT_CODE, OOM_KILLED_REASON,
};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Which failure signature matched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureSignature {
    /// Current termination reason is `OOMKilled`
    OomKilled,
    /// Restarted, and the previous termination exited with code 137
    PreviousExit137,
}

impl std::fmt::Display for FailureSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureSignature::OomKilled => write!(f, "oom_killed"),
            FailureSignature::PreviousExit137 => write!(f, "previous_exit_137"),
        }
    }
}

/// The first container found carrying a failure signature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureMatch {
    pub instance: String,
    pub container: String,
    pub exit_code: i32,
    pub reason: String,
    pub signature: FailureSignature,
}

/// Decides whether remediation is warranted for a set of instances
#[derive(Debug, Clone, Default)]
pub struct FailureDetector {
    /// Log every terminated container inspected, not only the match
    verbose: bool,
}

impl FailureDetector {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Find the first container matching either failure signature
    ///
    /// Stops at the first match. Returns `None` for an empty input.
    pub fn find_failure<'a, I>(&self, instances: I) -> Option<FailureMatch>
    where
        I: IntoIterator<Item = &'a Instance>,
    {
        instances.into_iter().find_map(|instance| {
            instance
                .containers
                .iter()
                .find_map(|container| self.check_container(instance, container))
        })
    }

    /// Returns true if at least one container matches a failure signature
    pub fn needs_remediation<'a, I>(&self, instances: I) -> bool
    where
        I: IntoIterator<Item = &'a Instance>,
    {
        self.find_failure(instances).is_some()
    }

    fn check_container(
        &self,
        instance: &Instance,
        container: &ContainerObservation,
    ) -> Option<FailureMatch> {
        if let Some(current) = &container.terminated {
            self.trace_termination(instance, container, current, "current");
            if current.reason_str() == OOM_KILLED_REASON {
                return Some(FailureMatch {
                    instance: instance.name.clone(),
                    container: container.name.clone(),
                    exit_code: current.exit_code,
                    reason: current.reason_str().to_string(),
                    signature: FailureSignature::OomKilled,
                });
            }
        }

        if container.restart_count > 0 {
            if let Some(previous) = &container.last_terminated {
                self.trace_termination(instance, container, previous, "previous");
                if previous.exit_code == OOM_EXIT_CODE {
                    return Some(FailureMatch {
                        instance: instance.name.clone(),
                        container: container.name.clone(),
                        exit_code: previous.exit_code,
                        reason: previous.reason_str().to_string(),
                        signature: FailureSignature::PreviousExit137,
                    });
                }
            }
        }

        None
    }

    fn trace_termination(
        &self,
        instance: &Instance,
        container: &ContainerObservation,
        record: &TerminationRecord,
        state: &str,
    ) {
        if self.verbose {
            info!(
                event = "container_terminated",
                pod_name = %instance.name,
                container = %container.name,
                state = %state,
                exit_code = record.exit_code,
                reason = %record.reason_str(),
                restart_count = container.restart_count,
                "Inspected terminated container"
            );
        }
    }
}
