//! Error types for the watcher core

use crate::models::RemediationTarget;
use thiserror::Error;

/// Failure reported by a [`ClusterClient`](crate::cluster::ClusterClient) call
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("{kind} {name} not found")]
    NotFound { kind: String, name: String },

    #[error("{0}")]
    Other(String),
}

/// Failures the control loop recovers from
///
/// None of these are fatal: observation failures skip the rest of the cycle,
/// fetch and apply failures skip a single target.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("failed to list instances in namespace {namespace}: {source}")]
    Observation {
        namespace: String,
        #[source]
        source: ClusterError,
    },

    #[error("failed to fetch controller {target}: {source}")]
    Fetch {
        target: RemediationTarget,
        #[source]
        source: ClusterError,
    },

    #[error("failed to apply controller {target}: {source}")]
    Apply {
        target: RemediationTarget,
        #[source]
        source: ClusterError,
    },
}

impl WatchError {
    /// Short label used for metrics and structured log fields
    pub fn kind(&self) -> &'static str {
        match self {
            WatchError::Observation { .. } => "observation",
            WatchError::Fetch { .. } => "fetch",
            WatchError::Apply { .. } => "apply",
        }
    }
}
