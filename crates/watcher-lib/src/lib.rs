//! Watcher library for OOM-triggered StatefulSet restarts
//!
//! This crate provides the core functionality for:
//! - Observing pods through an abstract cluster client
//! - Filtering pods by owning StatefulSet
//! - Detecting out-of-memory terminations
//! - Staggered rolling restarts of the target StatefulSets
//! - Health checks and observability

pub mod cluster;
pub mod detection;
pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod remediation;
pub mod watch;

pub use cluster::{ClusterClient, KubeClusterClient, PodTemplateAnnotations};
pub use error::{ClusterError, WatchError};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{StructuredLogger, WatcherMetrics};
pub use watch::{CycleOutcome, WatchConfig, WatchLoop};
