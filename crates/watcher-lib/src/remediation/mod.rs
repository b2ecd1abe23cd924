//! Rolling-restart remediation of target StatefulSets
//!
//! A restart is triggered by stamping the pod template with a
//! `restartTimestamp` annotation; the StatefulSet controller then rolls
//! the replicas.

mod orchestrator;


pub use orchestrator::{trigger_value, RemediationOrchestrator, RemediationReport, TargetOutcome};
