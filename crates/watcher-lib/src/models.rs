//! Core data models for the OOM watcher

use serde::{Deserialize, Serialize};

/// Termination reason reported by the kubelet for an out-of-memory kill
pub const OOM_KILLED_REASON: &str = "OOMKilled";

/// Exit code of a process killed with SIGKILL (128 + 9)
pub const OOM_EXIT_CODE: i32 = 137;

/// Pod-template annotation written to trigger a rolling restart
pub const RESTART_ANNOTATION: &str = "restartTimestamp";

/// Owner kind of the workload controllers this watcher remediates
pub const STATEFULSET_KIND: &str = "StatefulSet";

/// An observed workload replica (one pod)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub name: String,
    pub containers: Vec<ContainerObservation>,
    pub owners: Vec<OwnerRef>,
}

impl Instance {
    /// Returns true if any owner reference matches the given kind and name
    pub fn is_owned_by(&self, kind: &str, name: &str) -> bool {
        self.owners.iter().any(|o| o.kind == kind && o.name == name)
    }
}

/// Back-reference from an instance to the controller that created it
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerRef {
    pub kind: String,
    pub name: String,
}

impl OwnerRef {
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
        }
    }

    pub fn statefulset(name: impl Into<String>) -> Self {
        Self::new(STATEFULSET_KIND, name)
    }
}

/// Per-container state for one instance
///
/// `terminated` is the current state (absent while running). `last_terminated`
/// is the state captured when the container last restarted, so a running
/// container with `restart_count > 0` can still carry an abnormal exit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerObservation {
    pub name: String,
    pub terminated: Option<TerminationRecord>,
    pub restart_count: u32,
    pub last_terminated: Option<TerminationRecord>,
}

/// Exit code and reason of a terminated container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminationRecord {
    pub exit_code: i32,
    pub reason: Option<String>,
}

impl TerminationRecord {
    pub fn new(exit_code: i32, reason: impl Into<String>) -> Self {
        Self {
            exit_code,
            reason: Some(reason.into()),
        }
    }

    pub fn reason_str(&self) -> &str {
        self.reason.as_deref().unwrap_or("")
    }
}

/// A workload controller to restart, scoped to a namespace
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemediationTarget {
    pub namespace: String,
    pub name: String,
}

impl RemediationTarget {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for RemediationTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_ownership() {
        let instance = Instance {
            name: "db-0".to_string(),
            containers: vec![],
            owners: vec![OwnerRef::statefulset("db"), OwnerRef::new("ReplicaSet", "web")],
        };

        assert!(instance.is_owned_by(STATEFULSET_KIND, "db"));
        assert!(!instance.is_owned_by(STATEFULSET_KIND, "web"));
        assert!(!instance.is_owned_by("Deployment", "db"));
    }

    #[test]
    fn test_remediation_target_display() {
        let target = RemediationTarget::new("ns", "a");
        assert_eq!(target.to_string(), "ns/a");
    }

    #[test]
    fn test_termination_reason_defaults_to_empty() {
        let record = TerminationRecord {
            exit_code: 1,
            reason: None,
        };
        assert_eq!(record.reason_str(), "");
    }
}
