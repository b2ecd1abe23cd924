//! Cluster access for the watcher
//!
//! The control loop only ever talks to the cluster through [`ClusterClient`].
//! The production implementation is backed by `kube`; tests use a recording
//! fake with scripted results.

mod kube_client;

#[cfg(test)]
pub(crate) mod fake;

pub use kube_client::{instance_from_pod, KubeClusterClient};

use crate::error::ClusterError;
use crate::models::Instance;
use std::collections::BTreeMap;

pub use async_trait::async_trait;

/// Access to the pod-template annotations of a workload controller
///
/// This is the only part of a controller the watcher reads or writes.
pub trait PodTemplateAnnotations {
    /// Name of the controller
    fn controller_name(&self) -> &str;

    /// Current annotations on the pod template, if any
    fn template_annotations(&self) -> Option<&BTreeMap<String, String>>;

    /// Mutable annotations on the pod template, initialized when absent
    fn template_annotations_mut(&mut self) -> &mut BTreeMap<String, String>;
}

/// The three cluster operations the watcher depends on
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Workload controller type returned by [`get_controller`](Self::get_controller)
    type Controller: PodTemplateAnnotations + Send + Sync;

    /// Enumerate all instances in a namespace
    async fn list_instances(&self, namespace: &str) -> Result<Vec<Instance>, ClusterError>;

    /// Fetch the current state of a named workload controller
    async fn get_controller(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Self::Controller, ClusterError>;

    /// Write an updated workload controller back to the cluster
    async fn apply_controller(
        &self,
        namespace: &str,
        controller: &Self::Controller,
    ) -> Result<(), ClusterError>;
}
