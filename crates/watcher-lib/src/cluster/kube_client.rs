//! Kubernetes-backed cluster client
//!
//! Lists pods and reads/replaces StatefulSets through the Kubernetes API.

use super::{ClusterClient, PodTemplateAnnotations};
use crate::error::ClusterError;
use crate::models::{
    ContainerObservation, Instance, OwnerRef, TerminationRecord, STATEFULSET_KIND,
};
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::StatefulSet;
use k8s_openapi::api::core::v1::{ContainerState, ContainerStatus, Pod};
use kube::{
    api::{Api, ListParams, PostParams},
    Client,
};
use std::collections::BTreeMap;
use tracing::debug;

/// [`ClusterClient`] over a pre-authenticated `kube::Client`
#[derive(Clone)]
pub struct KubeClusterClient {
    client: Client,
}

impl KubeClusterClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    type Controller = StatefulSet;

    async fn list_instances(&self, namespace: &str) -> Result<Vec<Instance>, ClusterError> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let list = pods.list(&ListParams::default()).await?;

        debug!(namespace = %namespace, count = list.items.len(), "Listed pods");
        Ok(list.items.iter().map(instance_from_pod).collect())
    }

    async fn get_controller(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<StatefulSet, ClusterError> {
        let statefulsets: Api<StatefulSet> = Api::namespaced(self.client.clone(), namespace);

        match statefulsets.get(name).await {
            Ok(sts) => Ok(sts),
            Err(kube::Error::Api(e)) if e.code == 404 => Err(ClusterError::NotFound {
                kind: STATEFULSET_KIND.to_string(),
                name: name.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn apply_controller(
        &self,
        namespace: &str,
        controller: &StatefulSet,
    ) -> Result<(), ClusterError> {
        let name = controller
            .metadata
            .name
            .as_deref()
            .ok_or_else(|| ClusterError::Other("StatefulSet has no name".to_string()))?;

        let statefulsets: Api<StatefulSet> = Api::namespaced(self.client.clone(), namespace);
        statefulsets
            .replace(name, &PostParams::default(), controller)
            .await?;

        Ok(())
    }
}

impl PodTemplateAnnotations for StatefulSet {
    fn controller_name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or_default()
    }

    fn template_annotations(&self) -> Option<&BTreeMap<String, String>> {
        self.spec
            .as_ref()?
            .template
            .metadata
            .as_ref()?
            .annotations
            .as_ref()
    }

    fn template_annotations_mut(&mut self) -> &mut BTreeMap<String, String> {
        self.spec
            .get_or_insert_with(Default::default)
            .template
            .metadata
            .get_or_insert_with(Default::default)
            .annotations
            .get_or_insert_with(BTreeMap::new)
    }
}

/// Convert a Kubernetes pod into the watcher's instance model
pub fn instance_from_pod(pod: &Pod) -> Instance {
    let owners = pod
        .metadata
        .owner_references
        .iter()
        .flatten()
        .map(|o| OwnerRef::new(&o.kind, &o.name))
        .collect();

    let containers = pod
        .status
        .as_ref()
        .and_then(|s| s.container_statuses.as_ref())
        .into_iter()
        .flatten()
        .map(observation_from_status)
        .collect();

    Instance {
        name: pod.metadata.name.clone().unwrap_or_default(),
        containers,
        owners,
    }
}

fn observation_from_status(status: &ContainerStatus) -> ContainerObservation {
    ContainerObservation {
        name: status.name.clone(),
        terminated: termination_record(status.state.as_ref()),
        restart_count: u32::try_from(status.restart_count).unwrap_or(0),
        last_terminated: termination_record(status.last_state.as_ref()),
    }
}

fn termination_record(state: Option<&ContainerState>) -> Option<TerminationRecord> {
    state?.terminated.as_ref().map(|t| TerminationRecord {
        exit_code: t.exit_code,
        reason: t.reason.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RESTART_ANNOTATION;
    use serde_json::json;

    fn pod(value: serde_json::Value) -> Pod {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_instance_from_pod_with_previous_oom() {
        let pod = pod(json!({
            "metadata": {
                "name": "db-0",
                "ownerReferences": [{
                    "apiVersion": "apps/v1",
                    "kind": "StatefulSet",
                    "name": "db",
                    "uid": "8f1c"
                }]
            },
            "status": {
                "containerStatuses": [{
                    "name": "postgres",
                    "image": "postgres:16",
                    "imageID": "",
                    "ready": true,
                    "restartCount": 2,
                    "state": { "running": { "startedAt": "2024-01-01T00:00:00Z" } },
                    "lastState": { "terminated": { "exitCode": 137, "reason": "OOMKilled" } }
                }]
            }
        }));

        let instance = instance_from_pod(&pod);

        assert_eq!(instance.name, "db-0");
        assert_eq!(instance.owners, vec![OwnerRef::statefulset("db")]);
        assert_eq!(instance.containers.len(), 1);

        let container = &instance.containers[0];
        assert_eq!(container.name, "postgres");
        assert_eq!(container.restart_count, 2);
        assert!(container.terminated.is_none());
        assert_eq!(
            container.last_terminated,
            Some(TerminationRecord::new(137, "OOMKilled"))
        );
    }

    #[test]
    fn test_instance_from_pod_without_status() {
        let pod = pod(json!({ "metadata": { "name": "pending-0" } }));

        let instance = instance_from_pod(&pod);

        assert_eq!(instance.name, "pending-0");
        assert!(instance.containers.is_empty());
        assert!(instance.owners.is_empty());
    }

    #[test]
    fn test_current_termination_is_captured() {
        let pod = pod(json!({
            "metadata": { "name": "worker-1" },
            "status": {
                "containerStatuses": [{
                    "name": "worker",
                    "image": "worker:1",
                    "imageID": "",
                    "ready": false,
                    "restartCount": 0,
                    "state": { "terminated": { "exitCode": 1, "reason": "Error" } }
                }]
            }
        }));

        let instance = instance_from_pod(&pod);
        let container = &instance.containers[0];

        assert_eq!(container.terminated, Some(TerminationRecord::new(1, "Error")));
        assert!(container.last_terminated.is_none());
    }

    #[test]
    fn test_statefulset_annotations_initialized_when_absent() {
        let mut sts = StatefulSet::default();
        sts.metadata.name = Some("db".to_string());

        assert!(sts.template_annotations().is_none());

        sts.template_annotations_mut()
            .insert(RESTART_ANNOTATION.to_string(), "1700000000".to_string());

        assert_eq!(sts.controller_name(), "db");
        assert_eq!(
            sts.template_annotations()
                .and_then(|a| a.get(RESTART_ANNOTATION))
                .map(String::as_str),
            Some("1700000000")
        );
    }

    #[test]
    fn test_statefulset_existing_annotations_preserved() {
        let mut sts: StatefulSet = serde_json::from_value(json!({
            "metadata": { "name": "db" },
            "spec": {
                "selector": {},
                "serviceName": "db",
                "template": {
                    "metadata": { "annotations": { "team": "storage", "restartTimestamp": "1" } }
                }
            }
        }))
        .unwrap();

        sts.template_annotations_mut()
            .insert(RESTART_ANNOTATION.to_string(), "2".to_string());

        let annotations = sts.template_annotations().unwrap();
        assert_eq!(annotations.get("team").map(String::as_str), Some("storage"));
        assert_eq!(annotations.get(RESTART_ANNOTATION).map(String::as_str), Some("2"));
    }
}
