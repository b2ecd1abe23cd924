//! Recording cluster client for tests
//!
//! Returns scripted results and records every call with the tokio clock, so
//! tests can assert both which calls happened and when.

use super::{ClusterClient, PodTemplateAnnotations};
use crate::error::ClusterError;
use crate::models::{Instance, STATEFULSET_KIND};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;
use tokio::time::Instant;

/// Minimal workload controller carrying only pod-template annotations
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FakeController {
    pub name: String,
    pub annotations: Option<BTreeMap<String, String>>,
}

impl PodTemplateAnnotations for FakeController {
    fn controller_name(&self) -> &str {
        &self.name
    }

    fn template_annotations(&self) -> Option<&BTreeMap<String, String>> {
        self.annotations.as_ref()
    }

    fn template_annotations_mut(&mut self) -> &mut BTreeMap<String, String> {
        self.annotations.get_or_insert_with(BTreeMap::new)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    List { namespace: String },
    Get { namespace: String, name: String },
    Apply { namespace: String, controller: FakeController },
}

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub call: Call,
    pub at: Instant,
}

#[derive(Default)]
pub struct FakeClusterClient {
    instances: Vec<Instance>,
    fail_list: bool,
    controllers: HashMap<String, FakeController>,
    fail_get: HashSet<String>,
    fail_apply: HashSet<String>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl FakeClusterClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_instances(mut self, instances: Vec<Instance>) -> Self {
        self.instances = instances;
        self
    }

    pub fn failing_list(mut self) -> Self {
        self.fail_list = true;
        self
    }

    /// Add a controller with no pod-template annotations
    pub fn with_controller(self, name: &str) -> Self {
        self.with_controller_annotations(name, None)
    }

    pub fn with_controller_annotations(
        mut self,
        name: &str,
        annotations: Option<BTreeMap<String, String>>,
    ) -> Self {
        self.controllers.insert(
            name.to_string(),
            FakeController {
                name: name.to_string(),
                annotations,
            },
        );
        self
    }

    pub fn failing_get(mut self, name: &str) -> Self {
        self.fail_get.insert(name.to_string());
        self
    }

    pub fn failing_apply(mut self, name: &str) -> Self {
        self.fail_apply.insert(name.to_string());
        self
    }

    pub fn recorded(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.recorded().into_iter().map(|r| r.call).collect()
    }

    pub fn get_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Get { .. }))
            .count()
    }

    /// Controllers passed to successful or failed apply calls, in call order
    pub fn applied(&self) -> Vec<FakeController> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Apply { controller, .. } => Some(controller),
                _ => None,
            })
            .collect()
    }

    /// Time of each apply call, by controller name
    pub fn apply_times(&self) -> Vec<(String, Instant)> {
        self.recorded()
            .into_iter()
            .filter_map(|r| match r.call {
                Call::Apply { controller, .. } => Some((controller.name, r.at)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(RecordedCall {
            call,
            at: Instant::now(),
        });
    }
}

#[async_trait]
impl ClusterClient for FakeClusterClient {
    type Controller = FakeController;

    async fn list_instances(&self, namespace: &str) -> Result<Vec<Instance>, ClusterError> {
        self.record(Call::List {
            namespace: namespace.to_string(),
        });

        if self.fail_list {
            return Err(ClusterError::Other("list refused".to_string()));
        }
        Ok(self.instances.clone())
    }

    async fn get_controller(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<FakeController, ClusterError> {
        self.record(Call::Get {
            namespace: namespace.to_string(),
            name: name.to_string(),
        });

        if self.fail_get.contains(name) {
            return Err(ClusterError::Other(format!("get {name} refused")));
        }
        self.controllers
            .get(name)
            .cloned()
            .ok_or_else(|| ClusterError::NotFound {
                kind: STATEFULSET_KIND.to_string(),
                name: name.to_string(),
            })
    }

    async fn apply_controller(
        &self,
        namespace: &str,
        controller: &FakeController,
    ) -> Result<(), ClusterError> {
        self.record(Call::Apply {
            namespace: namespace.to_string(),
            controller: controller.clone(),
        });

        if self.fail_apply.contains(&controller.name) {
            return Err(ClusterError::Other(format!(
                "update {} refused",
                controller.name
            )));
        }
        Ok(())
    }
}
