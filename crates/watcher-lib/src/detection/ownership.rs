//! Owner-reference filtering

use crate::models::{Instance, STATEFULSET_KIND};
use std::collections::HashSet;

/// Narrows an instance list to those owned by a configured set of controllers
#[derive(Debug, Clone)]
pub struct OwnershipFilter {
    kind: String,
    targets: HashSet<String>,
}

impl OwnershipFilter {
    pub fn new<I, S>(kind: impl Into<String>, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind: kind.into(),
            targets: targets.into_iter().map(Into::into).collect(),
        }
    }

    /// Filter for instances owned by the named StatefulSets
    pub fn statefulsets<I, S>(targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(STATEFULSET_KIND, targets)
    }

    /// Returns true if any owner reference has the target kind and a target name
    pub fn matches(&self, instance: &Instance) -> bool {
        self.targets
            .iter()
            .any(|target| instance.is_owned_by(&self.kind, target))
    }

    /// Instances owned by any target, each included at most once
    pub fn filter<'a>(&self, instances: &'a [Instance]) -> Vec<&'a Instance> {
        instances.iter().filter(|i| self.matches(i)).collect()
    }
}
