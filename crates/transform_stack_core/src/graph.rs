//! Resource graph: plain records keyed by logical id plus an explicit edge
//! list, validated in one pass when construction finishes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::resources::{Resource, ResourceKind};

/// Relationship between two registered resources.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EdgeKind {
    /// Function executes under the role.
    SecuredBy,
    /// Trigger invokes the function.
    Invokes,
    /// Alarm watches the function's metric stream.
    Observes,
    /// Alarm state transitions publish to the topic.
    Notifies,
    /// Function writes to the log destination.
    WritesLogsTo,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Edge {
    pub kind: EdgeKind,
    pub from: String,
    pub to: String,
}

/// Explicit construction context threaded through stack synthesis; replaces
/// any implicit global "app" state. Registration order does not matter, only
/// the final validation pass does.
#[derive(Debug, Default)]
pub struct SynthContext {
    resources: BTreeMap<String, Resource>,
    edges: Vec<Edge>,
}

impl SynthContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a resource under its logical id. Ids must be non-empty
    /// ASCII alphanumerics (the update-in-place key scheme) and unique.
    pub fn register(
        &mut self,
        logical_id: &str,
        resource: Resource,
    ) -> Result<(), ValidationError> {
        if logical_id.is_empty() || !logical_id.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(ValidationError::new(format!(
                "logical id must be non-empty alphanumeric, got '{logical_id}'"
            )));
        }
        if self.resources.contains_key(logical_id) {
            return Err(ValidationError::new(format!(
                "duplicate logical id '{logical_id}'"
            )));
        }
        self.resources.insert(logical_id.to_string(), resource);
        Ok(())
    }

    pub fn connect(&mut self, kind: EdgeKind, from: &str, to: &str) {
        self.edges.push(Edge {
            kind,
            from: from.to_string(),
            to: to.to_string(),
        });
    }

    /// Single validation pass: every edge endpoint must refer to a
    /// registered resource.
    pub fn finish(self) -> Result<ResourceGraph, ValidationError> {
        for edge in &self.edges {
            for endpoint in [&edge.from, &edge.to] {
                if !self.resources.contains_key(endpoint) {
                    return Err(ValidationError::new(format!(
                        "edge {:?} references unregistered resource '{endpoint}'",
                        edge.kind
                    )));
                }
            }
        }

        Ok(ResourceGraph {
            resources: self.resources,
            edges: self.edges,
        })
    }
}

/// Fully-linked deployment plan. `BTreeMap` keeps iteration (and therefore
/// rendering) deterministic for identical input.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceGraph {
    pub resources: BTreeMap<String, Resource>,
    pub edges: Vec<Edge>,
}

impl ResourceGraph {
    pub fn resource(&self, logical_id: &str) -> Option<&Resource> {
        self.resources.get(logical_id)
    }

    pub fn count_of(&self, kind: ResourceKind) -> usize {
        self.resources
            .values()
            .filter(|resource| resource.kind() == kind)
            .count()
    }

    pub fn edges_of(&self, kind: EdgeKind) -> Vec<&Edge> {
        self.edges.iter().filter(|edge| edge.kind == kind).collect()
    }

    /// Logical ids this resource points at via edges of the given kind.
    pub fn edge_targets(&self, kind: EdgeKind, from: &str) -> Vec<&str> {
        self.edges
            .iter()
            .filter(|edge| edge.kind == kind && edge.from == from)
            .map(|edge| edge.to.as_str())
            .collect()
    }
}
