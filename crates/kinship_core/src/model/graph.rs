//! Ephemeral person-graph projection for force-directed rendering.
//!
//! Nothing here is persisted; a projection is rebuilt on every request.

use serde::{Deserialize, Serialize};

/// One rendered node: a person or the synthetic account-owner node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    /// Names of the active groups the person belongs to.
    pub groups: Vec<String>,
    /// Colors of those groups, skipping groups without one.
    pub colors: Vec<String>,
    pub is_center: bool,
}

/// One rendered directed edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    /// Relationship type name.
    #[serde(rename = "type")]
    pub kind: String,
    /// Copied verbatim from the relationship type; renderers pick a default.
    pub color: Option<String>,
}

impl GraphEdge {
    /// Dedup key: one edge per ordered `(source, target)` pair.
    pub fn key(&self) -> String {
        format!("{}-{}", self.source, self.target)
    }
}

/// `{nodes, edges}` in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl PersonGraph {
    pub fn has_node(&self, id: &str) -> bool {
        self.nodes.iter().any(|node| node.id == id)
    }

    pub fn edge(&self, source: &str, target: &str) -> Option<&GraphEdge> {
        self.edges
            .iter()
            .find(|edge| edge.source == source && edge.target == target)
    }
}
