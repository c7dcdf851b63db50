//! Graph value types: nodes, edges, and the graph itself.
//!
//! Invariants enforced at construction:
//! - node ids are unique within a graph (first occurrence wins),
//! - every edge references two nodes present in the same graph; edges that
//!   do not are dropped before the value exists, never persisted.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::warn;

/// Scalar property value. The property bag is an open map of scalars only;
/// anything structured belongs in first-class fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Number(f64),
    String(String),
}

/// A typed, labeled vertex in the knowledge graph.
///
/// `id` is opaque and stable only within the graph that created it.
/// `description` and `tags` are first-class; everything else goes into the
/// open `properties` map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, PropertyValue>,
}

impl Node {
    pub fn new(id: impl Into<String>, kind: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            label: label.into(),
            description: None,
            tags: Vec::new(),
            properties: BTreeMap::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Key identifying an edge for deduplication: `(source, type, target)`.
pub type EdgeKey = (String, String, String);

/// A typed, directed, weighted connection between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub label: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

impl Edge {
    /// Build an edge; weight is clamped non-negative.
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        kind: impl Into<String>,
        label: impl Into<String>,
        weight: f64,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            kind: kind.into(),
            label: label.into(),
            weight: weight.max(0.0),
        }
    }

    pub fn key(&self) -> EdgeKey {
        (self.source.clone(), self.kind.clone(), self.target.clone())
    }
}

/// A knowledge graph value. Not an identity: two graphs are compared
/// structurally, by node-id set and edge `(source, type, target)` triples.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from parts, enforcing the construction invariants:
    /// duplicate node ids keep the first occurrence, edges referencing
    /// unknown node ids are dropped.
    pub fn from_parts(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        let mut seen = HashSet::new();
        let mut kept_nodes = Vec::with_capacity(nodes.len());
        for node in nodes {
            if !seen.insert(node.id.clone()) {
                warn!(node_id = %node.id, "dropping node with duplicate id");
                continue;
            }
            kept_nodes.push(node);
        }

        let ids: HashSet<&str> = kept_nodes.iter().map(|n| n.id.as_str()).collect();
        let mut kept_edges = Vec::with_capacity(edges.len());
        for edge in edges {
            if !ids.contains(edge.source.as_str()) || !ids.contains(edge.target.as_str()) {
                warn!(
                    source = %edge.source,
                    target = %edge.target,
                    kind = %edge.kind,
                    "dropping edge referencing unknown node"
                );
                continue;
            }
            kept_edges.push(edge);
        }

        Self {
            nodes: kept_nodes,
            edges: kept_edges,
        }
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.iter().any(|n| n.id == id)
    }

    pub fn node_ids(&self) -> HashSet<&str> {
        self.nodes.iter().map(|n| n.id.as_str()).collect()
    }

    /// All edges incident to `id`, in either direction.
    pub fn incident_edges(&self, id: &str) -> Vec<&Edge> {
        self.edges
            .iter()
            .filter(|e| e.source == id || e.target == id)
            .collect()
    }

    /// Insert an edge, overwriting label and weight of an existing edge with
    /// the same `(source, type, target)` key (last write wins). Position of
    /// the first occurrence is retained.
    pub fn upsert_edge(&mut self, edge: Edge) {
        if let Some(existing) = self
            .edges
            .iter_mut()
            .find(|e| e.source == edge.source && e.kind == edge.kind && e.target == edge.target)
        {
            existing.label = edge.label;
            existing.weight = edge.weight;
        } else {
            self.edges.push(edge);
        }
    }

    /// Remove a node and every edge touching it. Returns false when the id
    /// is not present.
    pub fn remove_node(&mut self, id: &str) -> bool {
        let before = self.nodes.len();
        self.nodes.retain(|n| n.id != id);
        if self.nodes.len() == before {
            return false;
        }
        self.edges.retain(|e| e.source != id && e.target != id);
        true
    }

    /// In/out degree per node id, computed in one scan over the edges.
    pub fn degrees(&self) -> HashMap<&str, (usize, usize)> {
        let mut degrees: HashMap<&str, (usize, usize)> =
            self.nodes.iter().map(|n| (n.id.as_str(), (0, 0))).collect();
        for edge in &self.edges {
            if let Some(entry) = degrees.get_mut(edge.source.as_str()) {
                entry.1 += 1;
            }
            if let Some(entry) = degrees.get_mut(edge.target.as_str()) {
                entry.0 += 1;
            }
        }
        degrees
    }

    /// Structural equality: same node-id set and same edge key set,
    /// regardless of order, labels, or weights.
    pub fn structurally_equal(&self, other: &Graph) -> bool {
        let self_nodes: BTreeSet<&str> = self.nodes.iter().map(|n| n.id.as_str()).collect();
        let other_nodes: BTreeSet<&str> = other.nodes.iter().map(|n| n.id.as_str()).collect();
        if self_nodes != other_nodes {
            return false;
        }
        let self_edges: BTreeSet<EdgeKey> = self.edges.iter().map(Edge::key).collect();
        let other_edges: BTreeSet<EdgeKey> = other.edges.iter().map(Edge::key).collect();
        self_edges == other_edges
    }
}
