//! Merge engine: combine N fragment graphs into one unified graph.
//!
//! `merge` is a pure, total, deterministic function of its ordered input.
//! Conflict policy is asymmetric on purpose:
//!
//! - nodes dedup on `id`, first insert wins: ids are fragment-local, so a
//!   collision means the same fragment was merged twice (or a caller reused
//!   ids deliberately), and a node must not silently change identity;
//! - edges dedup on `(source, type, target)`, last write wins: later passes
//!   frequently refine an edge's label or weight.

use crate::graph::{Edge, EdgeKey, Graph, Node};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Summary of a merge, as reported on the service surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeStats {
    pub total_nodes: usize,
    pub total_edges: usize,
    /// Distinct case-insensitive node labels in the unified graph.
    pub unique_entities: usize,
    pub graph_count: usize,
}

impl MergeStats {
    pub fn for_graph(unified: &Graph, graph_count: usize) -> Self {
        let labels: HashSet<String> = unified
            .nodes
            .iter()
            .map(|n| n.label.to_lowercase())
            .collect();
        Self {
            total_nodes: unified.nodes.len(),
            total_edges: unified.edges.len(),
            unique_entities: labels.len(),
            graph_count,
        }
    }
}

/// Merge fragments in order into a single unified graph.
///
/// Edges whose endpoints are not in the node set accumulated so far are
/// excluded without error. Output node and edge order is insertion order
/// across fragments; merging the output again as a single fragment yields a
/// structurally identical graph.
pub fn merge(fragments: &[Graph]) -> Graph {
    let mut nodes: Vec<Node> = Vec::new();
    let mut node_seen: HashSet<String> = HashSet::new();
    let mut edges: Vec<Edge> = Vec::new();
    let mut edge_index: HashMap<EdgeKey, usize> = HashMap::new();

    for fragment in fragments {
        for node in &fragment.nodes {
            if node_seen.contains(&node.id) {
                debug!(node_id = %node.id, "merge: duplicate node id, first insert wins");
                continue;
            }
            node_seen.insert(node.id.clone());
            nodes.push(node.clone());
        }

        for edge in &fragment.edges {
            if !node_seen.contains(&edge.source) || !node_seen.contains(&edge.target) {
                debug!(
                    source = %edge.source,
                    target = %edge.target,
                    "merge: edge endpoint not in accumulated node set, excluded"
                );
                continue;
            }
            match edge_index.entry(edge.key()) {
                Entry::Occupied(slot) => {
                    // Last write wins: refine label/weight in place, keep
                    // the first occurrence's position.
                    let existing = &mut edges[*slot.get()];
                    existing.label = edge.label.clone();
                    existing.weight = edge.weight;
                }
                Entry::Vacant(slot) => {
                    slot.insert(edges.len());
                    edges.push(edge.clone());
                }
            }
        }
    }

    Graph { nodes, edges }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Edge, Node};

    fn node(id: &str, label: &str) -> Node {
        Node::new(id, "Person", label)
    }

    fn frag(nodes: Vec<Node>, edges: Vec<Edge>) -> Graph {
        Graph { nodes, edges }
    }

    #[test]
    fn first_insert_wins_on_nodes() {
        let a = frag(vec![node("n1", "Alice")], vec![]);
        let b = frag(vec![node("n1", "Alicia")], vec![]);
        let unified = merge(&[a, b]);
        assert_eq!(unified.nodes.len(), 1);
        assert_eq!(unified.nodes[0].label, "Alice");
    }

    #[test]
    fn last_write_wins_on_edges() {
        let a = frag(
            vec![node("n1", "Alice"), node("n2", "Acme")],
            vec![Edge::new("n1", "n2", "WORKS_AT", "works at", 1.0)],
        );
        let b = frag(
            vec![],
            vec![Edge::new("n1", "n2", "WORKS_AT", "employed by", 3.0)],
        );
        let unified = merge(&[a, b]);
        assert_eq!(unified.edges.len(), 1);
        assert_eq!(unified.edges[0].label, "employed by");
        assert!((unified.edges[0].weight - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn dangling_edges_excluded() {
        let a = frag(
            vec![node("n1", "Alice")],
            vec![Edge::new("n1", "missing", "KNOWS", "knows", 1.0)],
        );
        let unified = merge(&[a]);
        assert!(unified.edges.is_empty());
        assert_eq!(unified.nodes.len(), 1);
    }

    #[test]
    fn edge_valid_once_later_fragment_supplies_node() {
        // The endpoint check runs against the set accumulated so far, so an
        // edge arriving before its target node is excluded even when a later
        // fragment supplies that node.
        let a = frag(
            vec![node("n1", "Alice")],
            vec![Edge::new("n1", "n2", "KNOWS", "knows", 1.0)],
        );
        let b = frag(
            vec![node("n2", "Bob")],
            vec![Edge::new("n1", "n2", "KNOWS", "knows", 1.0)],
        );
        let unified = merge(&[a, b]);
        assert_eq!(unified.edges.len(), 1);
    }

    #[test]
    fn merge_is_idempotent_once_materialized() {
        let a = frag(
            vec![node("n1", "Alice"), node("n2", "Acme")],
            vec![Edge::new("n1", "n2", "WORKS_AT", "works at", 1.0)],
        );
        let b = frag(
            vec![node("n3", "Bob"), node("n2", "Acme Corp")],
            vec![Edge::new("n3", "n2", "WORKS_AT", "works at", 2.0)],
        );
        let unified = merge(&[a, b]);
        let again = merge(std::slice::from_ref(&unified));
        assert!(unified.structurally_equal(&again));
        assert_eq!(unified, again);
    }

    #[test]
    fn stats_count_distinct_labels_case_insensitively() {
        let unified = frag(
            vec![node("n1", "Acme"), node("n2", "acme"), node("n3", "Bob")],
            vec![],
        );
        let stats = MergeStats::for_graph(&unified, 2);
        assert_eq!(stats.total_nodes, 3);
        assert_eq!(stats.unique_entities, 2);
        assert_eq!(stats.graph_count, 2);
    }
}
