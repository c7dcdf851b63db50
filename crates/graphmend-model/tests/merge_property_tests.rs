use graphmend_model::{merge, Edge, Graph, Node};
use proptest::prelude::*;
use std::collections::HashSet;

fn ident() -> impl Strategy<Value = String> {
    // Small id space on purpose, so fragments collide often enough to
    // exercise both dedup policies.
    proptest::string::string_regex("n[0-9]{1,2}").unwrap()
}

fn node_strategy() -> impl Strategy<Value = Node> {
    (
        ident(),
        prop_oneof![
            Just("Person".to_string()),
            Just("Organization".to_string()),
            Just("Skill".to_string()),
        ],
        proptest::string::string_regex("[A-Za-z][A-Za-z ]{0,12}").unwrap(),
    )
        .prop_map(|(id, kind, label)| Node::new(id, kind, label))
}

fn edge_strategy() -> impl Strategy<Value = Edge> {
    (
        ident(),
        ident(),
        prop_oneof![
            Just("WORKS_AT".to_string()),
            Just("KNOWS".to_string()),
            Just("USES".to_string()),
        ],
        0.0f64..5.0,
    )
        .prop_map(|(source, target, kind, weight)| {
            let label = kind.to_lowercase().replace('_', " ");
            Edge::new(source, target, kind, label, weight)
        })
}

fn fragment_strategy() -> impl Strategy<Value = Graph> {
    (
        proptest::collection::vec(node_strategy(), 0..8),
        proptest::collection::vec(edge_strategy(), 0..10),
    )
        .prop_map(|(nodes, edges)| Graph::from_parts(nodes, edges))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn merged_graph_has_referential_integrity(fragments in proptest::collection::vec(fragment_strategy(), 0..5)) {
        let unified = merge(&fragments);
        let ids: HashSet<&str> = unified.nodes.iter().map(|n| n.id.as_str()).collect();
        for edge in &unified.edges {
            prop_assert!(ids.contains(edge.source.as_str()));
            prop_assert!(ids.contains(edge.target.as_str()));
        }
    }

    #[test]
    fn merged_graph_has_unique_node_ids(fragments in proptest::collection::vec(fragment_strategy(), 0..5)) {
        let unified = merge(&fragments);
        let mut seen = HashSet::new();
        for node in &unified.nodes {
            prop_assert!(seen.insert(node.id.clone()), "duplicate node id {}", node.id);
        }
    }

    #[test]
    fn merge_is_idempotent_once_materialized(fragments in proptest::collection::vec(fragment_strategy(), 0..5)) {
        let unified = merge(&fragments);
        let again = merge(std::slice::from_ref(&unified));
        prop_assert!(unified.structurally_equal(&again));
        prop_assert_eq!(unified, again);
    }

    #[test]
    fn merge_is_deterministic(fragments in proptest::collection::vec(fragment_strategy(), 0..5)) {
        let once = merge(&fragments);
        let twice = merge(&fragments);
        prop_assert_eq!(once, twice);
    }
}
