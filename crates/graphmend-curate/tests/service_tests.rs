//! End-to-end service surface tests over a temp-dir store.

use graphmend_curate::{
    AnalyzeRequest, Analyzer, CurationService, ExtractRequest, Extractor, FixApplier, FixRequest,
    MergeRequest, MockModel, ServiceError,
};
use graphmend_model::Fix;
use graphmend_storage::{DocumentContent, FileGraphStore, GraphStore, UNIFIED_GRAPH_ID};
use std::sync::Arc;
use tempfile::tempdir;

const EXTRACTION_RESPONSE: &str = r#"{
  "entities": [
    {"name": "Alice", "type": "Person"},
    {"name": "Acme Corp.", "type": "Organization", "description": "A manufacturing company based in Springfield."}
  ],
  "relations": [
    {"source": "Alice", "target": "Acme Corp.", "relation_type": "WORKS_AT"}
  ]
}"#;

fn service_with(model: MockModel, dir: &std::path::Path) -> Arc<CurationService> {
    let model: Arc<MockModel> = Arc::new(model);
    let store: Arc<dyn GraphStore> = Arc::new(FileGraphStore::open(dir).unwrap());
    Arc::new(CurationService::new(
        store,
        Extractor::new(model.clone()),
        Analyzer::new(model.clone()),
        FixApplier::new(model),
    ))
}

fn extract_request(label: &str) -> ExtractRequest {
    ExtractRequest {
        content: DocumentContent::Text("Alice works at Acme Corp.".into()),
        source_label: label.into(),
    }
}

#[tokio::test]
async fn extraction_persists_a_fragment() {
    let dir = tempdir().unwrap();
    let service = service_with(MockModel::always(EXTRACTION_RESPONSE), dir.path());

    let response = service
        .extract_document(extract_request("cv-alice"))
        .await
        .unwrap();
    assert_eq!(response.fragment_graph_id, "doc-cv-alice");
    assert_eq!(response.result.metadata.entity_count, 2);

    let store = FileGraphStore::open(dir.path()).unwrap();
    let fragment = store.load_graph("doc-cv-alice").unwrap();
    assert_eq!(fragment.nodes.len(), 2);
    assert_eq!(fragment.edges.len(), 1);
}

#[tokio::test]
async fn merge_requires_two_ids() {
    let dir = tempdir().unwrap();
    let service = service_with(MockModel::always(EXTRACTION_RESPONSE), dir.path());

    let err = service
        .merge_graphs(MergeRequest {
            graph_ids: vec!["doc-a".into()],
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidRequest(_)));
}

#[tokio::test]
async fn extract_merge_analyze_fix_round_trip() {
    let dir = tempdir().unwrap();
    let service = service_with(MockModel::always(EXTRACTION_RESPONSE), dir.path());

    let a = service
        .extract_document(extract_request("cv-a"))
        .await
        .unwrap();
    let b = service
        .extract_document(extract_request("cv-b"))
        .await
        .unwrap();

    let merged = service
        .merge_graphs(MergeRequest {
            graph_ids: vec![a.fragment_graph_id.clone(), b.fragment_graph_id.clone()],
        })
        .await
        .unwrap();
    // Ids are fresh per extraction, so the two fragments do not collide.
    assert_eq!(merged.stats.total_nodes, 4);
    assert_eq!(merged.stats.total_edges, 2);
    assert_eq!(merged.stats.graph_count, 2);
    // "Alice" appears twice with the same label, "Acme Corp." likewise.
    assert_eq!(merged.stats.unique_entities, 2);

    // Tier-2 output is the extraction response here, which parses but has
    // no analysis arrays; only tier-1 issues come back.
    let analysis = service
        .analyze_graph(AnalyzeRequest {
            graph_id: merged.unified_graph_id.clone(),
            selected_node_ids: vec![],
        })
        .await
        .unwrap();
    assert_eq!(analysis.stats["total"], analysis.issues.len());
    // Both Alice nodes lack a description.
    assert_eq!(analysis.stats["missing_descriptions"], 2);

    // Delete one of the Alice nodes via the fix surface.
    let alice_id = {
        let store = FileGraphStore::open(dir.path()).unwrap();
        let unified = store.load_graph(UNIFIED_GRAPH_ID).unwrap();
        unified
            .nodes
            .iter()
            .find(|n| n.label == "Alice")
            .unwrap()
            .id
            .clone()
    };
    let fixed = service
        .apply_fix(FixRequest {
            graph_id: merged.unified_graph_id.clone(),
            fix: Fix::Delete {
                node_id: alice_id.clone(),
            },
        })
        .await
        .unwrap();
    assert!(fixed.ok);

    // The deleted node no longer shows up in any issue.
    let analysis = service
        .analyze_graph(AnalyzeRequest {
            graph_id: merged.unified_graph_id,
            selected_node_ids: vec![],
        })
        .await
        .unwrap();
    assert!(analysis
        .issues
        .iter()
        .all(|issue| !issue.node_ids.contains(&alice_id)));
}

#[tokio::test]
async fn failed_fix_reports_in_band_and_leaves_store_unchanged() {
    let dir = tempdir().unwrap();
    let service = service_with(MockModel::always(EXTRACTION_RESPONSE), dir.path());

    let a = service
        .extract_document(extract_request("cv-a"))
        .await
        .unwrap();

    let response = service
        .apply_fix(FixRequest {
            graph_id: a.fragment_graph_id.clone(),
            fix: Fix::Delete {
                node_id: "no-such-node".into(),
            },
        })
        .await
        .unwrap();
    assert!(!response.ok);
    assert!(response.error.unwrap().contains("not found"));

    let store = FileGraphStore::open(dir.path()).unwrap();
    let fragment = store.load_graph(&a.fragment_graph_id).unwrap();
    assert_eq!(fragment.nodes.len(), 2);
}

#[tokio::test]
async fn reextraction_replaces_fragment_wholesale() {
    let dir = tempdir().unwrap();
    let service = service_with(
        MockModel::new(vec![
            EXTRACTION_RESPONSE.to_string(),
            r#"{"entities": [{"name": "Bob", "type": "Person"}], "relations": []}"#.to_string(),
        ]),
        dir.path(),
    );

    service
        .extract_document(extract_request("cv"))
        .await
        .unwrap();
    service
        .extract_document(extract_request("cv"))
        .await
        .unwrap();

    let store = FileGraphStore::open(dir.path()).unwrap();
    let fragment = store.load_graph("doc-cv").unwrap();
    assert_eq!(fragment.nodes.len(), 1);
    assert_eq!(fragment.nodes[0].label, "Bob");
}

#[tokio::test]
async fn background_extraction_resolves_through_handle() {
    let dir = tempdir().unwrap();
    let service = service_with(MockModel::always(EXTRACTION_RESPONSE), dir.path());

    let task = service.submit_extraction(extract_request("cv-bg"));
    let response = task.join().await.unwrap();
    assert_eq!(response.fragment_graph_id, "doc-cv-bg");
    assert_eq!(response.result.metadata.entity_count, 2);
}
