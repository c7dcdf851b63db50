//! Request/response surface over a graph store.
//!
//! This is where the pipeline pieces meet shared state. The unified graph
//! is the one mutable value; fix application is serialized behind a writer
//! lock (single-writer discipline: a fix reads state, computes a delta,
//! and writes back, a check-then-act race if unsynchronized). Nothing is
//! retried automatically: on timeout or transport failure the caller
//! re-issues the request explicitly.

use crate::analysis::{AnalysisStats, Analyzer};
use crate::extraction::{ExtractError, Extractor};
use crate::fixes::FixApplier;
use graphmend_model::{merge, ExtractionResult, Fix, Issue, MergeStats};
use graphmend_storage::{DocumentContent, GraphStore, StoreError, UNIFIED_GRAPH_ID};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error("background task failed: {0}")]
    Task(String),
}

// ── Requests / responses ────────────────────────────────────────────────────

/// One document to extract. `content` carries text or bytes + MIME type;
/// `source_label` keys the persisted fragment, so re-extracting the same
/// source replaces its fragment wholesale.
#[derive(Debug, Clone)]
pub struct ExtractRequest {
    pub content: DocumentContent,
    pub source_label: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractResponse {
    pub result: ExtractionResult,
    pub fragment_graph_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeRequest {
    pub graph_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeResponse {
    pub stats: MergeStats,
    pub unified_graph_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub graph_id: String,
    #[serde(default)]
    pub selected_node_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub issues: Vec<Issue>,
    pub stats: AnalysisStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixRequest {
    pub graph_id: String,
    pub fix: Fix,
}

/// Fix failures are reported in-band: the graph is guaranteed unchanged,
/// and the error names the fix kind and reason.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FixResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Handle to a background extraction, in place of any global job map:
/// submit returns the handle, joining it resolves the result.
pub struct ExtractionTask {
    pub id: Uuid,
    handle: JoinHandle<Result<ExtractResponse, ServiceError>>,
}

impl ExtractionTask {
    pub async fn join(self) -> Result<ExtractResponse, ServiceError> {
        self.handle
            .await
            .map_err(|e| ServiceError::Task(e.to_string()))?
    }
}

// ── Service ─────────────────────────────────────────────────────────────────

/// Glues extractor, merge engine, analyzer, and fix applier over a store.
pub struct CurationService {
    store: Arc<dyn GraphStore>,
    extractor: Extractor,
    analyzer: Analyzer,
    fixer: FixApplier,
    /// Serializes fix application against the stored graphs.
    write_lock: Mutex<()>,
}

impl CurationService {
    pub fn new(
        store: Arc<dyn GraphStore>,
        extractor: Extractor,
        analyzer: Analyzer,
        fixer: FixApplier,
    ) -> Self {
        Self {
            store,
            extractor,
            analyzer,
            fixer,
            write_lock: Mutex::new(()),
        }
    }

    /// Extract one document and persist the fragment graph.
    ///
    /// Model/parse degradation yields the zero-value result (and an empty
    /// fragment); only transport failures surface as errors.
    pub async fn extract_document(
        &self,
        request: ExtractRequest,
    ) -> Result<ExtractResponse, ServiceError> {
        if request.source_label.trim().is_empty() {
            return Err(ServiceError::InvalidRequest(
                "source_label must not be empty".to_string(),
            ));
        }
        let result = self
            .extractor
            .extract(&request.content, &request.source_label)
            .await?;

        let fragment_graph_id = fragment_id(&request.source_label);
        let fragment = result.clone().into_graph();
        self.store.save_graph(&fragment_graph_id, &fragment)?;
        info!(
            source = %request.source_label,
            graph_id = %fragment_graph_id,
            entities = result.metadata.entity_count,
            relations = result.metadata.relation_count,
            degraded = result.metadata.degraded,
            "extracted document"
        );
        Ok(ExtractResponse {
            result,
            fragment_graph_id,
        })
    }

    /// Submit an extraction to run in the background.
    pub fn submit_extraction(self: &Arc<Self>, request: ExtractRequest) -> ExtractionTask {
        let service = Arc::clone(self);
        let id = Uuid::new_v4();
        let handle = tokio::spawn(async move { service.extract_document(request).await });
        ExtractionTask { id, handle }
    }

    /// Merge named fragments into the unified graph. At least two ids are
    /// required; this is a client error, not a degradation.
    pub async fn merge_graphs(&self, request: MergeRequest) -> Result<MergeResponse, ServiceError> {
        if request.graph_ids.len() < 2 {
            return Err(ServiceError::InvalidRequest(format!(
                "merge requires at least 2 graph ids, got {}",
                request.graph_ids.len()
            )));
        }

        let mut fragments = Vec::with_capacity(request.graph_ids.len());
        for id in &request.graph_ids {
            fragments.push(self.store.load_graph(id)?);
        }

        let unified = merge(&fragments);
        let stats = MergeStats::for_graph(&unified, fragments.len());
        self.store.save_graph(UNIFIED_GRAPH_ID, &unified)?;
        info!(
            graphs = stats.graph_count,
            nodes = stats.total_nodes,
            edges = stats.total_edges,
            "merged fragments into unified graph"
        );
        Ok(MergeResponse {
            stats,
            unified_graph_id: UNIFIED_GRAPH_ID.to_string(),
        })
    }

    /// Analyze a stored graph, optionally restricted to selected nodes.
    pub async fn analyze_graph(
        &self,
        request: AnalyzeRequest,
    ) -> Result<AnalyzeResponse, ServiceError> {
        let graph = self.store.load_graph(&request.graph_id)?;
        let (issues, stats) = self
            .analyzer
            .analyze(&graph, &request.selected_node_ids)
            .await;
        Ok(AnalyzeResponse { issues, stats })
    }

    /// Apply one fix to a stored graph under the writer lock.
    ///
    /// Store trouble is an error; fix-level failure comes back in-band
    /// with `ok = false` and the stored graph untouched.
    pub async fn apply_fix(&self, request: FixRequest) -> Result<FixResponse, ServiceError> {
        let _guard = self.write_lock.lock().await;

        let mut graph = self.store.load_graph(&request.graph_id)?;
        match self.fixer.apply(&mut graph, &request.fix).await {
            Ok(_outcome) => {
                self.store.save_graph(&request.graph_id, &graph)?;
                Ok(FixResponse {
                    ok: true,
                    error: None,
                })
            }
            Err(err) => {
                // The fix applier staged its mutation, so the stored graph
                // is untouched; nothing to roll back.
                warn!(error = %err, "fix application rejected");
                Ok(FixResponse {
                    ok: false,
                    error: Some(err.to_string()),
                })
            }
        }
    }
}

/// Fragment graph id for a source label: stable, filesystem-safe.
pub fn fragment_id(source_label: &str) -> String {
    let slug: String = source_label
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_') {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    format!("doc-{}", slug.trim_matches('-'))
}
