//! Graphmend storage layer.
//!
//! Persists named graph fragments and the designated unified graph. The
//! [`GraphStore`] trait is the boundary the pipeline consumes; the default
//! implementation is a directory of pretty-printed JSON files, one per
//! graph, so fragments stay diffable and hand-inspectable.

pub mod documents;
pub mod file_store;

pub use documents::{DocumentContent, DocumentProvider, FileDocumentProvider};
pub use file_store::FileGraphStore;

use graphmend_model::Graph;
use thiserror::Error;

/// The id under which the canonical merged graph is stored.
pub const UNIFIED_GRAPH_ID: &str = "unified";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("graph not found: {0}")]
    NotFound(String),
    #[error("invalid graph id: {0}")]
    InvalidId(String),
    #[error("corrupt graph data for {id}: {reason}")]
    Corrupt { id: String, reason: String },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Persistence boundary for named graphs.
///
/// Fragment graphs are written wholesale (re-extraction replaces them,
/// keyed by source document id); the unified graph is rewritten by merge
/// and by single-fix mutation.
pub trait GraphStore: Send + Sync {
    fn load_graph(&self, id: &str) -> Result<Graph, StoreError>;
    fn save_graph(&self, id: &str, graph: &Graph) -> Result<(), StoreError>;
    fn delete_graph(&self, id: &str) -> Result<(), StoreError>;
    fn list_graphs(&self) -> Result<Vec<String>, StoreError>;
}
