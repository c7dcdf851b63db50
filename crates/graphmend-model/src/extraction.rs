//! Output of one extractor run over one document.

use crate::graph::{Edge, Graph, Node};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata attached to an extraction run. The counts always equal the
/// lengths of the entity/relation slices they describe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionMetadata {
    pub source: String,
    pub extracted_at: DateTime<Utc>,
    pub entity_count: usize,
    pub relation_count: usize,
    /// True when the model response could not be parsed and the result was
    /// zeroed instead of failing the caller.
    #[serde(default)]
    pub degraded: bool,
}

/// Self-contained fragment produced by extracting one document.
/// Immutable once created; re-extraction replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub entities: Vec<Node>,
    pub relations: Vec<Edge>,
    pub metadata: ExtractionMetadata,
}

impl ExtractionResult {
    /// Build a result; the metadata counts are derived from the slices so
    /// the integrity invariant holds by construction.
    pub fn new(entities: Vec<Node>, relations: Vec<Edge>, source: &str, degraded: bool) -> Self {
        let metadata = ExtractionMetadata {
            source: source.to_string(),
            extracted_at: Utc::now(),
            entity_count: entities.len(),
            relation_count: relations.len(),
            degraded,
        };
        Self {
            entities,
            relations,
            metadata,
        }
    }

    /// The zero-value result: no entities, no relations, degraded flag set.
    pub fn degraded(source: &str) -> Self {
        Self::new(Vec::new(), Vec::new(), source, true)
    }

    /// View the extraction as a fragment graph, applying the usual
    /// construction-time validation.
    pub fn into_graph(self) -> Graph {
        Graph::from_parts(self.entities, self.relations)
    }
}
