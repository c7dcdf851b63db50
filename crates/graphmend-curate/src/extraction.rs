//! Document → fragment graph extraction.
//!
//! One extractor call produces one self-contained [`ExtractionResult`].
//! The model's JSON is parsed strictly after fence stripping; a response
//! that does not parse degrades to the zero-value result instead of
//! failing the caller. Only a transport-level model failure is an error.

use crate::llm::{CompletionOptions, LlmError, TextModel};
use crate::payload::strip_code_fences;
use crate::prompts;
use graphmend_model::{Edge, ExtractionResult, Node};
use graphmend_storage::DocumentContent;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("model request failed: {0}")]
    Model(#[from] LlmError),
}

/// Raw payload shape requested from the model. Everything is optional and
/// defensive; validation happens while building the typed result.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawExtraction {
    entities: Vec<RawEntity>,
    relations: Vec<RawRelation>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawEntity {
    name: String,
    #[serde(rename = "type")]
    kind: String,
    description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawRelation {
    source: String,
    target: String,
    #[serde(alias = "type")]
    relation_type: String,
    description: Option<String>,
}

/// Turns one document into a typed fragment graph via the model.
#[derive(Clone)]
pub struct Extractor {
    model: Arc<dyn TextModel>,
    opts: CompletionOptions,
}

impl Extractor {
    pub fn new(model: Arc<dyn TextModel>) -> Self {
        Self {
            model,
            opts: CompletionOptions::factual(),
        }
    }

    /// Extract entities and relations from `content`.
    ///
    /// Model transport failure is a hard error. A response that fails to
    /// parse yields the zero-value result with `metadata.degraded` set:
    /// degrade, don't crash.
    pub async fn extract(
        &self,
        content: &DocumentContent,
        source_label: &str,
    ) -> Result<ExtractionResult, ExtractError> {
        let response = match content {
            DocumentContent::Text(text) => {
                let prompt = prompts::extraction_prompt(text);
                self.model.complete(&prompt, &self.opts).await?
            }
            DocumentContent::File { bytes, mime } => {
                let prompt = prompts::file_extraction_prompt();
                self.model
                    .complete_multimodal(bytes, mime, &prompt, &self.opts)
                    .await?
            }
        };

        let body = strip_code_fences(&response);
        let raw: RawExtraction = match serde_json::from_str(&body) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(
                    source = %source_label,
                    error = %e,
                    "extraction response did not parse, returning degraded result"
                );
                return Ok(ExtractionResult::degraded(source_label));
            }
        };

        Ok(self.materialize(raw, source_label))
    }

    /// Build the typed result: fresh ids, case-insensitive name collapse,
    /// relations resolved against this call's name map only.
    fn materialize(&self, raw: RawExtraction, source_label: &str) -> ExtractionResult {
        let mut entities: Vec<Node> = Vec::with_capacity(raw.entities.len());
        let mut by_name: HashMap<String, String> = HashMap::new();

        for entity in raw.entities {
            let name = entity.name.trim();
            if name.is_empty() {
                continue;
            }
            let key = name.to_lowercase();
            if by_name.contains_key(&key) {
                // Two casings of the same name collapse to one node.
                continue;
            }
            let id = Uuid::new_v4().to_string();
            by_name.insert(key, id.clone());

            let kind = if entity.kind.trim().is_empty() {
                "Concept".to_string()
            } else {
                entity.kind.trim().to_string()
            };
            let mut node = Node::new(id, kind, name);
            node.description = entity
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty());
            entities.push(node);
        }

        let mut relations: Vec<Edge> = Vec::new();
        for relation in raw.relations {
            let source = by_name.get(&relation.source.trim().to_lowercase());
            let target = by_name.get(&relation.target.trim().to_lowercase());
            let (source, target) = match (source, target) {
                (Some(s), Some(t)) => (s.clone(), t.clone()),
                _ => {
                    // The model may reference entities it decided not to
                    // emit as nodes; those relations are dropped, not raised.
                    debug!(
                        source = %relation.source,
                        target = %relation.target,
                        "dropping relation with unresolvable endpoint"
                    );
                    continue;
                }
            };
            let kind = normalize_relation_type(&relation.relation_type);
            let label = relation
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty())
                .unwrap_or_else(|| kind.to_lowercase().replace('_', " "));
            relations.push(Edge::new(source, target, kind, label, 1.0));
        }

        ExtractionResult::new(entities, relations, source_label, false)
    }
}

fn normalize_relation_type(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return "RELATED_TO".to_string();
    }
    trimmed.to_uppercase().replace([' ', '-'], "_")
}
