//! Single-fix mutation of a graph.
//!
//! Every fix is staged on a working copy and committed only on success, so
//! a failed fix leaves the caller's graph exactly as it was, with no
//! partial writes. The caller re-runs analysis afterwards if it needs a consistent
//! issue list.

use crate::llm::{CompletionOptions, LlmError, TextModel};
use crate::prompts;
use graphmend_model::{Edge, EdgeKey, Fix, FixKind, Graph};
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum FixError {
    #[error("{kind}: node not found: {node_id}")]
    NotFound { kind: FixKind, node_id: String },
    #[error("add_description: generation failed: {0}")]
    GenerationFailed(#[source] LlmError),
    #[error("{kind}: validation failed: {reason}")]
    ValidationFailed { kind: FixKind, reason: String },
    #[error("merge: fewer than two of the requested nodes still exist")]
    MergeInvalid,
}

/// What a successful fix did, for reporting.
#[derive(Debug, Clone)]
pub struct FixOutcome {
    pub kind: FixKind,
    pub summary: String,
}

/// Applies one structured fix per call.
#[derive(Clone)]
pub struct FixApplier {
    model: Option<Arc<dyn TextModel>>,
    opts: CompletionOptions,
}

impl FixApplier {
    pub fn new(model: Arc<dyn TextModel>) -> Self {
        Self {
            model: Some(model),
            opts: CompletionOptions::default(),
        }
    }

    /// Applier without a model; `add_description` fixes will fail cleanly.
    pub fn heuristic_only() -> Self {
        Self {
            model: None,
            opts: CompletionOptions::default(),
        }
    }

    /// Apply `fix` to `graph`. On error the graph is untouched.
    pub async fn apply(&self, graph: &mut Graph, fix: &Fix) -> Result<FixOutcome, FixError> {
        let mut working = graph.clone();
        let outcome = self.apply_staged(&mut working, fix).await?;
        *graph = working;
        info!(kind = %outcome.kind, "applied fix: {}", outcome.summary);
        Ok(outcome)
    }

    async fn apply_staged(&self, working: &mut Graph, fix: &Fix) -> Result<FixOutcome, FixError> {
        let kind = fix.kind();
        match fix {
            Fix::Delete { node_id } => {
                if !working.remove_node(node_id) {
                    return Err(FixError::NotFound {
                        kind,
                        node_id: node_id.clone(),
                    });
                }
                Ok(FixOutcome {
                    kind,
                    summary: format!("deleted node {node_id} and its relations"),
                })
            }

            Fix::AddDescription { node_id } => {
                let Some(node) = working.node(node_id) else {
                    return Err(FixError::NotFound {
                        kind,
                        node_id: node_id.clone(),
                    });
                };
                let Some(model) = &self.model else {
                    return Err(FixError::ValidationFailed {
                        kind,
                        reason: "no language model configured".to_string(),
                    });
                };

                // Gather the 1-hop neighborhood before the await; the
                // prompt only needs labels.
                let neighborhood: Vec<String> = working
                    .incident_edges(node_id)
                    .iter()
                    .filter_map(|edge| {
                        let (other, arrow) = if edge.source == *node_id {
                            (&edge.target, "->")
                        } else {
                            (&edge.source, "<-")
                        };
                        working
                            .node(other)
                            .map(|n| format!("{} {} {}", edge.label, arrow, n.label))
                    })
                    .collect();
                let prompt = prompts::description_prompt(node, &neighborhood);

                let text = model
                    .complete(&prompt, &self.opts)
                    .await
                    .map_err(FixError::GenerationFailed)?;

                let node = working.node_mut(node_id).ok_or_else(|| FixError::NotFound {
                    kind,
                    node_id: node_id.clone(),
                })?;
                node.description = Some(text.trim().to_string());
                Ok(FixOutcome {
                    kind,
                    summary: format!("generated description for node {node_id}"),
                })
            }

            Fix::AddRelation {
                source,
                target,
                relation_type,
                label,
                weight,
            } => {
                for endpoint in [source, target] {
                    if !working.contains_node(endpoint) {
                        return Err(FixError::ValidationFailed {
                            kind,
                            reason: format!("endpoint does not exist: {endpoint}"),
                        });
                    }
                }
                let label = label
                    .clone()
                    .filter(|l| !l.trim().is_empty())
                    .unwrap_or_else(|| relation_type.to_lowercase().replace('_', " "));
                working.upsert_edge(Edge::new(
                    source.clone(),
                    target.clone(),
                    relation_type.clone(),
                    label,
                    weight.unwrap_or(1.0),
                ));
                Ok(FixOutcome {
                    kind,
                    summary: format!("added relation {source} -{relation_type}-> {target}"),
                })
            }

            Fix::ChangeCategory { node_id, new_type } => {
                let node = working.node_mut(node_id).ok_or_else(|| FixError::NotFound {
                    kind,
                    node_id: node_id.clone(),
                })?;
                node.kind = new_type.clone();
                Ok(FixOutcome {
                    kind,
                    summary: format!("changed category of {node_id} to {new_type}"),
                })
            }

            Fix::Rename { node_id, new_label } => {
                let node = working.node_mut(node_id).ok_or_else(|| FixError::NotFound {
                    kind,
                    node_id: node_id.clone(),
                })?;
                node.label = new_label.clone();
                Ok(FixOutcome {
                    kind,
                    summary: format!("renamed {node_id} to \"{new_label}\""),
                })
            }

            Fix::Merge {
                node_ids,
                suggested_name,
            } => merge_nodes(working, node_ids, suggested_name),
        }
    }
}

/// Collapse all still-existing `node_ids` into the first of them.
///
/// Re-validates against current graph state first: this is the one fix
/// whose inputs can go stale between analysis and application.
fn merge_nodes(
    working: &mut Graph,
    node_ids: &[String],
    suggested_name: &str,
) -> Result<FixOutcome, FixError> {
    let valid: Vec<String> = node_ids
        .iter()
        .filter(|id| working.contains_node(id))
        .cloned()
        .collect();
    if valid.len() < 2 {
        return Err(FixError::MergeInvalid);
    }

    let survivor_id = valid[0].clone();
    let absorbed: HashSet<String> = valid[1..].iter().cloned().collect();

    // Fill survivor fields from absorbed nodes where the survivor lacks
    // them; the survivor's own values always win.
    let mut donor_description = None;
    let mut donor_tags = Vec::new();
    let mut donor_properties = Vec::new();
    for id in &valid[1..] {
        if let Some(node) = working.node(id) {
            if donor_description.is_none() {
                donor_description = node.description.clone();
            }
            donor_tags.extend(node.tags.iter().cloned());
            donor_properties.extend(node.properties.clone());
        }
    }

    {
        let survivor = working
            .node_mut(&survivor_id)
            .ok_or(FixError::MergeInvalid)?;
        if !suggested_name.trim().is_empty() {
            survivor.label = suggested_name.trim().to_string();
        }
        if survivor.description.is_none() {
            survivor.description = donor_description;
        }
        for tag in donor_tags {
            if !survivor.tags.contains(&tag) {
                survivor.tags.push(tag);
            }
        }
        for (key, value) in donor_properties {
            survivor.properties.entry(key).or_insert(value);
        }
    }

    // Re-point every edge whose endpoint was absorbed. Self-loops created
    // by the collapse are dropped; key collisions follow the merge-engine
    // edge policy (last write wins, first position kept).
    let mut edges: Vec<Edge> = Vec::with_capacity(working.edges.len());
    let mut index: HashMap<EdgeKey, usize> = HashMap::new();
    for edge in working.edges.drain(..) {
        let mut edge = edge;
        let remapped_source = absorbed.contains(&edge.source);
        let remapped_target = absorbed.contains(&edge.target);
        if remapped_source {
            edge.source = survivor_id.clone();
        }
        if remapped_target {
            edge.target = survivor_id.clone();
        }
        if (remapped_source || remapped_target) && edge.source == edge.target {
            continue;
        }
        match index.entry(edge.key()) {
            Entry::Occupied(slot) => {
                let existing = &mut edges[*slot.get()];
                existing.label = edge.label;
                existing.weight = edge.weight;
            }
            Entry::Vacant(slot) => {
                slot.insert(edges.len());
                edges.push(edge);
            }
        }
    }
    working.edges = edges;
    working.nodes.retain(|n| !absorbed.contains(&n.id));

    Ok(FixOutcome {
        kind: FixKind::Merge,
        summary: format!(
            "merged {} nodes into {survivor_id} as \"{suggested_name}\"",
            valid.len()
        ),
    })
}
