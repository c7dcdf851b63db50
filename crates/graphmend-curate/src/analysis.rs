//! Two-tier graph audit.
//!
//! Tier 1 is a pure data scan and cannot fail: orphans, missing
//! descriptions, weak relations. Tier 2 asks the model about duplicates,
//! missing relations, miscategorizations, and naming. It is best-effort: any
//! request or parse failure silently yields tier-1 issues only, because the
//! deterministic findings remain valid on their own.

use crate::llm::{CompletionOptions, TextModel};
use crate::payload::{first_balanced_object, strip_code_fences};
use crate::prompts;
use graphmend_model::{Fix, Graph, Issue, IssueKind, Severity};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Node/edge caps for the tier-2 prompt.
pub const MAX_PROMPT_NODES: usize = 30;
pub const MAX_PROMPT_EDGES: usize = 50;

/// Edges below this weight are reported as weak relations.
pub const WEAK_RELATION_THRESHOLD: f64 = 0.25;

/// A description shorter than this counts as missing.
const MIN_DESCRIPTION_CHARS: usize = 10;

/// Aggregated issue counts: `total`, per-severity, per-kind.
pub type AnalysisStats = BTreeMap<String, usize>;

/// Stats key for a kind, pluralized the way the reporting surface expects.
fn stats_key(kind: IssueKind) -> &'static str {
    match kind {
        IssueKind::Orphan => "orphans",
        IssueKind::MissingDescription => "missing_descriptions",
        IssueKind::Duplicate => "duplicates",
        IssueKind::WeakRelation => "weak_relations",
        IssueKind::Miscategorized => "miscategorized",
        IssueKind::MissingRelation => "missing_relations",
    }
}

// ── Tier-2 raw payload ──────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawAnalysis {
    duplicates: Vec<RawDuplicate>,
    #[serde(alias = "missing_relations")]
    missing_relations: Vec<RawMissingRelation>,
    miscategorized: Vec<RawMiscategorized>,
    naming: Vec<RawNaming>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawDuplicate {
    #[serde(alias = "node_ids")]
    node_ids: Vec<String>,
    #[serde(alias = "suggested_name")]
    suggested_name: String,
    reason: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawMissingRelation {
    #[serde(alias = "source_id", alias = "source")]
    source_id: String,
    #[serde(alias = "target_id", alias = "target")]
    target_id: String,
    #[serde(alias = "relation_type")]
    relation_type: String,
    reason: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawMiscategorized {
    #[serde(alias = "node_id")]
    node_id: String,
    #[serde(alias = "suggested_type")]
    suggested_type: String,
    reason: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawNaming {
    #[serde(alias = "node_id")]
    node_id: String,
    #[serde(alias = "suggested_name")]
    suggested_name: String,
    reason: String,
}

// ── Analyzer ────────────────────────────────────────────────────────────────

/// Inspects a graph (whole or a node subset) for defects.
#[derive(Clone)]
pub struct Analyzer {
    model: Option<Arc<dyn TextModel>>,
    opts: CompletionOptions,
}

impl Analyzer {
    pub fn new(model: Arc<dyn TextModel>) -> Self {
        Self {
            model: Some(model),
            opts: CompletionOptions::factual(),
        }
    }

    /// Analyzer without a model: tier 1 only.
    pub fn heuristic_only() -> Self {
        Self {
            model: None,
            opts: CompletionOptions::default(),
        }
    }

    /// Analyze `graph`, restricted to `scope` when non-empty.
    ///
    /// Never fails: tier-2 trouble is logged and swallowed. Issues come
    /// back stable-sorted by severity rank, detection order within a rank;
    /// `stats["total"]` always equals the issue count.
    pub async fn analyze(&self, graph: &Graph, scope: &[String]) -> (Vec<Issue>, AnalysisStats) {
        let scope_set: Option<HashSet<&str>> = if scope.is_empty() {
            None
        } else {
            Some(scope.iter().map(String::as_str).collect())
        };
        let in_scope =
            |id: &str| -> bool { scope_set.as_ref().map_or(true, |set| set.contains(id)) };

        let mut issues = self.heuristic_issues(graph, &in_scope);

        if let Some(model) = &self.model {
            match self.model_issues(model.as_ref(), graph, &in_scope).await {
                Ok(mut tier2) => issues.append(&mut tier2),
                Err(reason) => {
                    // Required degrade path: tier-1 findings stand alone.
                    warn!(%reason, "model-assisted analysis skipped");
                }
            }
        }

        issues.sort_by_key(|issue| issue.severity.rank());

        let stats = build_stats(&issues);
        (issues, stats)
    }

    /// Tier 1: pure scan, by construction cannot fail.
    fn heuristic_issues(&self, graph: &Graph, in_scope: &dyn Fn(&str) -> bool) -> Vec<Issue> {
        let degrees = graph.degrees();
        let mut issues = Vec::new();

        for node in &graph.nodes {
            if !in_scope(&node.id) {
                continue;
            }
            let (in_degree, out_degree) = degrees.get(node.id.as_str()).copied().unwrap_or((0, 0));
            if in_degree == 0 && out_degree == 0 {
                issues.push(Issue {
                    id: Uuid::new_v4().to_string(),
                    kind: IssueKind::Orphan,
                    severity: Severity::High,
                    node_ids: vec![node.id.clone()],
                    title: format!("Orphan node: {}", node.label),
                    description: format!(
                        "\"{}\" has no incoming or outgoing relations and is disconnected from the graph.",
                        node.label
                    ),
                    fix: Some(Fix::Delete {
                        node_id: node.id.clone(),
                    }),
                });
            }

            let description_len = node
                .description
                .as_deref()
                .map(|d| d.trim().chars().count())
                .unwrap_or(0);
            if description_len < MIN_DESCRIPTION_CHARS {
                issues.push(Issue {
                    id: Uuid::new_v4().to_string(),
                    kind: IssueKind::MissingDescription,
                    severity: Severity::Medium,
                    node_ids: vec![node.id.clone()],
                    title: format!("Missing description: {}", node.label),
                    description: format!(
                        "\"{}\" has no usable description ({} characters).",
                        node.label, description_len
                    ),
                    fix: Some(Fix::AddDescription {
                        node_id: node.id.clone(),
                    }),
                });
            }
        }

        for edge in &graph.edges {
            if edge.weight >= WEAK_RELATION_THRESHOLD {
                continue;
            }
            if !in_scope(&edge.source) && !in_scope(&edge.target) {
                continue;
            }
            issues.push(Issue {
                id: Uuid::new_v4().to_string(),
                kind: IssueKind::WeakRelation,
                severity: Severity::Low,
                node_ids: vec![edge.source.clone(), edge.target.clone()],
                title: format!("Weak relation: {}", edge.label),
                description: format!(
                    "The \"{}\" relation has weight {:.2}, below the {} threshold; it may be noise.",
                    edge.label, edge.weight, WEAK_RELATION_THRESHOLD
                ),
                fix: None,
            });
        }

        issues
    }

    /// Tier 2: bounded model pass. Returns `Err(reason)` on any request or
    /// parse trouble so the caller can skip the tier wholesale.
    async fn model_issues(
        &self,
        model: &dyn TextModel,
        graph: &Graph,
        in_scope: &dyn Fn(&str) -> bool,
    ) -> Result<Vec<Issue>, String> {
        let nodes: Vec<_> = graph
            .nodes
            .iter()
            .filter(|n| in_scope(&n.id))
            .take(MAX_PROMPT_NODES)
            .collect();
        if nodes.is_empty() {
            return Ok(Vec::new());
        }
        let edges: Vec<_> = graph.edges.iter().take(MAX_PROMPT_EDGES).collect();

        let prompt = prompts::analysis_prompt(&nodes, &edges);
        let response = model
            .complete(&prompt, &self.opts)
            .await
            .map_err(|e| e.to_string())?;

        let body = strip_code_fences(&response);
        let block = first_balanced_object(&body).ok_or("no JSON object in response")?;
        let raw: RawAnalysis = serde_json::from_str(block).map_err(|e| e.to_string())?;

        Ok(materialize_model_issues(raw, graph))
    }
}

/// Turn the raw tier-2 payload into issues, defending against hallucinated
/// node ids throughout.
fn materialize_model_issues(raw: RawAnalysis, graph: &Graph) -> Vec<Issue> {
    let mut issues = Vec::new();

    for dup in raw.duplicates {
        let existing: Vec<String> = dup
            .node_ids
            .iter()
            .filter(|id| graph.contains_node(id))
            .cloned()
            .collect();
        if existing.len() < 2 {
            debug!("dropping duplicate candidate with fewer than 2 known ids");
            continue;
        }
        let suggested_name = if dup.suggested_name.trim().is_empty() {
            graph
                .node(&existing[0])
                .map(|n| n.label.clone())
                .unwrap_or_default()
        } else {
            dup.suggested_name.trim().to_string()
        };
        let labels: Vec<String> = existing
            .iter()
            .filter_map(|id| graph.node(id).map(|n| format!("\"{}\"", n.label)))
            .collect();
        issues.push(Issue {
            id: Uuid::new_v4().to_string(),
            kind: IssueKind::Duplicate,
            severity: Severity::Medium,
            node_ids: existing.clone(),
            title: format!("Possible duplicates: {}", labels.join(", ")),
            description: non_empty_or(&dup.reason, "These nodes appear to describe the same entity."),
            fix: Some(Fix::Merge {
                node_ids: existing,
                suggested_name,
            }),
        });
    }

    for rel in raw.missing_relations {
        // Both endpoints must exist; the model hallucinates ids.
        if !graph.contains_node(&rel.source_id) || !graph.contains_node(&rel.target_id) {
            debug!(
                source = %rel.source_id,
                target = %rel.target_id,
                "dropping missing-relation suggestion with unknown endpoint"
            );
            continue;
        }
        let relation_type = if rel.relation_type.trim().is_empty() {
            "RELATED_TO".to_string()
        } else {
            rel.relation_type.trim().to_uppercase().replace(' ', "_")
        };
        issues.push(Issue {
            id: Uuid::new_v4().to_string(),
            kind: IssueKind::MissingRelation,
            severity: Severity::Low,
            node_ids: vec![rel.source_id.clone(), rel.target_id.clone()],
            title: format!("Missing relation ({relation_type})"),
            description: non_empty_or(&rel.reason, "A relation between these nodes appears to be missing."),
            fix: Some(Fix::AddRelation {
                source: rel.source_id,
                target: rel.target_id,
                relation_type,
                label: None,
                weight: None,
            }),
        });
    }

    for misc in raw.miscategorized {
        let Some(node) = graph.node(&misc.node_id) else {
            continue;
        };
        if misc.suggested_type.trim().is_empty() {
            continue;
        }
        issues.push(Issue {
            id: Uuid::new_v4().to_string(),
            kind: IssueKind::Miscategorized,
            severity: Severity::Low,
            node_ids: vec![misc.node_id.clone()],
            title: format!("Miscategorized: {}", node.label),
            description: non_empty_or(
                &misc.reason,
                "The node's type does not match what its label describes.",
            ),
            fix: Some(Fix::ChangeCategory {
                node_id: misc.node_id,
                new_type: misc.suggested_type.trim().to_string(),
            }),
        });
    }

    for naming in raw.naming {
        let Some(node) = graph.node(&naming.node_id) else {
            continue;
        };
        if naming.suggested_name.trim().is_empty() {
            continue;
        }
        issues.push(Issue {
            id: Uuid::new_v4().to_string(),
            kind: IssueKind::Miscategorized,
            severity: Severity::Low,
            node_ids: vec![naming.node_id.clone()],
            title: format!("Naming inconsistency: {}", node.label),
            description: non_empty_or(&naming.reason, "The node's label is inconsistently named."),
            fix: Some(Fix::Rename {
                node_id: naming.node_id,
                new_label: naming.suggested_name.trim().to_string(),
            }),
        });
    }

    issues
}

fn non_empty_or(text: &str, fallback: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

fn build_stats(issues: &[Issue]) -> AnalysisStats {
    let mut stats = AnalysisStats::new();
    stats.insert("total".to_string(), issues.len());
    for issue in issues {
        *stats.entry(issue.severity.as_str().to_string()).or_insert(0) += 1;
        *stats.entry(stats_key(issue.kind).to_string()).or_insert(0) += 1;
    }
    stats
}
