//! Defects found in a graph, and the fixes that repair them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What kind of defect an issue describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    Orphan,
    MissingDescription,
    Duplicate,
    WeakRelation,
    Miscategorized,
    MissingRelation,
}

impl IssueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueKind::Orphan => "orphan",
            IssueKind::MissingDescription => "missing_description",
            IssueKind::Duplicate => "duplicate",
            IssueKind::WeakRelation => "weak_relation",
            IssueKind::Miscategorized => "miscategorized",
            IssueKind::MissingRelation => "missing_relation",
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity rank: high sorts before medium sorts before low.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn rank(&self) -> u8 {
        match self {
            Severity::High => 0,
            Severity::Medium => 1,
            Severity::Low => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structured, machine-applicable repair.
///
/// Wire shape is `{"type": "...", "data": {...}}` with camelCase data keys,
/// e.g. `{"type":"merge","data":{"nodeIds":[...],"suggestedName":"..."}}`.
///
/// Every fix is replay-safe: re-applying either has the same effect or
/// reports `NotFound`/`MergeInvalid` with the graph untouched. `Merge` is
/// the one fix that depends on current graph state and must re-validate its
/// inputs before acting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Fix {
    #[serde(rename_all = "camelCase")]
    Delete { node_id: String },
    #[serde(rename_all = "camelCase")]
    AddDescription { node_id: String },
    #[serde(rename_all = "camelCase")]
    Merge {
        node_ids: Vec<String>,
        suggested_name: String,
    },
    #[serde(rename_all = "camelCase")]
    AddRelation {
        source: String,
        target: String,
        relation_type: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        weight: Option<f64>,
    },
    #[serde(rename_all = "camelCase")]
    ChangeCategory { node_id: String, new_type: String },
    #[serde(rename_all = "camelCase")]
    Rename { node_id: String, new_label: String },
}

impl Fix {
    pub fn kind(&self) -> FixKind {
        match self {
            Fix::Delete { .. } => FixKind::Delete,
            Fix::AddDescription { .. } => FixKind::AddDescription,
            Fix::Merge { .. } => FixKind::Merge,
            Fix::AddRelation { .. } => FixKind::AddRelation,
            Fix::ChangeCategory { .. } => FixKind::ChangeCategory,
            Fix::Rename { .. } => FixKind::Rename,
        }
    }
}

/// Discriminant of a [`Fix`], used in error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixKind {
    Delete,
    AddDescription,
    Merge,
    AddRelation,
    ChangeCategory,
    Rename,
}

impl fmt::Display for FixKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FixKind::Delete => "delete",
            FixKind::AddDescription => "add_description",
            FixKind::Merge => "merge",
            FixKind::AddRelation => "add_relation",
            FixKind::ChangeCategory => "change_category",
            FixKind::Rename => "rename",
        };
        f.write_str(name)
    }
}

/// A detected defect, optionally carrying the fix that repairs it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: IssueKind,
    pub severity: Severity,
    pub node_ids: Vec<String>,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix: Option<Fix>,
}
