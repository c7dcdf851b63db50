//! Graphmend core data model.
//!
//! A knowledge graph here is a plain value: typed nodes, typed weighted
//! edges, and nothing else. Fragment graphs come out of extraction, the
//! unified graph comes out of [`merge::merge`], and defects found by the
//! analyzer are carried as [`Issue`] values with optional machine-applicable
//! [`Fix`]es.

pub mod extraction;
pub mod graph;
pub mod issue;
pub mod merge;

pub use extraction::{ExtractionMetadata, ExtractionResult};
pub use graph::{Edge, EdgeKey, Graph, Node, PropertyValue};
pub use issue::{Fix, FixKind, Issue, IssueKind, Severity};
pub use merge::{merge, MergeStats};
