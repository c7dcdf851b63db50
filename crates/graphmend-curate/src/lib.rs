//! Graphmend curation pipeline: LLM-assisted extraction, analysis, repair.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                       CURATION PIPELINE                             │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │                                                                     │
//! │  Document ──► Extractor ──► Fragment Graph ──► Graph Store          │
//! │                  │                                  │               │
//! │                  ▼                                  ▼               │
//! │              TextModel                        Merge Engine          │
//! │             (LLM, opaque)                           │               │
//! │                  ▲                                  ▼               │
//! │                  │                           Unified Graph          │
//! │                  │                                  │               │
//! │              Analyzer ◄─────────────────────────────┤               │
//! │           (tier 1 + tier 2)                         │               │
//! │                  │                                  ▼               │
//! │              Issue List ──► operator ──► Fix Applier ──► mutated    │
//! │                                                          graph      │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The model is an opaque `prompt -> text` collaborator with no determinism
//! guarantee. Everything in this crate wraps, validates, or reconciles its
//! output:
//!
//! - [`extraction`] turns one document into a self-contained fragment graph,
//!   degrading to an empty result when the model output does not parse;
//! - [`analysis`] audits a graph in two tiers: deterministic checks that
//!   cannot fail, and a best-effort model pass whose failure is swallowed;
//! - [`fixes`] applies one structured fix at a time, staged and committed
//!   atomically so a failed fix never leaves a partial write;
//! - [`service`] is the request/response surface gluing the pieces over a
//!   graph store, with a single-writer lock on fix application.

pub mod analysis;
pub mod extraction;
pub mod fixes;
pub mod llm;
pub mod payload;
pub mod prompts;
pub mod service;

pub use analysis::{AnalysisStats, Analyzer};
pub use extraction::{ExtractError, Extractor};
pub use fixes::{FixApplier, FixError, FixOutcome};
pub use llm::{CompletionOptions, LlmError, MockModel, TextModel};
pub use service::{
    AnalyzeRequest, AnalyzeResponse, CurationService, ExtractRequest, ExtractResponse,
    ExtractionTask, FixRequest, FixResponse, MergeRequest, MergeResponse, ServiceError,
};
