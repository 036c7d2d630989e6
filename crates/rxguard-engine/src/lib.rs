//! AI-augmented drug interaction analysis engine.
//!
//! Orchestrates the deterministic core pipeline with deadline-bounded AI
//! clinical reasoning:
//!
//! - [`prompts`] renders the patient context and matched rules into a
//!   clinical prompt.
//! - [`reasoner`] calls the reasoning backend with retries and a hard
//!   deadline, reporting every terminal state as a tagged outcome.
//! - [`extraction`] validates and coerces the model's JSON response.
//! - [`analyzer`] ties it together: cache, knowledge, matching, reasoning,
//!   enrichment, risk aggregation, audit.
//! - [`audit`] records every completed analysis fire-and-forget.

pub mod analyzer;
pub mod audit;
pub mod extraction;
pub mod prompts;
pub mod reasoner;

pub use analyzer::{AnalyzeError, AnalyzerConfig, DataSourceStatus, InteractionAnalyzer};
pub use audit::{AuditRecord, AuditSink, MemoryAuditSink};
pub use extraction::{parse_analysis, ExtractionError, ParsedAnalysis};
pub use reasoner::{
    fallback_analysis, CannedService, ReasonError, ReasonOutcome, Reasoner, ReasonerConfig,
    ReasoningService, ServiceError,
};
