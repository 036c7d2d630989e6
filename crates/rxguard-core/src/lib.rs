//! Core drug interaction analysis primitives.
//!
//! This crate provides the deterministic half of the analysis pipeline:
//!
//! 1. [`knowledge`] resolves interaction rules and patient profiles from
//!    SQLite with transparent fallback to a bundled dataset.
//! 2. [`matcher`] checks every pair of a patient's medications against the
//!    rule set using lexical name matching.
//! 3. [`enrich`] appends deterministic clinical safeguards (geriatric NSAID
//!    warnings, nephrotoxic contraindications).
//! 4. [`risk`] derives the overall risk level and prescribing verdict.
//! 5. [`cache`] memoizes completed analyses keyed by patient, medications,
//!    and notes.
//!
//! The probabilistic half (prompting and response extraction) lives in the
//! companion engine crate, which orchestrates both.

pub mod cache;
pub mod enrich;
pub mod knowledge;
pub mod matcher;
pub mod models;
pub mod risk;

pub use cache::{cache_key, AnalysisCache, CacheStats};
pub use knowledge::{FallbackData, KnowledgeError, KnowledgeSource, SqliteStore};
pub use matcher::{match_rules, normalized_key, relevant_rules, MatchOutcome};
pub use models::{
    AnalysisRequest, AnalysisResult, Contraindication, DataSource, DosingAdjustment,
    InteractionRule, PatientProfile, Severity, Warning, WarningCategory,
};
