//! Analysis request and result types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Severity;

/// One incoming analysis call. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisRequest {
    pub patient_id: String,
    pub new_medications: Vec<String>,
    #[serde(default, alias = "notes")]
    pub clinical_notes: String,
}

impl AnalysisRequest {
    pub fn new(patient_id: impl Into<String>, new_medications: Vec<String>) -> Self {
        Self {
            patient_id: patient_id.into(),
            new_medications,
            clinical_notes: String::new(),
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.clinical_notes = notes.into();
        self
    }
}

/// What kind of clinical concern a warning describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WarningCategory {
    DrugInteraction,
    Contraindication,
    Allergy,
    AgeRelated,
    Dosing,
    SystemError,
}

impl WarningCategory {
    /// Lenient parse for AI-produced categories. Unknown values return
    /// `None`; ingestion defaults those to `SystemError`.
    pub fn parse_lenient(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "DRUG_INTERACTION" => Some(WarningCategory::DrugInteraction),
            "CONTRAINDICATION" => Some(WarningCategory::Contraindication),
            "ALLERGY" => Some(WarningCategory::Allergy),
            "AGE_RELATED" => Some(WarningCategory::AgeRelated),
            "DOSING" => Some(WarningCategory::Dosing),
            "SYSTEM_ERROR" => Some(WarningCategory::SystemError),
            _ => None,
        }
    }
}

/// A single clinical warning in an analysis result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Warning {
    pub severity: Severity,
    #[serde(alias = "type")]
    pub category: WarningCategory,
    pub drugs_involved: Vec<String>,
    pub description: String,
    pub clinical_significance: String,
    pub recommendation: String,
    pub monitoring_required: String,
}

/// A drug that should not be given due to a specific diagnosis.
///
/// Always structured; legacy flat-string forms are coerced at the wire
/// boundary, never stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Contraindication {
    pub drug: String,
    pub diagnosis: String,
    pub reason: String,
    pub alternative_suggested: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DosingAdjustment {
    pub drug: String,
    pub standard_dose: String,
    pub recommended_dose: String,
    pub reason: String,
}

/// Where the knowledge backing an analysis came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Database,
    Fallback,
}

impl DataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSource::Database => "database",
            DataSource::Fallback => "fallback",
        }
    }
}

/// The complete outcome of one analysis request.
///
/// Invariant: `overall_risk_level` equals the maximum severity among
/// `warnings` (`Low` if none); `risk::apply` enforces this before the
/// result leaves the orchestrator. Never mutated after being returned;
/// cached by value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisResult {
    pub patient_id: String,
    pub overall_risk_level: Severity,
    pub safe_to_prescribe: bool,
    pub warnings: Vec<Warning>,
    pub contraindications: Vec<Contraindication>,
    pub dosing_adjustments: Vec<DosingAdjustment>,
    pub monitoring_plan: Vec<String>,
    #[serde(alias = "llm_reasoning")]
    pub reasoning: String,
    pub confidence_score: f64,
    pub processing_time_ms: u64,
    pub cache_used: bool,
    pub data_source: DataSource,
    pub timestamp: Option<DateTime<Utc>>,
}
