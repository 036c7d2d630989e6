//! Extraction and validation of model responses.
//!
//! Model output is untrusted text: it may be wrapped in markdown fences,
//! preceded by prose, use legacy field names, or omit fields entirely.
//! Ingestion is lenient about shape but strict about the required fields;
//! anything invalid is an [`ExtractionError`] so the caller can retry.

use serde::Deserialize;
use thiserror::Error;

use rxguard_core::models::{
    Contraindication, DosingAdjustment, Severity, Warning, WarningCategory,
};

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("no JSON object found in response")]
    NoJsonFound,

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("missing required field: {0}")]
    MissingField(&'static str),
}

pub type ExtractionResult<T> = Result<T, ExtractionError>;

/// The validated clinical analysis extracted from one model response.
///
/// Contains only the model-authored fields; orchestration metadata
/// (timings, cache flags, data source) is attached later.
#[derive(Debug, Clone)]
pub struct ParsedAnalysis {
    pub overall_risk_level: Severity,
    pub safe_to_prescribe: bool,
    pub warnings: Vec<Warning>,
    pub contraindications: Vec<Contraindication>,
    pub dosing_adjustments: Vec<DosingAdjustment>,
    pub monitoring_plan: Vec<String>,
    pub reasoning: String,
    pub confidence_score: f64,
}

/// Strip a surrounding markdown code fence (```json ... ``` or ``` ... ```).
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop an optional language tag on the fence line.
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.trim_start();
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Slice out the outermost JSON object, tolerating prose before or after.
fn json_slice(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end >= start).then(|| &text[start..=end])
}

/// Raw wire shape before validation. Every field optional or defaulted so
/// a partially conforming response still parses; validation happens after.
#[derive(Debug, Deserialize)]
struct RawAnalysis {
    overall_risk_level: Option<String>,
    safe_to_prescribe: Option<bool>,
    warnings: Option<Vec<RawWarning>>,
    #[serde(default)]
    contraindications: Vec<RawContraindication>,
    #[serde(default)]
    dosing_adjustments: Vec<RawDosingAdjustment>,
    #[serde(default)]
    monitoring_plan: Vec<String>,
    #[serde(alias = "llm_reasoning")]
    reasoning: Option<String>,
    #[serde(default)]
    confidence_score: f64,
}

#[derive(Debug, Deserialize)]
struct RawWarning {
    severity: Option<String>,
    #[serde(alias = "type")]
    category: Option<String>,
    #[serde(default)]
    drugs_involved: Vec<String>,
    description: Option<String>,
    clinical_significance: Option<String>,
    recommendation: Option<String>,
    monitoring_required: Option<String>,
}

/// Legacy responses emit contraindications as flat strings; current ones
/// as structured objects. Both coerce to the structured model.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawContraindication {
    Structured {
        drug: Option<String>,
        diagnosis: Option<String>,
        reason: Option<String>,
        #[serde(default)]
        alternative_suggested: Option<String>,
    },
    Legacy(String),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawDosingAdjustment {
    Structured {
        drug: Option<String>,
        standard_dose: Option<String>,
        recommended_dose: Option<String>,
        reason: Option<String>,
    },
    Legacy(String),
}

impl RawWarning {
    fn into_warning(self) -> Warning {
        Warning {
            severity: self
                .severity
                .as_deref()
                .and_then(Severity::parse_lenient)
                .unwrap_or(Severity::Moderate),
            category: self
                .category
                .as_deref()
                .and_then(WarningCategory::parse_lenient)
                .unwrap_or(WarningCategory::SystemError),
            drugs_involved: self.drugs_involved,
            description: self
                .description
                .unwrap_or_else(|| "Drug interaction detected".into()),
            clinical_significance: self
                .clinical_significance
                .unwrap_or_else(|| "Clinical assessment required".into()),
            recommendation: self
                .recommendation
                .unwrap_or_else(|| "Consult healthcare provider".into()),
            monitoring_required: self
                .monitoring_required
                .unwrap_or_else(|| "Standard monitoring".into()),
        }
    }
}

impl RawContraindication {
    fn into_contraindication(self) -> Contraindication {
        match self {
            RawContraindication::Structured {
                drug,
                diagnosis,
                reason,
                alternative_suggested,
            } => Contraindication {
                drug: drug.unwrap_or_else(|| "Unknown".into()),
                diagnosis: diagnosis.unwrap_or_else(|| "Unspecified".into()),
                reason: reason.unwrap_or_else(|| "See clinical notes".into()),
                alternative_suggested,
            },
            RawContraindication::Legacy(text) => Contraindication {
                drug: "Unknown".into(),
                diagnosis: "Unspecified".into(),
                reason: text,
                alternative_suggested: None,
            },
        }
    }
}

impl RawDosingAdjustment {
    fn into_adjustment(self) -> DosingAdjustment {
        match self {
            RawDosingAdjustment::Structured {
                drug,
                standard_dose,
                recommended_dose,
                reason,
            } => DosingAdjustment {
                drug: drug.unwrap_or_else(|| "Unknown".into()),
                standard_dose: standard_dose.unwrap_or_else(|| "Standard dosing".into()),
                recommended_dose: recommended_dose
                    .unwrap_or_else(|| "See clinical notes".into()),
                reason: reason.unwrap_or_else(|| "Clinical adjustment advised".into()),
            },
            RawDosingAdjustment::Legacy(text) => DosingAdjustment {
                drug: "Unknown".into(),
                standard_dose: "Standard dosing".into(),
                recommended_dose: "See clinical notes".into(),
                reason: text,
            },
        }
    }
}

/// Parse and validate one model response.
///
/// Required fields: `overall_risk_level`, `safe_to_prescribe`, `warnings`,
/// `reasoning` (or its legacy alias). An unrecognized risk level coerces to
/// `Moderate` rather than failing; a missing one is a retryable error.
pub fn parse_analysis(text: &str) -> ExtractionResult<ParsedAnalysis> {
    let body = strip_code_fences(text);
    let json = json_slice(body).ok_or(ExtractionError::NoJsonFound)?;
    let raw: RawAnalysis = serde_json::from_str(json)?;

    let risk_text = raw
        .overall_risk_level
        .ok_or(ExtractionError::MissingField("overall_risk_level"))?;
    let overall_risk_level =
        Severity::parse_lenient(&risk_text).unwrap_or(Severity::Moderate);

    let safe_to_prescribe = raw
        .safe_to_prescribe
        .ok_or(ExtractionError::MissingField("safe_to_prescribe"))?;
    let warnings = raw
        .warnings
        .ok_or(ExtractionError::MissingField("warnings"))?;
    let reasoning = raw
        .reasoning
        .ok_or(ExtractionError::MissingField("reasoning"))?;

    Ok(ParsedAnalysis {
        overall_risk_level,
        safe_to_prescribe,
        warnings: warnings.into_iter().map(RawWarning::into_warning).collect(),
        contraindications: raw
            .contraindications
            .into_iter()
            .map(RawContraindication::into_contraindication)
            .collect(),
        dosing_adjustments: raw
            .dosing_adjustments
            .into_iter()
            .map(RawDosingAdjustment::into_adjustment)
            .collect(),
        monitoring_plan: raw.monitoring_plan,
        reasoning,
        confidence_score: raw.confidence_score.clamp(0.0, 1.0),
    })
}
