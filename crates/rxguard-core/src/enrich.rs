//! Deterministic clinical rule enrichment.
//!
//! Runs on every result regardless of whether the AI reasoner succeeded or
//! fell back. Rules are additive only: they never remove or downgrade
//! anything the reasoner produced.

use chrono::Utc;

use crate::matcher::normalized_key;
use crate::models::{
    AnalysisResult, Contraindication, DosingAdjustment, PatientProfile, Severity, Warning,
    WarningCategory,
};

/// NSAIDs considered potentially inappropriate in patients aged 65+.
pub const ELDERLY_INAPPROPRIATE: &[&str] =
    &["ibuprofen", "diclofenac", "indomethacin", "ketorolac"];

/// Drug classes contraindicated under impaired kidney function.
pub const NEPHROTOXIC: &[&str] = &["ibuprofen", "diclofenac", "naproxen", "metformin"];

/// Apply the deterministic clinical rules to an analysis result, in order:
/// age-related warnings, disease-based contraindications, timestamp fill.
pub fn enrich(result: &mut AnalysisResult, patient: &PatientProfile, new_medications: &[String]) {
    apply_age_rules(result, patient, new_medications);
    apply_kidney_rules(result, patient, new_medications);

    if result.timestamp.is_none() {
        result.timestamp = Some(Utc::now());
    }
}

fn lexical_class_match(medication: &str, class_names: &[&str]) -> bool {
    let key = normalized_key(medication);
    if key.is_empty() {
        return false;
    }
    class_names
        .iter()
        .any(|name| key.contains(name) || name.contains(key.as_str()))
}

fn apply_age_rules(
    result: &mut AnalysisResult,
    patient: &PatientProfile,
    new_medications: &[String],
) {
    if !patient.is_geriatric() {
        return;
    }

    for medication in new_medications {
        if !lexical_class_match(medication, ELDERLY_INAPPROPRIATE) {
            continue;
        }

        tracing::debug!(
            patient_id = %patient.id,
            medication = %medication,
            age = patient.age,
            "appending age-related warning"
        );

        result.warnings.push(Warning {
            severity: Severity::Moderate,
            category: WarningCategory::AgeRelated,
            drugs_involved: vec![medication.clone()],
            description: format!(
                "Potentially inappropriate medication in elderly patient (age {})",
                patient.age
            ),
            clinical_significance: "Increased risk of adverse effects in geriatric population"
                .into(),
            recommendation: "Consider alternative medication or dose reduction".into(),
            monitoring_required: "Enhanced monitoring for adverse effects".into(),
        });

        result.dosing_adjustments.push(DosingAdjustment {
            drug: medication.clone(),
            standard_dose: "Adult dose".into(),
            recommended_dose: "Reduce dose by 25-50% or consider alternative".into(),
            reason: format!(
                "Age-related dose adjustment for {} year old patient",
                patient.age
            ),
        });
    }
}

fn apply_kidney_rules(
    result: &mut AnalysisResult,
    patient: &PatientProfile,
    new_medications: &[String],
) {
    if !patient.has_kidney_impairment() {
        return;
    }

    let diagnosis = patient
        .diagnoses
        .iter()
        .find(|d| {
            let d = d.to_lowercase();
            d.contains("kidney") || d.contains("renal") || d.contains("ginjal")
        })
        .cloned()
        .unwrap_or_else(|| "Kidney impairment".into());

    for medication in new_medications {
        if !lexical_class_match(medication, NEPHROTOXIC) {
            continue;
        }

        tracing::debug!(
            patient_id = %patient.id,
            medication = %medication,
            "appending nephrotoxicity contraindication"
        );

        result.contraindications.push(Contraindication {
            drug: medication.clone(),
            diagnosis: diagnosis.clone(),
            reason: "Nephrotoxic medication contraindicated in kidney impairment".into(),
            alternative_suggested: Some("Paracetamol (if pain relief needed)".into()),
        });
    }
}
