//! Prompt construction for the clinical reasoning model.

use rxguard_core::models::{InteractionRule, PatientProfile};

/// System role given to the reasoning model on every call.
pub const SYSTEM_PROMPT: &str = "You are a clinical pharmacist AI assistant specializing in \
drug interaction analysis. You analyze medication combinations against patient context and \
known interaction data. Respond with valid JSON only, no prose before or after.";

fn format_medication_list(medications: &[String]) -> String {
    if medications.is_empty() {
        return "None currently prescribed".to_string();
    }
    medications
        .iter()
        .enumerate()
        .map(|(i, m)| format!("  {}. {}", i + 1, m))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_rules(rules: &[InteractionRule]) -> String {
    if rules.is_empty() {
        return "No known interactions found in the database for these medications.".to_string();
    }
    rules
        .iter()
        .map(|r| {
            format!(
                "- {} + {} [{}]: {}. Effect: {}. Recommendation: {}",
                r.drug_a, r.drug_b, r.severity, r.description, r.clinical_effect, r.recommendation
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the full clinical analysis prompt.
///
/// `matched_rules` are the database hits for the combined medication list;
/// they anchor the model's reasoning in curated knowledge rather than
/// asking it to recall interactions from training data.
pub fn build_clinical_prompt(
    patient: &PatientProfile,
    new_medications: &[String],
    matched_rules: &[InteractionRule],
    clinical_notes: &str,
) -> String {
    let notes = if clinical_notes.trim().is_empty() {
        "None provided"
    } else {
        clinical_notes
    };

    format!(
        r#"Analyze the following prescription for drug interactions and patient-specific risks.

PATIENT PROFILE:
- ID: {id}
- Age: {age} years, Gender: {gender}
- Weight: {weight}
- Diagnoses: {diagnoses}
- Allergies: {allergies}

CURRENT MEDICATIONS:
{current}

NEW MEDICATIONS TO PRESCRIBE:
{new}

KNOWN INTERACTIONS (from curated database):
{rules}

CLINICAL NOTES:
{notes}

ANALYSIS PRIORITIES:
1. Drug-drug interactions between current and new medications
2. Patient-specific contraindications (age, diagnoses, allergies)
3. Dosing concerns given patient factors
4. Required monitoring

Respond with JSON in exactly this structure:
{{
  "overall_risk_level": "LOW|MINOR|MODERATE|MAJOR",
  "safe_to_prescribe": true,
  "warnings": [
    {{
      "severity": "LOW|MINOR|MODERATE|MAJOR",
      "category": "DRUG_INTERACTION|CONTRAINDICATION|ALLERGY|AGE_RELATED|DOSING",
      "drugs_involved": ["Drug A", "Drug B"],
      "description": "...",
      "clinical_significance": "...",
      "recommendation": "...",
      "monitoring_required": "..."
    }}
  ],
  "contraindications": [
    {{
      "drug": "...",
      "diagnosis": "...",
      "reason": "...",
      "alternative_suggested": "..."
    }}
  ],
  "dosing_adjustments": [
    {{
      "drug": "...",
      "standard_dose": "...",
      "recommended_dose": "...",
      "reason": "..."
    }}
  ],
  "monitoring_plan": ["..."],
  "reasoning": "Step-by-step clinical reasoning",
  "confidence_score": 0.0
}}"#,
        id = patient.id,
        age = patient.age,
        gender = patient.gender,
        weight = patient
            .weight_kg
            .map(|w| format!("{w} kg"))
            .unwrap_or_else(|| "Not recorded".to_string()),
        diagnoses = if patient.diagnoses.is_empty() {
            "None recorded".to_string()
        } else {
            patient.diagnoses.join("; ")
        },
        allergies = if patient.allergies.is_empty() {
            "No known allergies".to_string()
        } else {
            patient.allergies.join("; ")
        },
        current = format_medication_list(&patient.current_medications),
        new = format_medication_list(new_medications),
        rules = format_rules(matched_rules),
        notes = notes,
    )
}
