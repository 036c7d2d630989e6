//! Patient profile as supplied by the patient store.

use serde::{Deserialize, Serialize};

/// A patient's clinical context for one analysis request.
///
/// Supplied per request by an external collaborator; the engine never
/// mutates it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientProfile {
    pub id: String,
    pub name: String,
    pub age: u32,
    pub gender: String,
    pub weight_kg: Option<f64>,
    /// Free-text diagnoses (e.g. "Atrial Fibrillation (chronic)").
    #[serde(default, alias = "diagnoses_text")]
    pub diagnoses: Vec<String>,
    /// Active medications as clinician-entered strings ("Warfarin 5mg OD").
    #[serde(default)]
    pub current_medications: Vec<String>,
    #[serde(default)]
    pub allergies: Vec<String>,
}

impl PatientProfile {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        age: u32,
        gender: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            age,
            gender: gender.into(),
            weight_kg: None,
            diagnoses: Vec::new(),
            current_medications: Vec::new(),
            allergies: Vec::new(),
        }
    }

    /// Geriatric threshold used by the age-related enrichment rule.
    pub fn is_geriatric(&self) -> bool {
        self.age >= 65
    }

    /// Whether any diagnosis textually indicates impaired kidney function.
    pub fn has_kidney_impairment(&self) -> bool {
        self.diagnoses.iter().any(|d| {
            let d = d.to_lowercase();
            d.contains("kidney") || d.contains("renal") || d.contains("ginjal")
        })
    }
}
