//! Bundled fallback dataset.
//!
//! A static snapshot of interaction rules and reference patients compiled
//! into the binary. Used whenever the primary store is unreachable so an
//! analysis degrades to older knowledge instead of failing outright.

use std::sync::OnceLock;

use crate::models::{InteractionRule, PatientProfile};

const INTERACTIONS_JSON: &str = include_str!("../../data/interactions.json");
const PATIENTS_JSON: &str = include_str!("../../data/patients.json");

static FALLBACK: OnceLock<FallbackData> = OnceLock::new();

/// Parsed bundled datasets.
pub struct FallbackData {
    rules: Vec<InteractionRule>,
    patients: Vec<PatientProfile>,
}

impl FallbackData {
    /// Access the process-wide fallback dataset, parsing it on first use.
    ///
    /// A bundled file that fails to parse yields an empty list (logged),
    /// never an error: absence of data degrades matching, it does not
    /// fail the analysis.
    pub fn get() -> &'static FallbackData {
        FALLBACK.get_or_init(|| FallbackData {
            rules: parse_bundled("interactions", INTERACTIONS_JSON),
            patients: parse_bundled("patients", PATIENTS_JSON),
        })
    }

    /// Active rules from the bundled snapshot.
    pub fn active_rules(&self) -> Vec<InteractionRule> {
        self.rules.iter().filter(|r| r.active).cloned().collect()
    }

    /// Look up a bundled patient by id.
    pub fn patient(&self, id: &str) -> Option<PatientProfile> {
        self.patients.iter().find(|p| p.id == id).cloned()
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn patient_count(&self) -> usize {
        self.patients.len()
    }
}

fn parse_bundled<T: serde::de::DeserializeOwned>(name: &str, json: &str) -> Vec<T> {
    match serde_json::from_str(json) {
        Ok(items) => items,
        Err(error) => {
            tracing::error!(dataset = name, %error, "bundled fallback dataset failed to parse");
            Vec::new()
        }
    }
}
