//! Curated drug interaction rules.

use serde::{Deserialize, Serialize};

use super::Severity;

fn default_active() -> bool {
    true
}

/// One curated pairwise interaction rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InteractionRule {
    #[serde(default)]
    pub id: i64,
    pub drug_a: String,
    pub drug_b: String,
    pub severity: Severity,
    pub description: String,
    #[serde(default)]
    pub mechanism: String,
    #[serde(default)]
    pub clinical_effect: String,
    #[serde(default)]
    pub recommendation: String,
    #[serde(default)]
    pub monitoring: String,
    #[serde(default)]
    pub evidence_level: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

/// Case-insensitive lexical match between a rule's drug name and a
/// normalized medication key, containment in either direction so that
/// "warfarin" matches "warfarin sodium" and vice versa. An empty key
/// matches nothing: `contains("")` is vacuously true and would make a
/// blank medication entry match every rule.
fn name_matches(rule_drug: &str, med_key: &str) -> bool {
    if med_key.is_empty() {
        return false;
    }
    let rule_key = rule_drug.trim().to_lowercase();
    if rule_key.is_empty() {
        return false;
    }
    rule_key.contains(med_key) || med_key.contains(&rule_key)
}

impl InteractionRule {
    /// Whether either side of the rule matches the given medication key.
    pub fn involves(&self, med_key: &str) -> bool {
        name_matches(&self.drug_a, med_key) || name_matches(&self.drug_b, med_key)
    }

    /// Whether the rule matches an unordered medication pair: one key must
    /// match `drug_a` and the other `drug_b`, in either assignment.
    pub fn matches_pair(&self, key_a: &str, key_b: &str) -> bool {
        (name_matches(&self.drug_a, key_a) && name_matches(&self.drug_b, key_b))
            || (name_matches(&self.drug_a, key_b) && name_matches(&self.drug_b, key_a))
    }
}
