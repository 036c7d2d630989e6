//! Clinical severity scale.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Severity of an interaction or warning, ordered from least to most
/// severe. The derived `Ord` is the clinical escalation order used by
/// risk aggregation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Minor,
    Moderate,
    Major,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Minor => "MINOR",
            Severity::Moderate => "MODERATE",
            Severity::Major => "MAJOR",
        }
    }

    /// Parse AI- or database-produced severity text. Accepts the legacy
    /// spellings `NONE` and `NO_INTERACTION` as `Low`. Unknown values
    /// return `None`; callers choose their own conservative default.
    pub fn parse_lenient(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "LOW" | "NONE" | "NO_INTERACTION" => Some(Severity::Low),
            "MINOR" => Some(Severity::Minor),
            "MODERATE" => Some(Severity::Moderate),
            "MAJOR" => Some(Severity::Major),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
