//! Pairwise interaction matching over a medication list.
//!
//! Matching is intentionally permissive (case-insensitive substring
//! containment, both directions): the clinical cost of a missed interaction
//! outweighs a spurious warning. A drug ontology or NLP normalizer is out
//! of scope.

use std::collections::HashSet;

use crate::models::InteractionRule;

/// Derive the normalized lexical key for a clinician-entered medication
/// string: lowercased, trimmed, first whitespace token.
///
/// "Ibuprofen 400mg TID" → "ibuprofen". Empty input yields an empty key,
/// which never matches any rule.
pub fn normalized_key(raw: &str) -> String {
    raw.trim()
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

/// Result of a pairwise matching pass.
#[derive(Debug, Clone)]
pub struct MatchOutcome {
    /// Rules that matched at least one medication pair, deduplicated by
    /// rule id, in first-hit order.
    pub hits: Vec<InteractionRule>,
    /// Number of unordered pairs examined: exactly C(n, 2).
    pub pairs_checked: usize,
}

/// Match every unordered medication pair against the rule set.
///
/// For `n` medications, examines exactly `n * (n - 1) / 2` pairs. Inactive
/// rules are excluded, and a rule that matches several pairs is reported
/// once. Symmetric: reordering the medication list yields the same hits.
pub fn match_rules(medications: &[String], rules: &[InteractionRule]) -> MatchOutcome {
    let keys: Vec<String> = medications.iter().map(|m| normalized_key(m)).collect();

    // Narrow to rules that involve any medication at all before the
    // pairwise pass; with large rule sets most are irrelevant.
    let candidates = relevant_rules(medications, rules);

    let mut hits: Vec<InteractionRule> = Vec::new();
    // Dedupe by position in the candidate slice, not by `id`: datasets
    // without explicit ids all carry the default 0, and keying on that
    // would collapse distinct rules into one hit.
    let mut seen: HashSet<usize> = HashSet::new();
    let mut pairs_checked = 0usize;

    for i in 0..keys.len() {
        for j in (i + 1)..keys.len() {
            pairs_checked += 1;
            for (idx, rule) in candidates.iter().enumerate() {
                if rule.matches_pair(&keys[i], &keys[j]) && seen.insert(idx) {
                    hits.push((*rule).clone());
                }
            }
        }
    }

    MatchOutcome {
        hits,
        pairs_checked,
    }
}

/// Rules that involve any single medication in the list (either drug side).
///
/// Looser than `match_rules`: one matching side is enough. Used to keep
/// the reasoning prompt small without dropping context about medications
/// whose partner drug is not on the list.
pub fn relevant_rules<'a>(
    medications: &[String],
    rules: &'a [InteractionRule],
) -> Vec<&'a InteractionRule> {
    let keys: Vec<String> = medications.iter().map(|m| normalized_key(m)).collect();

    rules
        .iter()
        .filter(|rule| rule.active)
        .filter(|rule| keys.iter().any(|key| rule.involves(key)))
        .collect()
}
