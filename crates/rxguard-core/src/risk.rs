//! Overall risk aggregation and the prescribe/no-prescribe decision.

use crate::models::{AnalysisResult, Contraindication, Severity, Warning};

/// Compute `(overall_risk_level, safe_to_prescribe)` from warnings and
/// contraindications.
///
/// The overall risk level is the maximum severity across all warnings
/// (`Low` if the list is empty). Prescribing is safe only when the risk is
/// at most `Minor` and no contraindications exist.
pub fn aggregate(
    warnings: &[Warning],
    contraindications: &[Contraindication],
) -> (Severity, bool) {
    let overall = warnings
        .iter()
        .map(|w| w.severity)
        .max()
        .unwrap_or(Severity::Low);
    let safe = overall <= Severity::Minor && contraindications.is_empty();
    (overall, safe)
}

/// Re-derive the aggregate fields of a result from its own warnings.
///
/// Called after enrichment so the max-severity invariant holds for every
/// result the orchestrator returns, including AI responses whose claimed
/// overall risk disagrees with their warning list.
pub fn apply(result: &mut AnalysisResult) {
    let (overall, safe) = aggregate(&result.warnings, &result.contraindications);
    result.overall_risk_level = overall;
    result.safe_to_prescribe = safe;
}
