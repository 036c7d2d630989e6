//! Deadline-bounded AI clinical reasoning.
//!
//! The reasoning service itself is a synchronous external collaborator
//! behind the [`ReasoningService`] trait. The reasoner wraps it with
//! retries, response extraction, and a hard deadline, and reports every
//! terminal state as a tagged [`ReasonOutcome`] so the orchestrator has a
//! single decision point for degraded analyses.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use rxguard_core::models::{
    InteractionRule, PatientProfile, Severity, Warning, WarningCategory,
};

use crate::extraction::{parse_analysis, ExtractionError, ParsedAnalysis};
use crate::prompts::{build_clinical_prompt, SYSTEM_PROMPT};

/// Failure reported by a reasoning service call.
#[derive(Error, Debug, Clone)]
#[error("reasoning service error: {0}")]
pub struct ServiceError(pub String);

/// A synchronous completion backend (remote inference API or local model).
///
/// `complete` may block; the reasoner always invokes it on a blocking
/// worker thread.
pub trait ReasoningService: Send + Sync {
    fn complete(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, ServiceError>;
}

/// Fixed-response service for tests and offline demos.
pub struct CannedService {
    response: String,
}

impl CannedService {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
        }
    }
}

impl ReasoningService for CannedService {
    fn complete(
        &self,
        _prompt: &str,
        _max_tokens: u32,
        _temperature: f32,
    ) -> Result<String, ServiceError> {
        Ok(self.response.clone())
    }
}

#[derive(Error, Debug)]
pub enum ReasonError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("reasoning worker failed: {0}")]
    Worker(String),
}

/// Terminal state of one reasoning attempt sequence.
#[derive(Debug)]
pub enum ReasonOutcome {
    /// A valid analysis was extracted. `raw` is the verbatim model output
    /// kept for auditing.
    Ok {
        analysis: ParsedAnalysis,
        raw: String,
    },
    /// The deadline elapsed before any attempt produced a valid analysis.
    TimedOut,
    /// All retries exhausted without a valid analysis.
    Failed(ReasonError),
}

/// Reasoner tuning knobs.
#[derive(Debug, Clone)]
pub struct ReasonerConfig {
    /// Hard deadline for the whole attempt sequence, retries included.
    pub deadline: Duration,
    /// Total attempts (first call plus retries).
    pub max_attempts: u32,
    /// Sleep before retry `n` (1-based); the last entry repeats if there
    /// are more retries than entries.
    pub retry_backoff: Vec<Duration>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for ReasonerConfig {
    fn default() -> Self {
        Self {
            deadline: Duration::from_millis(2500),
            max_attempts: 3,
            retry_backoff: vec![Duration::from_secs(1), Duration::from_secs(2)],
            max_tokens: 2000,
            temperature: 0.1,
        }
    }
}

/// Deadline-bounded, retrying wrapper around a [`ReasoningService`].
pub struct Reasoner {
    service: Arc<dyn ReasoningService>,
    config: ReasonerConfig,
}

impl Reasoner {
    pub fn new(service: Arc<dyn ReasoningService>, config: ReasonerConfig) -> Self {
        Self { service, config }
    }

    pub fn config(&self) -> &ReasonerConfig {
        &self.config
    }

    /// Run the reasoning sequence for one analysis request.
    ///
    /// Never returns an error: every failure mode is a tagged outcome. On
    /// timeout the in-flight attempt is abandoned (the worker thread runs
    /// to completion but its result is dropped).
    pub async fn reason(
        &self,
        patient: &PatientProfile,
        new_medications: &[String],
        matched_rules: &[InteractionRule],
        clinical_notes: &str,
    ) -> ReasonOutcome {
        let prompt = format!(
            "{SYSTEM_PROMPT}\n\n{}",
            build_clinical_prompt(patient, new_medications, matched_rules, clinical_notes)
        );

        match tokio::time::timeout(self.config.deadline, self.attempt_loop(prompt)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::warn!(
                    deadline_ms = self.config.deadline.as_millis() as u64,
                    "reasoning deadline elapsed"
                );
                ReasonOutcome::TimedOut
            }
        }
    }

    async fn attempt_loop(&self, prompt: String) -> ReasonOutcome {
        let mut last_error = ReasonError::Worker("no attempts were made".into());

        for attempt in 0..self.config.max_attempts {
            if attempt > 0 {
                let backoff = self
                    .config
                    .retry_backoff
                    .get(attempt as usize - 1)
                    .or(self.config.retry_backoff.last())
                    .copied()
                    .unwrap_or(Duration::from_secs(1));
                tokio::time::sleep(backoff).await;
            }

            match self.attempt(&prompt).await {
                Ok(outcome) => return outcome,
                Err(error) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_attempts = self.config.max_attempts,
                        %error,
                        "reasoning attempt failed"
                    );
                    last_error = error;
                }
            }
        }

        ReasonOutcome::Failed(last_error)
    }

    async fn attempt(&self, prompt: &str) -> Result<ReasonOutcome, ReasonError> {
        let service = Arc::clone(&self.service);
        let prompt = prompt.to_string();
        let max_tokens = self.config.max_tokens;
        let temperature = self.config.temperature;

        let raw = tokio::task::spawn_blocking(move || {
            service.complete(&prompt, max_tokens, temperature)
        })
        .await
        .map_err(|e| ReasonError::Worker(e.to_string()))??;

        let analysis = parse_analysis(&raw)?;
        Ok(ReasonOutcome::Ok { analysis, raw })
    }

    /// Cheap connectivity probe for ops tooling. Bounded by the same
    /// deadline as reasoning; a hung service reads as unavailable.
    pub async fn check_connection(&self) -> bool {
        let service = Arc::clone(&self.service);
        let probe = tokio::task::spawn_blocking(move || {
            service
                .complete("Respond with {\"ok\": true}", 16, 0.0)
                .is_ok()
        });
        match tokio::time::timeout(self.config.deadline, probe).await {
            Ok(joined) => joined.unwrap_or(false),
            Err(_) => false,
        }
    }
}

/// Conservative analysis used when reasoning is unavailable.
///
/// Moderate risk, not safe to prescribe, zero confidence: absence of AI
/// judgment must read as caution, never as a clean bill.
pub fn fallback_analysis(new_medications: &[String], detail: &str) -> ParsedAnalysis {
    ParsedAnalysis {
        overall_risk_level: Severity::Moderate,
        safe_to_prescribe: false,
        warnings: vec![Warning {
            severity: Severity::Moderate,
            category: WarningCategory::SystemError,
            drugs_involved: new_medications.to_vec(),
            description: format!("AI analysis unavailable: {detail}"),
            clinical_significance: "Automated reasoning could not assess this prescription"
                .into(),
            recommendation: "Manual clinical review required before prescribing".into(),
            monitoring_required: "Standard monitoring".into(),
        }],
        contraindications: Vec::new(),
        dosing_adjustments: Vec::new(),
        monitoring_plan: vec!["Consult clinical pharmacist".into()],
        reasoning: "Automated clinical reasoning was unavailable for this request.".into(),
        confidence_score: 0.0,
    }
}
