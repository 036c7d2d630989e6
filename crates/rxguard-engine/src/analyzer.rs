//! Analysis orchestration.
//!
//! One entry point, [`InteractionAnalyzer::analyze`], runs the full
//! pipeline: cache lookup, knowledge resolution, pairwise matching,
//! deadline-bounded AI reasoning, deterministic enrichment, risk
//! aggregation, caching, and audit. Degraded dependencies (store down,
//! model down) produce a conservative result, never an error; the only
//! caller-visible error is an unknown patient.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;

use rxguard_core::cache::DEFAULT_TTL;
use rxguard_core::models::{AnalysisRequest, AnalysisResult, DataSource, Severity};
use rxguard_core::{
    cache_key, enrich, match_rules, risk, AnalysisCache, CacheStats, KnowledgeError,
    KnowledgeSource,
};

use crate::audit::{AuditRecord, AuditSink};
use crate::reasoner::{
    fallback_analysis, ReasonOutcome, Reasoner, ReasonerConfig, ReasoningService,
};

#[derive(Error, Debug)]
pub enum AnalyzeError {
    #[error("patient {0} not found")]
    PatientNotFound(String),
}

impl From<KnowledgeError> for AnalyzeError {
    fn from(error: KnowledgeError) -> Self {
        match error {
            KnowledgeError::PatientNotFound(id) => AnalyzeError::PatientNotFound(id),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    pub cache_ttl: Duration,
    pub reasoner: ReasonerConfig,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_TTL,
            reasoner: ReasonerConfig::default(),
        }
    }
}

/// Ops snapshot of the engine's external dependencies.
#[derive(Debug, Clone, Serialize)]
pub struct DataSourceStatus {
    /// Where interaction rules currently load from.
    pub rules_source: DataSource,
    pub rule_count: usize,
    pub ai_service_available: bool,
}

struct Computed {
    result: AnalysisResult,
    raw_model_output: Option<String>,
    ai_ok: bool,
}

/// The drug interaction analysis engine.
pub struct InteractionAnalyzer {
    knowledge: KnowledgeSource,
    cache: AnalysisCache,
    reasoner: Reasoner,
    audit: Option<Arc<dyn AuditSink>>,
}

impl InteractionAnalyzer {
    pub fn new(
        knowledge: KnowledgeSource,
        service: Arc<dyn ReasoningService>,
        config: AnalyzerConfig,
    ) -> Self {
        Self {
            knowledge,
            cache: AnalysisCache::new(config.cache_ttl),
            reasoner: Reasoner::new(service, config.reasoner),
            audit: None,
        }
    }

    pub fn with_audit(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(sink);
        self
    }

    /// Analyze a prescription request.
    ///
    /// Concurrent identical requests are collapsed: the first computes,
    /// the rest wait and read the cached result.
    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, AnalyzeError> {
        let started = Instant::now();
        let key = cache_key(
            &request.patient_id,
            &request.new_medications,
            &request.clinical_notes,
        );

        if let Some(mut hit) = self.cache.get(&key).await {
            tracing::debug!(patient_id = %request.patient_id, "analysis cache hit");
            hit.cache_used = true;
            hit.processing_time_ms = started.elapsed().as_millis() as u64;
            return Ok(hit);
        }

        let guard = self.cache.guard(&key);
        let _lock = guard.lock().await;

        // Another task may have finished this exact computation while we
        // waited on the guard.
        if let Some(mut hit) = self.cache.get(&key).await {
            drop(_lock);
            self.cache.release(&key);
            hit.cache_used = true;
            hit.processing_time_ms = started.elapsed().as_millis() as u64;
            return Ok(hit);
        }

        let computed = self.compute(request, started).await;
        drop(_lock);
        self.cache.release(&key);

        let computed = computed?;

        // Cache only trustworthy results: reasoning succeeded and the
        // knowledge came from the primary store. Fallback analyses stay
        // uncached so recovery is picked up immediately.
        if computed.ai_ok && computed.result.data_source == DataSource::Database {
            self.cache.put(key, computed.result.clone()).await;
        }

        self.emit_audit(&computed, &request.new_medications);

        Ok(computed.result)
    }

    async fn compute(
        &self,
        request: &AnalysisRequest,
        started: Instant,
    ) -> Result<Computed, AnalyzeError> {
        let (patient, patient_source) = self.knowledge.load_patient(&request.patient_id)?;

        // Nothing new to prescribe: trivially safe, no reasoning needed.
        if request.new_medications.is_empty() {
            let mut result = empty_prescription_result(&request.patient_id, patient_source);
            enrich::enrich(&mut result, &patient, &request.new_medications);
            risk::apply(&mut result);
            result.processing_time_ms = started.elapsed().as_millis() as u64;
            return Ok(Computed {
                result,
                raw_model_output: None,
                ai_ok: false,
            });
        }

        let (rules, rules_source) = self.knowledge.load_rules();
        let data_source = if patient_source == DataSource::Fallback
            || rules_source == DataSource::Fallback
        {
            DataSource::Fallback
        } else {
            DataSource::Database
        };

        let mut all_medications = patient.current_medications.clone();
        all_medications.extend(request.new_medications.iter().cloned());
        let matched = match_rules(&all_medications, &rules);
        tracing::debug!(
            patient_id = %request.patient_id,
            pairs_checked = matched.pairs_checked,
            hits = matched.hits.len(),
            "pairwise matching complete"
        );

        let outcome = self
            .reasoner
            .reason(
                &patient,
                &request.new_medications,
                &matched.hits,
                &request.clinical_notes,
            )
            .await;

        let (analysis, raw_model_output, ai_ok) = match outcome {
            ReasonOutcome::Ok { analysis, raw } => (analysis, Some(raw), true),
            ReasonOutcome::TimedOut => {
                tracing::warn!(patient_id = %request.patient_id, "reasoning timed out, using conservative fallback");
                (
                    fallback_analysis(&request.new_medications, "analysis deadline exceeded"),
                    None,
                    false,
                )
            }
            ReasonOutcome::Failed(error) => {
                tracing::warn!(patient_id = %request.patient_id, %error, "reasoning failed, using conservative fallback");
                (
                    fallback_analysis(&request.new_medications, &error.to_string()),
                    None,
                    false,
                )
            }
        };

        let mut result = AnalysisResult {
            patient_id: request.patient_id.clone(),
            overall_risk_level: analysis.overall_risk_level,
            safe_to_prescribe: analysis.safe_to_prescribe,
            warnings: analysis.warnings,
            contraindications: analysis.contraindications,
            dosing_adjustments: analysis.dosing_adjustments,
            monitoring_plan: analysis.monitoring_plan,
            reasoning: analysis.reasoning,
            confidence_score: analysis.confidence_score,
            processing_time_ms: 0,
            cache_used: false,
            data_source,
            timestamp: None,
        };

        enrich::enrich(&mut result, &patient, &request.new_medications);
        risk::apply(&mut result);
        result.processing_time_ms = started.elapsed().as_millis() as u64;

        Ok(Computed {
            result,
            raw_model_output,
            ai_ok,
        })
    }

    fn emit_audit(&self, computed: &Computed, new_medications: &[String]) {
        let Some(sink) = &self.audit else {
            return;
        };
        let record = AuditRecord::from_result(
            &computed.result,
            new_medications,
            computed.raw_model_output.clone(),
        );
        let sink = Arc::clone(sink);
        tokio::spawn(async move {
            if let Err(error) = sink.append(record) {
                tracing::warn!(%error, "audit write failed");
            }
        });
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    /// Drop all cached analyses, returning how many were removed.
    pub async fn clear_cache(&self) -> usize {
        self.cache.clear().await
    }

    /// Probe the knowledge store and the reasoning service.
    pub async fn data_source_status(&self) -> DataSourceStatus {
        let (rules, rules_source) = self.knowledge.load_rules();
        DataSourceStatus {
            rules_source,
            rule_count: rules.len(),
            ai_service_available: self.reasoner.check_connection().await,
        }
    }
}

fn empty_prescription_result(patient_id: &str, data_source: DataSource) -> AnalysisResult {
    AnalysisResult {
        patient_id: patient_id.to_string(),
        overall_risk_level: Severity::Low,
        safe_to_prescribe: true,
        warnings: Vec::new(),
        contraindications: Vec::new(),
        dosing_adjustments: Vec::new(),
        monitoring_plan: Vec::new(),
        reasoning: "No new medications requested; nothing to analyze.".into(),
        confidence_score: 1.0,
        processing_time_ms: 0,
        cache_used: false,
        data_source,
        timestamp: None,
    }
}
