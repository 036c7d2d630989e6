//! End-to-end analyzer tests with scripted reasoning services.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rxguard_core::models::{
    AnalysisRequest, DataSource, InteractionRule, PatientProfile, Severity, WarningCategory,
};
use rxguard_core::{KnowledgeSource, SqliteStore};
use rxguard_engine::{
    AnalyzeError, AnalyzerConfig, InteractionAnalyzer, MemoryAuditSink, ReasonerConfig,
    ReasoningService, ServiceError,
};

/// Service that replays a scripted sequence of responses, optionally
/// delaying each one, and counts calls.
struct ScriptedService {
    responses: Mutex<VecDeque<Result<String, ServiceError>>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl ScriptedService {
    fn new(responses: Vec<Result<String, ServiceError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ReasoningService for ScriptedService {
    fn complete(&self, _: &str, _: u32, _: f32) -> Result<String, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ServiceError("script exhausted".into())))
    }
}

fn low_risk_response() -> String {
    r#"{
        "overall_risk_level": "LOW",
        "safe_to_prescribe": true,
        "warnings": [],
        "contraindications": [],
        "dosing_adjustments": [],
        "monitoring_plan": [],
        "reasoning": "No significant interactions identified.",
        "confidence_score": 0.95
    }"#
    .to_string()
}

fn major_interaction_response() -> String {
    r#"{
        "overall_risk_level": "MAJOR",
        "safe_to_prescribe": false,
        "warnings": [{
            "severity": "MAJOR",
            "category": "DRUG_INTERACTION",
            "drugs_involved": ["Warfarin", "Ibuprofen"],
            "description": "Significantly increased bleeding risk",
            "clinical_significance": "GI haemorrhage risk",
            "recommendation": "Avoid combination, use paracetamol",
            "monitoring_required": "INR closely"
        }],
        "contraindications": [],
        "dosing_adjustments": [],
        "monitoring_plan": ["Monitor INR", "Watch for bleeding signs"],
        "reasoning": "NSAID with anticoagulant in an elderly patient.",
        "confidence_score": 0.9
    }"#
    .to_string()
}

fn warfarin_ibuprofen_rule() -> InteractionRule {
    InteractionRule {
        id: 0,
        drug_a: "Warfarin".into(),
        drug_b: "Ibuprofen".into(),
        severity: Severity::Major,
        description: "Increased anticoagulant effect".into(),
        mechanism: "Platelet inhibition".into(),
        clinical_effect: "Bleeding risk".into(),
        recommendation: "Avoid combination".into(),
        monitoring: "INR".into(),
        evidence_level: Some("A".into()),
        active: true,
    }
}

fn seeded_knowledge() -> KnowledgeSource {
    let store = SqliteStore::open_in_memory().unwrap();
    store.insert_rule(&warfarin_ibuprofen_rule()).unwrap();

    let mut elderly = PatientProfile::new("P001", "Bapak Agus Santoso", 72, "Male");
    elderly.weight_kg = Some(68.5);
    elderly.diagnoses = vec!["Atrial Fibrillation (chronic)".into()];
    elderly.current_medications = vec!["Warfarin 5mg OD".into()];
    elderly.allergies = vec!["Penicillin (rash)".into()];
    store.insert_patient(&elderly).unwrap();

    let mut ckd = PatientProfile::new("P003", "Bapak Budi Hartono", 58, "Male");
    ckd.diagnoses = vec!["Chronic Kidney Disease Stage 3".into()];
    ckd.current_medications = vec!["Amlodipine 5mg OD".into()];
    store.insert_patient(&ckd).unwrap();

    KnowledgeSource::with_sqlite(Arc::new(store))
}

fn quick_config() -> AnalyzerConfig {
    AnalyzerConfig {
        cache_ttl: Duration::from_secs(60),
        reasoner: ReasonerConfig {
            deadline: Duration::from_millis(500),
            max_attempts: 2,
            retry_backoff: vec![Duration::from_millis(5)],
            ..ReasonerConfig::default()
        },
    }
}

#[tokio::test]
async fn test_major_interaction_scenario() {
    let service = Arc::new(ScriptedService::new(vec![Ok(major_interaction_response())]));
    let analyzer = InteractionAnalyzer::new(seeded_knowledge(), service, quick_config());

    let request = AnalysisRequest::new("P001", vec!["Ibuprofen 400mg TID".into()]);
    let result = analyzer.analyze(&request).await.unwrap();

    assert_eq!(result.overall_risk_level, Severity::Major);
    assert!(!result.safe_to_prescribe);
    assert_eq!(result.data_source, DataSource::Database);
    assert!(!result.cache_used);
    assert!(result.timestamp.is_some());

    let interaction = result
        .warnings
        .iter()
        .find(|w| w.category == WarningCategory::DrugInteraction)
        .expect("AI interaction warning");
    assert!(interaction.drugs_involved.contains(&"Warfarin".to_string()));
    assert!(interaction.drugs_involved.contains(&"Ibuprofen".to_string()));

    // Deterministic enrichment: NSAID in a 72-year-old adds an
    // age-related warning plus a dosing adjustment.
    assert!(result
        .warnings
        .iter()
        .any(|w| w.category == WarningCategory::AgeRelated));
    assert_eq!(result.dosing_adjustments.len(), 1);
}

#[tokio::test]
async fn test_low_risk_scenario() {
    let service = Arc::new(ScriptedService::new(vec![Ok(low_risk_response())]));
    let analyzer = InteractionAnalyzer::new(seeded_knowledge(), service, quick_config());

    let request = AnalysisRequest::new("P003", vec!["Paracetamol 500mg TID".into()]);
    let result = analyzer.analyze(&request).await.unwrap();

    assert_eq!(result.overall_risk_level, Severity::Low);
    assert!(result.safe_to_prescribe);
    assert!(result.warnings.is_empty());
    assert!(result.contraindications.is_empty());
}

#[tokio::test]
async fn test_kidney_contraindication_appended() {
    let service = Arc::new(ScriptedService::new(vec![Ok(low_risk_response())]));
    let analyzer = InteractionAnalyzer::new(seeded_knowledge(), service, quick_config());

    let request = AnalysisRequest::new("P003", vec!["Naproxen 250mg BID".into()]);
    let result = analyzer.analyze(&request).await.unwrap();

    assert_eq!(result.contraindications.len(), 1);
    assert_eq!(result.contraindications[0].drug, "Naproxen 250mg BID");
    // A contraindication forces the verdict to unsafe even though the AI
    // reported safe.
    assert!(!result.safe_to_prescribe);
}

#[tokio::test]
async fn test_cache_hit_on_second_call() {
    let service = Arc::new(ScriptedService::new(vec![
        Ok(major_interaction_response()),
        Ok(low_risk_response()),
    ]));
    let analyzer =
        InteractionAnalyzer::new(seeded_knowledge(), service.clone(), quick_config());

    let request = AnalysisRequest::new("P001", vec!["Ibuprofen 400mg TID".into()]);
    let first = analyzer.analyze(&request).await.unwrap();
    let second = analyzer.analyze(&request).await.unwrap();

    assert!(!first.cache_used);
    assert!(second.cache_used);
    assert_eq!(service.calls(), 1);
    assert_eq!(first.warnings, second.warnings);
    assert_eq!(first.overall_risk_level, second.overall_risk_level);
}

#[tokio::test]
async fn test_cache_expiry_recomputes() {
    let service = Arc::new(ScriptedService::new(vec![
        Ok(low_risk_response()),
        Ok(low_risk_response()),
    ]));
    let mut config = quick_config();
    config.cache_ttl = Duration::from_millis(50);
    let analyzer = InteractionAnalyzer::new(seeded_knowledge(), service.clone(), config);

    let request = AnalysisRequest::new("P003", vec!["Paracetamol 500mg".into()]);
    analyzer.analyze(&request).await.unwrap();
    tokio::time::sleep(Duration::from_millis(80)).await;
    let second = analyzer.analyze(&request).await.unwrap();

    assert!(!second.cache_used);
    assert_eq!(service.calls(), 2);
}

#[tokio::test]
async fn test_timeout_produces_conservative_fallback() {
    let service = Arc::new(
        ScriptedService::new(vec![Ok(low_risk_response())])
            .with_delay(Duration::from_millis(500)),
    );
    let mut config = quick_config();
    config.reasoner.deadline = Duration::from_millis(100);
    let analyzer = InteractionAnalyzer::new(seeded_knowledge(), service, config);

    let request = AnalysisRequest::new("P001", vec!["Ibuprofen 400mg TID".into()]);
    let started = std::time::Instant::now();
    let result = analyzer.analyze(&request).await.unwrap();

    // The caller gets an answer near the deadline, not the service latency.
    assert!(started.elapsed() < Duration::from_millis(400));

    assert!(!result.safe_to_prescribe);
    assert_eq!(result.confidence_score, 0.0);
    let system_error = result
        .warnings
        .iter()
        .find(|w| w.category == WarningCategory::SystemError)
        .expect("fallback system warning");
    assert!(system_error
        .drugs_involved
        .contains(&"Ibuprofen 400mg TID".to_string()));

    // Fallback results are never cached.
    assert_eq!(analyzer.cache_stats().await.total_entries, 0);
}

#[tokio::test]
async fn test_malformed_then_valid_response_retries() {
    let service = Arc::new(ScriptedService::new(vec![
        Ok("I think this looks fine!".to_string()),
        Ok(low_risk_response()),
    ]));
    let analyzer = InteractionAnalyzer::new(seeded_knowledge(), service.clone(), quick_config());

    let request = AnalysisRequest::new("P003", vec!["Paracetamol 500mg".into()]);
    let result = analyzer.analyze(&request).await.unwrap();

    assert_eq!(service.calls(), 2);
    assert_eq!(result.overall_risk_level, Severity::Low);
    assert!(result.safe_to_prescribe);
}

#[tokio::test]
async fn test_empty_new_medications_skips_reasoning() {
    let service = Arc::new(ScriptedService::new(vec![Ok(low_risk_response())]));
    let analyzer = InteractionAnalyzer::new(seeded_knowledge(), service.clone(), quick_config());

    let request = AnalysisRequest::new("P001", Vec::new());
    let result = analyzer.analyze(&request).await.unwrap();

    assert_eq!(service.calls(), 0);
    assert_eq!(result.overall_risk_level, Severity::Low);
    assert!(result.safe_to_prescribe);
    assert!((result.confidence_score - 1.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_unknown_patient_is_an_error() {
    let service = Arc::new(ScriptedService::new(vec![]));
    let analyzer = InteractionAnalyzer::new(seeded_knowledge(), service, quick_config());

    let request = AnalysisRequest::new("P999", vec!["Paracetamol 500mg".into()]);
    let error = analyzer.analyze(&request).await.unwrap_err();
    assert!(matches!(error, AnalyzeError::PatientNotFound(id) if id == "P999"));
}

#[tokio::test]
async fn test_fallback_knowledge_results_not_cached() {
    // No primary store at all: every load is tagged fallback.
    let service = Arc::new(ScriptedService::new(vec![
        Ok(low_risk_response()),
        Ok(low_risk_response()),
    ]));
    let analyzer = InteractionAnalyzer::new(
        KnowledgeSource::fallback_only(),
        service.clone(),
        quick_config(),
    );

    // P002 exists in the bundled dataset.
    let request = AnalysisRequest::new("P002", vec!["Paracetamol 500mg".into()]);
    let first = analyzer.analyze(&request).await.unwrap();
    let second = analyzer.analyze(&request).await.unwrap();

    assert_eq!(first.data_source, DataSource::Fallback);
    assert!(!second.cache_used);
    assert_eq!(service.calls(), 2);
}

#[tokio::test]
async fn test_audit_record_emitted() {
    let service = Arc::new(ScriptedService::new(vec![Ok(major_interaction_response())]));
    let sink = Arc::new(MemoryAuditSink::new());
    let analyzer = InteractionAnalyzer::new(seeded_knowledge(), service, quick_config())
        .with_audit(sink.clone());

    let request = AnalysisRequest::new("P001", vec!["Ibuprofen 400mg TID".into()]);
    analyzer.analyze(&request).await.unwrap();

    // Audit is fire-and-forget; give the spawned task a moment.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].patient_id, "P001");
    assert_eq!(records[0].overall_risk_level, Severity::Major);
    assert!(records[0].raw_model_output.is_some());
}

#[tokio::test]
async fn test_ops_surface() -> anyhow::Result<()> {
    let service = Arc::new(ScriptedService::new(vec![
        Ok(low_risk_response()),
        Ok("{\"ok\": true}".to_string()),
    ]));
    let analyzer = InteractionAnalyzer::new(seeded_knowledge(), service, quick_config());

    let request = AnalysisRequest::new("P003", vec!["Paracetamol 500mg".into()]);
    analyzer.analyze(&request).await?;

    let stats = analyzer.cache_stats().await;
    assert_eq!(stats.total_entries, 1);
    assert_eq!(stats.valid_entries, 1);

    let status = analyzer.data_source_status().await;
    assert_eq!(status.rules_source, DataSource::Database);
    assert_eq!(status.rule_count, 1);
    assert!(status.ai_service_available);

    assert_eq!(analyzer.clear_cache().await, 1);
    assert_eq!(analyzer.cache_stats().await.total_entries, 0);
    Ok(())
}

#[tokio::test]
async fn test_concurrent_identical_requests_single_flight() {
    // The delay keeps the first computation in flight long enough for the
    // second request to land on the single-flight guard.
    let service = Arc::new(
        ScriptedService::new(vec![Ok(low_risk_response()), Ok(low_risk_response())])
            .with_delay(Duration::from_millis(50)),
    );
    let analyzer = Arc::new(InteractionAnalyzer::new(
        seeded_knowledge(),
        service.clone(),
        quick_config(),
    ));

    let request = AnalysisRequest::new("P003", vec!["Paracetamol 500mg".into()]);
    let a = {
        let analyzer = Arc::clone(&analyzer);
        let request = request.clone();
        tokio::spawn(async move { analyzer.analyze(&request).await })
    };
    let b = {
        let analyzer = Arc::clone(&analyzer);
        let request = request.clone();
        tokio::spawn(async move { analyzer.analyze(&request).await })
    };

    let first = a.await.unwrap().unwrap();
    let second = b.await.unwrap().unwrap();

    // One task computed, the other waited and read the cache.
    assert_eq!(service.calls(), 1);
    assert_eq!(first.overall_risk_level, second.overall_risk_level);
    assert!(first.cache_used || second.cache_used);
}
