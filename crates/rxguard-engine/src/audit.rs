//! Analysis audit trail.
//!
//! One record per completed analysis, written fire-and-forget: audit
//! failures are logged and never affect the caller's result.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use thiserror::Error;
use uuid::Uuid;

use rxguard_core::models::{AnalysisResult, DataSource, Severity};

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("audit write failed: {0}")]
    WriteFailed(String),
}

/// An immutable audit record for one completed analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: Uuid,
    pub patient_id: String,
    pub new_medications: Vec<String>,
    pub overall_risk_level: Severity,
    pub confidence_score: f64,
    pub latency_ms: u64,
    pub cache_used: bool,
    pub data_source: DataSource,
    /// Verbatim model output, absent when the reasoner fell back.
    pub raw_model_output: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AuditRecord {
    pub fn from_result(
        result: &AnalysisResult,
        new_medications: &[String],
        raw_model_output: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            patient_id: result.patient_id.clone(),
            new_medications: new_medications.to_vec(),
            overall_risk_level: result.overall_risk_level,
            confidence_score: result.confidence_score,
            latency_ms: result.processing_time_ms,
            cache_used: result.cache_used,
            data_source: result.data_source,
            raw_model_output,
            created_at: result.timestamp.unwrap_or_else(Utc::now),
        }
    }
}

/// Destination for audit records.
pub trait AuditSink: Send + Sync {
    fn append(&self, record: AuditRecord) -> Result<(), AuditError>;
}

/// In-memory sink for tests and single-process deployments.
#[derive(Default)]
pub struct MemoryAuditSink {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AuditSink for MemoryAuditSink {
    fn append(&self, record: AuditRecord) -> Result<(), AuditError> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_result() -> AnalysisResult {
        AnalysisResult {
            patient_id: "P001".into(),
            overall_risk_level: Severity::Major,
            safe_to_prescribe: false,
            warnings: Vec::new(),
            contraindications: Vec::new(),
            dosing_adjustments: Vec::new(),
            monitoring_plan: Vec::new(),
            reasoning: "test".into(),
            confidence_score: 0.9,
            processing_time_ms: 42,
            cache_used: false,
            data_source: DataSource::Database,
            timestamp: Some(Utc::now()),
        }
    }

    #[test]
    fn test_record_from_result() {
        let record = AuditRecord::from_result(
            &sample_result(),
            &["Ibuprofen 400mg".into()],
            Some("{\"raw\": true}".into()),
        );

        assert_eq!(record.patient_id, "P001");
        assert_eq!(record.overall_risk_level, Severity::Major);
        assert_eq!(record.latency_ms, 42);
        assert!(record.raw_model_output.is_some());
    }

    #[test]
    fn test_memory_sink_appends() {
        let sink = MemoryAuditSink::new();
        assert!(sink.is_empty());

        let record = AuditRecord::from_result(&sample_result(), &[], None);
        sink.append(record).unwrap();

        assert_eq!(sink.len(), 1);
        assert_eq!(sink.records()[0].patient_id, "P001");
    }
}
