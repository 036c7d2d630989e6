//! Knowledge source: interaction rules and patient records.
//!
//! The primary store is SQLite; any read failure transparently falls back
//! to the bundled static dataset, tagging the result so callers can report
//! degraded confidence. Errors never cross this boundary except a genuine
//! patient-not-found.

mod fallback;
mod schema;
mod sqlite;

pub use fallback::FallbackData;
pub use schema::SCHEMA;
pub use sqlite::SqliteStore;

use std::sync::Arc;

use thiserror::Error;

use crate::models::{DataSource, InteractionRule, PatientProfile};

/// Store-level errors. These stay inside the knowledge layer; the resolver
/// converts them into fallback activation.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("lock poisoned: {0}")]
    Lock(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Read access to interaction rules.
pub trait RuleStore: Send + Sync {
    fn list_active_rules(&self) -> StoreResult<Vec<InteractionRule>>;
}

/// Read access to patient profiles.
pub trait PatientStore: Send + Sync {
    fn get_patient(&self, id: &str) -> StoreResult<Option<PatientProfile>>;
}

/// The only error the knowledge layer surfaces to callers.
#[derive(Error, Debug)]
pub enum KnowledgeError {
    #[error("patient {0} not found")]
    PatientNotFound(String),
}

/// Resolves rules and patients from the primary store with transparent
/// fallback to the bundled dataset.
pub struct KnowledgeSource {
    rules: Option<Arc<dyn RuleStore>>,
    patients: Option<Arc<dyn PatientStore>>,
}

impl KnowledgeSource {
    pub fn new(rules: Arc<dyn RuleStore>, patients: Arc<dyn PatientStore>) -> Self {
        Self {
            rules: Some(rules),
            patients: Some(patients),
        }
    }

    /// Use one SQLite store for both rules and patients.
    pub fn with_sqlite(store: Arc<SqliteStore>) -> Self {
        Self {
            rules: Some(store.clone()),
            patients: Some(store),
        }
    }

    /// Serve everything from the bundled dataset. Useful for demos and
    /// tests; every load is tagged `fallback`.
    pub fn fallback_only() -> Self {
        Self {
            rules: None,
            patients: None,
        }
    }

    /// Load active interaction rules.
    ///
    /// Never errors: a failing primary store logs a warning and degrades
    /// to the bundled dataset; absence of data is an empty list.
    pub fn load_rules(&self) -> (Vec<InteractionRule>, DataSource) {
        if let Some(store) = &self.rules {
            match store.list_active_rules() {
                Ok(rules) => {
                    tracing::debug!(count = rules.len(), "loaded interaction rules from store");
                    return (rules, DataSource::Database);
                }
                Err(error) => {
                    tracing::warn!(%error, "rule store unavailable, using bundled fallback dataset");
                }
            }
        }
        (FallbackData::get().active_rules(), DataSource::Fallback)
    }

    /// Load a patient profile.
    ///
    /// A failing primary store degrades to the bundled dataset; a patient
    /// missing from a healthy store is a genuine caller error and is not
    /// papered over with fallback data.
    pub fn load_patient(
        &self,
        id: &str,
    ) -> Result<(PatientProfile, DataSource), KnowledgeError> {
        if let Some(store) = &self.patients {
            match store.get_patient(id) {
                Ok(Some(patient)) => return Ok((patient, DataSource::Database)),
                Ok(None) => return Err(KnowledgeError::PatientNotFound(id.to_string())),
                Err(error) => {
                    tracing::warn!(%error, patient_id = id, "patient store unavailable, using bundled fallback dataset");
                }
            }
        }
        FallbackData::get()
            .patient(id)
            .map(|p| (p, DataSource::Fallback))
            .ok_or_else(|| KnowledgeError::PatientNotFound(id.to_string()))
    }
}
