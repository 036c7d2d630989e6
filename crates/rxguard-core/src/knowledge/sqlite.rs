//! SQLite-backed knowledge store.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};

use super::schema::SCHEMA;
use super::{PatientStore, RuleStore, StoreError, StoreResult};
use crate::models::{InteractionRule, PatientProfile, Severity};

/// Primary knowledge store backed by SQLite.
///
/// The connection is wrapped in a `Mutex` so the store can be shared
/// across concurrent analysis tasks behind an `Arc`.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open the store at `path`, creating the schema if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> StoreResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Lock(e.to_string()))
    }

    /// Insert an interaction rule, returning its assigned row id.
    pub fn insert_rule(&self, rule: &InteractionRule) -> StoreResult<i64> {
        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT INTO drug_interactions (
                drug_a, drug_b, severity, description, mechanism,
                clinical_effect, recommendation, monitoring, evidence_level, active
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                rule.drug_a,
                rule.drug_b,
                rule.severity.as_str(),
                rule.description,
                rule.mechanism,
                rule.clinical_effect,
                rule.recommendation,
                rule.monitoring,
                rule.evidence_level,
                rule.active as i64,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Activate or deactivate a rule.
    pub fn set_rule_active(&self, rule_id: i64, active: bool) -> StoreResult<bool> {
        let conn = self.lock()?;
        let rows = conn.execute(
            "UPDATE drug_interactions SET active = ?2 WHERE id = ?1",
            params![rule_id, active as i64],
        )?;
        Ok(rows > 0)
    }

    /// Insert a patient with their medications, diagnoses, and allergies.
    pub fn insert_patient(&self, patient: &PatientProfile) -> StoreResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        tx.execute(
            r#"
            INSERT INTO patients (id, name, age, gender, weight_kg)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                patient.id,
                patient.name,
                patient.age,
                patient.gender,
                patient.weight_kg,
            ],
        )?;
        for medication in &patient.current_medications {
            tx.execute(
                "INSERT INTO patient_medications (patient_id, medication) VALUES (?1, ?2)",
                params![patient.id, medication],
            )?;
        }
        for diagnosis in &patient.diagnoses {
            tx.execute(
                "INSERT INTO patient_diagnoses (patient_id, diagnosis) VALUES (?1, ?2)",
                params![patient.id, diagnosis],
            )?;
        }
        for allergen in &patient.allergies {
            tx.execute(
                "INSERT INTO patient_allergies (patient_id, allergen) VALUES (?1, ?2)",
                params![patient.id, allergen],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    /// Bulk-import rules (used by seeding scripts and tests).
    pub fn import_rules(&self, rules: &[InteractionRule]) -> StoreResult<usize> {
        for rule in rules {
            self.insert_rule(rule)?;
        }
        Ok(rules.len())
    }
}

impl RuleStore for SqliteStore {
    fn list_active_rules(&self) -> StoreResult<Vec<InteractionRule>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, drug_a, drug_b, severity, description, mechanism,
                   clinical_effect, recommendation, monitoring, evidence_level, active
            FROM drug_interactions
            WHERE active = 1
            ORDER BY id
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            let severity_text: String = row.get(3)?;
            Ok(InteractionRule {
                id: row.get(0)?,
                drug_a: row.get(1)?,
                drug_b: row.get(2)?,
                // The CHECK constraint keeps values recognizable; coerce
                // defensively anyway rather than failing the whole load.
                severity: Severity::parse_lenient(&severity_text).unwrap_or(Severity::Moderate),
                description: row.get(4)?,
                mechanism: row.get(5)?,
                clinical_effect: row.get(6)?,
                recommendation: row.get(7)?,
                monitoring: row.get(8)?,
                evidence_level: row.get(9)?,
                active: row.get::<_, i64>(10)? != 0,
            })
        })?;

        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}

impl PatientStore for SqliteStore {
    fn get_patient(&self, id: &str) -> StoreResult<Option<PatientProfile>> {
        let conn = self.lock()?;
        let patient = conn
            .query_row(
                "SELECT id, name, age, gender, weight_kg FROM patients WHERE id = ?",
                [id],
                |row| {
                    Ok(PatientProfile {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        age: row.get(2)?,
                        gender: row.get(3)?,
                        weight_kg: row.get(4)?,
                        diagnoses: Vec::new(),
                        current_medications: Vec::new(),
                        allergies: Vec::new(),
                    })
                },
            )
            .optional()?;

        let Some(mut patient) = patient else {
            return Ok(None);
        };

        let mut stmt = conn.prepare(
            "SELECT medication FROM patient_medications WHERE patient_id = ? AND active = 1 ORDER BY id",
        )?;
        patient.current_medications = stmt
            .query_map([id], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut stmt =
            conn.prepare("SELECT diagnosis FROM patient_diagnoses WHERE patient_id = ? ORDER BY id")?;
        patient.diagnoses = stmt
            .query_map([id], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut stmt =
            conn.prepare("SELECT allergen FROM patient_allergies WHERE patient_id = ? ORDER BY id")?;
        patient.allergies = stmt
            .query_map([id], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(patient))
    }
}
