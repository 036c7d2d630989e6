//! SQLite schema for the knowledge store.

/// Complete schema for interaction rules and patient records.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Drug Interaction Rules
-- ============================================================================

CREATE TABLE IF NOT EXISTS drug_interactions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    drug_a TEXT NOT NULL,
    drug_b TEXT NOT NULL,
    severity TEXT NOT NULL CHECK (severity IN ('MAJOR', 'MODERATE', 'MINOR', 'LOW')),
    description TEXT NOT NULL DEFAULT '',
    mechanism TEXT NOT NULL DEFAULT '',
    clinical_effect TEXT NOT NULL DEFAULT '',
    recommendation TEXT NOT NULL DEFAULT '',
    monitoring TEXT NOT NULL DEFAULT '',
    evidence_level TEXT,
    active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_interactions_drug_a ON drug_interactions(drug_a);
CREATE INDEX IF NOT EXISTS idx_interactions_drug_b ON drug_interactions(drug_b);
CREATE INDEX IF NOT EXISTS idx_interactions_active ON drug_interactions(active);

-- ============================================================================
-- Patients
-- ============================================================================

CREATE TABLE IF NOT EXISTS patients (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    age INTEGER NOT NULL,
    gender TEXT NOT NULL,
    weight_kg REAL,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS patient_medications (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    patient_id TEXT NOT NULL REFERENCES patients(id) ON DELETE CASCADE,
    medication TEXT NOT NULL,
    active INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS patient_diagnoses (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    patient_id TEXT NOT NULL REFERENCES patients(id) ON DELETE CASCADE,
    diagnosis TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS patient_allergies (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    patient_id TEXT NOT NULL REFERENCES patients(id) ON DELETE CASCADE,
    allergen TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_medications_patient ON patient_medications(patient_id);
CREATE INDEX IF NOT EXISTS idx_diagnoses_patient ON patient_diagnoses(patient_id);
CREATE INDEX IF NOT EXISTS idx_allergies_patient ON patient_allergies(patient_id);
"#;
