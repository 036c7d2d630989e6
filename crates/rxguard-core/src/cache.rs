//! TTL cache for completed analysis results.
//!
//! The cache map is the only cross-request shared state in the engine.
//! Reads take a shared lock; expired entries are evicted lazily on read.
//! A per-key in-flight guard lets the orchestrator collapse concurrent
//! identical requests into one computation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};

use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::sync::{Mutex as AsyncMutex, RwLock};

use crate::matcher::normalized_key;
use crate::models::AnalysisResult;

/// Default entry lifetime: one hour.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone)]
struct CacheEntry {
    result: AnalysisResult,
    created_at: Instant,
}

/// Operational cache statistics for ops tooling.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CacheStats {
    pub total_entries: usize,
    pub valid_entries: usize,
    /// Fraction of stored entries still within their TTL. A coarse proxy
    /// for hit likelihood; per-request hit counters are not kept.
    pub hit_ratio_estimate: f64,
}

/// Stable cache key over `(patient_id, sorted normalized medications, notes)`.
///
/// Normalizing and sorting the medication list makes the key insensitive to
/// entry order and dose formatting noise after the first token.
pub fn cache_key(patient_id: &str, medications: &[String], notes: &str) -> String {
    let mut keys: Vec<String> = medications.iter().map(|m| normalized_key(m)).collect();
    keys.sort_unstable();

    let mut hasher = Sha256::new();
    hasher.update(patient_id.as_bytes());
    hasher.update(b"|");
    hasher.update(keys.join(",").as_bytes());
    hasher.update(b"|");
    hasher.update(notes.as_bytes());
    hex::encode(hasher.finalize())
}

/// Concurrency-safe TTL cache keyed by [`cache_key`].
pub struct AnalysisCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    inflight: StdMutex<HashMap<String, Arc<AsyncMutex<()>>>>,
    ttl: Duration,
}

impl Default for AnalysisCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl AnalysisCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            inflight: StdMutex::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Look up a result. Expired entries are removed and reported as a miss.
    pub async fn get(&self, key: &str) -> Option<AnalysisResult> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if entry.created_at.elapsed() < self.ttl => {
                    return Some(entry.result.clone());
                }
                Some(_) => {} // expired, evict below
                None => return None,
            }
        }

        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get(key) {
            // Re-check: another task may have refreshed the entry between
            // dropping the read lock and acquiring the write lock.
            if entry.created_at.elapsed() < self.ttl {
                return Some(entry.result.clone());
            }
            entries.remove(key);
        }
        None
    }

    /// Store a result. Last write wins on concurrent puts to the same key;
    /// values for the same key are expected to be equivalent.
    pub async fn put(&self, key: String, result: AnalysisResult) {
        let mut entries = self.entries.write().await;
        entries.insert(
            key,
            CacheEntry {
                result,
                created_at: Instant::now(),
            },
        );
    }

    /// Drop all entries, returning how many were removed.
    pub async fn clear(&self) -> usize {
        let mut entries = self.entries.write().await;
        let cleared = entries.len();
        entries.clear();
        cleared
    }

    pub async fn stats(&self) -> CacheStats {
        let entries = self.entries.read().await;
        let total_entries = entries.len();
        let valid_entries = entries
            .values()
            .filter(|e| e.created_at.elapsed() < self.ttl)
            .count();
        let hit_ratio_estimate = if total_entries == 0 {
            0.0
        } else {
            valid_entries as f64 / total_entries as f64
        };
        CacheStats {
            total_entries,
            valid_entries,
            hit_ratio_estimate,
        }
    }

    /// Obtain the single-flight guard for a key.
    ///
    /// Callers lock the returned mutex for the duration of a computation
    /// and call [`release`](Self::release) when done. Tasks that arrive
    /// while a computation is in flight block on the same mutex and
    /// re-check the cache once it unlocks. A task that grabs a fresh guard
    /// just after `release` merely duplicates work; it cannot produce an
    /// incorrect result.
    pub fn guard(&self, key: &str) -> Arc<AsyncMutex<()>> {
        let mut inflight = self
            .inflight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(
            inflight
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
        )
    }

    /// Remove the in-flight marker for a key after a computation finishes.
    pub fn release(&self, key: &str) {
        let mut inflight = self
            .inflight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        inflight.remove(key);
    }
}
