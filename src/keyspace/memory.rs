//! In-process key-value namespace.
//!
//! Mirrors SCAN semantics closely enough to exercise the export: the cursor
//! is a position in insertion order, `COUNT` bounds how many slots one call
//! examines (so pages can be short or empty), and the pattern filters what
//! was examined. Faults and duplicate delivery can be injected.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use glob::Pattern;

use super::{KeyValueScanClient, ScanError, ScanPage, ZERO_CURSOR};
use crate::domain::RatingEntry;

#[derive(Debug, Default)]
struct MemoryState {
    order: Vec<String>,
    hashes: HashMap<String, RatingEntry>,
    fail_scan_calls: HashSet<usize>,
    fail_hash_keys: HashSet<String>,
    overlap: bool,
    scan_calls: usize,
    hash_calls: usize,
}

/// Ordered in-memory namespace of hashes
#[derive(Debug, Default)]
pub struct MemoryKeyspace {
    state: Mutex<MemoryState>,
}

impl MemoryKeyspace {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        // State stays consistent even if a holder panicked mid-test
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Store a hash, replacing any previous value for the key
    pub fn insert_hash<K, V>(&self, key: &str, pairs: impl IntoIterator<Item = (K, V)>)
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut state = self.lock();
        if !state.hashes.contains_key(key) {
            state.order.push(key.to_string());
        }
        state.hashes.insert(key.to_string(), pairs.into_iter().collect());
    }

    pub fn remove(&self, key: &str) -> bool {
        let mut state = self.lock();
        state.order.retain(|k| k != key);
        state.hashes.remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.lock().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make the `n`-th scan call (1-based, counted across all scans) fail
    pub fn fail_scan_call(&self, n: usize) {
        self.lock().fail_scan_calls.insert(n);
    }

    /// Make every hash fetch for `key` fail
    pub fn fail_hash(&self, key: &str) {
        self.lock().fail_hash_keys.insert(key.to_string());
    }

    /// Re-deliver the last examined slot of the previous page at the start
    /// of each continuation page, as a rehashing server may
    pub fn set_overlap(&self, overlap: bool) {
        self.lock().overlap = overlap;
    }

    pub fn scan_calls(&self) -> usize {
        self.lock().scan_calls
    }

    pub fn hash_calls(&self) -> usize {
        self.lock().hash_calls
    }
}

#[async_trait]
impl KeyValueScanClient for MemoryKeyspace {
    async fn scan(
        &self,
        cursor: &str,
        pattern: &str,
        page_size: usize,
    ) -> Result<ScanPage, ScanError> {
        let mut state = self.lock();
        state.scan_calls += 1;
        if state.fail_scan_calls.contains(&state.scan_calls) {
            return Err(ScanError::Unavailable(format!(
                "injected failure on scan call {}",
                state.scan_calls
            )));
        }

        let matcher = Pattern::new(pattern).map_err(|e| ScanError::Command {
            command: "SCAN".to_string(),
            message: format!("invalid pattern {}: {}", pattern, e),
        })?;
        let start: usize = cursor.parse().map_err(|_| ScanError::Command {
            command: "SCAN".to_string(),
            message: format!("invalid cursor {}", cursor),
        })?;

        let count = page_size.max(1);
        let end = (start + count).min(state.order.len());
        let from = if state.overlap && start > 0 { start - 1 } else { start };

        let keys = state.order[from.min(end)..end]
            .iter()
            .filter(|k| matcher.matches(k))
            .cloned()
            .collect();

        let next_cursor = if end >= state.order.len() {
            ZERO_CURSOR.to_string()
        } else {
            end.to_string()
        };

        Ok(ScanPage { next_cursor, keys })
    }

    async fn get_hash(&self, key: &str) -> Result<RatingEntry, ScanError> {
        let mut state = self.lock();
        state.hash_calls += 1;
        if state.fail_hash_keys.contains(key) {
            return Err(ScanError::Unavailable(format!("injected failure on HGETALL {}", key)));
        }
        Ok(state.hashes.get(key).cloned().unwrap_or_default())
    }
}
