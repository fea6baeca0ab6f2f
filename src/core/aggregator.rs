//! Ratings aggregation over a full keyspace scan.
//!
//! Walks every `resource:*` key, pulls its ratings hash and turns it into a
//! labelled report row. Label lookups fail open: a lookup that errors
//! leaves an empty field, the row is still emitted and still counted.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::{RatingEntry, ResourceRef, StandardId};
use crate::keyspace::{KeyValueScanClient, KeyspaceCursor, ScanError};
use crate::report::{ReportBuffer, ReportError, ReportRow};
use crate::store::TaxonomyStore;

/// Default key pattern for per-resource rating hashes
pub const DEFAULT_PATTERN: &str = "resource:*";

/// Default SCAN COUNT hint
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Where an export run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportPhase {
    Idle,
    Scanning,
    Resolving,
    Emitting,
    Uploading,
    Done,
    Failed,
}

/// Scan settings for one aggregation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSettings {
    pub pattern: String,
    pub page_size: usize,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_PATTERN.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Result of driving a scan to its end (or to its first failure)
#[derive(Debug)]
pub struct AggregateOutcome {
    /// Keys processed, one per delivered key including duplicates
    pub processed: usize,

    /// Fields left empty because their lookup failed
    pub unresolved: usize,

    /// Scan round trips issued
    pub scan_calls: usize,

    /// Accumulated report
    pub buffer: ReportBuffer,

    /// Set if a scan step failed; rows before the failure are kept
    pub scan_error: Option<ScanError>,

    /// Set if a row could not be encoded; the walk stops there
    pub report_error: Option<ReportError>,
}

/// Builds the ratings report from the keyspace and the taxonomy store
pub struct RatingsAggregator {
    store: Arc<dyn TaxonomyStore>,
    keyspace: Arc<dyn KeyValueScanClient>,
    settings: ExportSettings,
    phase: ExportPhase,
}

impl RatingsAggregator {
    pub fn new(
        store: Arc<dyn TaxonomyStore>,
        keyspace: Arc<dyn KeyValueScanClient>,
        settings: ExportSettings,
    ) -> Self {
        Self {
            store,
            keyspace,
            settings,
            phase: ExportPhase::Idle,
        }
    }

    pub fn phase(&self) -> ExportPhase {
        self.phase
    }

    pub(crate) fn enter(&mut self, phase: ExportPhase) {
        debug!(from = ?self.phase, to = ?phase, "Export phase");
        self.phase = phase;
    }

    /// Scan the keyspace to completion and build one row per delivered key.
    ///
    /// Rows are appended in delivery order. A scan failure stops the walk
    /// and is reported in the outcome together with everything gathered
    /// up to that point.
    pub async fn aggregate(&mut self) -> AggregateOutcome {
        let keyspace = Arc::clone(&self.keyspace);
        let mut cursor = KeyspaceCursor::new(
            keyspace.as_ref(),
            self.settings.pattern.clone(),
            self.settings.page_size,
        );

        let mut buffer = ReportBuffer::new();
        let mut processed = 0usize;
        let mut unresolved = 0usize;
        let mut scan_error = None;
        let mut report_error = None;

        self.enter(ExportPhase::Scanning);
        'scan: loop {
            let keys = match cursor.next_page().await {
                Ok(Some(keys)) => keys,
                Ok(None) => break,
                Err(e) => {
                    scan_error = Some(e);
                    break;
                }
            };
            if keys.is_empty() {
                continue;
            }

            self.enter(ExportPhase::Resolving);
            let entries = self.fetch_entries(&keys).await;

            for (key, entry) in keys.iter().zip(entries) {
                let (row, gaps) = self.resolve_row(key, entry).await;

                self.enter(ExportPhase::Emitting);
                if let Err(e) = buffer.push(&row) {
                    warn!(%key, error = %e, "Row could not be encoded");
                    report_error = Some(e);
                    break 'scan;
                }
                processed += 1;
                unresolved += gaps;
                self.enter(ExportPhase::Resolving);
            }
            self.enter(ExportPhase::Scanning);
        }

        info!(
            processed,
            unresolved,
            scan_calls = cursor.calls(),
            failed = scan_error.is_some() || report_error.is_some(),
            "Found {} keys",
            cursor.delivered()
        );

        AggregateOutcome {
            processed,
            unresolved,
            scan_calls: cursor.calls(),
            buffer,
            scan_error,
            report_error,
        }
    }

    /// Fetch one page of hashes, one result per key
    async fn fetch_entries(&self, keys: &[String]) -> Vec<Result<RatingEntry, ScanError>> {
        match self.keyspace.get_hashes(keys).await {
            Ok(entries) if entries.len() == keys.len() => entries,
            Ok(entries) => {
                warn!(
                    expected = keys.len(),
                    got = entries.len(),
                    "Hash batch size mismatch"
                );
                let mut entries: Vec<_> = entries.into_iter().map(Some).collect();
                entries.resize_with(keys.len(), || None);
                entries
                    .into_iter()
                    .map(|e| {
                        e.unwrap_or_else(|| {
                            Err(ScanError::Unavailable(
                                "missing reply in hash batch".to_string(),
                            ))
                        })
                    })
                    .collect()
            }
            Err(e) => {
                warn!(error = %e, keys = keys.len(), "Hash batch failed");
                let message = e.to_string();
                keys.iter()
                    .map(|_| Err(ScanError::Unavailable(message.clone())))
                    .collect()
            }
        }
    }

    /// Build the row for one key. Returns the row and how many of its
    /// fields were left empty by failed lookups.
    async fn resolve_row(
        &self,
        key: &str,
        entry: Result<RatingEntry, ScanError>,
    ) -> (ReportRow, usize) {
        let mut gaps = 0usize;

        let resource = match ResourceRef::from_key(key) {
            Some(resource) => match self.store.resolve_resource_label(resource.id).await {
                Ok(label) => resource.with_label(label),
                Err(e) => {
                    warn!(%key, error = %e, "Resource label unresolved");
                    gaps += 1;
                    resource
                }
            },
            None => {
                warn!(%key, "Key has no resource id");
                gaps += 1;
                ResourceRef::new(0)
            }
        };
        let mut row = ReportRow::new(resource.url());

        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(%key, error = %e, "Ratings hash unavailable");
                return (row, gaps + 1);
            }
        };
        debug!(%key, ratings = entry.len(), "Resource ratings");

        for (standard, rating) in entry.pairs() {
            let title = match standard.parse::<StandardId>() {
                Ok(id) => match self.store.resolve_standard_label(id).await {
                    Ok(label) => label.title,
                    Err(e) => {
                        warn!(%key, standard = %id, error = %e, "Standard label unresolved");
                        gaps += 1;
                        String::new()
                    }
                },
                Err(_) => {
                    warn!(%key, %standard, "Non-numeric standard id");
                    gaps += 1;
                    String::new()
                }
            };
            row.push(title, rating.clone());
        }

        (row, gaps)
    }
}
