//! Ratings export orchestration.
//!
//! Wires the keyspace scan, the aggregator and the report sink together for
//! one run and reports how many keys were processed.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use crate::keyspace::{KeyValueScanClient, ScanError};
use crate::report::{report_name, ReportError, ReportSink, SinkError};
use crate::store::TaxonomyStore;

use super::aggregator::{ExportPhase, ExportSettings, RatingsAggregator};
use super::matcher::RelationshipMatcher;

/// A failed export run.
///
/// Every variant carries the number of keys processed before the failure.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The scan broke off; no artifact was written
    #[error("keyspace scan failed after {processed} keys: {source}")]
    Scan {
        processed: usize,
        #[source]
        source: ScanError,
    },

    /// A row could not be encoded; no artifact was written
    #[error("failed to encode report after {processed} keys: {source}")]
    Report {
        processed: usize,
        #[source]
        source: ReportError,
    },

    /// The report was built but could not be stored
    #[error("failed to write report {artifact} ({processed} keys): {source}")]
    Sink {
        processed: usize,
        artifact: String,
        #[source]
        source: SinkError,
    },
}

impl ExportError {
    pub fn processed(&self) -> usize {
        match self {
            ExportError::Scan { processed, .. }
            | ExportError::Report { processed, .. }
            | ExportError::Sink { processed, .. } => *processed,
        }
    }
}

/// Result of a successful export run
#[derive(Debug, Clone)]
pub struct ExportSummary {
    /// Keys processed (equals rows written)
    pub processed: usize,

    /// Fields left empty by failed lookups
    pub unresolved: usize,

    /// Scan round trips issued
    pub scan_calls: usize,

    /// Name the report was stored under
    pub artifact: String,

    /// Size of the stored report
    pub bytes: usize,

    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

/// Entry point for matching and ratings export
pub struct Orchestrator {
    store: Arc<dyn TaxonomyStore>,
    keyspace: Arc<dyn KeyValueScanClient>,
    sink: Arc<dyn ReportSink>,
    settings: ExportSettings,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn TaxonomyStore>,
        keyspace: Arc<dyn KeyValueScanClient>,
        sink: Arc<dyn ReportSink>,
        settings: ExportSettings,
    ) -> Self {
        Self {
            store,
            keyspace,
            sink,
            settings,
        }
    }

    /// Relationship matcher over the same taxonomy store
    pub fn matcher(&self) -> RelationshipMatcher {
        RelationshipMatcher::new(Arc::clone(&self.store))
    }

    /// Export every resource's standard ratings as one report.
    ///
    /// The report is stored under `{selector}-ratings.csv` exactly once,
    /// after the scan has completed. If the scan fails nothing is written
    /// and any previous artifact under that name is left as it was.
    #[instrument(skip(self), fields(sink = %self.sink.describe()))]
    pub async fn export_ratings(&self, selector: &str) -> Result<ExportSummary, ExportError> {
        let started_at = Utc::now();
        let artifact = report_name(selector);
        info!(%artifact, pattern = %self.settings.pattern, "Starting ratings export");

        let mut aggregator = RatingsAggregator::new(
            Arc::clone(&self.store),
            Arc::clone(&self.keyspace),
            self.settings.clone(),
        );
        let outcome = aggregator.aggregate().await;

        if let Some(source) = outcome.scan_error {
            aggregator.enter(ExportPhase::Failed);
            error!(
                processed = outcome.processed,
                error = %source,
                "Scan error, report not written"
            );
            return Err(ExportError::Scan {
                processed: outcome.processed,
                source,
            });
        }

        let encoded = match outcome.report_error {
            Some(e) => Err(e),
            None => outcome.buffer.finish(),
        };
        let report = match encoded {
            Ok(report) => report,
            Err(source) => {
                aggregator.enter(ExportPhase::Failed);
                error!(processed = outcome.processed, error = %source, "Report not encoded");
                return Err(ExportError::Report {
                    processed: outcome.processed,
                    source,
                });
            }
        };

        if outcome.unresolved > 0 {
            warn!(unresolved = outcome.unresolved, "Some labels could not be resolved");
        }

        aggregator.enter(ExportPhase::Uploading);
        info!(%artifact, rows = report.rows(), "Writing result");

        if let Err(source) = self.sink.put(&artifact, report.content()).await {
            aggregator.enter(ExportPhase::Failed);
            error!(%artifact, error = %source, "Error writing report");
            return Err(ExportError::Sink {
                processed: outcome.processed,
                artifact,
                source,
            });
        }

        aggregator.enter(ExportPhase::Done);
        let summary = ExportSummary {
            processed: outcome.processed,
            unresolved: outcome.unresolved,
            scan_calls: outcome.scan_calls,
            artifact,
            bytes: report.content().len(),
            started_at,
            completed_at: Utc::now(),
        };
        info!(
            processed = summary.processed,
            scan_calls = summary.scan_calls,
            "Ratings export complete"
        );
        Ok(summary)
    }
}
