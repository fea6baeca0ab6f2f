//! Core logic.
//!
//! This module contains:
//! - Matcher: taxonomy relationship checks between two resources
//! - Aggregator: keyspace scan → labelled report rows
//! - Orchestrator: runs an export end to end and stores the report

pub mod aggregator;
pub mod matcher;
pub mod orchestrator;

// Re-export commonly used types
pub use aggregator::{
    AggregateOutcome, ExportPhase, ExportSettings, RatingsAggregator, DEFAULT_PAGE_SIZE,
    DEFAULT_PATTERN,
};
pub use matcher::{Relation, RelationProfile, RelationshipMatcher};
pub use orchestrator::{ExportError, ExportSummary, Orchestrator};
