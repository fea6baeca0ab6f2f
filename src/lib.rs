//! curriculink - taxonomy matching and ratings export for an educational
//! content catalog.
//!
//! # Architecture
//!
//! Two pieces of logic sit on top of two stores:
//! - The relational catalog (resources, standards, alignments, subjects)
//!   answers ID-set and label lookups
//! - A key-value namespace holds one ratings hash per resource
//!
//! The matcher decides whether two resources share a standard, a standard
//! category or a subject, failing closed on lookup errors. The export walks
//! the whole keyspace with a cursor, labels every rating against the
//! catalog (failing open), and stores a single report.
//!
//! # Modules
//!
//! - `domain`: Data structures (Dimension, IDs, labels, RatingEntry)
//! - `store`: Taxonomy store interface and SQLite backend
//! - `keyspace`: Scan client interface, cursor, REST and in-memory backends
//! - `report`: Report rows, buffer and sinks
//! - `core`: Matcher, aggregator and orchestrator
//! - `config`: Explicit configuration loading
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Do two resources share a standard?
//! curriculink shares standard 4123630 4123755
//!
//! # Export ratings for grade K
//! curriculink export --grade K
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod keyspace;
pub mod report;
pub mod store;

// Re-export main types at crate root for convenience
pub use config::Config;
pub use core::{ExportError, ExportSummary, Orchestrator, Relation, RelationshipMatcher};
pub use domain::{Dimension, RatingEntry, ResourceId, StandardId};
pub use keyspace::{KeyValueScanClient, KeyspaceCursor, MemoryKeyspace, RestKeyspace};
pub use report::{DirectorySink, HttpSink, ReportSink};
pub use store::{SqliteTaxonomyStore, StoreError, TaxonomyStore};
