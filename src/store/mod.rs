//! Relational taxonomy store interface.
//!
//! The catalog database holds resources, standards, alignments between
//! them, standard categories and resource subjects. The matcher and the
//! ratings export only need three read operations from it, captured by
//! [`TaxonomyStore`].

pub mod sqlite;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{Dimension, ResourceId, ResourceLabel, StandardId, StandardLabel, TaxonomyIdSet};

pub use sqlite::SqliteTaxonomyStore;

/// Errors raised by taxonomy lookups
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{context}: {source}")]
    Query {
        context: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("taxonomy store connection lock poisoned")]
    Poisoned,

    #[error("taxonomy store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub(crate) fn query(context: impl Into<String>, source: rusqlite::Error) -> Self {
        Self::Query {
            context: context.into(),
            source,
        }
    }
}

/// Read-only query surface over the catalog taxonomy
#[async_trait]
pub trait TaxonomyStore: Send + Sync {
    /// IDs attached to `resource` along `dimension`
    async fn ids_for(
        &self,
        dimension: Dimension,
        resource: ResourceId,
    ) -> Result<TaxonomyIdSet, StoreError>;

    /// URL and title of a resource; empty fields if it does not exist
    async fn resolve_resource_label(
        &self,
        resource: ResourceId,
    ) -> Result<ResourceLabel, StoreError>;

    /// Title of a standard; empty if it does not exist
    async fn resolve_standard_label(
        &self,
        standard: StandardId,
    ) -> Result<StandardLabel, StoreError>;
}
