//! Cross-resource taxonomy relationship matching.
//!
//! Two resources are related along a dimension when their ID sets for that
//! dimension intersect. Lookups fail closed: if either side cannot be
//! fetched the answer is "not related", with the error carried alongside so
//! callers that care can tell the two cases apart.

use std::sync::Arc;

use tracing::{debug, error, instrument};

use crate::domain::{Dimension, ResourceId};
use crate::store::{StoreError, TaxonomyStore};

/// Outcome of one relationship check
#[derive(Debug)]
pub struct Relation {
    /// Whether a shared ID was found (always false if a lookup failed)
    pub shared: bool,

    /// Lookup failure that forced a negative answer
    pub error: Option<StoreError>,
}

impl Relation {
    fn shared(shared: bool) -> Self {
        Self {
            shared,
            error: None,
        }
    }

    fn failed(error: StoreError) -> Self {
        Self {
            shared: false,
            error: Some(error),
        }
    }

    pub fn is_shared(&self) -> bool {
        self.shared
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }

    /// Convert to a Result for callers that want `?`
    pub fn into_result(self) -> Result<bool, StoreError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.shared),
        }
    }
}

/// Relations along every dimension for one resource pair
#[derive(Debug)]
pub struct RelationProfile {
    pub standard: Relation,
    pub category: Relation,
    pub subject: Relation,
}

impl RelationProfile {
    pub fn get(&self, dimension: Dimension) -> &Relation {
        match dimension {
            Dimension::Standard => &self.standard,
            Dimension::Category => &self.category,
            Dimension::Subject => &self.subject,
        }
    }

    /// Related along at least one dimension
    pub fn any_shared(&self) -> bool {
        Dimension::ALL.iter().any(|d| self.get(*d).is_shared())
    }
}

/// Decides whether resources share taxonomy along a dimension
#[derive(Clone)]
pub struct RelationshipMatcher {
    store: Arc<dyn TaxonomyStore>,
}

impl RelationshipMatcher {
    pub fn new(store: Arc<dyn TaxonomyStore>) -> Self {
        Self { store }
    }

    /// Check whether `a` and `b` share at least one ID along `dimension`.
    ///
    /// Issues one lookup per resource on every call. The boolean is
    /// symmetric in `a` and `b`.
    #[instrument(skip(self))]
    pub async fn shares(&self, dimension: Dimension, a: ResourceId, b: ResourceId) -> Relation {
        let ids_a = match self.store.ids_for(dimension, a).await {
            Ok(ids) => ids,
            Err(e) => {
                error!(resource = %a, error = %e, "Couldn't retrieve {} ids", dimension);
                return Relation::failed(e);
            }
        };

        let ids_b = match self.store.ids_for(dimension, b).await {
            Ok(ids) => ids,
            Err(e) => {
                error!(resource = %b, error = %e, "Couldn't retrieve {} ids", dimension);
                return Relation::failed(e);
            }
        };

        match ids_a.first_shared(&ids_b) {
            Some(id) => {
                debug!(shared_id = id, "Resources share {}", dimension);
                Relation::shared(true)
            }
            None => {
                debug!("Resources do not share {}", dimension);
                Relation::shared(false)
            }
        }
    }

    /// Check every dimension for a resource pair
    pub async fn profile(&self, a: ResourceId, b: ResourceId) -> RelationProfile {
        RelationProfile {
            standard: self.shares(Dimension::Standard, a, b).await,
            category: self.shares(Dimension::Category, a, b).await,
            subject: self.shares(Dimension::Subject, a, b).await,
        }
    }
}
