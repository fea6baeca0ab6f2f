//! Domain types for curriculink.
//!
//! This module contains the core data structures:
//! - Taxonomy: dimensions, identifiers, ID sets and labels
//! - Ratings: per-resource standard ratings read from the keyspace

pub mod ratings;
pub mod taxonomy;

// Re-export commonly used types
pub use ratings::RatingEntry;
pub use taxonomy::{
    Dimension, ResourceId, ResourceLabel, ResourceRef, StandardId, StandardLabel, TaxonomyIdSet,
};
