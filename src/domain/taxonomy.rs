//! Taxonomy identifiers and labels.
//!
//! Resources are aligned to standards, standards belong to categories and
//! resources are tagged with subjects. Each of those axes is a [`Dimension`]
//! along which two resources can be compared.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// One of the three independent taxonomy axes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    /// Direct resource → standard alignment
    Standard,

    /// Category of an aligned standard (derived through the standards table)
    Category,

    /// Resource → subject association
    Subject,
}

impl Dimension {
    /// All dimensions, in reporting order
    pub const ALL: [Dimension; 3] = [
        Dimension::Standard,
        Dimension::Category,
        Dimension::Subject,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Standard => "standard",
            Dimension::Category => "category",
            Dimension::Subject => "subject",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Dimension {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" | "standards" => Ok(Dimension::Standard),
            "category" | "categories" => Ok(Dimension::Category),
            "subject" | "subjects" => Ok(Dimension::Subject),
            other => Err(format!("unknown taxonomy dimension: {}", other)),
        }
    }
}

/// Catalog resource identifier (video, game, assessment...)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(pub i64);

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ResourceId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Educational standard identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StandardId(pub i64);

impl fmt::Display for StandardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for StandardId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl FromStr for StandardId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(StandardId)
    }
}

/// IDs one resource carries along one dimension.
///
/// Built fresh per lookup and never cached. Duplicates collapse and
/// insertion order does not matter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaxonomyIdSet {
    ids: HashSet<i64>,
}

impl TaxonomyIdSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: i64) -> bool {
        self.ids.insert(id)
    }

    pub fn contains(&self, id: i64) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = i64> + '_ {
        self.ids.iter().copied()
    }

    /// First ID present in both sets, if any.
    ///
    /// Probes the larger set with the smaller one and stops at the first
    /// hit, so the answer (as a boolean) does not depend on argument order.
    pub fn first_shared(&self, other: &TaxonomyIdSet) -> Option<i64> {
        let (small, large) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        small.iter().find(|id| large.contains(*id))
    }
}

impl FromIterator<i64> for TaxonomyIdSet {
    fn from_iter<I: IntoIterator<Item = i64>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}

/// Human-readable resource label. Fields are empty when unresolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceLabel {
    /// Public share URL
    pub url: String,

    /// Display title
    pub title: String,
}

/// Human-readable standard label. Empty when unresolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StandardLabel {
    pub title: String,
}

/// A resource identifier with its label once resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRef {
    pub id: ResourceId,
    pub label: Option<ResourceLabel>,
}

impl ResourceRef {
    pub fn new(id: impl Into<ResourceId>) -> Self {
        Self {
            id: id.into(),
            label: None,
        }
    }

    pub fn with_label(mut self, label: ResourceLabel) -> Self {
        self.label = Some(label);
        self
    }

    /// Parse the resource ID embedded in a keyspace key.
    ///
    /// The ID is the run of trailing digits (`resource:42` → 42). Returns
    /// `None` if the key has no numeric suffix or the suffix is not positive.
    pub fn from_key(key: &str) -> Option<Self> {
        let digits_start = key
            .char_indices()
            .rev()
            .take_while(|(_, c)| c.is_ascii_digit())
            .last()
            .map(|(i, _)| i)?;

        let id: i64 = key[digits_start..].parse().ok()?;
        if id <= 0 {
            return None;
        }
        Some(Self::new(id))
    }

    /// Resolved URL, or empty string
    pub fn url(&self) -> &str {
        self.label.as_ref().map(|l| l.url.as_str()).unwrap_or("")
    }
}
