//! Per-resource standard ratings as stored in the key-value namespace.

/// Standard ratings for one resource.
///
/// A snapshot of the hash stored under `resource:<id>` at scan time, as
/// `(standard_id, rating)` pairs in the order the store returned them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RatingEntry {
    pairs: Vec<(String, String)>,
}

impl RatingEntry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a flat `[field, value, field, value, ...]` reply.
    ///
    /// A trailing field without a value is dropped.
    pub fn from_flat(flat: Vec<String>) -> Self {
        let mut pairs = Vec::with_capacity(flat.len() / 2);
        let mut iter = flat.into_iter();
        while let (Some(field), Some(value)) = (iter.next(), iter.next()) {
            pairs.push((field, value));
        }
        Self { pairs }
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RatingEntry {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            pairs: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}
