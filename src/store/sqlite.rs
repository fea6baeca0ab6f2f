//! SQLite-backed taxonomy store.
//!
//! Queries run inline on the caller's task: the pipeline is strictly
//! sequential, so a single mutex-guarded connection is enough.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use super::{StoreError, TaxonomyStore};
use crate::domain::{Dimension, ResourceId, ResourceLabel, StandardId, StandardLabel, TaxonomyIdSet};

const STANDARD_IDS_SQL: &str = "SELECT standard_id FROM alignments WHERE resource_id = ?1";

// Categories are not stored per resource: each alignment is joined through
// the standards table to that standard's category.
const CATEGORY_IDS_SQL: &str = "SELECT DISTINCT standards.category_id
     FROM alignments
     INNER JOIN standards ON standards.id = alignments.standard_id
     WHERE alignments.resource_id = ?1 AND standards.category_id IS NOT NULL";

const SUBJECT_IDS_SQL: &str = "SELECT subject_id FROM resources_subjects WHERE resource_id = ?1";

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS resources (
    id INTEGER PRIMARY KEY,
    title TEXT,
    share_url TEXT
);
CREATE TABLE IF NOT EXISTS standards (
    id INTEGER PRIMARY KEY,
    title TEXT,
    grade TEXT,
    category_id INTEGER
);
CREATE TABLE IF NOT EXISTS alignments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    resource_id INTEGER NOT NULL,
    standard_id INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS resources_subjects (
    resource_id INTEGER NOT NULL,
    subject_id INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_alignments_resource ON alignments(resource_id);
CREATE INDEX IF NOT EXISTS idx_resources_subjects_resource ON resources_subjects(resource_id);
"#;

/// Taxonomy store over a SQLite catalog database
pub struct SqliteTaxonomyStore {
    conn: Mutex<Connection>,
}

impl SqliteTaxonomyStore {
    /// Open an existing catalog database
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|e| {
            StoreError::query(format!("Failed to open catalog database {}", path.display()), e)
        })?;
        Ok(Self::from_connection(conn))
    }

    /// Open an empty in-memory catalog with the schema created
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StoreError::query("Failed to open in-memory catalog", e))?;
        let store = Self::from_connection(conn);
        store.ensure_schema()?;
        Ok(store)
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Create the catalog tables if they are missing
    pub fn ensure_schema(&self) -> Result<(), StoreError> {
        self.lock()?
            .execute_batch(SCHEMA_SQL)
            .map_err(|e| StoreError::query("Failed to create catalog schema", e))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    fn select_ids(
        &self,
        sql: &str,
        resource: ResourceId,
        what: &str,
    ) -> Result<TaxonomyIdSet, StoreError> {
        let context = || format!("Couldn't retrieve {} for resource {}", what, resource);
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(sql).map_err(|e| StoreError::query(context(), e))?;
        let rows = stmt
            .query_map(params![resource.0], |row| row.get::<_, i64>(0))
            .map_err(|e| StoreError::query(context(), e))?;

        let mut ids = TaxonomyIdSet::new();
        for id in rows {
            ids.insert(id.map_err(|e| StoreError::query(context(), e))?);
        }
        Ok(ids)
    }

    // ------------------------------------------------------------------
    // Catalog writes (local catalogs and fixtures)
    // ------------------------------------------------------------------

    pub fn insert_resource(
        &self,
        id: ResourceId,
        url: &str,
        title: &str,
    ) -> Result<(), StoreError> {
        self.lock()?
            .execute(
                "INSERT OR REPLACE INTO resources (id, share_url, title) VALUES (?1, ?2, ?3)",
                params![id.0, url, title],
            )
            .map(|_| ())
            .map_err(|e| StoreError::query(format!("Failed to insert resource {}", id), e))
    }

    pub fn insert_standard(
        &self,
        id: StandardId,
        title: &str,
        category_id: Option<i64>,
    ) -> Result<(), StoreError> {
        self.lock()?
            .execute(
                "INSERT OR REPLACE INTO standards (id, title, category_id) VALUES (?1, ?2, ?3)",
                params![id.0, title, category_id],
            )
            .map(|_| ())
            .map_err(|e| StoreError::query(format!("Failed to insert standard {}", id), e))
    }

    pub fn align(&self, resource: ResourceId, standard: StandardId) -> Result<(), StoreError> {
        self.lock()?
            .execute(
                "INSERT INTO alignments (resource_id, standard_id) VALUES (?1, ?2)",
                params![resource.0, standard.0],
            )
            .map(|_| ())
            .map_err(|e| {
                StoreError::query(
                    format!("Failed to align {} to standard {}", resource, standard),
                    e,
                )
            })
    }

    pub fn tag_subject(&self, resource: ResourceId, subject_id: i64) -> Result<(), StoreError> {
        self.lock()?
            .execute(
                "INSERT INTO resources_subjects (resource_id, subject_id) VALUES (?1, ?2)",
                params![resource.0, subject_id],
            )
            .map(|_| ())
            .map_err(|e| {
                StoreError::query(
                    format!("Failed to tag {} with subject {}", resource, subject_id),
                    e,
                )
            })
    }

    /// Run arbitrary SQL against the catalog (migrations, fault setup)
    pub fn execute_batch(&self, sql: &str) -> Result<(), StoreError> {
        self.lock()?
            .execute_batch(sql)
            .map_err(|e| StoreError::query("Failed to execute batch", e))
    }
}

#[async_trait]
impl TaxonomyStore for SqliteTaxonomyStore {
    async fn ids_for(
        &self,
        dimension: Dimension,
        resource: ResourceId,
    ) -> Result<TaxonomyIdSet, StoreError> {
        let ids = match dimension {
            Dimension::Standard => self.select_ids(STANDARD_IDS_SQL, resource, "standards")?,
            Dimension::Category => self.select_ids(CATEGORY_IDS_SQL, resource, "categories")?,
            Dimension::Subject => self.select_ids(SUBJECT_IDS_SQL, resource, "subjects")?,
        };
        debug!(%dimension, %resource, count = ids.len(), "Retrieved taxonomy ids");
        Ok(ids)
    }

    async fn resolve_resource_label(
        &self,
        resource: ResourceId,
    ) -> Result<ResourceLabel, StoreError> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT share_url, title FROM resources WHERE id = ?1",
                params![resource.0],
                |row| Ok((row.get::<_, Option<String>>(0)?, row.get::<_, Option<String>>(1)?)),
            )
            .optional()
            .map_err(|e| {
                StoreError::query(format!("Error retrieving resource {}", resource), e)
            })?;

        let (url, title) = row.unwrap_or_default();
        Ok(ResourceLabel {
            url: url.unwrap_or_default(),
            title: title.unwrap_or_default(),
        })
    }

    async fn resolve_standard_label(
        &self,
        standard: StandardId,
    ) -> Result<StandardLabel, StoreError> {
        let conn = self.lock()?;
        let title = conn
            .query_row(
                "SELECT title FROM standards WHERE id = ?1",
                params![standard.0],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()
            .map_err(|e| {
                StoreError::query(format!("Error retrieving standard {}", standard), e)
            })?;

        Ok(StandardLabel {
            title: title.flatten().unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> SqliteTaxonomyStore {
        let store = SqliteTaxonomyStore::open_in_memory().unwrap();
        store.insert_resource(ResourceId(1), "http://x/1", "Counting Song").unwrap();
        store.insert_standard(StandardId(10), "Counting", Some(100)).unwrap();
        store.insert_standard(StandardId(11), "Cardinality", Some(100)).unwrap();
        store.insert_standard(StandardId(12), "Shapes", None).unwrap();
        store.align(ResourceId(1), StandardId(10)).unwrap();
        store.align(ResourceId(1), StandardId(11)).unwrap();
        store.align(ResourceId(1), StandardId(11)).unwrap();
        store.align(ResourceId(1), StandardId(12)).unwrap();
        store.tag_subject(ResourceId(1), 5).unwrap();
        store
    }

    #[tokio::test]
    async fn test_standard_ids_collapse_duplicates() {
        let store = seeded();
        let ids = store.ids_for(Dimension::Standard, ResourceId(1)).await.unwrap();
        assert_eq!(ids.len(), 3);
        assert!(ids.contains(11));
    }

    #[tokio::test]
    async fn test_category_ids_are_derived_and_distinct() {
        let store = seeded();
        let ids = store.ids_for(Dimension::Category, ResourceId(1)).await.unwrap();
        // Standard 12 has no category and is skipped
        assert_eq!(ids.len(), 1);
        assert!(ids.contains(100));
    }

    #[tokio::test]
    async fn test_subject_ids() {
        let store = seeded();
        let ids = store.ids_for(Dimension::Subject, ResourceId(1)).await.unwrap();
        assert_eq!(ids.iter().collect::<Vec<_>>(), vec![5]);
    }

    #[tokio::test]
    async fn test_unknown_resource_has_empty_sets() {
        let store = seeded();
        for dimension in Dimension::ALL {
            assert!(store.ids_for(dimension, ResourceId(999)).await.unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn test_labels_resolve_or_are_empty() {
        let store = seeded();
        let label = store.resolve_resource_label(ResourceId(1)).await.unwrap();
        assert_eq!(label.url, "http://x/1");
        assert_eq!(label.title, "Counting Song");

        assert_eq!(
            store.resolve_resource_label(ResourceId(2)).await.unwrap(),
            ResourceLabel::default()
        );
        assert_eq!(store.resolve_standard_label(StandardId(10)).await.unwrap().title, "Counting");
        assert_eq!(store.resolve_standard_label(StandardId(99)).await.unwrap().title, "");
    }

    #[tokio::test]
    async fn test_missing_table_is_a_retrieval_error() {
        let store = seeded();
        store.execute_batch("DROP TABLE resources_subjects").unwrap();

        let err = store.ids_for(Dimension::Subject, ResourceId(1)).await.unwrap_err();
        assert!(matches!(err, StoreError::Query { .. }));
        assert!(err.to_string().contains("subjects"));
    }
}
