//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use curriculink::domain::{
    Dimension, ResourceId, ResourceLabel, StandardId, StandardLabel, TaxonomyIdSet,
};
use curriculink::report::{ReportSink, SinkError};
use curriculink::store::{StoreError, TaxonomyStore};

/// Wraps a store and fails chosen lookups
pub struct FlakyStore<S> {
    inner: S,
    fail_ids_for: HashSet<i64>,
    fail_resources: HashSet<i64>,
    fail_standards: HashSet<i64>,
    ids_calls: AtomicUsize,
}

impl<S: TaxonomyStore> FlakyStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            fail_ids_for: HashSet::new(),
            fail_resources: HashSet::new(),
            fail_standards: HashSet::new(),
            ids_calls: AtomicUsize::new(0),
        }
    }

    pub fn failing_ids_for(mut self, resource: i64) -> Self {
        self.fail_ids_for.insert(resource);
        self
    }

    pub fn failing_resource_label(mut self, resource: i64) -> Self {
        self.fail_resources.insert(resource);
        self
    }

    pub fn failing_standard_label(mut self, standard: i64) -> Self {
        self.fail_standards.insert(standard);
        self
    }

    pub fn ids_calls(&self) -> usize {
        self.ids_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<S: TaxonomyStore> TaxonomyStore for FlakyStore<S> {
    async fn ids_for(
        &self,
        dimension: Dimension,
        resource: ResourceId,
    ) -> Result<TaxonomyIdSet, StoreError> {
        self.ids_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_ids_for.contains(&resource.0) {
            return Err(StoreError::Unavailable(format!("{} ids for {}", dimension, resource)));
        }
        self.inner.ids_for(dimension, resource).await
    }

    async fn resolve_resource_label(
        &self,
        resource: ResourceId,
    ) -> Result<ResourceLabel, StoreError> {
        if self.fail_resources.contains(&resource.0) {
            return Err(StoreError::Unavailable(format!("resource {}", resource)));
        }
        self.inner.resolve_resource_label(resource).await
    }

    async fn resolve_standard_label(
        &self,
        standard: StandardId,
    ) -> Result<StandardLabel, StoreError> {
        if self.fail_standards.contains(&standard.0) {
            return Err(StoreError::Unavailable(format!("standard {}", standard)));
        }
        self.inner.resolve_standard_label(standard).await
    }
}

/// Sink that keeps every put in memory
#[derive(Default)]
pub struct RecordingSink {
    puts: Mutex<Vec<(String, String)>>,
    fail: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            puts: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn puts(&self) -> Vec<(String, String)> {
        self.puts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReportSink for RecordingSink {
    fn describe(&self) -> String {
        "memory".to_string()
    }

    async fn put(&self, name: &str, content: &str) -> Result<(), SinkError> {
        if self.fail {
            return Err(SinkError::Rejected {
                name: name.to_string(),
                status: 503,
            });
        }
        self.puts
            .lock()
            .unwrap()
            .push((name.to_string(), content.to_string()));
        Ok(())
    }
}

pub fn shared<T>(value: T) -> Arc<T> {
    Arc::new(value)
}
