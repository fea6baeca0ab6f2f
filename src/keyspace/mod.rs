//! Key-value namespace access.
//!
//! Ratings live in a Redis-style namespace as one hash per resource under
//! `resource:<id>`. The namespace is enumerated with cursor-based SCAN,
//! which may deliver a live key more than once but never omits a key that
//! was present for the whole scan.
//!
//! - [`KeyValueScanClient`]: the two commands the export needs
//! - [`KeyspaceCursor`]: lazy, finite, non-restartable enumeration
//! - [`RestKeyspace`]: Redis-over-REST backend
//! - [`MemoryKeyspace`]: in-process namespace for local runs and tests

pub mod cursor;
pub mod memory;
pub mod rest;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::RatingEntry;

pub use cursor::KeyspaceCursor;
pub use memory::MemoryKeyspace;
pub use rest::RestKeyspace;

/// Cursor value that both starts and ends a scan
pub const ZERO_CURSOR: &str = "0";

/// Errors from the key-value namespace
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("HTTP error talking to keyspace: {0}")]
    Http(#[from] reqwest::Error),

    #[error("keyspace returned an error for {command}: {message}")]
    Command { command: String, message: String },

    #[error("unexpected keyspace reply for {command}: {details}")]
    Protocol { command: String, details: String },

    #[error("keyspace unavailable: {0}")]
    Unavailable(String),
}

/// One page of a cursor scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanPage {
    /// Cursor to pass to the next call; [`ZERO_CURSOR`] once the scan is complete
    pub next_cursor: String,

    /// Keys delivered by this call (possibly empty)
    pub keys: Vec<String>,
}

impl ScanPage {
    pub fn is_terminal(&self) -> bool {
        self.next_cursor == ZERO_CURSOR
    }
}

/// Commands the ratings export issues against the namespace
#[async_trait]
pub trait KeyValueScanClient: Send + Sync {
    /// One SCAN step
    async fn scan(
        &self,
        cursor: &str,
        pattern: &str,
        page_size: usize,
    ) -> Result<ScanPage, ScanError>;

    /// All fields of the hash stored at `key` (empty if the key is gone)
    async fn get_hash(&self, key: &str) -> Result<RatingEntry, ScanError>;

    /// Fetch several hashes, one result per key in the same order.
    ///
    /// Backends that support pipelining override this to use a single
    /// round trip; failures stay attached to their key.
    async fn get_hashes(
        &self,
        keys: &[String],
    ) -> Result<Vec<Result<RatingEntry, ScanError>>, ScanError> {
        let mut entries = Vec::with_capacity(keys.len());
        for key in keys {
            entries.push(self.get_hash(key).await);
        }
        Ok(entries)
    }
}
