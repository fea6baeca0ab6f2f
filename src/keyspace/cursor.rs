//! Lazy enumeration of a keyspace pattern.

use tracing::{debug, warn};

use super::{KeyValueScanClient, ScanError, ZERO_CURSOR};

#[derive(Debug, Clone, PartialEq, Eq)]
enum CursorState {
    /// Next call resumes from this server-side cursor
    Active(String),

    /// Terminal page delivered, or a scan step failed
    Finished,
}

/// Page-by-page walk over every key matching a glob pattern.
///
/// The scan starts at the zero cursor and ends after the call that hands
/// the zero cursor back; that last page is still delivered. A failed step
/// ends the walk for good. There is no way to rewind: build a new cursor to
/// scan again, which may observe a different snapshot of the namespace.
///
/// Keys delivered more than once by the backend are passed through as-is.
pub struct KeyspaceCursor<'a> {
    client: &'a dyn KeyValueScanClient,
    pattern: String,
    page_size: usize,
    state: CursorState,
    calls: usize,
    delivered: usize,
}

impl<'a> KeyspaceCursor<'a> {
    pub fn new(
        client: &'a dyn KeyValueScanClient,
        pattern: impl Into<String>,
        page_size: usize,
    ) -> Self {
        Self {
            client,
            pattern: pattern.into(),
            page_size: page_size.max(1),
            state: CursorState::Active(ZERO_CURSOR.to_string()),
            calls: 0,
            delivered: 0,
        }
    }

    /// Fetch the next page of keys.
    ///
    /// Returns `Ok(None)` once the scan is exhausted. The first error is
    /// returned as-is and every later call yields `Ok(None)`.
    pub async fn next_page(&mut self) -> Result<Option<Vec<String>>, ScanError> {
        let cursor = match &self.state {
            CursorState::Active(cursor) => cursor.clone(),
            CursorState::Finished => return Ok(None),
        };

        self.calls += 1;
        let page = match self.client.scan(&cursor, &self.pattern, self.page_size).await {
            Ok(page) => page,
            Err(e) => {
                warn!(pattern = %self.pattern, calls = self.calls, error = %e, "Scan step failed");
                self.state = CursorState::Finished;
                return Err(e);
            }
        };

        debug!(
            cursor = %cursor,
            next = %page.next_cursor,
            keys = page.keys.len(),
            "Scan step"
        );

        self.delivered += page.keys.len();
        self.state = if page.is_terminal() {
            CursorState::Finished
        } else {
            CursorState::Active(page.next_cursor)
        };

        Ok(Some(page.keys))
    }

    /// Drain the remaining pages into one list, in delivery order
    pub async fn collect(mut self) -> Result<Vec<String>, ScanError> {
        let mut keys = Vec::new();
        while let Some(page) = self.next_page().await? {
            keys.extend(page);
        }
        Ok(keys)
    }

    /// Scan round trips issued so far
    pub fn calls(&self) -> usize {
        self.calls
    }

    /// Keys delivered so far, duplicates included
    pub fn delivered(&self) -> usize {
        self.delivered
    }

    pub fn is_finished(&self) -> bool {
        self.state == CursorState::Finished
    }
}
