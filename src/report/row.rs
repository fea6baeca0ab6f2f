//! Report rows and the accumulating buffer.
//!
//! Output shape:
//!
//! ```text
//! Resource,Rating
//! http://x/42,Counting,3
//! http://x/43
//! http://x/44,Shapes,4,Counting,2
//! ```
//!
//! The header names two columns but rows are variable width: a resource
//! label followed by zero or more `standard label, rating` pairs. Consumers
//! must not assume a constant column count.

use std::fmt;

use thiserror::Error;

/// Fixed header line, kept byte-compatible with existing consumers
pub const REPORT_HEADER: &str = "Resource,Rating";

/// Suffix appended to the run selector to name the artifact
pub const REPORT_SUFFIX: &str = "ratings.csv";

/// Artifact name for a run selector (e.g. grade `K` → `K-ratings.csv`)
pub fn report_name(selector: &str) -> String {
    format!("{}-{}", selector, REPORT_SUFFIX)
}

/// Errors encoding report rows
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("report is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// One exported line: a resource and its rated standards
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportRow {
    /// Resource label (URL); empty if it could not be resolved
    pub resource: String,

    /// `(standard label, rating)` pairs in hash order
    pub ratings: Vec<(String, String)>,
}

impl ReportRow {
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            ratings: Vec::new(),
        }
    }

    pub fn push(&mut self, standard: impl Into<String>, rating: impl Into<String>) {
        self.ratings.push((standard.into(), rating.into()));
    }

    /// Fields in output order: resource, then each standard and rating
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.resource.as_str()).chain(
            self.ratings
                .iter()
                .flat_map(|(standard, rating)| [standard.as_str(), rating.as_str()]),
        )
    }
}

/// Append-only report text for one export run.
///
/// Rows are written with a flexible CSV writer: fields are quoted only when
/// they contain a delimiter, quote or line break, and a row made of a lone
/// empty field is written as `""` so it never collapses into a blank line.
pub struct ReportBuffer {
    writer: csv::Writer<Vec<u8>>,
    rows: usize,
}

impl Default for ReportBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ReportBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReportBuffer")
            .field("rows", &self.rows)
            .finish_non_exhaustive()
    }
}

impl ReportBuffer {
    pub fn new() -> Self {
        let mut content = Vec::with_capacity(4096);
        content.extend_from_slice(REPORT_HEADER.as_bytes());
        content.push(b'\n');

        let writer = csv::WriterBuilder::new()
            .flexible(true)
            .has_headers(false)
            .from_writer(content);
        Self { writer, rows: 0 }
    }

    pub fn push(&mut self, row: &ReportRow) -> Result<(), ReportError> {
        self.writer.write_record(row.fields())?;
        self.rows += 1;
        Ok(())
    }

    /// Data rows appended so far (header excluded)
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Freeze the buffer for upload
    pub fn finish(self) -> Result<Report, ReportError> {
        let bytes = self
            .writer
            .into_inner()
            .map_err(|e| csv::Error::from(e.into_error()))?;
        Ok(Report {
            content: String::from_utf8(bytes)?,
            rows: self.rows,
        })
    }
}

/// Finished report content; no further rows can be added
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    content: String,
    rows: usize,
}

impl Report {
    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn rows(&self) -> usize {
        self.rows
    }
}
