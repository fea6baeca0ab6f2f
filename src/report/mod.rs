//! Ratings report format and destinations.

pub mod row;
pub mod sink;

pub use row::{
    report_name, Report, ReportBuffer, ReportError, ReportRow, REPORT_HEADER, REPORT_SUFFIX,
};
pub use sink::{DirectorySink, HttpSink, ReportSink, SinkError};
