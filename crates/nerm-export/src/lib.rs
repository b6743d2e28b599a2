//! Pagination-and-export pipeline for the nerm client.
//!
//! A [`PageFetcher`] reads single pages through a [`Transport`]. The
//! [`PaginationDriver`] walks a whole collection, filters each page and feeds
//! a [`RecordSink`], usually a [`JsonArraySink`]. Once the JSON file is
//! complete, the [`CsvProjector`] derives a CSV whose columns cover every
//! attribute key seen. [`run_export`] ties the steps together.

pub mod advanced_search;
pub mod client;
pub mod counts;
pub mod driver;
pub mod error;
pub mod fetcher;
pub mod job;
pub mod projector;
pub mod sink;
pub mod transport;

#[cfg(test)]
mod testing;

pub use client::ApiClient;
pub use driver::{
    ExportJob, JobState, JobSummary, NoProgress, Pagination, PaginationDriver, ProgressReporter,
    collect_all,
};
pub use error::{ErrorCategory, ExportError, Result};
pub use fetcher::{Page, PageFetcher, PageMetadata, Position};
pub use job::{ExportConfig, ExportOutcome, ExportRequest, OutputTarget, run_export, run_export_to};
pub use projector::{CsvProjector, ProjectionSummary, csv_path_for};
pub use sink::{JsonArraySink, RecordSink};
pub use transport::{Method, QueryParams, Transport};
