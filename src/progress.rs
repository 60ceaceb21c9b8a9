//! Progress-callback trait for per-document pipeline events.
//!
//! Inject an [`Arc<dyn PipelineProgressCallback>`] via
//! [`crate::config::PipelineConfigBuilder::progress_callback`] to receive
//! events as the pipeline analyses each document and extracts its tables.
//!
//! # Example
//!
//! ```rust
//! use pdcaas_extract::{PipelineConfig, PipelineProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     analysed: AtomicUsize,
//! }
//!
//! impl PipelineProgressCallback for CountingCallback {
//!     fn on_document_complete(&self, name: &str, index: usize, total: usize, tables: usize) {
//!         self.analysed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{index}/{total} {name}: {tables} tables");
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { analysed: AtomicUsize::new(0) });
//!
//! let config = PipelineConfig::builder()
//!     .progress_callback(counter as Arc<dyn PipelineProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::output::PipelineReport;
use std::sync::Arc;

/// Called by the pipeline as it moves through its stages.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Documents are processed one at a time, but the
/// trait is `Send + Sync` so a callback can be shared with other threads
/// (e.g. a progress-bar ticker).
pub trait PipelineProgressCallback: Send + Sync {
    /// Called once before the first document is submitted.
    ///
    /// # Arguments
    /// * `total_documents`: PDFs found in the input directory
    fn on_run_start(&self, total_documents: usize) {
        let _ = total_documents;
    }

    /// Called just before a document is sent to the analysis service.
    ///
    /// # Arguments
    /// * `name`: file name of the PDF
    /// * `index`: 1-indexed position in the run
    /// * `total`: total documents in the run
    fn on_document_start(&self, name: &str, index: usize, total: usize) {
        let _ = (name, index, total);
    }

    /// Called after a document's analysis result has been saved.
    ///
    /// # Arguments
    /// * `tables`: number of tables the service detected
    fn on_document_complete(&self, name: &str, index: usize, total: usize, tables: usize) {
        let _ = (name, index, total, tables);
    }

    /// Called once the extractor has classified every table.
    ///
    /// # Arguments
    /// * `kept`: tables that passed the relevance filter
    /// * `seen`: tables decoded from all intermediate files
    fn on_tables_extracted(&self, kept: usize, seen: usize) {
        let _ = (kept, seen);
    }

    /// Called once after the last stage.
    fn on_run_complete(&self, report: &PipelineReport) {
        let _ = report;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl PipelineProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::PipelineConfig`].
pub type ProgressCallback = Arc<dyn PipelineProgressCallback>;
