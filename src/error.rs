//! Error types for the pdcaas-extract library.
//!
//! The pipeline is a manual batch job: any failure aborts the run and is
//! returned as a [`PdcaasError`]. Conditions the pipeline tolerates
//! (skip-phrase tables, null-filled score columns, skipped charts) are not
//! errors and never surface here.
//!
//! Remote analysis that completes but reports a failure, or exceeds its time
//! budget, is first returned as a typed
//! [`crate::pipeline::analyze::AnalysisOutcome`] and only turned into
//! [`PdcaasError::AnalysisFailed`] by the pipeline driver.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdcaas-extract library.
#[derive(Debug, Error)]
pub enum PdcaasError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// A directory that must be listed could not be read.
    #[error("Cannot read directory '{path}': {source}")]
    InputDirUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── Service errors ────────────────────────────────────────────────────
    /// Endpoint or key missing when the analysis stage needs them.
    #[error("Document analysis service is not configured.\n{hint}")]
    ServiceNotConfigured { hint: String },

    /// The service rejected the credentials (401/403).
    #[error("Authentication error from document analysis service (HTTP {status}): {detail}")]
    AuthError { status: u16, detail: String },

    /// The service answered with an unexpected HTTP status.
    #[error("Document analysis service returned HTTP {status}: {body}")]
    ServiceError { status: u16, body: String },

    /// Connection, TLS or body-decoding failure talking to the service.
    #[error("Transport error calling document analysis service: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service finished without a result, or ran out of time.
    #[error("Analysis of '{path}' did not complete: {reason}")]
    AnalysisFailed { path: PathBuf, reason: String },

    // ── Data errors ───────────────────────────────────────────────────────
    /// An intermediate analysis file could not be decoded.
    #[error("Malformed analysis file '{path}': {detail}")]
    MalformedAnalysis { path: PathBuf, detail: String },

    /// A spreadsheet could not be opened or parsed.
    #[error("Failed to read spreadsheet '{path}': {detail}")]
    SpreadsheetRead { path: PathBuf, detail: String },

    /// A spreadsheet could not be serialised.
    #[error("Failed to write spreadsheet '{path}': {detail}")]
    SpreadsheetWrite { path: PathBuf, detail: String },

    /// Spreadsheet extension is neither `.xlsx` nor `.csv`.
    #[error("Unsupported spreadsheet format for '{path}' (expected .xlsx or .csv)")]
    UnsupportedSpreadsheet { path: PathBuf },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A chart image could not be encoded or saved.
    #[error("Failed to write chart '{path}': {detail}")]
    ChartWriteFailed { path: PathBuf, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}
