//! # pdcaas-extract
//!
//! Pull amino-acid composition tables out of scientific PDFs and score
//! protein quality (PDCAAS and its in-vitro variant IVPDCAAS).
//!
//! ## Why this crate?
//!
//! Composition tables in nutrition papers come in every layout imaginable:
//! headers on top or underneath, codes in upper or title case, tables split
//! across pages. Text extraction loses the grid. This crate sends each PDF to
//! Azure AI Document Intelligence, which returns every table as addressed
//! cells, then applies a small set of rules to decide which tables are
//! composition data and lays them side by side in one spreadsheet for review.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF/
//!  │
//!  ├─ 1. Analyze    POST to Document Intelligence, poll, save JSON/<stem>.json
//!  ├─ 2. Extract    sparse cells → dense grid → skip / header / marker rules
//!  ├─ 3. Aggregate  pad to equal height, concatenate → final_result.xlsx
//!  ├─ 4. Score      PDCAAS = ASS×TPD/100, IVPDCAAS = ASS×IVPD/100 on the
//!  │                curated sheet (R/final_result.xlsx), written in place
//!  └─ 5. Chart      optional PNGs of the scored sheet
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdcaas_extract::{run, PipelineConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PipelineConfig::builder()
//!         .endpoint(std::env::var("AZURE_DOCUMENT_INTELLIGENCE_ENDPOINT")?)
//!         .api_key(std::env::var("AZURE_DOCUMENT_INTELLIGENCE_KEY")?)
//!         .build()?;
//!     let report = run(&config).await?;
//!     eprintln!("kept {}/{} tables", report.tables_kept, report.tables_seen);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdcaas` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdcaas-extract = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod output;
mod persist;
pub mod pipeline;
pub mod progress;
pub mod run;
pub mod spreadsheet;
pub mod table;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{PipelineConfig, PipelineConfigBuilder};
pub use error::PdcaasError;
pub use output::{AggregateOutcome, AggregateSummary, PipelineReport, ScoreSummary};
pub use pipeline::aggregate::{aggregate, write_aggregate};
pub use pipeline::analyze::{
    analyze_and_save, AnalysisOutcome, AzureDocumentAnalyzer, DocumentAnalyzer,
};
pub use pipeline::chart::render_charts;
pub use pipeline::extract::{
    classify, extract_relevant, normalize, scan_folder, Classification, ExtractedTable,
    HeaderPosition, TableScan,
};
pub use pipeline::score::{score_file, score_table};
pub use progress::{NoopProgressCallback, PipelineProgressCallback, ProgressCallback};
pub use run::{analyze_folder, run, run_sync, run_with_analyzer};
pub use spreadsheet::{read_table, write_table, SheetFormat};
pub use table::{Cell, Table};
