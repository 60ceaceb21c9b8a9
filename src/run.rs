//! Whole-pipeline entry points.
//!
//! ```text
//! PDF/*.pdf ──analyze──▶ JSON/*.json ──extract──▶ kept tables
//!     ──aggregate──▶ final_result.xlsx
//!     R/final_result.xlsx ──score──▶ R/final_result.xlsx ──chart──▶ *.png
//! ```
//!
//! Stages run strictly one after another and documents are analysed one at
//! a time. Any error aborts the run. The aggregated output and the curated
//! spreadsheet are different files: the curated copy is maintained by hand
//! from the aggregated output and may not exist yet on a first run, in which
//! case scoring is skipped with a warning.

use crate::config::PipelineConfig;
use crate::error::PdcaasError;
use crate::output::PipelineReport;
use crate::pipeline::aggregate::write_aggregate;
use crate::pipeline::analyze::{analyze_and_save, AzureDocumentAnalyzer, DocumentAnalyzer};
use crate::pipeline::chart::render_charts;
use crate::pipeline::extract::extract_relevant;
use crate::pipeline::input::{list_pdfs, validate_pdf};
use crate::pipeline::score::score_file;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Run the whole pipeline against Azure Document Intelligence.
///
/// With [`PipelineConfig::skip_analysis`] set, no credentials are needed and
/// the intermediate JSON already in `json_dir` is used as-is.
///
/// # Errors
/// Returns the first fatal error of any stage:
/// - [`PdcaasError::ServiceNotConfigured`] when analysis runs without an
///   endpoint or key
/// - input, service, data and output errors from the stages themselves
pub async fn run(config: &PipelineConfig) -> Result<PipelineReport, PdcaasError> {
    if config.skip_analysis {
        return drive::<AzureDocumentAnalyzer>(config, None).await;
    }
    let analyzer = AzureDocumentAnalyzer::from_config(config)?;
    drive(config, Some(&analyzer)).await
}

/// Run the whole pipeline with a caller-supplied analyzer.
///
/// Used by tests and by callers that front the service with their own
/// client. [`PipelineConfig::skip_analysis`] still applies.
pub async fn run_with_analyzer<A: DocumentAnalyzer>(
    config: &PipelineConfig,
    analyzer: &A,
) -> Result<PipelineReport, PdcaasError> {
    if config.skip_analysis {
        return drive::<A>(config, None).await;
    }
    drive(config, Some(analyzer)).await
}

/// Synchronous wrapper around [`run`].
///
/// Creates a temporary tokio runtime internally.
pub fn run_sync(config: &PipelineConfig) -> Result<PipelineReport, PdcaasError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| PdcaasError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(run(config))
}

/// Analyse every PDF in `pdf_dir`, writing one JSON file per document.
///
/// Returns the number of documents analysed.
pub async fn analyze_folder<A: DocumentAnalyzer>(
    config: &PipelineConfig,
    analyzer: &A,
) -> Result<usize, PdcaasError> {
    let pdfs = list_pdfs(&config.pdf_dir)?;
    let total = pdfs.len();
    info!("Analysing {} PDFs from {}", total, config.pdf_dir.display());

    if let Some(ref cb) = config.progress_callback {
        cb.on_run_start(total);
    }

    for (i, pdf) in pdfs.iter().enumerate() {
        let name = display_name(pdf);
        validate_pdf(pdf)?;

        if let Some(ref cb) = config.progress_callback {
            cb.on_document_start(&name, i + 1, total);
        }
        info!("Processing file: {}", name);

        let json_path = config.intermediate_path(pdf);
        let tables = analyze_and_save(analyzer, pdf, &json_path).await?;

        if let Some(ref cb) = config.progress_callback {
            cb.on_document_complete(&name, i + 1, total, tables);
        }
    }

    Ok(total)
}

// ── Internal helpers ─────────────────────────────────────────────────────

async fn drive<A: DocumentAnalyzer>(
    config: &PipelineConfig,
    analyzer: Option<&A>,
) -> Result<PipelineReport, PdcaasError> {
    let total_start = Instant::now();
    let mut report = PipelineReport::default();

    // ── Step 1: Intermediate directory ───────────────────────────────────
    tokio::fs::create_dir_all(&config.json_dir)
        .await
        .map_err(|e| PdcaasError::OutputWriteFailed {
            path: config.json_dir.clone(),
            source: e,
        })?;

    // ── Step 2: Analysis ─────────────────────────────────────────────────
    match analyzer {
        Some(analyzer) => {
            let analysis_start = Instant::now();
            report.documents_analyzed = analyze_folder(config, analyzer).await?;
            report.analysis_duration_ms = analysis_start.elapsed().as_millis() as u64;
            info!(
                "Analysed {} documents in {}ms",
                report.documents_analyzed, report.analysis_duration_ms
            );
        }
        None => info!(
            "Skipping analysis; reusing intermediate files in {}",
            config.json_dir.display()
        ),
    }

    // ── Step 3: Extraction ───────────────────────────────────────────────
    let extraction = extract_relevant(&config.json_dir)?;
    report.intermediate_files = extraction.files;
    report.tables_seen = extraction.seen;
    report.tables_kept = extraction.kept.len();
    if let Some(ref cb) = config.progress_callback {
        cb.on_tables_extracted(report.tables_kept, report.tables_seen);
    }

    // ── Step 4: Aggregation ──────────────────────────────────────────────
    report.aggregate = write_aggregate(extraction.kept, &config.output_path)?
        .summary()
        .cloned();

    // ── Step 5: Scoring ──────────────────────────────────────────────────
    let scored = if config.skip_scoring {
        info!("Skipping scoring");
        report.score_skipped = Some("scoring disabled".to_string());
        None
    } else if !config.curated_path.exists() {
        let reason = format!(
            "curated spreadsheet {} not found",
            config.curated_path.display()
        );
        warn!("Skipping scoring: {reason}");
        report.score_skipped = Some(reason);
        None
    } else {
        let (summary, table) = score_file(&config.curated_path)?;
        report.score = Some(summary);
        Some(table)
    };

    // ── Step 6: Charts ───────────────────────────────────────────────────
    match (config.chart_dir(), scored) {
        (Some(dir), Some(table)) => report.charts = render_charts(&table, dir)?,
        (Some(_), None) => debug!("No scored table; charts not rendered"),
        (None, _) => {}
    }

    report.total_duration_ms = total_start.elapsed().as_millis() as u64;
    info!(
        "Run complete: {}/{} tables kept, {}ms total",
        report.tables_kept, report.tables_seen, report.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_run_complete(&report);
    }
    Ok(report)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
