//! CLI binary for pdcaas-extract.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `PipelineConfig`, runs the pipeline and prints the report.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdcaas_extract::{
    run, PipelineConfig, PipelineProgressCallback, PipelineReport, ProgressCallback,
};
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar across all documents plus a log line
/// per analysed PDF.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Start of the document currently being analysed.
    started: Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    /// Spinner until `on_run_start` reports how many PDFs there are.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Listing PDFs…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            started: Mutex::new(None),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} PDFs  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Analysing");
        self.bar.reset_eta();
    }

    fn elapsed_secs(&self) -> f64 {
        self.started
            .lock()
            .ok()
            .and_then(|mut s| s.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl PipelineProgressCallback for CliProgressCallback {
    fn on_run_start(&self, total_documents: usize) {
        self.activate_bar(total_documents);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Analysing {total_documents} PDFs…"))
        ));
    }

    fn on_document_start(&self, name: &str, _index: usize, _total: usize) {
        if let Ok(mut started) = self.started.lock() {
            *started = Some(Instant::now());
        }
        self.bar.set_message(name.to_string());
    }

    fn on_document_complete(&self, name: &str, index: usize, total: usize, tables: usize) {
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {:<40}  {}  {}",
            green("✓"),
            index,
            total,
            name,
            dim(&format!("{tables:>3} tables")),
            dim(&format!("{:.1}s", self.elapsed_secs())),
        ));
        self.bar.inc(1);
    }

    fn on_tables_extracted(&self, kept: usize, seen: usize) {
        self.bar.finish_and_clear();
        let mark = if kept == 0 { yellow("⚠") } else { green("✔") };
        eprintln!(
            "{} {}/{} tables kept",
            mark,
            bold(&kept.to_string()),
            seen
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Whole pipeline with the default folders (./PDF → ./JSON → ./final_result.xlsx)
  pdcaas

  # Re-run extraction and scoring on existing JSON, no service calls
  pdcaas --skip-analysis

  # Custom model and folders, charts next to the curated sheet
  pdcaas --model NewmodelTable --pdf-dir papers --json-dir out/json \
         --output out/tables.xlsx --chart-dir R/charts

  # CSV in and out, no service calls
  pdcaas --skip-analysis --output final_result.csv --curated R/final_result.csv

  # Machine-readable run report
  pdcaas --json > report.json

RELEVANCE RULES:
  A table is kept when its first cell is not "abstract", "article in" or
  "article info" and either its first or last row has exactly 18 amino-acid
  codes (ASP THR SER … TRP) or any cell mentions PDCAAS.

SCORES (curated sheet, written back in place):
  PDCAAS   = ASS × TPD  / 100
  IVPDCAAS = ASS × IVPD / 100

ENVIRONMENT VARIABLES:
  AZURE_DOCUMENT_INTELLIGENCE_ENDPOINT  Resource endpoint (https://…)
  AZURE_DOCUMENT_INTELLIGENCE_KEY       Subscription key
  PDCAAS_MODEL                          Model id (default prebuilt-layout)
  RUST_LOG                              Override log filter
"#;

/// Extract amino-acid tables from PDFs and score PDCAAS / IVPDCAAS.
#[derive(Parser, Debug)]
#[command(
    name = "pdcaas",
    version,
    about = "Extract amino-acid tables from PDFs and score PDCAAS / IVPDCAAS",
    long_about = "Send every PDF in a folder to Azure AI Document Intelligence, keep the tables \
that hold amino-acid composition data, lay them side by side in one spreadsheet, and add \
PDCAAS and IVPDCAAS columns to a curated copy of that spreadsheet.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Folder with the source PDFs.
    #[arg(long, env = "PDCAAS_PDF_DIR", default_value = "./PDF")]
    pdf_dir: PathBuf,

    /// Folder for per-document analysis JSON.
    #[arg(long, env = "PDCAAS_JSON_DIR", default_value = "./JSON")]
    json_dir: PathBuf,

    /// Aggregated spreadsheet (.xlsx or .csv).
    #[arg(short, long, env = "PDCAAS_OUTPUT", default_value = "./final_result.xlsx")]
    output: PathBuf,

    /// Curated spreadsheet to score in place (.xlsx or .csv).
    #[arg(long, env = "PDCAAS_CURATED", default_value = "./R/final_result.xlsx")]
    curated: PathBuf,

    /// Render PNG charts of the scored sheet into this folder.
    #[arg(long, env = "PDCAAS_CHART_DIR")]
    chart_dir: Option<PathBuf>,

    /// Document Intelligence endpoint.
    #[arg(long, env = "AZURE_DOCUMENT_INTELLIGENCE_ENDPOINT")]
    endpoint: Option<String>,

    /// Document Intelligence subscription key.
    #[arg(long, env = "AZURE_DOCUMENT_INTELLIGENCE_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Analysis model id.
    #[arg(long, env = "PDCAAS_MODEL", default_value = pdcaas_extract::config::DEFAULT_MODEL_ID)]
    model: String,

    /// REST api-version.
    #[arg(long, env = "PDCAAS_API_VERSION", default_value = pdcaas_extract::config::DEFAULT_API_VERSION)]
    api_version: String,

    /// Per-document analysis timeout in seconds.
    #[arg(long, env = "PDCAAS_ANALYSIS_TIMEOUT", default_value_t = 300)]
    analysis_timeout: u64,

    /// Delay between status polls in milliseconds (min 100).
    #[arg(long, env = "PDCAAS_POLL_INTERVAL_MS", default_value_t = 1000)]
    poll_interval_ms: u64,

    /// Reuse existing JSON instead of calling the service.
    #[arg(long, env = "PDCAAS_SKIP_ANALYSIS")]
    skip_analysis: bool,

    /// Stop after writing the aggregated spreadsheet.
    #[arg(long, env = "PDCAAS_SKIP_SCORE")]
    skip_score: bool,

    /// Print the run report as JSON on stdout.
    #[arg(long, env = "PDCAAS_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDCAAS_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDCAAS_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDCAAS_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // INFO logs would interleave with the bar, so they are off while it shows.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.skip_analysis;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn PipelineProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Run ──────────────────────────────────────────────────────────────
    let report = run(&config).await.context("Pipeline failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialise report")?;
        println!("{json}");
    } else if !cli.quiet {
        print_summary(&report);
    }

    Ok(())
}

/// Map CLI args to `PipelineConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<PipelineConfig> {
    let mut builder = PipelineConfig::builder()
        .model_id(&cli.model)
        .api_version(&cli.api_version)
        .pdf_dir(&cli.pdf_dir)
        .json_dir(&cli.json_dir)
        .output_path(&cli.output)
        .curated_path(&cli.curated)
        .analysis_timeout_secs(cli.analysis_timeout)
        .poll_interval_ms(cli.poll_interval_ms)
        .skip_analysis(cli.skip_analysis)
        .skip_scoring(cli.skip_score);

    if let Some(ref endpoint) = cli.endpoint {
        builder = builder.endpoint(endpoint);
    }
    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key);
    }
    if let Some(ref dir) = cli.chart_dir {
        builder = builder.chart_dir(dir);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn print_summary(report: &PipelineReport) {
    match report.aggregate {
        Some(ref agg) => eprintln!(
            "{}  {} tables  →  {}  {}",
            green("✔"),
            agg.tables,
            bold(&agg.path.display().to_string()),
            dim(&format!("{} rows × {} columns", agg.rows, agg.columns)),
        ),
        None => eprintln!("{}  No relevant tables found.", yellow("⚠")),
    }

    if let Some(ref score) = report.score {
        let flag = |computed: bool| if computed { green("computed") } else { dim("empty") };
        eprintln!(
            "{}  scored {}  PDCAAS {}  IVPDCAAS {}",
            green("✔"),
            bold(&score.path.display().to_string()),
            flag(score.pdcaas_computed),
            flag(score.ivpdcaas_computed),
        );
    }
    if let Some(ref reason) = report.score_skipped {
        eprintln!("{}  Scoring skipped: {}", yellow("⚠"), reason);
    }

    for chart in &report.charts {
        eprintln!("   {} {}", cyan("▸"), chart.display());
    }

    eprintln!(
        "   {} PDFs analysed  —  {}ms total",
        dim(&report.documents_analyzed.to_string()),
        report.total_duration_ms,
    );
}
