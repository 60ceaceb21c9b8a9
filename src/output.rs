//! Result types reported by each stage and by a whole pipeline run.
//!
//! All types are `Serialize` so the CLI can print them with `--json`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where the aggregated table went and how big it is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateSummary {
    pub path: PathBuf,
    pub rows: usize,
    pub columns: usize,
    /// Number of source tables concatenated side by side.
    pub tables: usize,
}

/// Outcome of the aggregation stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggregateOutcome {
    /// The aggregated spreadsheet was written.
    Written(AggregateSummary),
    /// No table passed the relevance filter; nothing was written.
    NoRelevantTables,
}

impl AggregateOutcome {
    pub fn summary(&self) -> Option<&AggregateSummary> {
        match self {
            AggregateOutcome::Written(s) => Some(s),
            AggregateOutcome::NoRelevantTables => None,
        }
    }
}

/// What the scoring stage computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreSummary {
    pub path: PathBuf,
    pub rows: usize,
    /// `ASS` and `TPD` were both present.
    pub pdcaas_computed: bool,
    /// `ASS` and `IVPD` were both present.
    pub ivpdcaas_computed: bool,
}

/// Statistics for one full pipeline run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineReport {
    /// PDFs sent to the analysis service this run.
    pub documents_analyzed: usize,
    /// Intermediate JSON files read by the extractor.
    pub intermediate_files: usize,
    /// Tables decoded from the intermediate files.
    pub tables_seen: usize,
    /// Tables that passed the relevance filter.
    pub tables_kept: usize,
    /// `None` when no relevant tables were found.
    pub aggregate: Option<AggregateSummary>,
    /// `None` when scoring was skipped or the curated sheet was absent.
    pub score: Option<ScoreSummary>,
    /// Why scoring did not run, when it did not.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_skipped: Option<String>,
    /// Chart images written this run.
    pub charts: Vec<PathBuf>,
    /// Wall-clock time spent waiting on the analysis service.
    pub analysis_duration_ms: u64,
    /// Wall-clock time for the whole run.
    pub total_duration_ms: u64,
}
