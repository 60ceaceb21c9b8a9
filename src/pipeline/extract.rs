//! Table extraction: decode analysis results, rebuild cell grids, and decide
//! which tables hold amino-acid composition data.
//!
//! ## Relevance rules
//!
//! 1. **Skip phrase**: the first cell of the first row, trimmed and
//!    lower-cased, equals `article in`, `abstract` or `article info`. Such
//!    tables are article front matter and are dropped before anything else is
//!    looked at, even if they mention PDCAAS.
//! 2. **Header row**: the first (top) or last (bottom) row has *exactly* 18
//!    cells whose upper-cased text is in [`header_vocabulary`]. A row with 19
//!    or more matching cells does not count.
//! 3. **Marker**: any cell contains `PDCAAS`, case-insensitive.
//!
//! A table is kept when it is not skipped and has a header row or a marker.
//! A matched header row (top preferred) becomes the column labels.

use crate::error::PdcaasError;
use crate::pipeline::input::list_analysis_files;
use crate::table::{Cell, Table};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Upper-case three-letter amino-acid codes.
pub const HEADER_CODES_UPPER: [&str; 18] = [
    "ASP", "THR", "SER", "GLU", "PRO", "GLY", "ALA", "CYS", "VAL", "MET", "ILE", "LEU", "TYR",
    "PHE", "HIS", "LYS", "ARG", "TRP",
];

/// Title-case codes as they appear in many papers.
///
/// NOTE: "Try" (not "Tyr") is kept as found in the reference data; changing
/// it alters which tables match.
pub const HEADER_CODES_TITLE: [&str; 18] = [
    "Asp", "Thr", "Ser", "Glu", "Pro", "Gly", "Ala", "Cys", "Val", "Met", "Ile", "Leu", "Try",
    "Phe", "His", "Lys", "Arg", "Trp",
];

/// A header row must match exactly this many cells.
pub const HEADER_MATCH_COUNT: usize = HEADER_CODES_UPPER.len();

/// First-cell phrases that mark article front matter.
pub const SKIP_PHRASES: [&str; 3] = ["article in", "abstract", "article info"];

static HEADER_VOCABULARY: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HEADER_CODES_UPPER
        .iter()
        .chain(HEADER_CODES_TITLE.iter())
        .copied()
        .collect()
});

static RE_SCORE_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)PDCAAS").unwrap());

/// Union of both code lists.
pub fn header_vocabulary() -> &'static HashSet<&'static str> {
    &HEADER_VOCABULARY
}

// ── Analysis result decoding ─────────────────────────────────────────────

/// The part of an analysis result the extractor reads.
///
/// Accepts the REST casing (`rowIndex`) and the SDK `to_dict()` casing
/// (`row_index`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalysisDocument {
    #[serde(default)]
    pub tables: Vec<AnalyzedTable>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyzedTable {
    #[serde(default)]
    pub cells: Vec<AnalyzedCell>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzedCell {
    #[serde(alias = "rowIndex")]
    pub row_index: usize,
    #[serde(alias = "columnIndex")]
    pub column_index: usize,
    #[serde(default)]
    pub content: Option<String>,
}

impl AnalysisDocument {
    /// Decode a result, unwrapping an `analyzeResult` envelope if present.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        let mut value: serde_json::Value = serde_json::from_slice(bytes)?;
        if let Some(inner) = value.get_mut("analyzeResult") {
            value = inner.take();
        }
        serde_json::from_value(value)
    }

    pub fn from_path(path: &Path) -> Result<Self, PdcaasError> {
        let bytes = std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::PermissionDenied => PdcaasError::PermissionDenied {
                path: path.to_path_buf(),
            },
            _ => PdcaasError::FileNotFound {
                path: path.to_path_buf(),
            },
        })?;
        Self::from_slice(&bytes).map_err(|e| PdcaasError::MalformedAnalysis {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })
    }
}

impl AnalyzedTable {
    /// Rebuild the candidate grid for this table.
    pub fn to_grid(&self) -> Table {
        Table::from_sparse(self.cells.iter().map(|cell| {
            (
                cell.row_index,
                cell.column_index,
                Cell::text(cell.content.clone().unwrap_or_default()),
            )
        }))
    }
}

// ── Classification ───────────────────────────────────────────────────────

/// Which edge row matched the header vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum HeaderPosition {
    Top,
    Bottom,
}

/// Relevance decision for one candidate table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct Classification {
    /// First cell is a skip phrase; nothing else was evaluated.
    pub skipped: bool,
    /// Matched header row, top preferred.
    pub header: Option<HeaderPosition>,
    /// A cell mentions PDCAAS.
    pub has_marker: bool,
}

impl Classification {
    pub fn keep(&self) -> bool {
        !self.skipped && (self.header.is_some() || self.has_marker)
    }
}

/// `true` when the first cell of the first row is a skip phrase.
pub fn is_skip_table(grid: &Table) -> bool {
    let first = grid.cell(0, 0).map(Cell::as_str).unwrap_or("");
    let first = first.trim().to_lowercase();
    SKIP_PHRASES.contains(&first.as_str())
}

/// Count cells whose upper-cased text is in the header vocabulary.
pub fn header_matches(row: &[Cell]) -> usize {
    let vocabulary = header_vocabulary();
    row.iter()
        .filter(|cell| vocabulary.contains(cell.as_str().to_uppercase().as_str()))
        .count()
}

fn is_header_row(row: Option<&Vec<Cell>>) -> bool {
    row.is_some_and(|r| header_matches(r) == HEADER_MATCH_COUNT)
}

/// `true` when any cell mentions PDCAAS.
pub fn has_score_marker(grid: &Table) -> bool {
    grid.rows()
        .iter()
        .flatten()
        .any(|cell| RE_SCORE_MARKER.is_match(cell.as_str()))
}

/// Classify a candidate grid.
pub fn classify(grid: &Table) -> Classification {
    if is_skip_table(grid) {
        return Classification {
            skipped: true,
            ..Classification::default()
        };
    }

    let header = if is_header_row(grid.rows().first()) {
        Some(HeaderPosition::Top)
    } else if is_header_row(grid.rows().last()) {
        Some(HeaderPosition::Bottom)
    } else {
        None
    };

    Classification {
        skipped: false,
        header,
        has_marker: has_score_marker(grid),
    }
}

/// Promote the matched header row to column labels.
///
/// Without a header match the grid keeps its positional labels.
pub fn normalize(grid: Table, classification: &Classification) -> Table {
    match classification.header {
        Some(HeaderPosition::Top) => grid.promote_first_row(),
        Some(HeaderPosition::Bottom) => grid.promote_last_row(),
        None => grid,
    }
}

// ── Folder scan ──────────────────────────────────────────────────────────

/// One table found in an intermediate file, with its relevance decision.
#[derive(Debug, Clone)]
pub struct ExtractedTable {
    /// Intermediate file the table came from.
    pub source: PathBuf,
    /// 0-based position within that file's `tables` array.
    pub index: usize,
    pub classification: Classification,
    /// Normalized table if a header matched, otherwise the candidate grid.
    pub table: Table,
}

impl ExtractedTable {
    pub fn keep(&self) -> bool {
        self.classification.keep()
    }
}

/// Lazy iterator over every table in a folder of analysis files.
///
/// Files are decoded one at a time, in file-name order, as the iterator is
/// advanced. A file that fails to decode yields one `Err` and iteration
/// continues with the next file.
pub struct TableScan {
    files: VecDeque<PathBuf>,
    current: Option<(PathBuf, std::iter::Enumerate<std::vec::IntoIter<AnalyzedTable>>)>,
    files_read: usize,
}

impl TableScan {
    pub fn new(files: Vec<PathBuf>) -> Self {
        Self {
            files: files.into(),
            current: None,
            files_read: 0,
        }
    }

    /// Intermediate files opened so far.
    pub fn files_read(&self) -> usize {
        self.files_read
    }
}

impl Iterator for TableScan {
    type Item = Result<ExtractedTable, PdcaasError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((source, tables)) = self.current.as_mut() {
                if let Some((index, analyzed)) = tables.next() {
                    let grid = analyzed.to_grid();
                    let classification = classify(&grid);
                    debug!(
                        "{} table {}: {}×{} {:?}",
                        source.display(),
                        index,
                        grid.row_count(),
                        grid.column_count(),
                        classification
                    );
                    let table = normalize(grid, &classification);
                    return Some(Ok(ExtractedTable {
                        source: source.clone(),
                        index,
                        classification,
                        table,
                    }));
                }
                self.current = None;
            }

            let path = self.files.pop_front()?;
            self.files_read += 1;
            match AnalysisDocument::from_path(&path) {
                Ok(doc) => self.current = Some((path, doc.tables.into_iter().enumerate())),
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

/// Start a lazy scan of every `*.json` file in `dir`.
pub fn scan_folder(dir: &Path) -> Result<TableScan, PdcaasError> {
    Ok(TableScan::new(list_analysis_files(dir)?))
}

/// Tables kept by the relevance filter, plus scan statistics.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub kept: Vec<Table>,
    pub seen: usize,
    pub files: usize,
}

/// Scan `dir` and keep the relevant tables in scan order.
///
/// The first malformed file aborts extraction.
pub fn extract_relevant(dir: &Path) -> Result<Extraction, PdcaasError> {
    let mut scan = scan_folder(dir)?;
    let mut extraction = Extraction::default();

    for item in scan.by_ref() {
        let extracted = item?;
        extraction.seen += 1;
        if extracted.keep() {
            extraction.kept.push(extracted.table);
        }
    }
    extraction.files = scan.files_read();

    info!(
        "Kept {}/{} tables from {} analysis files",
        extraction.kept.len(),
        extraction.seen,
        extraction.files
    );
    Ok(extraction)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a grid from row-major string slices.
    fn grid(rows: &[&[&str]]) -> Table {
        Table::from_sparse(rows.iter().enumerate().flat_map(|(r, row)| {
            row.iter()
                .enumerate()
                .map(move |(c, s)| (r, c, Cell::text(*s)))
        }))
    }

    fn header_row() -> Vec<&'static str> {
        HEADER_CODES_UPPER.to_vec()
    }

    #[test]
    fn vocabulary_is_union_of_both_lists() {
        let v = header_vocabulary();
        assert_eq!(v.len(), 36);
        assert!(v.contains("TYR"));
        assert!(v.contains("Try"));
        assert!(!v.contains("Tyr"));
    }

    #[test]
    fn exact_header_on_top_is_promoted() {
        let header = header_row();
        let values: Vec<&str> = vec!["1.0"; 18];
        let g = grid(&[&header, &values]);

        let c = classify(&g);
        assert_eq!(c.header, Some(HeaderPosition::Top));
        assert!(c.keep());

        let t = normalize(g, &c);
        assert_eq!(t.columns()[0], "ASP");
        assert_eq!(t.columns()[17], "TRP");
        assert_eq!(t.row_count(), 1);
    }

    #[test]
    fn mixed_case_header_matches_after_uppercasing() {
        let header: Vec<&str> = vec![
            "Asp", "thr", "Ser", "Glu", "Pro", "Gly", "Ala", "Cys", "Val", "Met", "Ile", "Leu",
            "Tyr", "Phe", "His", "Lys", "Arg", "Trp",
        ];
        let c = classify(&grid(&[&header]));
        assert_eq!(c.header, Some(HeaderPosition::Top));
    }

    #[test]
    fn try_spelling_does_not_match() {
        let mut header = header_row();
        header[12] = "Try";
        let c = classify(&grid(&[&header, &["x"]]));
        assert_eq!(c.header, None);
        assert!(!c.keep());
    }

    #[test]
    fn nineteen_matches_are_rejected() {
        let mut header = header_row();
        header.push("LYS");
        let c = classify(&grid(&[&header, &["1"]]));
        assert_eq!(c.header, None);
        assert!(!c.keep());
    }

    #[test]
    fn header_cells_are_not_trimmed() {
        let mut header = header_row();
        header[0] = " ASP";
        let c = classify(&grid(&[&header]));
        assert_eq!(c.header, None);
    }

    #[test]
    fn bottom_header_drops_last_row() {
        let header = header_row();
        let g = grid(&[&["5.1"; 18], &["4.2"; 18], &header]);

        let c = classify(&g);
        assert_eq!(c.header, Some(HeaderPosition::Bottom));

        let t = normalize(g, &c);
        assert_eq!(t.columns()[1], "THR");
        assert_eq!(t.row_count(), 2);
        assert_eq!(t.cell(1, 0), Some(&Cell::text("4.2")));
    }

    #[test]
    fn extra_label_cell_keeps_eighteen_match_header() {
        let mut header = vec!["Sample"];
        header.extend(HEADER_CODES_UPPER);
        let values: Vec<&str> = std::iter::once("soy").chain(["2.5"; 18]).collect();

        let top = grid(&[&header, &values]);
        let c = classify(&top);
        assert_eq!(c.header, Some(HeaderPosition::Top));
        let t = normalize(top, &c);
        assert_eq!(t.column_count(), 19);
        assert_eq!(t.columns()[0], "Sample");
        assert_eq!(t.columns()[18], "TRP");
        assert_eq!(t.cell(0, 0), Some(&Cell::text("soy")));

        let bottom = grid(&[&values, &header]);
        let c = classify(&bottom);
        assert_eq!(c.header, Some(HeaderPosition::Bottom));
        let t = normalize(bottom, &c);
        assert_eq!(t.columns()[0], "Sample");
        assert_eq!(t.row_count(), 1);
        assert_eq!(t.cell(0, 1), Some(&Cell::text("2.5")));
    }

    #[test]
    fn header_only_table_has_empty_body() {
        let c_grid = grid(&[&header_row()]);
        let c = classify(&c_grid);
        let t = normalize(c_grid, &c);
        assert!(c.keep());
        assert_eq!(t.column_count(), 18);
        assert!(t.is_empty());
    }

    #[test]
    fn marker_anywhere_keeps_table_with_positional_labels() {
        let g = grid(&[&["Sample", "Value"], &["soy", "x"], &["", "pdcaas (%)"]]);
        let c = classify(&g);
        assert!(c.has_marker);
        assert_eq!(c.header, None);
        assert!(c.keep());

        let t = normalize(g, &c);
        assert_eq!(t.columns(), &["0", "1"]);
        assert_eq!(t.row_count(), 3);
    }

    #[test]
    fn skip_phrase_wins_over_marker() {
        let g = grid(&[&["Abstract", ""], &["", "PDCAAS surveyed"]]);
        let c = classify(&g);
        assert!(c.skipped);
        assert!(!c.has_marker);
        assert!(!c.keep());
    }

    #[test]
    fn skip_phrase_is_trimmed_and_case_insensitive() {
        for first in ["  ARTICLE INFO ", "Article in", "abstract"] {
            assert!(is_skip_table(&grid(&[&[first]])), "{first:?}");
        }
        assert!(!is_skip_table(&grid(&[&["Abstracts"]])));
    }

    #[test]
    fn empty_first_cell_does_not_crash() {
        // first cell missing entirely: column 0 only exists in row 1
        let g = Table::from_sparse(vec![
            (0, 1, Cell::text("PDCAAS")),
            (1, 0, Cell::text("soy")),
        ]);
        assert_eq!(g.cell(0, 0), Some(&Cell::Empty));
        assert!(classify(&g).keep());

        let empty = Table::from_sparse(Vec::new());
        let c = classify(&empty);
        assert!(!c.skipped);
        assert!(!c.keep());
    }

    #[test]
    fn decodes_rest_and_sdk_casing() {
        let rest = br#"{"analyzeResult": {"tables": [{"rowCount": 1, "cells": [
            {"kind": "columnHeader", "rowIndex": 0, "columnIndex": 1, "content": "B"},
            {"rowIndex": 0, "columnIndex": 0, "content": "A"}
        ]}]}}"#;
        let doc = AnalysisDocument::from_slice(rest).unwrap();
        let g = doc.tables[0].to_grid();
        assert_eq!(g.rows()[0], vec![Cell::text("A"), Cell::text("B")]);

        let sdk = br#"{"tables": [{"cells": [
            {"row_index": 0, "column_index": 0, "content": null}
        ]}], "pages": []}"#;
        let doc = AnalysisDocument::from_slice(sdk).unwrap();
        assert_eq!(doc.tables[0].to_grid().cell(0, 0), Some(&Cell::Empty));

        let no_tables = AnalysisDocument::from_slice(br#"{"content": "text"}"#).unwrap();
        assert!(no_tables.tables.is_empty());
    }

    #[test]
    fn scan_folder_is_lazy_and_ordered() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("b.json"),
            r#"{"tables": [{"cells": [{"rowIndex": 0, "columnIndex": 0, "content": "PDCAAS"}]}]}"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("a.json"),
            r#"{"tables": [
                {"cells": [{"rowIndex": 0, "columnIndex": 0, "content": "Abstract"}]},
                {"cells": [{"rowIndex": 0, "columnIndex": 0, "content": "misc"}]}
            ]}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("ignored.txt"), "x").unwrap();

        let mut scan = scan_folder(dir.path()).unwrap();
        assert_eq!(scan.files_read(), 0);

        let first = scan.next().unwrap().unwrap();
        assert!(first.source.ends_with("a.json"));
        assert!(first.classification.skipped);
        assert_eq!(scan.files_read(), 1);

        let rest: Vec<ExtractedTable> = scan.map(Result::unwrap).collect();
        assert_eq!(rest.len(), 2);
        assert!(!rest[0].keep());
        assert!(rest[1].keep());
        assert_eq!(rest[1].index, 0);
    }

    #[test]
    fn malformed_file_aborts_extraction() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.json"), "{not json").unwrap();
        let err = extract_relevant(dir.path()).unwrap_err();
        assert!(matches!(err, PdcaasError::MalformedAnalysis { .. }));
    }
}
