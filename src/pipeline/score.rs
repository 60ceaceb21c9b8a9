//! Scoring: derive PDCAAS and IVPDCAAS from the curated spreadsheet.
//!
//! ```text
//! PDCAAS   = ASS × TPD  ÷ 100
//! IVPDCAAS = ASS × IVPD ÷ 100
//! ```
//!
//! Column names are matched exactly. When a formula's inputs are not both
//! present the whole output column is empty. Rows whose inputs are not
//! numeric get an empty cell. Existing output columns are recomputed in
//! place, so scoring is idempotent.

use crate::error::PdcaasError;
use crate::output::ScoreSummary;
use crate::spreadsheet::{read_table, write_table};
use crate::table::{Cell, Table};
use std::path::Path;
use tracing::{info, warn};

pub const ASS: &str = "ASS";
pub const TPD: &str = "TPD";
pub const IVPD: &str = "IVPD";
pub const PDCAAS: &str = "PDCAAS";
pub const IVPDCAAS: &str = "IVPDCAAS";

/// Which score columns could be computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scored {
    pub pdcaas: bool,
    pub ivpdcaas: bool,
}

/// `score × digestibility ÷ 100`, or `None` if either operand is not numeric.
pub fn corrected_score(score: &Cell, digestibility: &Cell) -> Option<f64> {
    Some(score.as_number()? * digestibility.as_number()? / 100.0)
}

/// Per-row product of two columns, or `None` if either column is missing.
fn product_column(table: &Table, score: &str, digestibility: &str) -> Option<Vec<Cell>> {
    let scores = table.column(score)?;
    let digestibility = table.column(digestibility)?;
    Some(
        scores
            .into_iter()
            .zip(digestibility)
            .map(|(s, d)| corrected_score(s, d).map_or(Cell::Empty, Cell::Number))
            .collect(),
    )
}

/// Add or recompute the PDCAAS and IVPDCAAS columns.
pub fn score_table(table: &mut Table) -> Scored {
    let pdcaas = product_column(table, ASS, TPD);
    let ivpdcaas = product_column(table, ASS, IVPD);
    let scored = Scored {
        pdcaas: pdcaas.is_some(),
        ivpdcaas: ivpdcaas.is_some(),
    };

    if !scored.pdcaas {
        warn!("Columns {ASS}/{TPD} not both present; {PDCAAS} left empty");
    }
    if !scored.ivpdcaas {
        warn!("Columns {ASS}/{IVPD} not both present; {IVPDCAAS} left empty");
    }

    table.set_column(PDCAAS, pdcaas.unwrap_or_default());
    table.set_column(IVPDCAAS, ivpdcaas.unwrap_or_default());
    scored
}

/// Score the spreadsheet at `path` and write it back to the same path.
pub fn score_file(path: &Path) -> Result<(ScoreSummary, Table), PdcaasError> {
    let mut table = read_table(path)?;
    let scored = score_table(&mut table);
    write_table(&table, path)?;

    info!(
        "Updated spreadsheet saved with {PDCAAS} and {IVPDCAAS}: {}",
        path.display()
    );

    Ok((
        ScoreSummary {
            path: path.to_path_buf(),
            rows: table.row_count(),
            pdcaas_computed: scored.pdcaas,
            ivpdcaas_computed: scored.ivpdcaas,
        },
        table,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet(columns: &[&str], rows: Vec<Vec<Cell>>) -> Table {
        Table::new(columns.iter().map(|c| c.to_string()).collect(), rows)
    }

    #[test]
    fn pdcaas_without_ivpd() {
        let mut t = sheet(
            &["ASS", "TPD"],
            vec![vec![80.0.into(), 50.0.into()], vec![90.0.into(), 60.0.into()]],
        );
        let scored = score_table(&mut t);

        assert_eq!(scored, Scored { pdcaas: true, ivpdcaas: false });
        assert_eq!(t.columns(), &["ASS", "TPD", "PDCAAS", "IVPDCAAS"]);
        let pdcaas: Vec<Option<f64>> = t.column(PDCAAS).unwrap().iter().map(|c| c.as_number()).collect();
        assert_eq!(pdcaas, vec![Some(40.0), Some(54.0)]);
        assert!(t.column(IVPDCAAS).unwrap().iter().all(|c| c.is_empty()));
    }

    #[test]
    fn ivpdcaas_only() {
        let mut t = sheet(&["IVPD", "ASS"], vec![vec![85.0.into(), 100.0.into()]]);
        score_table(&mut t);
        assert_eq!(t.column(PDCAAS).unwrap(), vec![&Cell::Empty]);
        assert_eq!(t.column(IVPDCAAS).unwrap(), vec![&Cell::Number(85.0)]);
    }

    #[test]
    fn names_are_case_sensitive() {
        let mut t = sheet(&["ass", "TPD"], vec![vec![80.0.into(), 50.0.into()]]);
        assert!(!score_table(&mut t).pdcaas);
    }

    #[test]
    fn non_numeric_rows_become_empty() {
        let mut t = sheet(
            &["ASS", "TPD"],
            vec![
                vec![Cell::text("n.d."), 50.0.into()],
                vec![Cell::text("70"), Cell::text(" 90 ")],
                vec![Cell::Empty, 10.0.into()],
            ],
        );
        score_table(&mut t);
        assert_eq!(
            t.column(PDCAAS).unwrap(),
            vec![&Cell::Empty, &Cell::Number(63.0), &Cell::Empty]
        );
    }

    #[test]
    fn rescoring_is_idempotent() {
        let mut t = sheet(
            &["ASS", "TPD", "IVPD"],
            vec![vec![80.0.into(), 50.0.into(), 40.0.into()]],
        );
        score_table(&mut t);
        let once = t.clone();
        score_table(&mut t);

        assert_eq!(t, once);
        assert_eq!(t.columns(), &["ASS", "TPD", "IVPD", "PDCAAS", "IVPDCAAS"]);
    }

    #[test]
    fn existing_score_columns_keep_their_position() {
        let mut t = sheet(
            &["PDCAAS", "ASS", "TPD"],
            vec![vec![Cell::text("stale"), 50.0.into(), 50.0.into()]],
        );
        score_table(&mut t);
        assert_eq!(t.columns(), &["PDCAAS", "ASS", "TPD", "IVPDCAAS"]);
        assert_eq!(t.cell(0, 0), Some(&Cell::Number(25.0)));
    }

    #[test]
    fn score_file_rewrites_same_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("curated.csv");
        std::fs::write(&path, "SAMPLE,ASS,TPD\nsoy,80,50\npea,90,60\n").unwrap();

        let (summary, _) = score_file(&path).unwrap();
        assert!(summary.pdcaas_computed);
        assert!(!summary.ivpdcaas_computed);
        assert_eq!(summary.rows, 2);

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            written,
            "SAMPLE,ASS,TPD,PDCAAS,IVPDCAAS\nsoy,80,50,40,\npea,90,60,54,\n"
        );
    }
}
