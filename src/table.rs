//! Rectangular table value shared by every pipeline stage.
//!
//! A [`Table`] is a list of column labels plus rows of [`Cell`]s, and every
//! row always has exactly one cell per label. Sparse input (cells addressed
//! by `(row, column)`) goes through [`Table::from_sparse`], which is the only
//! place gaps are filled.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// One spreadsheet cell.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Cell {
    /// No value. Gaps, empty strings and null scores all collapse to this.
    #[default]
    Empty,
    Text(String),
    Number(f64),
}

impl Cell {
    /// Build a text cell, mapping the empty string to [`Cell::Empty`].
    pub fn text(s: impl Into<String>) -> Self {
        let s = s.into();
        if s.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(s)
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    /// Borrow the text content; empty for [`Cell::Empty`] and numbers.
    pub fn as_str(&self) -> &str {
        match self {
            Cell::Text(s) => s,
            Cell::Empty | Cell::Number(_) => "",
        }
    }

    /// Numeric view used by scoring and charts.
    ///
    /// Text is accepted when it parses as a float after trimming, because CSV
    /// files and hand-edited sheets carry numbers as text.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            Cell::Text(s) => s.trim().parse::<f64>().ok(),
            Cell::Empty => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(s) => f.write_str(s),
            Cell::Number(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::text(s)
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Cell::Number(n)
    }
}

/// A dense table with labelled columns.
///
/// Labels may repeat: side-by-side concatenation keeps each source table's
/// own labels. Lookups by name resolve to the first occurrence.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Build a table, padding short rows (and truncating long ones) to the
    /// label count so the result is rectangular.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, Cell::Empty);
                row
            })
            .collect();
        Self { columns, rows }
    }

    /// Reconstruct a dense grid from sparse `(row, column, cell)` triples.
    ///
    /// Rows and columns are the sorted distinct indices that occur in the
    /// input, so non-contiguous indices collapse to a dense layout. Column
    /// labels are the original column indices. Missing positions become
    /// [`Cell::Empty`]; a repeated coordinate keeps the last cell.
    pub fn from_sparse(cells: impl IntoIterator<Item = (usize, usize, Cell)>) -> Self {
        let mut grid: BTreeMap<usize, BTreeMap<usize, Cell>> = BTreeMap::new();
        let mut column_keys: BTreeSet<usize> = BTreeSet::new();

        for (row, column, cell) in cells {
            column_keys.insert(column);
            grid.entry(row).or_default().insert(column, cell);
        }

        let rows = grid
            .into_values()
            .map(|mut row| {
                column_keys
                    .iter()
                    .map(|c| row.remove(c).unwrap_or_default())
                    .collect()
            })
            .collect();
        let columns = column_keys.iter().map(|c| c.to_string()).collect();

        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// `true` when the table has no data rows (it may still have labels).
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&Cell> {
        self.rows.get(row).and_then(|r| r.get(column))
    }

    /// Position of the first column with exactly this label.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Cells of the first column named `name`, top to bottom.
    pub fn column(&self, name: &str) -> Option<Vec<&Cell>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|row| &row[idx]).collect())
    }

    /// Replace the first column named `name`, or append it if absent.
    ///
    /// `values` is padded with [`Cell::Empty`] or truncated to the row count.
    pub fn set_column(&mut self, name: &str, mut values: Vec<Cell>) {
        values.resize(self.rows.len(), Cell::Empty);
        match self.column_index(name) {
            Some(idx) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[idx] = value;
                }
            }
            None => {
                self.columns.push(name.to_string());
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
    }

    /// Promote the first row to column labels, dropping it from the data.
    pub fn promote_first_row(mut self) -> Self {
        if self.rows.is_empty() {
            return self;
        }
        let header = self.rows.remove(0);
        self.columns = header.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Promote the last row to column labels, dropping it from the data.
    pub fn promote_last_row(mut self) -> Self {
        if let Some(header) = self.rows.pop() {
            self.columns = header.iter().map(|c| c.to_string()).collect();
        }
        self
    }

    /// Extend the table to `rows` rows with [`Cell::Empty`] in every column.
    ///
    /// Never removes rows.
    pub fn pad_rows(&mut self, rows: usize) {
        let width = self.columns.len();
        while self.rows.len() < rows {
            self.rows.push(vec![Cell::Empty; width]);
        }
    }

    /// Append `other`'s columns to the right of this table.
    ///
    /// Both tables must already have the same row count.
    pub(crate) fn extend_columns(&mut self, other: Table) {
        debug_assert_eq!(self.rows.len(), other.rows.len());
        self.columns.extend(other.columns);
        for (row, extra) in self.rows.iter_mut().zip(other.rows) {
            row.extend(extra);
        }
    }
}
