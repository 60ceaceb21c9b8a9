//! Spreadsheet I/O for [`Table`] values.
//!
//! The format is picked from the file extension:
//!
//! | Extension | Read | Write |
//! |-----------|------|-------|
//! | `.xlsx`   | calamine, first worksheet | rust_xlsxwriter, one worksheet |
//! | `.csv`    | csv | csv |
//!
//! The first row holds the column labels; no index column is written.
//! Writes are atomic (temp file + rename).

use crate::error::PdcaasError;
use crate::persist::write_atomic;
use crate::table::{Cell, Table};
use calamine::{open_workbook, DataType, Reader as CalamineReader, Xlsx};
use rust_xlsxwriter::{Format, Workbook};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::debug;

/// Supported spreadsheet formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetFormat {
    Xlsx,
    Csv,
}

impl SheetFormat {
    /// Detect the format from the extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "xlsx" => Some(SheetFormat::Xlsx),
            "csv" => Some(SheetFormat::Csv),
            _ => None,
        }
    }
}

fn format_of(path: &Path) -> Result<SheetFormat, PdcaasError> {
    SheetFormat::from_path(path).ok_or_else(|| PdcaasError::UnsupportedSpreadsheet {
        path: path.to_path_buf(),
    })
}

/// Read a spreadsheet into a [`Table`].
pub fn read_table(path: &Path) -> Result<Table, PdcaasError> {
    let format = format_of(path)?;
    if !path.exists() {
        return Err(PdcaasError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let table = match format {
        SheetFormat::Xlsx => read_xlsx(path)?,
        SheetFormat::Csv => read_csv(path)?,
    };
    debug!(
        "Read {} rows × {} columns from {}",
        table.row_count(),
        table.column_count(),
        path.display()
    );
    Ok(table)
}

/// Write a [`Table`] to `path`, replacing any existing file.
pub fn write_table(table: &Table, path: &Path) -> Result<(), PdcaasError> {
    let format = format_of(path)?;
    write_atomic(path, |tmp| match format {
        SheetFormat::Xlsx => write_xlsx(table, tmp, path),
        SheetFormat::Csv => write_csv(table, tmp, path),
    })?;
    debug!(
        "Wrote {} rows × {} columns to {}",
        table.row_count(),
        table.column_count(),
        path.display()
    );
    Ok(())
}

// ── XLSX ─────────────────────────────────────────────────────────────────

fn read_xlsx(path: &Path) -> Result<Table, PdcaasError> {
    let read_err = |detail: String| PdcaasError::SpreadsheetRead {
        path: path.to_path_buf(),
        detail,
    };

    let mut workbook: Xlsx<BufReader<File>> =
        open_workbook(path).map_err(|e| read_err(format!("failed to open workbook: {e}")))?;

    let Some(sheet_name) = workbook.sheet_names().first().cloned() else {
        return Ok(Table::default());
    };

    let range = match workbook.worksheet_range(&sheet_name) {
        Some(Ok(range)) => range,
        Some(Err(e)) => return Err(read_err(format!("sheet '{sheet_name}': {e}"))),
        None => return Ok(Table::default()),
    };

    // The range starts at the first non-empty cell; re-anchor it at A1 so
    // leading blank rows and columns survive a write/read cycle.
    let (row_offset, col_offset) = range
        .start()
        .map_or((0, 0), |(r, c)| (r as usize, c as usize));
    let width = col_offset + range.width();

    let mut rows = std::iter::repeat_with(Vec::new)
        .take(row_offset)
        .chain(range.rows().map(|row| {
            std::iter::repeat(Cell::Empty)
                .take(col_offset)
                .chain(row.iter().map(cell_from_calamine))
                .collect::<Vec<Cell>>()
        }));
    let Some(header) = rows.next() else {
        return Ok(Table::default());
    };
    let columns = (0..width)
        .map(|i| header.get(i).map(Cell::to_string).unwrap_or_default())
        .collect();

    Ok(Table::new(columns, rows.collect()))
}

fn cell_from_calamine(value: &DataType) -> Cell {
    match value {
        DataType::String(s) => Cell::text(s.as_str()),
        DataType::Float(v) => Cell::Number(*v),
        DataType::Int(v) => Cell::Number(*v as f64),
        DataType::Bool(b) => Cell::Text(if *b { "TRUE" } else { "FALSE" }.to_string()),
        DataType::Error(e) => Cell::Text(format!("#{e:?}")),
        DataType::Empty => Cell::Empty,
        DataType::DateTime(v) => Cell::Number(*v),
        DataType::DateTimeIso(s) => Cell::text(s.as_str()),
        DataType::Duration(v) => Cell::Number(*v),
        DataType::DurationIso(s) => Cell::text(s.as_str()),
    }
}

fn write_xlsx(table: &Table, tmp: &Path, target: &Path) -> Result<(), PdcaasError> {
    let write_err = |detail: String| PdcaasError::SpreadsheetWrite {
        path: target.to_path_buf(),
        detail,
    };

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    let header_format = Format::new().set_bold();

    for (col, label) in table.columns().iter().enumerate() {
        let col = column_number(col).map_err(&write_err)?;
        worksheet
            .write_string_with_format(0, col, label, &header_format)
            .map_err(|e| write_err(e.to_string()))?;
    }

    for (r, row) in table.rows().iter().enumerate() {
        let row_num = u32::try_from(r + 1)
            .map_err(|_| write_err(format!("row {} exceeds the xlsx limit", r + 1)))?;
        for (c, cell) in row.iter().enumerate() {
            let col = column_number(c).map_err(&write_err)?;
            match cell {
                Cell::Empty => {}
                Cell::Text(s) => {
                    worksheet
                        .write_string(row_num, col, s)
                        .map_err(|e| write_err(e.to_string()))?;
                }
                Cell::Number(n) => {
                    worksheet
                        .write_number(row_num, col, *n)
                        .map_err(|e| write_err(e.to_string()))?;
                }
            }
        }
    }

    workbook.save(tmp).map_err(|e| write_err(e.to_string()))
}

fn column_number(col: usize) -> Result<u16, String> {
    u16::try_from(col).map_err(|_| format!("column {col} exceeds the xlsx limit"))
}

// ── CSV ──────────────────────────────────────────────────────────────────

fn read_csv(path: &Path) -> Result<Table, PdcaasError> {
    let read_err = |e: csv::Error| PdcaasError::SpreadsheetRead {
        path: path.to_path_buf(),
        detail: e.to_string(),
    };

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(read_err)?;

    let columns: Vec<String> = reader
        .headers()
        .map_err(read_err)?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(read_err)?;
        rows.push(record.iter().map(Cell::text).collect());
    }

    Ok(Table::new(columns, rows))
}

fn write_csv(table: &Table, tmp: &Path, target: &Path) -> Result<(), PdcaasError> {
    let write_err = |e: csv::Error| PdcaasError::SpreadsheetWrite {
        path: target.to_path_buf(),
        detail: e.to_string(),
    };

    let mut writer = csv::WriterBuilder::new().from_path(tmp).map_err(write_err)?;
    writer.write_record(table.columns()).map_err(write_err)?;
    for row in table.rows() {
        writer
            .write_record(row.iter().map(|c| c.to_string()))
            .map_err(write_err)?;
    }
    writer.flush().map_err(|e| PdcaasError::OutputWriteFailed {
        path: target.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::new(
            vec!["SAMPLE".into(), "ASS".into(), "TPD".into()],
            vec![
                vec![Cell::text("soy"), Cell::Number(80.0), Cell::text("50")],
                vec![Cell::text("pea"), Cell::Empty, Cell::Number(60.5)],
            ],
        )
    }

    #[test]
    fn format_detection() {
        assert_eq!(SheetFormat::from_path(Path::new("a.XLSX")), Some(SheetFormat::Xlsx));
        assert_eq!(SheetFormat::from_path(Path::new("a.csv")), Some(SheetFormat::Csv));
        assert_eq!(SheetFormat::from_path(Path::new("a.xls")), None);
        assert_eq!(SheetFormat::from_path(Path::new("noext")), None);
    }

    #[test]
    fn csv_keeps_labels_and_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scores.csv");
        write_table(&sample(), &path).unwrap();

        let back = read_table(&path).unwrap();
        assert_eq!(back.columns(), sample().columns());
        assert_eq!(back.row_count(), 2);
        assert_eq!(back.cell(0, 1).and_then(Cell::as_number), Some(80.0));
        assert_eq!(back.cell(1, 1), Some(&Cell::Empty));
        assert_eq!(back.cell(1, 2).and_then(Cell::as_number), Some(60.5));
    }

    #[test]
    fn xlsx_keeps_numbers_numeric() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scores.xlsx");
        write_table(&sample(), &path).unwrap();

        let back = read_table(&path).unwrap();
        assert_eq!(back.columns(), &["SAMPLE", "ASS", "TPD"]);
        assert_eq!(back.cell(0, 0), Some(&Cell::text("soy")));
        assert_eq!(back.cell(0, 1), Some(&Cell::Number(80.0)));
        assert_eq!(back.cell(0, 2), Some(&Cell::text("50")));
        assert_eq!(back.cell(1, 1), Some(&Cell::Empty));
    }

    #[test]
    fn xlsx_keeps_leading_blank_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("padded.xlsx");
        let t = Table::new(
            vec!["".into(), "SAMPLE".into(), "ASS".into()],
            vec![
                vec![Cell::Empty, Cell::text("soy"), Cell::Number(80.0)],
                vec![Cell::Empty, Cell::text("pea"), Cell::Number(90.0)],
            ],
        );
        write_table(&t, &path).unwrap();

        let back = read_table(&path).unwrap();
        assert_eq!(back.columns(), &["", "SAMPLE", "ASS"]);
        assert_eq!(back.cell(0, 0), Some(&Cell::Empty));
        assert_eq!(back.cell(1, 1), Some(&Cell::text("pea")));
        assert_eq!(back.cell(1, 2), Some(&Cell::Number(90.0)));
    }

    #[test]
    fn xlsx_keeps_blank_header_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("unlabelled.xlsx");
        let t = Table::new(
            vec!["".into(), "".into()],
            vec![vec![Cell::text("a"), Cell::Number(1.0)]],
        );
        write_table(&t, &path).unwrap();

        let back = read_table(&path).unwrap();
        assert_eq!(back.columns(), &["", ""]);
        assert_eq!(back.row_count(), 1);
        assert_eq!(back.cell(0, 0), Some(&Cell::text("a")));
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_table(&dir.path().join("absent.xlsx")).unwrap_err();
        assert!(matches!(err, PdcaasError::FileNotFound { .. }));
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let err = write_table(&sample(), Path::new("out.ods")).unwrap_err();
        assert!(matches!(err, PdcaasError::UnsupportedSpreadsheet { .. }));
    }
}
