//! Aggregation: lay every kept table side by side in one wide table.
//!
//! Tables have different heights, so each one is padded with empty rows up
//! to the tallest before the columns are concatenated. Column labels are kept
//! as-is, duplicates included.

use crate::error::PdcaasError;
use crate::output::{AggregateOutcome, AggregateSummary};
use crate::spreadsheet::write_table;
use crate::table::Table;
use std::path::Path;
use tracing::info;

/// Concatenate `tables` column-wise after padding each to the maximum row
/// count. Returns `None` for an empty input.
pub fn aggregate(tables: Vec<Table>) -> Option<Table> {
    let max_rows = tables.iter().map(Table::row_count).max()?;

    let mut tables = tables.into_iter().map(|mut t| {
        t.pad_rows(max_rows);
        t
    });

    let mut combined = tables.next()?;
    for table in tables {
        combined.extend_columns(table);
    }
    Some(combined)
}

/// Aggregate `tables` and write the result to `path`, replacing it.
///
/// With no tables nothing is written and any existing file is left alone.
pub fn write_aggregate(tables: Vec<Table>, path: &Path) -> Result<AggregateOutcome, PdcaasError> {
    let count = tables.len();
    let Some(combined) = aggregate(tables) else {
        info!("No relevant tables found.");
        return Ok(AggregateOutcome::NoRelevantTables);
    };

    write_table(&combined, path)?;
    info!(
        "Filtered tables saved to {} ({} rows × {} columns from {} tables)",
        path.display(),
        combined.row_count(),
        combined.column_count(),
        count
    );

    Ok(AggregateOutcome::Written(AggregateSummary {
        path: path.to_path_buf(),
        rows: combined.row_count(),
        columns: combined.column_count(),
        tables: count,
    }))
}
