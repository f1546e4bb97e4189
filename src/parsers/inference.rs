//! Infers the column delimiter when none is given
//!
//! Heuristic: if every row has a comma and no row has more CSV fields than the first row, the
//! input is CSV. Fields are counted the way the CSV parser reads them, so quoted commas do not
//! count and short rows are left for padding. If every row has a comma but a later row is longer
//! than the first, the file is probably a malformed CSV and an error is raised. Otherwise cells
//! are separated by runs of whitespace.

use csv::{ReaderBuilder, StringRecord};
use log::debug;
use thiserror::Error;

/// Errors when inferring the delimiter of the table
#[derive(Debug, Error)]
pub enum TableInferenceError {
    #[error(
        "Inconsistent CSV column counts. File is probably a CSV file, but row {row} has {found} columns and the first row has {expected}"
    )]
    InconsistentCSVColumnCounts {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

/// Delimiter picked by [`infer_delimiter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InferredDelimiter {
    Comma,
    Whitespace,
}

pub fn infer_delimiter(rows: &[&str]) -> Result<InferredDelimiter, TableInferenceError> {
    let delimiter = if infer_is_csv(rows)? {
        InferredDelimiter::Comma
    } else {
        InferredDelimiter::Whitespace
    };
    debug!("Inferred delimiter {:?} from {} rows", delimiter, rows.len());
    Ok(delimiter)
}

// An empty input is not CSV; there is nothing to split either way.
fn infer_is_csv(rows: &[&str]) -> Result<bool, TableInferenceError> {
    if rows.is_empty() || !rows.iter().all(|row| row.contains(',')) {
        return Ok(false);
    }

    let expected = csv_field_count(rows[0])?;
    for (idx, row) in rows.iter().enumerate().skip(1) {
        let found = csv_field_count(row)?;
        if found > expected {
            debug!(
                "Row {} has {found} CSV fields, first row has {expected}",
                idx + 1
            );
            return Err(TableInferenceError::InconsistentCSVColumnCounts {
                row: idx + 1,
                expected,
                found,
            });
        }
    }
    Ok(true)
}

/// Number of fields in `row` as read by a quote aware CSV reader
fn csv_field_count(row: &str) -> Result<usize, TableInferenceError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(row.as_bytes());
    let mut record = StringRecord::new();
    if !reader.read_record(&mut record)? {
        return Ok(0);
    }
    Ok(record.len())
}
