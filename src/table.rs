//! Table model shared by the parsers, the header resolver and the Parquet writer

use std::{fmt, io, path::PathBuf, string::FromUtf8Error};

use arrow::error::ArrowError;
use log::debug;
use parquet::errors::ParquetError;
use thiserror::Error;

use crate::parsers::inference::TableInferenceError;

/// Errors that can occur when converting a file
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("Failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to stage normalized buffer: {0}")]
    Staging(#[source] io::Error),
    #[error("Input {} is not valid UTF-8: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: FromUtf8Error,
    },
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Regex(#[from] regex::Error),
    #[error(transparent)]
    Inference(#[from] TableInferenceError),
    #[error("Line {line} has {found} fields, expected at most {expected}")]
    RaggedRow {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("Header has {found} names but the table has {expected} columns")]
    HeaderMismatch { expected: usize, found: usize },
    #[error("Column name {0:?} appears more than once in the header")]
    DuplicateColumn(String),
    #[error("Cannot take the header from the first row of an empty table")]
    EmptyTable,
    #[error(transparent)]
    Arrow(#[from] ArrowError),
    #[error(transparent)]
    Parquet(#[from] ParquetError),
}

/// Represents a row in the table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableRow {
    cells: Vec<String>,
}

impl TableRow {
    pub fn new(cells: Vec<String>) -> Self {
        Self { cells }
    }

    pub fn cells(&self) -> &[String] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Pads the row with empty cells up to `n_cols`
    fn pad_to(&mut self, n_cols: usize) {
        if self.cells.len() < n_cols {
            self.cells.resize(n_cols, String::new());
        }
    }
}

impl<S: Into<String>> FromIterator<S> for TableRow {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(Into::into).collect())
    }
}

/// A parsed table. The header stays empty until [`resolve_headers`] assigns one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    header: TableRow,
    rows: Vec<TableRow>,
    n_cols: usize,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a data row. The first row added fixes the column count.
    pub fn add_row(&mut self, row: TableRow) {
        if self.rows.is_empty() {
            self.n_cols = row.len();
        }
        self.rows.push(row);
    }

    pub fn header(&self) -> &[String] {
        self.header.cells()
    }

    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    /// Values of column `idx`, one per data row
    pub fn column(&self, idx: usize) -> impl Iterator<Item = &str> + '_ {
        self.rows
            .iter()
            .map(move |row| row.cells.get(idx).map(String::as_str).unwrap_or(""))
    }
}

/// How column names are assigned to a parsed table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum HeaderSpec {
    /// The first data row becomes the header
    FromFirstRow,
    /// `column1`, `column2`, ... one per column
    #[default]
    Synthesized,
    /// Caller supplied names, one per column
    Explicit(Vec<String>),
}

/// Placeholder names `column1..columnN`
pub fn synthesized_header(n_cols: usize) -> TableRow {
    (1..=n_cols).map(|i| format!("column{i}")).collect()
}

/// Fills missing cells with empty strings and assigns the header according to `spec`
pub fn resolve_headers(mut table: Table, spec: &HeaderSpec) -> Result<Table, ConvertError> {
    let n_cols = table.n_cols;
    for row in table.rows.iter_mut() {
        row.pad_to(n_cols);
    }

    table.header = match spec {
        HeaderSpec::FromFirstRow => {
            if table.rows.is_empty() {
                return Err(ConvertError::EmptyTable);
            }
            table.rows.remove(0)
        }
        HeaderSpec::Synthesized => synthesized_header(n_cols),
        HeaderSpec::Explicit(names) => {
            if names.len() != n_cols {
                return Err(ConvertError::HeaderMismatch {
                    expected: n_cols,
                    found: names.len(),
                });
            }
            TableRow::new(names.clone())
        }
    };
    debug!("Resolved header: {:?}", table.header);
    Ok(table)
}

impl fmt::Display for Table {
    /// Left aligned columns with a leading row index, similar to a dataframe print
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let index_width = self.rows.len().saturating_sub(1).to_string().len();
        let widths: Vec<usize> = (0..self.n_cols)
            .map(|idx| {
                let header = self.header.cells.get(idx).map_or(0, |h| h.chars().count());
                self.column(idx)
                    .map(|cell| cell.chars().count())
                    .fold(header, usize::max)
            })
            .collect();

        write!(f, "{:index_width$}", "")?;
        for (idx, width) in widths.iter().enumerate() {
            let name = self.header.cells.get(idx).map_or("", String::as_str);
            write!(f, "  {name:<width$}")?;
        }
        writeln!(f)?;
        for (row_idx, row) in self.rows.iter().enumerate() {
            write!(f, "{row_idx:<index_width$}")?;
            for (idx, width) in widths.iter().enumerate() {
                let cell = row.cells.get(idx).map_or("", String::as_str);
                write!(f, "  {cell:<width$}")?;
            }
            writeln!(f)?;
        }
        write!(f, "[{} rows x {} columns]", self.rows.len(), self.n_cols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_of(rows: &[&[&str]]) -> Table {
        let mut table = Table::new();
        for row in rows {
            table.add_row(row.iter().copied().collect());
        }
        table
    }

    #[test]
    fn test_resolve_headers_from_first_row() {
        let table = table_of(&[&["h1", "h2", "h3"], &["1", "2", "3"], &["4", "5", "6"]]);
        let table = resolve_headers(table, &HeaderSpec::FromFirstRow).unwrap();
        assert_eq!(table.header(), ["h1", "h2", "h3"]);
        assert_eq!(table.rows().len(), 2);
        assert_eq!(table.rows()[0].cells(), ["1", "2", "3"]);
        assert_eq!(table.rows()[1].cells(), ["4", "5", "6"]);
    }

    #[test]
    fn test_resolve_headers_synthesized() {
        let table = table_of(&[&["a", "b"], &["c", "d"]]);
        let table = resolve_headers(table, &HeaderSpec::Synthesized).unwrap();
        assert_eq!(table.header(), ["column1", "column2"]);
        // no row is consumed as a header
        assert_eq!(table.rows().len(), 2);
    }

    #[test]
    fn test_resolve_headers_explicit() {
        let table = table_of(&[&["1", "2"]]);
        let spec = HeaderSpec::Explicit(vec!["id".to_string(), "value".to_string()]);
        let table = resolve_headers(table, &spec).unwrap();
        assert_eq!(table.header(), ["id", "value"]);
    }

    #[test]
    fn test_resolve_headers_explicit_mismatch() {
        let table = table_of(&[&["1", "2", "3"]]);
        let spec = HeaderSpec::Explicit(vec!["id".to_string()]);
        assert!(matches!(
            resolve_headers(table, &spec),
            Err(ConvertError::HeaderMismatch {
                expected: 3,
                found: 1
            })
        ));
    }

    #[test]
    fn test_resolve_headers_pads_short_rows() {
        let table = table_of(&[&["1", "2", "3"], &["4"], &["5", "6"]]);
        let table = resolve_headers(table, &HeaderSpec::Synthesized).unwrap();
        assert_eq!(table.rows()[1].cells(), ["4", "", ""]);
        assert_eq!(table.rows()[2].cells(), ["5", "6", ""]);
    }

    #[test]
    fn test_resolve_headers_first_row_of_empty_table() {
        assert!(matches!(
            resolve_headers(Table::new(), &HeaderSpec::FromFirstRow),
            Err(ConvertError::EmptyTable)
        ));
    }

    #[test]
    fn test_display_aligns_columns() {
        let table = table_of(&[&["name", "n"], &["alice", "10"], &["bob", "7"]]);
        let table = resolve_headers(table, &HeaderSpec::FromFirstRow).unwrap();
        let expected = "   name   n \n0  alice  10\n1  bob    7 \n[2 rows x 2 columns]";
        assert_eq!(table.to_string(), expected);
    }
}
