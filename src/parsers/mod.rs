//! Parsers for splitting normalized lines into table rows

use std::io::BufRead;

use log::{debug, trace};

use crate::table::{ConvertError, Table, TableRow};

pub mod delimited;
pub mod inference;
pub mod pattern;

use delimited::DelimitedParser;
use inference::{InferredDelimiter, infer_delimiter};
use pattern::PatternParser;

/// Trait for parsing input strings into table rows
pub trait Parser {
    /// Parses one line of input into a row (does not distinguish between header or data)
    fn parse(&self, input: &str) -> Result<TableRow, ConvertError>;
    #[cfg(test)]
    /// Returns the pattern used by the parser to split fields
    fn delimiter(&self) -> &str;
}

/// Column delimiter as supplied on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnDelimiter {
    /// No delimiter given, infer it from the data
    Infer,
    /// A single character, used verbatim
    Char(char),
    /// Several characters, matched as one literal sequence
    Sequence(String),
}

impl ColumnDelimiter {
    pub fn from_arg(delimiter: &str) -> Self {
        let mut chars = delimiter.chars();
        match (chars.next(), chars.next()) {
            (None, _) => Self::Infer,
            (Some(c), None) => Self::Char(c),
            _ => Self::Sequence(delimiter.to_string()),
        }
    }

    /// Builds the parser for this delimiter. `rows` is only consulted when inferring.
    fn build_parser(&self, rows: &[&str]) -> Result<Box<dyn Parser>, ConvertError> {
        let parser: Box<dyn Parser> = match self {
            Self::Char(c) => match u8::try_from(*c) {
                Ok(byte) if c.is_ascii() => Box::new(DelimitedParser::new(byte)),
                _ => Box::new(PatternParser::from_literal(&c.to_string())?),
            },
            Self::Sequence(delimiter) => Box::new(PatternParser::from_literal(delimiter)?),
            Self::Infer => match infer_delimiter(rows)? {
                InferredDelimiter::Comma => Box::new(DelimitedParser::new(b',')),
                InferredDelimiter::Whitespace => Box::new(PatternParser::whitespace()?),
            },
        };
        Ok(parser)
    }
}

/// Parses the lines of `buffer` into a table without a header.
///
/// The first `skip_lines` lines are skipped, blank lines are dropped, and the last `skip_footer`
/// remaining lines are dropped before splitting. The first parsed row fixes the column count;
/// shorter rows are kept as is, longer rows are rejected.
pub fn parse_table<R: BufRead>(
    buffer: R,
    column_delimiter: &str,
    skip_lines: usize,
    skip_footer: usize,
) -> Result<Table, ConvertError> {
    let lines: Vec<String> = buffer
        .lines()
        .collect::<Result<_, _>>()
        .map_err(ConvertError::Staging)?;

    // keep 1-based line numbers for error messages
    let mut rows: Vec<(usize, &str)> = lines
        .iter()
        .enumerate()
        .skip(skip_lines)
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| (idx + 1, line.as_str()))
        .collect();
    rows.truncate(rows.len().saturating_sub(skip_footer));
    debug!(
        "Parsing {} rows ({} lines, {} skipped, {} footer)",
        rows.len(),
        lines.len(),
        skip_lines,
        skip_footer
    );

    let preview: Vec<&str> = rows.iter().map(|(_, line)| *line).collect();
    let parser = ColumnDelimiter::from_arg(column_delimiter).build_parser(&preview)?;

    let mut table = Table::new();
    for (line_no, line) in rows {
        let row = parser.parse(line)?;
        if !table.rows().is_empty() && row.len() > table.n_cols() {
            return Err(ConvertError::RaggedRow {
                line: line_no,
                expected: table.n_cols(),
                found: row.len(),
            });
        }
        trace!("Line {line_no}: {:?}", row);
        table.add_row(row);
    }
    Ok(table)
}
