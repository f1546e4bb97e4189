//! Splits rows on a regular expression
//!
//! Used for multi-character delimiters, single non-ASCII delimiters, and whitespace separated
//! input when no delimiter is given.

use log::trace;
use regex::Regex;

use crate::table::{ConvertError, TableRow};

use super::Parser;

/// Parser splitting rows wherever `pattern` matches
#[derive(Debug)]
pub struct PatternParser {
    pattern: Regex,
    trim: bool,
}

impl PatternParser {
    /// Each character of `delimiter` is escaped on its own and the escaped characters are joined,
    /// so the delimiter matches as one literal sequence
    pub fn from_literal(delimiter: &str) -> Result<Self, ConvertError> {
        let pattern = escape_chars(delimiter);
        trace!("Delimiter {:?} compiled to pattern {:?}", delimiter, pattern);
        Ok(Self {
            pattern: Regex::new(&pattern)?,
            trim: false,
        })
    }

    /// Splits on runs of whitespace, ignoring leading and trailing whitespace
    pub fn whitespace() -> Result<Self, ConvertError> {
        Ok(Self {
            pattern: Regex::new(r"\s+")?,
            trim: true,
        })
    }
}

fn escape_chars(delimiter: &str) -> String {
    delimiter
        .chars()
        .map(|c| regex::escape(c.encode_utf8(&mut [0; 4])))
        .collect()
}

impl Parser for PatternParser {
    fn parse(&self, input: &str) -> Result<TableRow, ConvertError> {
        let input = if self.trim { input.trim() } else { input };
        let table_row: TableRow = self.pattern.split(input).collect();
        trace!("Parsed row: {:?}", table_row);
        Ok(table_row)
    }

    #[cfg(test)]
    fn delimiter(&self) -> &str {
        self.pattern.as_str()
    }
}
