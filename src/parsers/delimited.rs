//! Parses an input where cells are separated by a single character delimiter

use csv::{ReaderBuilder, StringRecord};
use log::trace;

use crate::table::{ConvertError, TableRow};

use super::Parser;

/// Parser for single byte separated input. Double quoted cells may contain the delimiter.
pub struct DelimitedParser {
    delimiter: u8,
}

impl DelimitedParser {
    /// `delimiter` must be ASCII
    pub fn new(delimiter: u8) -> Self {
        Self { delimiter }
    }
}

impl Parser for DelimitedParser {
    fn parse(&self, input: &str) -> Result<TableRow, ConvertError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .delimiter(self.delimiter)
            .flexible(true)
            .from_reader(input.as_bytes());
        let mut record = StringRecord::new();
        if !reader.read_record(&mut record)? {
            return Ok(TableRow::default());
        }
        let table_row: TableRow = record.iter().collect();
        trace!("Parsed row: {:?}", table_row);
        Ok(table_row)
    }

    #[cfg(test)]
    fn delimiter(&self) -> &str {
        std::str::from_utf8(std::slice::from_ref(&self.delimiter)).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_comma() {
        let parser = DelimitedParser::new(b',');
        assert_eq!(parser.delimiter(), ",");
        let row = parser.parse("1,John Doe,29,New York").unwrap();
        assert_eq!(row.cells(), ["1", "John Doe", "29", "New York"]);
    }

    #[test]
    fn test_parse_colon() {
        // analogous to /etc/passwd
        let parser = DelimitedParser::new(b':');
        let row = parser
            .parse("nobody:x:65534:65534:nobody:/nonexistent:/usr/sbin/nologin")
            .unwrap();
        assert_eq!(row.len(), 7);
        assert_eq!(row.cells()[5], "/nonexistent");
    }

    #[test]
    fn test_parse_quoted_delimiter() {
        let parser = DelimitedParser::new(b',');
        let row = parser.parse("\"Doe, John\",42,\"say \"\"hi\"\"\"").unwrap();
        assert_eq!(row.cells(), ["Doe, John", "42", "say \"hi\""]);
    }

    #[test]
    fn test_parse_empty_cells() {
        let parser = DelimitedParser::new(b'\t');
        let row = parser.parse("a\t\t\tb").unwrap();
        assert_eq!(row.cells(), ["a", "", "", "b"]);
    }

    #[test]
    fn test_parse_no_delimiter_is_single_cell() {
        let parser = DelimitedParser::new(b',');
        let row = parser.parse("only one field").unwrap();
        assert_eq!(row.cells(), ["only one field"]);
    }
}
