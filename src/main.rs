//! `delimconv` is a CLI tool for converting delimiter separated text files into Parquet.
//!
//! Exports from reporting systems often use unusual row separators, carry a preamble of metadata
//! before the data and a footer after it. `delimconv` normalizes the row separator to newlines,
//! skips the preamble, splits the rows into columns, names the columns, prints the table and
//! writes it to `<out_dir>/<input_basename>.parquet` with every column stored as a string.
//!
//! # Example usage:
//!
//! ```sh
//! # Comma separated file with the column names on its first line
//! delimconv data/sales.csv out/ --headers in_file --column-delimiter ','
//!
//! # Rows separated by `|NL|`, columns by `||`, with a two line title and a one line total
//! delimconv export.txt out/ --row-delimiter '|NL|' --column-delimiter '||' \
//!     --skip-lines 2 --skip-footers 1
//!
//! # CRLF line endings, only print the table
//! delimconv legacy.dat out/ --row-delimiter '\r\n' --dry-run
//! ```
//!
//! # Preamble
//! If a line starting with `START-OF-DATA` exists, everything up to and including that line is
//! skipped and `--skip-lines` is ignored. Otherwise `--skip-lines` lines are skipped.
//!
//! # Column delimiters
//! - A single ASCII character is used as is and honors double quoted cells (`"a,b",c` is two
//!   cells).
//! - Several characters are matched as one literal sequence, so `||` never splits on a lone `|`.
//! - Without a delimiter, the input is read as CSV if every row has a comma and no row has more
//!   fields than the first, and as whitespace separated otherwise.
//!
//! # Headers
//! `--headers in_file` takes the column names from the first row, `--headers default` (the
//! default) names the columns `column1`, `column2`, ...
//!
//! Rows shorter than the first row are padded with empty cells. Rows longer than the first row
//! are an error. Logging is controlled with `RUST_LOG`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use runner::{ConvertOptions, run_convert};
use table::HeaderSpec;

mod columnar;
mod parsers;
mod runner;
mod staging;
mod table;

/// `delimconv` normalizes a delimiter separated file and converts it to Parquet
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Path to the delimiter separated input file
    input_path: PathBuf,
    /// Directory the Parquet file is written to
    out_dir: PathBuf,
    /// Where column names come from
    #[arg(long, value_enum, default_value_t = HeaderArg::Default)]
    headers: HeaderArg,
    /// Row delimiter replaced with a newline before parsing. `\n`, `\r`, `\t` and `\\` are
    /// unescaped. Leave empty if rows are already newline separated.
    #[arg(long, alias = "row_delimiter", default_value = "", value_parser = parse_escapes)]
    row_delimiter: String,
    /// One or more characters separating columns. Inferred as comma or whitespace if empty.
    #[arg(long, alias = "column_delimiter", default_value = "", value_parser = parse_escapes)]
    column_delimiter: String,
    /// Number of lines to skip when the file has no `START-OF-DATA` line
    #[arg(long, alias = "skip_lines", default_value_t = 0)]
    skip_lines: usize,
    /// Number of rows to drop from the end of the file
    #[arg(long, alias = "skip_footers", default_value_t = 0)]
    skip_footers: usize,
    /// Print the table without writing the Parquet file
    #[arg(long, alias = "dry_run")]
    dry_run: bool,
}

/// Header policies selectable from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum HeaderArg {
    /// Use the first row as the header
    #[value(name = "in_file", alias = "in-file")]
    InFile,
    /// Name the columns `column1`, `column2`, ...
    Default,
}

impl From<HeaderArg> for HeaderSpec {
    fn from(arg: HeaderArg) -> Self {
        match arg {
            HeaderArg::InFile => HeaderSpec::FromFirstRow,
            HeaderArg::Default => HeaderSpec::Synthesized,
        }
    }
}

/// Unescapes `\n`, `\r`, `\t` and `\\` so delimiters can be typed in a shell.
/// Other backslashes are kept as is.
fn parse_escapes(arg: &str) -> Result<String, String> {
    let mut out = String::with_capacity(arg.len());
    let mut chars = arg.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    Ok(out)
}

/// Primary entrypoint for `delimconv`
fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let input_path = args.input_path.clone();
    let options = ConvertOptions::from(args);
    run_convert(&options)
        .with_context(|| format!("Failed to convert {}", input_path.display()))?;
    Ok(())
}
