//! Runs the conversion pipeline for one input file

use std::{
    fs,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use log::{debug, info};

use crate::{
    Args,
    columnar::write_parquet,
    parsers::parse_table,
    staging::{SENTINEL, StagedBuffer, find_data_start, normalize},
    table::{ConvertError, HeaderSpec, Table, resolve_headers},
};

/// Extension of the written file
const OUTPUT_EXTENSION: &str = "parquet";
/// Base name used when the input file name has nothing before its first `.`
const FALLBACK_BASE_NAME: &str = "table";
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Options for one conversion
#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    pub input_path: PathBuf,
    pub out_dir: PathBuf,
    pub headers: HeaderSpec,
    /// Replaced with `\n` before parsing. Empty if the input is already newline delimited.
    pub row_delimiter: String,
    /// Empty to infer the delimiter
    pub column_delimiter: String,
    /// Lines skipped from the top when the input has no `START-OF-DATA` line
    pub skip_lines: usize,
    pub skip_footers: usize,
    /// Print the table without writing the Parquet file
    pub dry_run: bool,
}

impl From<Args> for ConvertOptions {
    fn from(args: Args) -> Self {
        Self {
            input_path: args.input_path,
            out_dir: args.out_dir,
            headers: args.headers.into(),
            row_delimiter: args.row_delimiter,
            column_delimiter: args.column_delimiter,
            skip_lines: args.skip_lines,
            skip_footers: args.skip_footers,
            dry_run: args.dry_run,
        }
    }
}

/// Output file for `input`: the file name up to its first `.`, placed in `out_dir`
pub fn output_path(input: &Path, out_dir: &Path) -> PathBuf {
    let base = input
        .file_name()
        .map(|name| name.to_string_lossy())
        .and_then(|name| name.split('.').next().map(str::to_string))
        .filter(|base| !base.is_empty())
        .unwrap_or_else(|| FALLBACK_BASE_NAME.to_string());
    out_dir.join(format!("{base}.{OUTPUT_EXTENSION}"))
}

/// Reads the whole input as UTF-8, dropping a leading byte order mark
fn read_input(path: &Path) -> Result<String, ConvertError> {
    let mut bytes = fs::read(path).map_err(|source| ConvertError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if bytes.starts_with(UTF8_BOM) {
        bytes.drain(..UTF8_BOM.len());
    }
    String::from_utf8(bytes).map_err(|source| ConvertError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

/// Normalizes, parses and resolves the headers of the input without printing or writing
pub fn convert(options: &ConvertOptions) -> Result<Table, ConvertError> {
    let content = read_input(&options.input_path)?;
    debug!(
        "Read {} bytes from {}",
        content.len(),
        options.input_path.display()
    );

    // the staged buffer lives only as long as parsing
    let table = {
        let mut staged = StagedBuffer::stage(&normalize(&content, &options.row_delimiter))?;
        drop(content);

        let skip_lines = match find_data_start(staged.reader()?, SENTINEL)? {
            Some(data_start) => {
                if options.skip_lines != 0 && options.skip_lines != data_start {
                    info!(
                        "{SENTINEL} found, skipping {data_start} lines instead of {}",
                        options.skip_lines
                    );
                }
                data_start
            }
            None => options.skip_lines,
        };
        parse_table(
            staged.reader()?,
            &options.column_delimiter,
            skip_lines,
            options.skip_footers,
        )?
    };

    resolve_headers(table, &options.headers)
}

/// Runs the conversion, prints the elapsed time and the table, then writes the Parquet file
pub fn run_convert(options: &ConvertOptions) -> Result<Table, ConvertError> {
    let start = Instant::now();
    let table = convert(options)?;
    print_elapsed(start.elapsed());
    println!("{table}");

    if options.dry_run {
        info!("Dry run, not writing output");
        return Ok(table);
    }
    fs::create_dir_all(&options.out_dir).map_err(|source| ConvertError::Io {
        path: options.out_dir.clone(),
        source,
    })?;
    let out_path = output_path(&options.input_path, &options.out_dir);
    if write_parquet(&table, &out_path)? {
        info!("Wrote {}", out_path.display());
    }
    Ok(table)
}

fn print_elapsed(elapsed: Duration) {
    println!("--- {} seconds ---", elapsed.as_secs_f64());
}

#[cfg(test)]
mod tests {
    use tempfile::{TempDir, tempdir};

    use super::*;

    fn write_input(name: &str, content: &[u8]) -> (TempDir, PathBuf) {
        let dir = tempdir().unwrap();
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        (dir, path)
    }

    fn base_options(input_path: PathBuf, out_dir: PathBuf) -> ConvertOptions {
        ConvertOptions {
            input_path,
            out_dir,
            ..Default::default()
        }
    }

    #[test]
    fn test_output_path() {
        let out = Path::new("/data/out");
        assert_eq!(
            output_path(Path::new("/in/report.2024.csv"), out),
            Path::new("/data/out/report.parquet")
        );
        assert_eq!(
            output_path(Path::new("relative/file"), out),
            Path::new("/data/out/file.parquet")
        );
        assert_eq!(
            output_path(Path::new(".hidden"), out),
            Path::new("/data/out/table.parquet")
        );
    }

    #[test]
    fn test_convert_crlf_header_in_file() {
        let (dir, path) = write_input("data.csv", b"h1,h2,h3\r\n1,2,3\r\n4,5,6\r\n");
        let options = ConvertOptions {
            headers: HeaderSpec::FromFirstRow,
            row_delimiter: "\r\n".to_string(),
            column_delimiter: ",".to_string(),
            ..base_options(path, dir.path().to_path_buf())
        };
        let table = convert(&options).unwrap();
        assert_eq!(table.header(), ["h1", "h2", "h3"]);
        assert_eq!(table.rows().len(), 2);
        assert_eq!(table.rows()[0].cells(), ["1", "2", "3"]);
        assert_eq!(table.rows()[1].cells(), ["4", "5", "6"]);
    }

    #[test]
    fn test_convert_sentinel_overrides_skip_lines() {
        let (dir, path) = write_input("data.txt", b"junk\nSTART-OF-DATA\na,b\n1,2\n");
        for skip_lines in [0, 1, 3] {
            let options = ConvertOptions {
                headers: HeaderSpec::FromFirstRow,
                column_delimiter: ",".to_string(),
                skip_lines,
                ..base_options(path.clone(), dir.path().to_path_buf())
            };
            let table = convert(&options).unwrap();
            assert_eq!(table.header(), ["a", "b"]);
            assert_eq!(table.rows().len(), 1);
            assert_eq!(table.rows()[0].cells(), ["1", "2"]);
        }
    }

    #[test]
    fn test_convert_skip_lines_without_sentinel() {
        let (dir, path) = write_input("data.txt", b"title\n\nx|y\n1|2\n3|4\nend\n");
        let options = ConvertOptions {
            column_delimiter: "|".to_string(),
            skip_lines: 2,
            skip_footers: 1,
            ..base_options(path, dir.path().to_path_buf())
        };
        let table = convert(&options).unwrap();
        assert_eq!(table.header(), ["column1", "column2"]);
        assert_eq!(table.rows().len(), 3);
        assert_eq!(table.rows()[2].cells(), ["3", "4"]);
    }

    #[test]
    fn test_convert_custom_row_delimiter_and_bom() {
        let (dir, path) = write_input("data.txt", b"\xEF\xBB\xBFa;b~1;2~3;4");
        let options = ConvertOptions {
            headers: HeaderSpec::Explicit(vec!["left".to_string(), "right".to_string()]),
            row_delimiter: "~".to_string(),
            column_delimiter: ";".to_string(),
            ..base_options(path, dir.path().to_path_buf())
        };
        let table = convert(&options).unwrap();
        assert_eq!(table.header(), ["left", "right"]);
        assert_eq!(table.rows()[0].cells(), ["a", "b"]);
        assert_eq!(table.rows().len(), 3);
    }

    #[test]
    fn test_convert_missing_file() {
        let dir = tempdir().unwrap();
        let options = base_options(dir.path().join("missing.csv"), dir.path().to_path_buf());
        assert!(matches!(convert(&options), Err(ConvertError::Io { .. })));
    }

    #[test]
    fn test_convert_invalid_utf8() {
        let (dir, path) = write_input("data.csv", b"a,b\n\xFF\xFE,c\n");
        let options = base_options(path, dir.path().to_path_buf());
        assert!(matches!(convert(&options), Err(ConvertError::Decode { .. })));
    }

    #[test]
    fn test_convert_header_mismatch() {
        let (dir, path) = write_input("data.csv", b"1,2,3\n");
        let options = ConvertOptions {
            headers: HeaderSpec::Explicit(vec!["only".to_string()]),
            column_delimiter: ",".to_string(),
            ..base_options(path, dir.path().to_path_buf())
        };
        assert!(matches!(
            convert(&options),
            Err(ConvertError::HeaderMismatch { .. })
        ));
    }

    #[test]
    fn test_run_convert_writes_parquet() {
        let (dir, path) = write_input("sales.2024.csv", b"region,total\nnorth,10\nsouth,20\n");
        let out_dir = dir.path().join("out");
        let options = ConvertOptions {
            headers: HeaderSpec::FromFirstRow,
            column_delimiter: ",".to_string(),
            ..base_options(path, out_dir.clone())
        };
        let table = run_convert(&options).unwrap();
        assert_eq!(table.rows().len(), 2);
        assert!(out_dir.join("sales.parquet").exists());
    }

    #[test]
    fn test_convert_inferred_csv_with_quotes_and_short_rows() {
        let (dir, path) = write_input(
            "people.csv",
            b"name,age,city\n\"Doe, John\",42\nAnn,7,Oslo\n",
        );
        let options = ConvertOptions {
            headers: HeaderSpec::FromFirstRow,
            ..base_options(path, dir.path().to_path_buf())
        };
        let table = convert(&options).unwrap();
        assert_eq!(table.header(), ["name", "age", "city"]);
        assert_eq!(table.rows()[0].cells(), ["Doe, John", "42", ""]);
        assert_eq!(table.rows()[1].cells(), ["Ann", "7", "Oslo"]);
    }

    #[test]
    fn test_run_convert_rejects_duplicate_header() {
        let (dir, path) = write_input("dup.csv", b"a,,a\n1,2,3\n");
        let out_dir = dir.path().join("out");
        let options = ConvertOptions {
            headers: HeaderSpec::FromFirstRow,
            column_delimiter: ",".to_string(),
            ..base_options(path, out_dir.clone())
        };
        assert!(matches!(
            run_convert(&options),
            Err(ConvertError::DuplicateColumn(_))
        ));
        assert!(!out_dir.join("dup.parquet").exists());
    }

    #[test]
    fn test_run_convert_empty_input_writes_nothing() {
        let (dir, path) = write_input("empty.csv", b"");
        let out_dir = dir.path().join("out");
        let table = run_convert(&base_options(path, out_dir.clone())).unwrap();
        assert_eq!(table.n_cols(), 0);
        assert!(!out_dir.join("empty.parquet").exists());
    }

    #[test]
    fn test_run_convert_dry_run() {
        let (dir, path) = write_input("sales.csv", b"north,10\n");
        let out_dir = dir.path().join("out");
        let options = ConvertOptions {
            dry_run: true,
            ..base_options(path, out_dir.clone())
        };
        run_convert(&options).unwrap();
        assert!(!out_dir.exists());
    }
}
