//! Normalizes raw input into a newline delimited buffer and stages it in a temporary file
//!
//! The staged buffer is the only copy of the normalized text. The preamble scanner and the table
//! parser both read from it, each starting from a rewound cursor. The temporary file is removed
//! when the [`StagedBuffer`] is dropped, on success and on every early return.

use std::{
    borrow::Cow,
    fs::File,
    io::{BufRead, BufReader, Seek, SeekFrom, Write},
};

use log::{debug, trace};

use crate::table::ConvertError;

/// Lines starting with this text mark the end of a preamble
pub const SENTINEL: &str = "START-OF-DATA";

/// Replaces every occurrence of `row_delimiter` with `\n`.
///
/// An empty delimiter means the content is already newline delimited and is returned as is.
pub fn normalize<'a>(content: &'a str, row_delimiter: &str) -> Cow<'a, str> {
    if row_delimiter.is_empty() || row_delimiter == "\n" {
        return Cow::Borrowed(content);
    }
    Cow::Owned(content.replace(row_delimiter, "\n"))
}

/// Normalized text held in an anonymous temporary file
#[derive(Debug)]
pub struct StagedBuffer {
    reader: BufReader<File>,
}

impl StagedBuffer {
    /// Writes `normalized` into a fresh temporary file and rewinds it
    pub fn stage(normalized: &str) -> Result<Self, ConvertError> {
        let mut file = tempfile::tempfile().map_err(ConvertError::Staging)?;
        file.write_all(normalized.as_bytes())
            .map_err(ConvertError::Staging)?;
        file.flush().map_err(ConvertError::Staging)?;
        file.seek(SeekFrom::Start(0))
            .map_err(ConvertError::Staging)?;
        debug!("Staged {} bytes of normalized input", normalized.len());
        Ok(Self {
            reader: BufReader::new(file),
        })
    }

    /// Reader over the staged text positioned at the start
    pub fn reader(&mut self) -> Result<&mut BufReader<File>, ConvertError> {
        self.reader.rewind().map_err(ConvertError::Staging)?;
        Ok(&mut self.reader)
    }
}

/// Scans `buffer` for a line starting with `sentinel`.
///
/// Returns the number of lines consumed up to and including the sentinel line, or `None` when no
/// line matches. The buffer is rewound before returning in both cases.
pub fn find_data_start<R: BufRead + Seek>(
    buffer: &mut R,
    sentinel: &str,
) -> Result<Option<usize>, ConvertError> {
    buffer.rewind().map_err(ConvertError::Staging)?;
    let mut consumed = 0;
    let mut found = None;
    let mut line = Vec::new();
    loop {
        line.clear();
        let n = buffer
            .read_until(b'\n', &mut line)
            .map_err(ConvertError::Staging)?;
        if n == 0 {
            break;
        }
        consumed += 1;
        if line.starts_with(sentinel.as_bytes()) {
            found = Some(consumed);
            break;
        }
    }
    buffer.rewind().map_err(ConvertError::Staging)?;
    match found {
        Some(n) => debug!("Found {sentinel} after {n} lines"),
        None => trace!("No {sentinel} line in {consumed} lines"),
    }
    Ok(found)
}
