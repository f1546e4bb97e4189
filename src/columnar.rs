//! Writes a resolved table as a Parquet file with one UTF-8 column per header name

use std::{
    collections::HashSet,
    fs::{self, File},
    io::BufWriter,
    path::Path,
    sync::Arc,
};

use arrow::{
    array::{ArrayRef, StringArray},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use log::{debug, warn};
use parquet::{arrow::ArrowWriter, basic::Compression, file::properties::WriterProperties};

use crate::table::{ConvertError, Table};

/// Converts the table into a single record batch. Column names must be unique.
pub fn to_record_batch(table: &Table) -> Result<RecordBatch, ConvertError> {
    let mut seen = HashSet::new();
    if let Some(name) = table.header().iter().find(|name| !seen.insert(name.as_str())) {
        return Err(ConvertError::DuplicateColumn(name.clone()));
    }
    let fields: Vec<Field> = table
        .header()
        .iter()
        .map(|name| Field::new(name, DataType::Utf8, false))
        .collect();
    let columns: Vec<ArrayRef> = (0..table.n_cols())
        .map(|idx| Arc::new(StringArray::from_iter_values(table.column(idx))) as ArrayRef)
        .collect();
    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
}

/// Writes `table` to `path`, going through a `.tmp` sibling that is renamed on success.
///
/// Returns `false` when the table has no columns and nothing was written.
pub fn write_parquet(table: &Table, path: &Path) -> Result<bool, ConvertError> {
    if table.n_cols() == 0 {
        warn!("Table has no columns, not writing {}", path.display());
        return Ok(false);
    }
    let batch = to_record_batch(table)?;
    let tmp = path.with_extension("parquet.tmp");

    if let Err(e) = write_batch(&batch, &tmp) {
        // best effort, the write error is the one worth reporting
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    fs::rename(&tmp, path).map_err(|source| ConvertError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(
        "Wrote {} rows x {} columns to {}",
        batch.num_rows(),
        batch.num_columns(),
        path.display()
    );
    Ok(true)
}

fn write_batch(batch: &RecordBatch, path: &Path) -> Result<(), ConvertError> {
    let file = File::create(path).map_err(|source| ConvertError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .set_dictionary_enabled(true)
        .build();
    let mut writer = ArrowWriter::try_new(BufWriter::new(file), batch.schema(), Some(props))?;
    writer.write(batch)?;
    writer.close()?;
    Ok(())
}
