use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

use super::loader::TIME_COLUMN;
use super::model::FieldTable;
use crate::error::{Error, Result};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Write a table in the monthly file layout.  Dispatch by extension.
pub fn write_table(table: &FieldTable, path: &Path) -> Result<()> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "csv" => write_csv(table, path),
        "parquet" | "pq" => write_parquet(table, path),
        other => Err(Error::Config(format!("cannot write .{other} files"))),
    }
}

/// `Time` first, then one column per probe channel; `NaN` as empty cell.
pub fn write_csv(table: &FieldTable, path: &Path) -> Result<()> {
    let io_err = |e: csv::Error| Error::Io {
        path: path.to_path_buf(),
        source: e.into(),
    };
    let mut writer = csv::Writer::from_path(path).map_err(io_err)?;

    let mut header = vec![TIME_COLUMN.to_string()];
    header.extend(table.keys().map(|k| k.to_string()));
    writer.write_record(&header).map_err(io_err)?;

    let columns: Vec<&[f64]> = table.columns().map(|(_, v)| v).collect();
    for (row, ts) in table.timestamps().iter().enumerate() {
        let mut record = Vec::with_capacity(columns.len() + 1);
        record.push(ts.format(TIME_FORMAT).to_string());
        record.extend(columns.iter().map(|c| format_value(c[row])));
        writer.write_record(&record).map_err(io_err)?;
    }
    writer.flush().map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn format_value(v: f64) -> String {
    if v.is_finite() {
        v.to_string()
    } else {
        String::new()
    }
}

/// Same layout as [`write_csv`]; `NaN` becomes null.
pub fn write_parquet(table: &FieldTable, path: &Path) -> Result<()> {
    let origin = path.display().to_string();

    let mut fields = vec![Field::new(TIME_COLUMN, DataType::Utf8, false)];
    let mut arrays: Vec<ArrayRef> = vec![Arc::new(StringArray::from(
        table
            .timestamps()
            .iter()
            .map(|t| t.format(TIME_FORMAT).to_string())
            .collect::<Vec<_>>(),
    ))];
    for (key, values) in table.columns() {
        fields.push(Field::new(key.to_string(), DataType::Float64, true));
        arrays.push(Arc::new(Float64Array::from(
            values
                .iter()
                .map(|v| v.is_finite().then_some(*v))
                .collect::<Vec<_>>(),
        )));
    }
    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(schema.clone(), arrays)
        .map_err(|e| Error::malformed(&origin, format!("building record batch: {e}")))?;

    let file = std::fs::File::create(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut writer = ArrowWriter::try_new(file, schema, None)
        .map_err(|e| Error::malformed(&origin, format!("creating parquet writer: {e}")))?;
    writer
        .write(&batch)
        .map_err(|e| Error::malformed(&origin, format!("writing parquet: {e}")))?;
    writer
        .close()
        .map_err(|e| Error::malformed(&origin, format!("closing parquet writer: {e}")))?;
    Ok(())
}
