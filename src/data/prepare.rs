use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use super::loader::{Period, load_file, month_file_name};
use super::mask::{apply_flow_masks, apply_mask_periods};
use super::model::{BheId, FieldTable, Resolution};
use super::resample::resample_mean;
use super::writer::write_table;
use crate::config::{DataLayout, PrepareConfig};
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Raw 30 s → prepared 5 min
// ---------------------------------------------------------------------------

/// File format of the prepared monthly files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Csv,
    Parquet,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Parquet => "parquet",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "parquet" | "pq" => Ok(OutputFormat::Parquet),
            other => Err(format!("unknown output format '{other}' (expected csv or parquet)")),
        }
    }
}

/// Mask and average one raw table.
pub fn prepare_table(raw: &FieldTable, config: &PrepareConfig) -> Result<FieldTable> {
    let mut table = raw.clone();
    if config.mask_flow {
        apply_flow_masks(&mut table, BheId::all());
    }
    if config.mask_wrong_sensor_data {
        apply_mask_periods(&mut table, &config.mask_periods);
    }
    resample_mean(&table, config.interval_seconds, Resolution::Prepared5min)
}

/// Convert one month; returns the written file.
pub fn prepare_month(
    layout: &DataLayout,
    year: i32,
    month: u32,
    config: &PrepareConfig,
    format: OutputFormat,
) -> Result<PathBuf> {
    let source = layout
        .dir(Resolution::Raw30s)
        .join(month_file_name(Resolution::Raw30s, year, month, "csv"));
    let raw = load_file(&source, Resolution::Raw30s)?;
    let prepared = prepare_table(&raw, config)?;

    let out_dir = layout.dir(Resolution::Prepared5min);
    std::fs::create_dir_all(&out_dir).map_err(|source| Error::Io {
        path: out_dir.clone(),
        source,
    })?;
    let target = out_dir.join(month_file_name(
        Resolution::Prepared5min,
        year,
        month,
        format.extension(),
    ));
    write_table(&prepared, &target)?;
    log::info!(
        "{year}-{month:02}: {} raw rows -> {} rows in {}",
        raw.len(),
        prepared.len(),
        target.display()
    );
    Ok(target)
}

/// Convert every month of the configured period. Stops at the first month
/// that fails.
pub fn prepare_all(
    layout: &DataLayout,
    config: &PrepareConfig,
    format: OutputFormat,
) -> Result<Vec<PathBuf>> {
    config.validate()?;
    let period = Period::new(config.start, config.end)?;
    period
        .months()
        .into_iter()
        .map(|(year, month)| prepare_month(layout, year, month, config, format))
        .collect()
}
