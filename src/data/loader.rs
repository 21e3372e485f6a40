use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use arrow::array::{Array, ArrayRef, AsArray, Float64Array};
use arrow::compute::cast;
use arrow::datatypes::{
    DataType, TimeUnit, TimestampMicrosecondType, TimestampMillisecondType,
    TimestampNanosecondType, TimestampSecondType,
};
use chrono::{DateTime, Datelike, NaiveDateTime};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use super::mask::apply_flow_masks;
use super::model::{
    BheId, Channel, ColumnKey, FieldTable, MeasurementSeries, Resolution, first_unordered,
};
use crate::analysis::add_delta_t;
use crate::config::DataLayout;
use crate::error::{Error, Result};

/// Name of the timestamp column in every monthly file.
pub const TIME_COLUMN: &str = "Time";

/// Extensions of monthly files, in order of preference.
const EXTENSIONS: [&str; 3] = ["csv", "parquet", "pq"];

// ---------------------------------------------------------------------------
// Load options
// ---------------------------------------------------------------------------

/// Inclusive time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Period {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self> {
        if end < start {
            return Err(Error::Config(format!("period end {end} is before start {start}")));
        }
        Ok(Period { start, end })
    }

    /// Every `(year, month)` touched by the period.
    pub fn months(&self) -> Vec<(i32, u32)> {
        let mut months = Vec::new();
        let (mut year, mut month) = (self.start.year(), self.start.month());
        while (year, month) <= (self.end.year(), self.end.month()) {
            months.push((year, month));
            if month == 12 {
                year += 1;
                month = 1;
            } else {
                month += 1;
            }
        }
        months
    }
}

/// What to read from a resolution tier.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadOptions {
    /// `None` loads every monthly file in the directory.
    pub period: Option<Period>,
    /// `None` keeps every exchanger present in the files.
    pub bhes: Option<BTreeSet<BheId>>,
    pub channels: Vec<Channel>,
    /// Blank out no-flow and data-gap periods (see [`super::mask`]).
    pub masked: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions {
            period: None,
            bhes: None,
            channels: Channel::MEASURED.to_vec(),
            masked: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// `ERC_data_raw_2019_03.csv` and friends.
pub fn month_file_name(resolution: Resolution, year: i32, month: u32, ext: &str) -> String {
    format!("ERC_data_{}_{year}_{month:02}.{ext}", resolution.file_tag())
}

/// Load the monthly files of one tier into a single table.
///
/// Fails with [`Error::MissingData`] when the directory or a month of the
/// requested period is absent, and with [`Error::MalformedData`] when a file
/// cannot be parsed or months overlap. Nothing is returned on failure.
pub fn load_table(
    layout: &DataLayout,
    resolution: Resolution,
    options: &LoadOptions,
) -> Result<FieldTable> {
    let dir = layout.dir(resolution);
    if !dir.is_dir() {
        return Err(Error::missing(&dir, "data directory not found"));
    }

    let files = match &options.period {
        Some(period) => period_files(&dir, resolution, period)?,
        None => month_files(&dir, resolution)?,
    };

    let mut table = FieldTable::new(resolution);
    for file in &files {
        let month = load_file(file, resolution)?;
        if let (Some(last), Some(first)) = (table.timestamps().last(), month.timestamps().first())
        {
            if first <= last {
                return Err(Error::malformed(
                    file.display().to_string(),
                    format!("starts at {first}, not after the previous month's {last}"),
                ));
            }
        }
        table.append(month);
    }

    if let Some(period) = &options.period {
        table.retain_period(period.start, period.end);
    }
    table.retain_columns(options.bhes.as_ref(), &Channel::ALL);

    if options.masked {
        let bhes = table.bhes();
        apply_flow_masks(&mut table, bhes);
    }
    if options.channels.contains(&Channel::TemperatureDifference) {
        add_delta_t(&mut table);
    }
    table.retain_columns(None, &options.channels);

    log::info!(
        "Loaded {} rows x {} columns ({}) from {} file(s) in {}",
        table.len(),
        table.keys().count(),
        resolution,
        files.len(),
        dir.display()
    );
    Ok(table)
}

/// Load one channel per exchanger.
pub fn load_series(
    layout: &DataLayout,
    resolution: Resolution,
    channel: Channel,
    options: &LoadOptions,
) -> Result<BTreeMap<BheId, MeasurementSeries>> {
    let options = LoadOptions {
        channels: vec![channel],
        ..options.clone()
    };
    Ok(load_table(layout, resolution, &options)?.channel_series(channel))
}

/// Load a single monthly file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – `Time` column plus `Probe_XX_<channel>` columns
/// * `.parquet` – same flat layout; `Time` as string or timestamp column
pub fn load_file(path: &Path, resolution: Resolution) -> Result<FieldTable> {
    if !path.is_file() {
        return Err(Error::missing(path, "monthly file not found"));
    }
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let (timestamps, columns) = match ext.as_str() {
        "parquet" | "pq" => load_parquet(path)?,
        "csv" => load_csv(path)?,
        other => {
            return Err(Error::malformed(
                path.display().to_string(),
                format!("unsupported file extension: .{other}"),
            ));
        }
    };

    if let Some(i) = first_unordered(&timestamps) {
        return Err(Error::malformed(
            path.display().to_string(),
            format!(
                "timestamp {} at row {i} does not follow {}",
                timestamps[i],
                timestamps[i - 1]
            ),
        ));
    }
    log::debug!("{}: {} rows", path.display(), timestamps.len());
    Ok(FieldTable::from_parts(resolution, timestamps, columns))
}

// ---------------------------------------------------------------------------
// Monthly file discovery
// ---------------------------------------------------------------------------

/// All monthly files of the tier in (year, month) order.
fn month_files(dir: &Path, resolution: Resolution) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|source| Error::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut found: BTreeMap<(i32, u32), (usize, PathBuf)> = BTreeMap::new();
    for entry in entries {
        let path = entry
            .map_err(|source| Error::Io {
                path: dir.to_path_buf(),
                source,
            })?
            .path();
        let Some((year, month, rank)) = parse_month_file_name(&path, resolution) else {
            continue;
        };
        let slot = found.entry((year, month)).or_insert((rank, path.clone()));
        if rank < slot.0 {
            *slot = (rank, path);
        }
    }

    if found.is_empty() {
        return Err(Error::missing(
            dir,
            format!("no files named ERC_data_{}_YYYY_MM.csv", resolution.file_tag()),
        ));
    }
    Ok(found.into_values().map(|(_, path)| path).collect())
}

/// One file per month of the period; any gap is an error.
fn period_files(dir: &Path, resolution: Resolution, period: &Period) -> Result<Vec<PathBuf>> {
    period
        .months()
        .into_iter()
        .map(|(year, month)| {
            EXTENSIONS
                .iter()
                .map(|ext| dir.join(month_file_name(resolution, year, month, ext)))
                .find(|p| p.is_file())
                .ok_or_else(|| {
                    Error::missing(
                        dir.join(month_file_name(resolution, year, month, "csv")),
                        "monthly file not found",
                    )
                })
        })
        .collect()
}

/// `(year, month, extension rank)` of a file following the naming convention.
fn parse_month_file_name(path: &Path, resolution: Resolution) -> Option<(i32, u32, usize)> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let rank = EXTENSIONS.iter().position(|e| *e == ext)?;
    let stem = path.file_stem()?.to_str()?;
    let prefix = format!("ERC_data_{}_", resolution.file_tag());
    let (year, month) = stem.strip_prefix(&prefix)?.split_once('_')?;
    if year.len() != 4 || month.len() != 2 {
        return None;
    }
    let year: i32 = year.parse().ok()?;
    let month: u32 = month.parse().ok()?;
    (1..=12).contains(&month).then_some((year, month, rank))
}

// ---------------------------------------------------------------------------
// Cell parsing
// ---------------------------------------------------------------------------

/// Parse a `Time` cell. Offsets are converted to UTC and dropped.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    const WITH_OFFSET: [&str; 3] = [
        "%Y-%m-%d %H:%M:%S%:z",
        "%Y-%m-%d %H:%M:%S%.f%:z",
        "%Y-%m-%d %H:%M:%S%z",
    ];
    const NAIVE: [&str; 5] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ];

    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    WITH_OFFSET
        .iter()
        .find_map(|f| DateTime::parse_from_str(s, f).ok())
        .map(|dt| dt.naive_utc())
        .or_else(|| {
            NAIVE
                .iter()
                .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
        })
}

/// Empty cells and `nan` are missing samples.
fn parse_value(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() || s.eq_ignore_ascii_case("nan") {
        return Some(f64::NAN);
    }
    s.parse().ok()
}

/// Probe columns by header position; the rest is ignored.
fn probe_columns<'a>(
    headers: impl Iterator<Item = &'a str>,
    path: &Path,
) -> Vec<(usize, ColumnKey)> {
    headers
        .enumerate()
        .filter(|(_, h)| *h != TIME_COLUMN)
        .filter_map(|(i, h)| match h.parse::<ColumnKey>() {
            Ok(key) => Some((i, key)),
            Err(e) => {
                log::warn!("{}: ignoring column: {e}", path.display());
                None
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

type Columns = (Vec<NaiveDateTime>, BTreeMap<ColumnKey, Vec<f64>>);

fn load_csv(path: &Path) -> Result<Columns> {
    let origin = path.display().to_string();
    let mut reader =
        csv::Reader::from_path(path).map_err(|e| Error::malformed(&origin, e.to_string()))?;
    let headers = reader
        .headers()
        .map_err(|e| Error::malformed(&origin, format!("reading headers: {e}")))?
        .clone();

    let time_idx = headers
        .iter()
        .position(|h| h == TIME_COLUMN)
        .ok_or_else(|| Error::malformed(&origin, "missing 'Time' column"))?;
    let probes = probe_columns(headers.iter(), path);

    let mut timestamps = Vec::new();
    let mut values: Vec<Vec<f64>> = vec![Vec::new(); probes.len()];

    for (row_no, result) in reader.records().enumerate() {
        let record =
            result.map_err(|e| Error::malformed(&origin, format!("row {row_no}: {e}")))?;

        let cell = record.get(time_idx).unwrap_or("");
        let ts = parse_timestamp(cell).ok_or_else(|| {
            Error::malformed(&origin, format!("row {row_no}: '{cell}' is not a timestamp"))
        })?;
        timestamps.push(ts);

        for ((col_idx, key), column) in probes.iter().zip(values.iter_mut()) {
            let cell = record.get(*col_idx).unwrap_or("");
            let v = parse_value(cell).ok_or_else(|| {
                Error::malformed(&origin, format!("row {row_no}, {key}: '{cell}' is not a number"))
            })?;
            column.push(v);
        }
    }

    let columns = probes
        .into_iter()
        .map(|(_, key)| key)
        .zip(values)
        .collect();
    Ok((timestamps, columns))
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet monthly file.
///
/// Expected schema:
/// - `Time`: Utf8 / LargeUtf8 strings or a Timestamp column (any unit)
/// - `Probe_XX_<channel>`: any numeric type, nulls are missing samples
fn load_parquet(path: &Path) -> Result<Columns> {
    let origin = path.display().to_string();
    let file = std::fs::File::open(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| Error::malformed(&origin, format!("reading parquet metadata: {e}")))?;
    let reader = builder
        .build()
        .map_err(|e| Error::malformed(&origin, format!("building parquet reader: {e}")))?;

    let mut timestamps = Vec::new();
    let mut columns: BTreeMap<ColumnKey, Vec<f64>> = BTreeMap::new();

    for batch_result in reader {
        let batch = batch_result
            .map_err(|e| Error::malformed(&origin, format!("reading record batch: {e}")))?;
        let schema = batch.schema();

        let time_idx = schema
            .index_of(TIME_COLUMN)
            .map_err(|_| Error::malformed(&origin, "missing 'Time' column"))?;
        timestamps.extend(extract_timestamps(batch.column(time_idx), &origin)?);

        let names = schema.fields().iter().map(|f| f.name().as_str());
        for (col_idx, key) in probe_columns(names, path) {
            let values = extract_f64(batch.column(col_idx))
                .map_err(|e| Error::malformed(&origin, format!("{key}: {e}")))?;
            columns.entry(key).or_default().extend(values);
        }
    }

    if let Some((key, _)) = columns.iter().find(|(_, v)| v.len() != timestamps.len()) {
        return Err(Error::malformed(
            &origin,
            format!("column {key} is missing from some record batches"),
        ));
    }
    Ok((timestamps, columns))
}

// -- Parquet / Arrow helpers --

fn extract_timestamps(col: &ArrayRef, origin: &str) -> Result<Vec<NaiveDateTime>> {
    let parsed: Vec<Option<NaiveDateTime>> = match col.data_type() {
        DataType::Utf8 => col
            .as_string::<i32>()
            .iter()
            .map(|s| s.and_then(parse_timestamp))
            .collect(),
        DataType::LargeUtf8 => col
            .as_string::<i64>()
            .iter()
            .map(|s| s.and_then(parse_timestamp))
            .collect(),
        DataType::Timestamp(TimeUnit::Second, _) => {
            let arr = col.as_primitive::<TimestampSecondType>();
            (0..arr.len()).map(|i| arr.value_as_datetime(i)).collect()
        }
        DataType::Timestamp(TimeUnit::Millisecond, _) => {
            let arr = col.as_primitive::<TimestampMillisecondType>();
            (0..arr.len()).map(|i| arr.value_as_datetime(i)).collect()
        }
        DataType::Timestamp(TimeUnit::Microsecond, _) => {
            let arr = col.as_primitive::<TimestampMicrosecondType>();
            (0..arr.len()).map(|i| arr.value_as_datetime(i)).collect()
        }
        DataType::Timestamp(TimeUnit::Nanosecond, _) => {
            let arr = col.as_primitive::<TimestampNanosecondType>();
            (0..arr.len()).map(|i| arr.value_as_datetime(i)).collect()
        }
        other => {
            return Err(Error::malformed(
                origin,
                format!("'Time' column has type {other:?}"),
            ));
        }
    };

    parsed
        .into_iter()
        .enumerate()
        .map(|(row, ts)| match ts {
            Some(ts) if !col.is_null(row) => Ok(ts),
            _ => Err(Error::malformed(origin, format!("row {row}: invalid timestamp"))),
        })
        .collect()
}

/// Cast any numeric column to `f64`; nulls become `NaN`.
fn extract_f64(col: &ArrayRef) -> std::result::Result<Vec<f64>, String> {
    if !col.data_type().is_numeric() {
        return Err(format!("expected a numeric column, got {:?}", col.data_type()));
    }
    let converted = cast(col, &DataType::Float64).map_err(|e| e.to_string())?;
    let arr = converted
        .as_any()
        .downcast_ref::<Float64Array>()
        .ok_or_else(|| "cast to Float64 failed".to_string())?;
    Ok(arr.iter().map(|v| v.unwrap_or(f64::NAN)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::fs;

    fn at(d: u32, h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 2, d)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_month_file_name() {
        assert_eq!(
            month_file_name(Resolution::Raw30s, 2019, 3, "csv"),
            "ERC_data_raw_2019_03.csv"
        );
        assert_eq!(
            month_file_name(Resolution::Prepared5min, 2024, 12, "parquet"),
            "ERC_data_prepared_2024_12.parquet"
        );
    }

    #[test]
    fn test_parse_month_file_name() {
        let p = Path::new("data/raw_30s/ERC_data_raw_2019_03.csv");
        assert_eq!(parse_month_file_name(p, Resolution::Raw30s), Some((2019, 3, 0)));
        assert_eq!(parse_month_file_name(p, Resolution::Prepared5min), None);
        let p = Path::new("ERC_data_raw_2019_13.csv");
        assert_eq!(parse_month_file_name(p, Resolution::Raw30s), None);
        let p = Path::new("ERC_data_raw_2019_03.txt");
        assert_eq!(parse_month_file_name(p, Resolution::Raw30s), None);
    }

    #[test]
    fn test_period_months_crosses_year() {
        let period = Period::new(
            NaiveDate::from_ymd_opt(2019, 11, 15).unwrap().and_hms_opt(0, 0, 0).unwrap(),
            NaiveDate::from_ymd_opt(2020, 2, 1).unwrap().and_hms_opt(0, 0, 0).unwrap(),
        )
        .unwrap();
        assert_eq!(
            period.months(),
            vec![(2019, 11), (2019, 12), (2020, 1), (2020, 2)]
        );
        assert!(Period::new(period.end, period.start).is_err());
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = at(1, 0, 0, 30);
        assert_eq!(parse_timestamp("2020-02-01 00:00:30"), Some(expected));
        assert_eq!(parse_timestamp("2020-02-01T00:00:30"), Some(expected));
        assert_eq!(parse_timestamp("2020-02-01 00:00:30+00:00"), Some(expected));
        assert_eq!(parse_timestamp("2020-02-01T00:00:30Z"), Some(expected));
        assert_eq!(parse_timestamp("2020-02-01 01:00:30+01:00"), Some(expected));
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn test_load_csv_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write(
            tmp.path(),
            "ERC_data_raw_2020_02.csv",
            "Time,Probe_01_T_in,Probe_01_V_dot,Comment\n\
             2020-02-01 00:00:00+00:00,10.5,20,a\n\
             2020-02-01 00:00:30+00:00,,nan,b\n",
        );
        let table = load_file(&path, Resolution::Raw30s).unwrap();

        assert_eq!(table.timestamps(), &[at(1, 0, 0, 0), at(1, 0, 0, 30)]);
        let bhe = BheId::new(1).unwrap();
        let t_in = table.column(ColumnKey::new(bhe, Channel::InletTemperature)).unwrap();
        assert_eq!(t_in[0], 10.5);
        assert!(t_in[1].is_nan());
        assert_eq!(table.keys().count(), 2);
    }

    #[test]
    fn test_load_csv_rejects_bad_cells() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write(
            tmp.path(),
            "bad_value.csv",
            "Time,Probe_01_T_in\n2020-02-01 00:00:00,warm\n",
        );
        assert!(matches!(
            load_file(&path, Resolution::Raw30s),
            Err(Error::MalformedData { .. })
        ));

        let path = write(tmp.path(), "no_time.csv", "When,Probe_01_T_in\nx,1\n");
        assert!(matches!(
            load_file(&path, Resolution::Raw30s),
            Err(Error::MalformedData { .. })
        ));

        let path = write(
            tmp.path(),
            "unordered.csv",
            "Time,Probe_01_T_in\n2020-02-01 00:00:30,1\n2020-02-01 00:00:00,2\n",
        );
        assert!(matches!(
            load_file(&path, Resolution::Raw30s),
            Err(Error::MalformedData { .. })
        ));
    }

    #[test]
    fn test_load_table_concatenates_months_and_slices_period() {
        let tmp = tempfile::tempdir().unwrap();
        let raw = tmp.path().join("raw_30s");
        fs::create_dir(&raw).unwrap();
        write(
            &raw,
            "ERC_data_raw_2020_01.csv",
            "Time,Probe_02_T_out\n2020-01-31 23:59:00,5.0\n2020-01-31 23:59:30,5.5\n",
        );
        write(
            &raw,
            "ERC_data_raw_2020_02.csv",
            "Time,Probe_02_T_out,Probe_03_T_out\n2020-02-01 00:00:00,6.0,7.0\n",
        );
        let layout = DataLayout::new(tmp.path());

        let all = load_table(&layout, Resolution::Raw30s, &LoadOptions::default()).unwrap();
        assert_eq!(all.len(), 3);
        let b3 = all
            .column(ColumnKey::new(BheId::new(3).unwrap(), Channel::OutletTemperature))
            .unwrap();
        assert!(b3[0].is_nan() && b3[1].is_nan());
        assert_eq!(b3[2], 7.0);

        let options = LoadOptions {
            period: Some(
                Period::new(
                    NaiveDate::from_ymd_opt(2020, 1, 31).unwrap().and_hms_opt(23, 59, 30).unwrap(),
                    at(29, 0, 0, 0),
                )
                .unwrap(),
            ),
            bhes: Some(BTreeSet::from([BheId::new(2).unwrap()])),
            ..LoadOptions::default()
        };
        let sliced = load_table(&layout, Resolution::Raw30s, &options).unwrap();
        assert_eq!(sliced.len(), 2);
        assert_eq!(sliced.bhes().len(), 1);
    }

    #[test]
    fn test_load_table_missing_month_in_period() {
        let tmp = tempfile::tempdir().unwrap();
        let raw = tmp.path().join("raw_30s");
        fs::create_dir(&raw).unwrap();
        write(&raw, "ERC_data_raw_2020_02.csv", "Time,Probe_01_T_in\n2020-02-01 00:00:00,1\n");

        let options = LoadOptions {
            period: Some(Period::new(at(1, 0, 0, 0), at(1, 0, 0, 0) + chrono::TimeDelta::days(40)).unwrap()),
            ..LoadOptions::default()
        };
        let err = load_table(&DataLayout::new(tmp.path()), Resolution::Raw30s, &options)
            .unwrap_err();
        match err {
            Error::MissingData { path, .. } => {
                assert!(path.ends_with("ERC_data_raw_2020_03.csv"))
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_load_table_overlapping_months() {
        let tmp = tempfile::tempdir().unwrap();
        let raw = tmp.path().join("raw_30s");
        fs::create_dir(&raw).unwrap();
        write(&raw, "ERC_data_raw_2020_01.csv", "Time,Probe_01_T_in\n2020-02-01 00:00:00,1\n");
        write(&raw, "ERC_data_raw_2020_02.csv", "Time,Probe_01_T_in\n2020-02-01 00:00:00,1\n");

        let err = load_table(
            &DataLayout::new(tmp.path()),
            Resolution::Raw30s,
            &LoadOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::MalformedData { .. }));
    }

    #[test]
    fn test_directory_without_month_files_is_missing_data() {
        let tmp = tempfile::tempdir().unwrap();
        let prepared = tmp.path().join("prepared_5min");
        fs::create_dir(&prepared).unwrap();
        write(&prepared, "README.txt", "download the archive first");

        let err = load_table(
            &DataLayout::new(tmp.path()),
            Resolution::Prepared5min,
            &LoadOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::MissingData { .. }));
    }

    #[test]
    fn test_load_with_delta_t_channel() {
        let tmp = tempfile::tempdir().unwrap();
        let raw = tmp.path().join("raw_30s");
        fs::create_dir(&raw).unwrap();
        write(
            &raw,
            "ERC_data_raw_2020_02.csv",
            "Time,Probe_04_T_in,Probe_04_T_out\n2020-02-01 00:00:00,10.0,12.5\n",
        );
        let options = LoadOptions {
            channels: vec![Channel::TemperatureDifference],
            ..LoadOptions::default()
        };
        let series = load_series(
            &DataLayout::new(tmp.path()),
            Resolution::Raw30s,
            Channel::TemperatureDifference,
            &options,
        )
        .unwrap();
        let s = &series[&BheId::new(4).unwrap()];
        assert_eq!(s.values(), &[2.5]);
    }

    /// 60 raw rows for BHE 01 with no flow in rows 10..=12.
    fn write_no_flow_month(root: &Path) {
        let raw = root.join("raw_30s");
        fs::create_dir(&raw).unwrap();
        let mut body = String::from("Time,Probe_01_T_in,Probe_01_T_out,Probe_01_V_dot\n");
        for i in 0..60 {
            let flow = if (10..=12).contains(&i) { 0.0 } else { 25.0 };
            let time = at(1, 0, 0, 0) + chrono::TimeDelta::seconds(30 * i);
            body.push_str(&format!("{time},9.0,11.0,{flow}\n"));
        }
        write(&raw, "ERC_data_raw_2020_02.csv", &body);
    }

    fn nan_rows(values: &[f64]) -> Vec<usize> {
        values
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_nan())
            .map(|(i, _)| i)
            .collect()
    }

    #[test]
    fn test_masked_load_blanks_no_flow_and_travel_time() {
        let tmp = tempfile::tempdir().unwrap();
        write_no_flow_month(tmp.path());
        let layout = DataLayout::new(tmp.path());
        let bhe = BheId::new(1).unwrap();
        // BHE 01 travel time 625.36 s -> 21 samples of 30 s
        let expected: Vec<usize> = (10..=12 + 21).collect();

        let masked = LoadOptions {
            masked: true,
            ..LoadOptions::default()
        };
        let table = load_table(&layout, Resolution::Raw30s, &masked).unwrap();
        for channel in Channel::MEASURED {
            let column = table.column(ColumnKey::new(bhe, channel)).unwrap();
            assert_eq!(nan_rows(column), expected, "{channel}");
        }

        let unmasked = load_table(&layout, Resolution::Raw30s, &LoadOptions::default()).unwrap();
        let flow = unmasked.column(ColumnKey::new(bhe, Channel::FlowRate)).unwrap();
        assert!(nan_rows(flow).is_empty());
    }

    #[test]
    fn test_masked_load_without_flow_channel_requested() {
        let tmp = tempfile::tempdir().unwrap();
        write_no_flow_month(tmp.path());
        let layout = DataLayout::new(tmp.path());
        let bhe = BheId::new(1).unwrap();
        let expected: Vec<usize> = (10..=33).collect();

        let options = LoadOptions {
            channels: vec![Channel::InletTemperature, Channel::TemperatureDifference],
            masked: true,
            ..LoadOptions::default()
        };
        let table = load_table(&layout, Resolution::Raw30s, &options).unwrap();
        assert!(table.column(ColumnKey::new(bhe, Channel::FlowRate)).is_none());
        let t_in = table.column(ColumnKey::new(bhe, Channel::InletTemperature)).unwrap();
        assert_eq!(nan_rows(t_in), expected);

        // delta_T follows the masked temperatures
        let delta = table
            .column(ColumnKey::new(bhe, Channel::TemperatureDifference))
            .unwrap();
        assert_eq!(nan_rows(delta), expected);
        assert_eq!(delta[0], 2.0);
    }
}
