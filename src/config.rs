//! Dataset layout and preparation settings.
//!
//! Defaults reproduce the published dataset: monthly files from July 2018 to
//! June 2024 under `data/`, prepared at 5 minute resolution with the known
//! faulty sensor periods masked. A JSON file may override any field.

use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::data::mask::{MaskPeriod, default_mask_periods};
use crate::data::model::Resolution;
use crate::error::{Error, Result};

/// Default data root, relative to the working directory.
pub const DEFAULT_DATA_ROOT: &str = "data";

/// Where the downloaded dataset lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataLayout {
    pub root: PathBuf,
}

impl Default for DataLayout {
    fn default() -> Self {
        DataLayout {
            root: PathBuf::from(DEFAULT_DATA_ROOT),
        }
    }
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DataLayout { root: root.into() }
    }

    /// `<root>/raw_30s` or `<root>/prepared_5min`.
    pub fn dir(&self, resolution: Resolution) -> PathBuf {
        self.root.join(resolution.dir_name())
    }
}

/// Settings of the raw → prepared conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrepareConfig {
    /// Bin width of the prepared data in seconds.
    pub interval_seconds: u32,
    /// First month processed (any timestamp within it).
    pub start: NaiveDateTime,
    /// Last month processed.
    pub end: NaiveDateTime,
    /// Apply the flow masks before averaging.
    pub mask_flow: bool,
    /// Apply `mask_periods`.
    pub mask_wrong_sensor_data: bool,
    pub mask_periods: Vec<MaskPeriod>,
}

impl Default for PrepareConfig {
    fn default() -> Self {
        PrepareConfig {
            interval_seconds: Resolution::Prepared5min.step_seconds(),
            start: date_time(2018, 7, 1, 0, 0, 0),
            end: date_time(2024, 6, 30, 23, 59, 59),
            mask_flow: true,
            mask_wrong_sensor_data: true,
            mask_periods: default_mask_periods(),
        }
    }
}

impl PrepareConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: PrepareConfig = serde_json::from_str(&text)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.interval_seconds == 0 {
            return Err(Error::Config("interval_seconds must be positive".into()));
        }
        if self.end < self.start {
            return Err(Error::Config(format!(
                "end {} is before start {}",
                self.end, self.start
            )));
        }
        Ok(())
    }
}

fn date_time(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .and_then(|date| date.and_hms_opt(h, min, s))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_dirs() {
        let layout = DataLayout::default();
        assert_eq!(layout.dir(Resolution::Raw30s), PathBuf::from("data/raw_30s"));
        assert_eq!(
            layout.dir(Resolution::Prepared5min),
            PathBuf::from("data/prepared_5min")
        );
    }

    #[test]
    fn test_default_prepare_config() {
        let config = PrepareConfig::default();
        assert_eq!(config.interval_seconds, 300);
        assert_eq!(config.start.to_string(), "2018-07-01 00:00:00");
        assert_eq!(config.end.to_string(), "2024-06-30 23:59:59");
        assert_eq!(config.mask_periods.len(), 6);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_prepare_config_partial_json() {
        let json = r#"{
            "interval_seconds": 3600,
            "start": "2020-01-01T00:00:00",
            "end": "2020-03-31T23:59:59",
            "mask_periods": [
                { "column": "Probe_05_T_out", "start": "2020-02-01", "end": "2020-02-10" }
            ]
        }"#;
        let config: PrepareConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.interval_seconds, 3600);
        assert!(config.mask_wrong_sensor_data);
        assert_eq!(config.mask_periods.len(), 1);
        assert_eq!(config.mask_periods[0].column.to_string(), "Probe_05_T_out");
    }

    #[test]
    fn test_invalid_column_in_json_is_rejected() {
        let json = r#"{ "mask_periods": [
            { "column": "Probe_99_T_out", "start": "2020-02-01", "end": "2020-02-10" }
        ] }"#;
        assert!(serde_json::from_str::<PrepareConfig>(json).is_err());
    }

    #[test]
    fn test_validate_rejects_reversed_period() {
        let config = PrepareConfig {
            end: date_time(2017, 1, 1, 0, 0, 0),
            ..PrepareConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }
}
