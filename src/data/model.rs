use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// BheId – one of the 40 borehole heat exchangers
// ---------------------------------------------------------------------------

/// Number of exchangers in the field.
pub const BHE_COUNT: u8 = 40;

/// Identifier of a borehole heat exchanger (1–40).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct BheId(u8);

impl BheId {
    pub fn new(id: u8) -> Option<Self> {
        (1..=BHE_COUNT).contains(&id).then_some(BheId(id))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// All 40 exchangers in ascending order.
    pub fn all() -> impl Iterator<Item = BheId> {
        (1..=BHE_COUNT).map(BheId)
    }

    /// Underground vault the exchanger's pipes are gathered in.
    pub fn vault(self) -> Vault {
        match self.0 {
            1..=12 => Vault::West,
            23 => Vault::East,
            13..=25 => Vault::South,
            _ => Vault::East,
        }
    }
}

impl TryFrom<u8> for BheId {
    type Error = String;

    fn try_from(id: u8) -> std::result::Result<Self, Self::Error> {
        BheId::new(id).ok_or_else(|| format!("BHE id {id} outside 1..={BHE_COUNT}"))
    }
}

impl From<BheId> for u8 {
    fn from(id: BheId) -> u8 {
        id.0
    }
}

impl fmt::Display for BheId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}", self.0)
    }
}

impl FromStr for BheId {
    type Err = String;

    /// Accepts `7`, `07` or `BHE 07`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let digits = s.trim().trim_start_matches("BHE").trim();
        let id: u8 = digits
            .parse()
            .map_err(|_| format!("'{s}' is not a BHE id"))?;
        BheId::try_from(id)
    }
}

// ---------------------------------------------------------------------------
// Vault
// ---------------------------------------------------------------------------

/// Underground vault grouping of the exchangers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Vault {
    West,
    South,
    East,
}

impl Vault {
    pub const ALL: [Vault; 3] = [Vault::West, Vault::South, Vault::East];

    /// Short label used in the figures (V1, V2, V3).
    pub fn label(self) -> &'static str {
        match self {
            Vault::West => "V1",
            Vault::South => "V2",
            Vault::East => "V3",
        }
    }

    pub fn members(self) -> Vec<BheId> {
        BheId::all().filter(|b| b.vault() == self).collect()
    }
}

impl fmt::Display for Vault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Vault::West => "west",
            Vault::South => "south",
            Vault::East => "east",
        };
        write!(f, "{} ({name})", self.label())
    }
}

// ---------------------------------------------------------------------------
// Channel
// ---------------------------------------------------------------------------

/// Sensor channel recorded per exchanger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Channel {
    InletTemperature,
    OutletTemperature,
    FlowRate,
    /// Derived: outlet minus inlet temperature.
    TemperatureDifference,
}

impl Channel {
    /// Channels present in the monthly data files.
    pub const MEASURED: [Channel; 3] = [
        Channel::InletTemperature,
        Channel::OutletTemperature,
        Channel::FlowRate,
    ];

    pub const ALL: [Channel; 4] = [
        Channel::InletTemperature,
        Channel::OutletTemperature,
        Channel::FlowRate,
        Channel::TemperatureDifference,
    ];

    /// Column name suffix (`Probe_01_<suffix>`).
    pub fn suffix(self) -> &'static str {
        match self {
            Channel::InletTemperature => "T_in",
            Channel::OutletTemperature => "T_out",
            Channel::FlowRate => "V_dot",
            Channel::TemperatureDifference => "delta_T",
        }
    }

    pub fn from_suffix(suffix: &str) -> Option<Self> {
        Channel::ALL.into_iter().find(|c| c.suffix() == suffix)
    }

    pub fn is_temperature(self) -> bool {
        matches!(
            self,
            Channel::InletTemperature | Channel::OutletTemperature
        )
    }

    pub fn axis_label(self) -> &'static str {
        match self {
            Channel::InletTemperature => "Inlet temp. [°C]",
            Channel::OutletTemperature => "Outlet temp. [°C]",
            Channel::FlowRate => "Volume flow [l/min]",
            Channel::TemperatureDifference => "Temp. difference [K]",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

impl FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Channel::from_suffix(s.trim()).ok_or_else(|| {
            format!("unknown channel '{s}' (expected T_in, T_out, V_dot or delta_T)")
        })
    }
}

// ---------------------------------------------------------------------------
// ColumnKey – `Probe_XX_<channel>`
// ---------------------------------------------------------------------------

/// Identifies one column of a monthly data file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ColumnKey {
    pub bhe: BheId,
    pub channel: Channel,
}

impl ColumnKey {
    pub fn new(bhe: BheId, channel: Channel) -> Self {
        ColumnKey { bhe, channel }
    }
}

impl fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Probe_{}_{}", self.bhe, self.channel.suffix())
    }
}

impl FromStr for ColumnKey {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let rest = s
            .strip_prefix("Probe_")
            .ok_or_else(|| format!("'{s}' is not a probe column"))?;
        let (id, suffix) = rest
            .split_once('_')
            .ok_or_else(|| format!("'{s}' is not a probe column"))?;
        let bhe: BheId = id.parse()?;
        let channel = Channel::from_suffix(suffix)
            .ok_or_else(|| format!("'{s}' has unknown channel '{suffix}'"))?;
        Ok(ColumnKey { bhe, channel })
    }
}

impl TryFrom<String> for ColumnKey {
    type Error = String;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ColumnKey> for String {
    fn from(key: ColumnKey) -> String {
        key.to_string()
    }
}

// ---------------------------------------------------------------------------
// Resolution tier
// ---------------------------------------------------------------------------

/// Sampling interval of the recorded data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// 30 s raw monitoring data.
    Raw30s,
    /// 5 min masked and averaged data.
    Prepared5min,
}

impl Resolution {
    pub const ALL: [Resolution; 2] = [Resolution::Raw30s, Resolution::Prepared5min];

    pub fn step_seconds(self) -> u32 {
        match self {
            Resolution::Raw30s => 30,
            Resolution::Prepared5min => 300,
        }
    }

    /// Sub-directory of the data root.
    pub fn dir_name(self) -> &'static str {
        match self {
            Resolution::Raw30s => "raw_30s",
            Resolution::Prepared5min => "prepared_5min",
        }
    }

    /// Tag in the monthly file name (`ERC_data_<tag>_YYYY_MM`).
    pub fn file_tag(self) -> &'static str {
        match self {
            Resolution::Raw30s => "raw",
            Resolution::Prepared5min => "prepared",
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Raw30s => f.write_str("raw 30 s"),
            Resolution::Prepared5min => f.write_str("prepared 5 min"),
        }
    }
}

impl FromStr for Resolution {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "raw" | "raw_30s" | "30s" => Ok(Resolution::Raw30s),
            "prepared" | "prepared_5min" | "5min" => Ok(Resolution::Prepared5min),
            other => Err(format!("unknown resolution '{other}' (expected raw or prepared)")),
        }
    }
}

/// Position of the first timestamp that does not strictly follow its predecessor.
pub fn first_unordered(timestamps: &[NaiveDateTime]) -> Option<usize> {
    timestamps
        .windows(2)
        .position(|w| w[1] <= w[0])
        .map(|i| i + 1)
}

// ---------------------------------------------------------------------------
// MeasurementSeries – one channel of one exchanger
// ---------------------------------------------------------------------------

/// Time-ordered readings for one channel at one exchanger.
///
/// Missing samples are `NaN`. Timestamps are strictly increasing.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementSeries {
    bhe: BheId,
    channel: Channel,
    resolution: Resolution,
    timestamps: Vec<NaiveDateTime>,
    values: Vec<f64>,
}

impl MeasurementSeries {
    pub fn new(
        bhe: BheId,
        channel: Channel,
        resolution: Resolution,
        timestamps: Vec<NaiveDateTime>,
        values: Vec<f64>,
    ) -> Result<Self> {
        let origin = format!("BHE {bhe} {channel}");
        if timestamps.len() != values.len() {
            return Err(Error::malformed(
                origin,
                format!(
                    "{} timestamps but {} values",
                    timestamps.len(),
                    values.len()
                ),
            ));
        }
        if let Some(i) = first_unordered(&timestamps) {
            return Err(Error::malformed(
                origin,
                format!("timestamp {} does not follow {}", timestamps[i], timestamps[i - 1]),
            ));
        }
        Ok(MeasurementSeries {
            bhe,
            channel,
            resolution,
            timestamps,
            values,
        })
    }

    pub fn bhe(&self) -> BheId {
        self.bhe
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn points(&self) -> impl Iterator<Item = (NaiveDateTime, f64)> + '_ {
        self.timestamps.iter().copied().zip(self.values.iter().copied())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of finite samples.
    pub fn valid_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_finite()).count()
    }

    pub fn time_span(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        Some((*self.timestamps.first()?, *self.timestamps.last()?))
    }

    /// Legend label, e.g. `BHE 01 T_in (raw 30 s)`.
    pub fn label(&self) -> String {
        format!("BHE {} {} ({})", self.bhe, self.channel, self.resolution)
    }
}

// ---------------------------------------------------------------------------
// FieldTable – shared time index with one column per probe channel
// ---------------------------------------------------------------------------

/// In-memory analogue of one or more monthly data files.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldTable {
    resolution: Resolution,
    timestamps: Vec<NaiveDateTime>,
    columns: BTreeMap<ColumnKey, Vec<f64>>,
}

impl FieldTable {
    pub fn new(resolution: Resolution) -> Self {
        FieldTable {
            resolution,
            timestamps: Vec::new(),
            columns: BTreeMap::new(),
        }
    }

    /// Checked constructor: columns must match the index length and the
    /// index must be strictly increasing.
    pub fn with_columns(
        resolution: Resolution,
        timestamps: Vec<NaiveDateTime>,
        columns: BTreeMap<ColumnKey, Vec<f64>>,
    ) -> Result<Self> {
        if let Some((key, column)) = columns.iter().find(|(_, c)| c.len() != timestamps.len()) {
            return Err(Error::malformed(
                key.to_string(),
                format!("{} values for {} timestamps", column.len(), timestamps.len()),
            ));
        }
        if let Some(i) = first_unordered(&timestamps) {
            return Err(Error::malformed(
                resolution.to_string(),
                format!("timestamp {} does not follow {}", timestamps[i], timestamps[i - 1]),
            ));
        }
        Ok(Self::from_parts(resolution, timestamps, columns))
    }

    /// Build from parts; every column must match the index length.
    pub(crate) fn from_parts(
        resolution: Resolution,
        timestamps: Vec<NaiveDateTime>,
        columns: BTreeMap<ColumnKey, Vec<f64>>,
    ) -> Self {
        debug_assert!(columns.values().all(|c| c.len() == timestamps.len()));
        FieldTable {
            resolution,
            timestamps,
            columns,
        }
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn column(&self, key: ColumnKey) -> Option<&[f64]> {
        self.columns.get(&key).map(|c| c.as_slice())
    }

    pub(crate) fn column_mut(&mut self, key: ColumnKey) -> Option<&mut Vec<f64>> {
        self.columns.get_mut(&key)
    }

    pub(crate) fn set_column(&mut self, key: ColumnKey, values: Vec<f64>) {
        debug_assert_eq!(values.len(), self.timestamps.len());
        self.columns.insert(key, values);
    }

    pub fn keys(&self) -> impl Iterator<Item = ColumnKey> + '_ {
        self.columns.keys().copied()
    }

    pub fn columns(&self) -> impl Iterator<Item = (ColumnKey, &[f64])> {
        self.columns.iter().map(|(k, v)| (*k, v.as_slice()))
    }

    /// Exchangers with at least one column.
    pub fn bhes(&self) -> BTreeSet<BheId> {
        self.columns.keys().map(|k| k.bhe).collect()
    }

    pub fn series(&self, bhe: BheId, channel: Channel) -> Option<MeasurementSeries> {
        let values = self.columns.get(&ColumnKey::new(bhe, channel))?;
        Some(MeasurementSeries {
            bhe,
            channel,
            resolution: self.resolution,
            timestamps: self.timestamps.clone(),
            values: values.clone(),
        })
    }

    /// Every exchanger's series for one channel.
    pub fn channel_series(&self, channel: Channel) -> BTreeMap<BheId, MeasurementSeries> {
        self.bhes()
            .into_iter()
            .filter_map(|bhe| Some((bhe, self.series(bhe, channel)?)))
            .collect()
    }

    /// Append the rows of `other` (which must start after this table ends).
    ///
    /// Columns present on one side only are filled with `NaN` on the other.
    pub(crate) fn append(&mut self, other: FieldTable) {
        let own_len = self.timestamps.len();
        let other_len = other.timestamps.len();
        let mut other_columns = other.columns;

        for (key, column) in self.columns.iter_mut() {
            match other_columns.remove(key) {
                Some(values) => column.extend(values),
                None => column.extend(std::iter::repeat(f64::NAN).take(other_len)),
            }
        }
        for (key, values) in other_columns {
            let mut column = vec![f64::NAN; own_len];
            column.extend(values);
            self.columns.insert(key, column);
        }
        self.timestamps.extend(other.timestamps);
    }

    /// Keep only rows with `start <= t <= end`.
    pub(crate) fn retain_period(&mut self, start: NaiveDateTime, end: NaiveDateTime) {
        let from = self.timestamps.partition_point(|t| *t < start);
        let to = self.timestamps.partition_point(|t| *t <= end);
        let to = to.max(from);
        self.timestamps = self.timestamps[from..to].to_vec();
        for column in self.columns.values_mut() {
            *column = column[from..to].to_vec();
        }
    }

    /// Keep only the given exchangers and channels.
    pub(crate) fn retain_columns(&mut self, bhes: Option<&BTreeSet<BheId>>, channels: &[Channel]) {
        self.columns.retain(|key, _| {
            channels.contains(&key.channel) && bhes.map_or(true, |set| set.contains(&key.bhe))
        });
    }

    /// Smallest and largest finite value over the matching columns.
    pub fn value_range(&self, mut filter: impl FnMut(ColumnKey) -> bool) -> Option<(f64, f64)> {
        finite_range(
            self.columns
                .iter()
                .filter(|(k, _)| filter(**k))
                .flat_map(|(_, v)| v.iter().copied()),
        )
    }

    /// Sample spacing of this table.
    pub fn step(&self) -> TimeDelta {
        TimeDelta::seconds(i64::from(self.resolution.step_seconds()))
    }
}

/// Min/max of the finite values, `None` when there are none.
pub fn finite_range(values: impl IntoIterator<Item = f64>) -> Option<(f64, f64)> {
    values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Runs of finite samples mapped through `point`; `NaN` breaks a run.
pub fn finite_runs<T>(
    timestamps: &[NaiveDateTime],
    values: &[f64],
    point: impl Fn(NaiveDateTime, f64) -> T,
) -> Vec<Vec<T>> {
    let mut runs = Vec::new();
    let mut current = Vec::new();
    for (t, v) in timestamps.iter().zip(values) {
        if v.is_finite() {
            current.push(point(*t, *v));
        } else if !current.is_empty() {
            runs.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2021, 3, 1)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn bhe(id: u8) -> BheId {
        BheId::new(id).unwrap()
    }

    #[test]
    fn test_bhe_id_bounds_and_display() {
        assert!(BheId::new(0).is_none());
        assert!(BheId::new(41).is_none());
        assert_eq!(bhe(7).to_string(), "07");
        assert_eq!("07".parse::<BheId>().unwrap(), bhe(7));
        assert_eq!("BHE 33".parse::<BheId>().unwrap(), bhe(33));
        assert!("x1".parse::<BheId>().is_err());
        assert_eq!(BheId::all().count(), 40);
    }

    #[test]
    fn test_vault_membership() {
        assert_eq!(bhe(1).vault(), Vault::West);
        assert_eq!(bhe(12).vault(), Vault::West);
        assert_eq!(bhe(13).vault(), Vault::South);
        assert_eq!(bhe(23).vault(), Vault::East);
        assert_eq!(bhe(24).vault(), Vault::South);
        assert_eq!(bhe(25).vault(), Vault::South);
        assert_eq!(bhe(26).vault(), Vault::East);

        assert_eq!(Vault::West.members().len(), 12);
        assert_eq!(Vault::South.members().len(), 12);
        assert_eq!(Vault::East.members().len(), 16);
    }

    #[test]
    fn test_column_key_parse() {
        let key: ColumnKey = "Probe_13_T_out".parse().unwrap();
        assert_eq!(key, ColumnKey::new(bhe(13), Channel::OutletTemperature));
        assert_eq!(key.to_string(), "Probe_13_T_out");

        let key: ColumnKey = "Probe_02_V_dot".parse().unwrap();
        assert_eq!(key.channel, Channel::FlowRate);

        assert!("Time".parse::<ColumnKey>().is_err());
        assert!("Probe_41_T_in".parse::<ColumnKey>().is_err());
        assert!("Probe_01_pressure".parse::<ColumnKey>().is_err());
    }

    #[test]
    fn test_series_rejects_unordered_timestamps() {
        let err = MeasurementSeries::new(
            bhe(1),
            Channel::InletTemperature,
            Resolution::Raw30s,
            vec![ts(0, 0, 30), ts(0, 0, 30)],
            vec![1.0, 2.0],
        )
        .unwrap_err();
        assert!(matches!(err, Error::MalformedData { .. }));

        let err = MeasurementSeries::new(
            bhe(1),
            Channel::InletTemperature,
            Resolution::Raw30s,
            vec![ts(0, 0, 0)],
            vec![1.0, 2.0],
        )
        .unwrap_err();
        assert!(matches!(err, Error::MalformedData { .. }));
    }

    #[test]
    fn test_with_columns_validates() {
        let k = ColumnKey::new(bhe(3), Channel::OutletTemperature);
        let ok = FieldTable::with_columns(
            Resolution::Raw30s,
            vec![ts(0, 0, 0), ts(0, 0, 30)],
            BTreeMap::from([(k, vec![1.0, 2.0])]),
        )
        .unwrap();
        assert_eq!(ok.len(), 2);

        let short = FieldTable::with_columns(
            Resolution::Raw30s,
            vec![ts(0, 0, 0), ts(0, 0, 30)],
            BTreeMap::from([(k, vec![1.0])]),
        );
        assert!(matches!(short, Err(Error::MalformedData { .. })));

        let unordered = FieldTable::with_columns(
            Resolution::Raw30s,
            vec![ts(0, 0, 30), ts(0, 0, 0)],
            BTreeMap::from([(k, vec![1.0, 2.0])]),
        );
        assert!(matches!(unordered, Err(Error::MalformedData { .. })));
    }

    #[test]
    fn test_append_fills_missing_columns() {
        let k1 = ColumnKey::new(bhe(1), Channel::InletTemperature);
        let k2 = ColumnKey::new(bhe(2), Channel::InletTemperature);

        let mut a = FieldTable::from_parts(
            Resolution::Raw30s,
            vec![ts(0, 0, 0), ts(0, 0, 30)],
            BTreeMap::from([(k1, vec![1.0, 2.0])]),
        );
        let b = FieldTable::from_parts(
            Resolution::Raw30s,
            vec![ts(0, 1, 0)],
            BTreeMap::from([(k2, vec![5.0])]),
        );
        a.append(b);

        assert_eq!(a.len(), 3);
        let c1 = a.column(k1).unwrap();
        assert_eq!(&c1[..2], &[1.0, 2.0]);
        assert!(c1[2].is_nan());
        let c2 = a.column(k2).unwrap();
        assert!(c2[0].is_nan() && c2[1].is_nan());
        assert_eq!(c2[2], 5.0);
    }

    #[test]
    fn test_retain_period_inclusive() {
        let k = ColumnKey::new(bhe(1), Channel::FlowRate);
        let mut t = FieldTable::from_parts(
            Resolution::Raw30s,
            vec![ts(0, 0, 0), ts(0, 0, 30), ts(0, 1, 0), ts(0, 1, 30)],
            BTreeMap::from([(k, vec![1.0, 2.0, 3.0, 4.0])]),
        );
        t.retain_period(ts(0, 0, 30), ts(0, 1, 0));
        assert_eq!(t.timestamps(), &[ts(0, 0, 30), ts(0, 1, 0)]);
        assert_eq!(t.column(k).unwrap(), &[2.0, 3.0]);
    }

    #[test]
    fn test_finite_range_skips_nan() {
        assert_eq!(finite_range([f64::NAN, 3.0, -1.0]), Some((-1.0, 3.0)));
        assert_eq!(finite_range([f64::NAN]), None);
    }

    #[test]
    fn test_finite_runs_split_on_nan() {
        let times = [ts(0, 0, 0), ts(0, 0, 30), ts(0, 1, 0), ts(0, 1, 30), ts(0, 2, 0)];
        let runs = finite_runs(&times, &[1.0, f64::NAN, 2.0, 3.0, f64::NAN], |_, v| v);
        assert_eq!(runs, vec![vec![1.0], vec![2.0, 3.0]]);
        assert!(finite_runs(&times, &[f64::NAN; 5], |t, _| t).is_empty());
    }
}
