//! Derived quantities and statistics over loaded field data.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use crate::data::model::{BheId, Channel, ColumnKey, FieldTable, MeasurementSeries, Vault};

/// Default misfit above which an exchanger deviates from its vault (K).
pub const DEFAULT_OUTLIER_THRESHOLD: f64 = 0.15;

// ---------------------------------------------------------------------------
// Temperature difference
// ---------------------------------------------------------------------------

/// Add a `delta_T` column (`T_out - T_in`) for every exchanger with both
/// temperature columns.
pub fn add_delta_t(table: &mut FieldTable) {
    for bhe in table.bhes() {
        let inlet = table.column(ColumnKey::new(bhe, Channel::InletTemperature));
        let outlet = table.column(ColumnKey::new(bhe, Channel::OutletTemperature));
        let (Some(inlet), Some(outlet)) = (inlet, outlet) else {
            continue;
        };
        let delta = outlet.iter().zip(inlet).map(|(o, i)| o - i).collect();
        table.set_column(ColumnKey::new(bhe, Channel::TemperatureDifference), delta);
    }
}

/// Table holding only the `delta_T` columns.
pub fn delta_t(table: &FieldTable) -> FieldTable {
    let mut derived = table.clone();
    add_delta_t(&mut derived);
    derived.retain_columns(None, &[Channel::TemperatureDifference]);
    derived
}

// ---------------------------------------------------------------------------
// Vault median outliers
// ---------------------------------------------------------------------------

/// Exchangers whose channel deviates from the median of their vault.
#[derive(Debug, Clone, PartialEq)]
pub struct OutlierReport {
    /// Mean absolute deviation from the vault median, above the threshold.
    pub misfits: BTreeMap<BheId, f64>,
    /// Row-wise median per vault (`NaN` where no member has data).
    pub medians: BTreeMap<Vault, Vec<f64>>,
}

/// Compare every exchanger with the row-wise median of its vault.
///
/// Members listed in `excluded` take no part in the median and are not
/// reported. Exchangers without any sample overlapping the median are
/// skipped.
pub fn vault_outliers(
    table: &FieldTable,
    channel: Channel,
    threshold: f64,
    excluded: &BTreeSet<BheId>,
) -> OutlierReport {
    let mut report = OutlierReport {
        misfits: BTreeMap::new(),
        medians: BTreeMap::new(),
    };

    for vault in Vault::ALL {
        let members: Vec<(BheId, &[f64])> = vault
            .members()
            .into_iter()
            .filter(|b| !excluded.contains(b))
            .filter_map(|b| Some((b, table.column(ColumnKey::new(b, channel))?)))
            .collect();
        if members.is_empty() {
            continue;
        }

        let median: Vec<f64> = (0..table.len())
            .map(|row| nan_median(members.iter().map(|(_, col)| col[row])))
            .collect();

        for (bhe, column) in &members {
            let Some(misfit) = mean_abs_error(column, &median) else {
                continue;
            };
            if misfit.abs() > threshold {
                report.misfits.insert(*bhe, misfit);
            }
        }
        report.medians.insert(vault, median);
    }
    report
}

/// Median of the finite values, `NaN` when there are none.
pub fn nan_median(values: impl IntoIterator<Item = f64>) -> f64 {
    let mut finite: Vec<f64> = values.into_iter().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return f64::NAN;
    }
    finite.sort_by(f64::total_cmp);
    let mid = finite.len() / 2;
    if finite.len() % 2 == 0 {
        (finite[mid - 1] + finite[mid]) / 2.0
    } else {
        finite[mid]
    }
}

/// Mean of `|a - b|` over the rows where both are finite.
pub fn mean_abs_error(a: &[f64], b: &[f64]) -> Option<f64> {
    let (sum, n) = a
        .iter()
        .zip(b)
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .fold((0.0, 0usize), |(s, n), (x, y)| (s + (x - y).abs(), n + 1));
    (n > 0).then(|| sum / n as f64)
}

// ---------------------------------------------------------------------------
// Summary statistics
// ---------------------------------------------------------------------------

/// Descriptive statistics of one series, `NaN` samples excluded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesSummary {
    pub samples: usize,
    pub valid: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    /// Population standard deviation (divides by `valid`, not `valid - 1`).
    pub std_dev: f64,
}

impl SeriesSummary {
    /// Share of samples that are finite.
    pub fn coverage(&self) -> f64 {
        if self.samples == 0 {
            0.0
        } else {
            self.valid as f64 / self.samples as f64
        }
    }
}

/// `None` when the series has no finite sample.
pub fn summarize(series: &MeasurementSeries) -> Option<SeriesSummary> {
    let finite: Vec<f64> = series
        .values()
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .collect();
    if finite.is_empty() {
        return None;
    }
    let n = finite.len() as f64;
    let mean = finite.iter().sum::<f64>() / n;
    let variance = finite.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    Some(SeriesSummary {
        samples: series.len(),
        valid: finite.len(),
        mean,
        min: finite.iter().copied().fold(f64::INFINITY, f64::min),
        max: finite.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        std_dev: variance.sqrt(),
    })
}

/// Mean per calendar day over finite samples; days without any are omitted.
pub fn daily_means(series: &MeasurementSeries) -> Vec<(NaiveDate, f64)> {
    let mut days: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
    for (ts, v) in series.points() {
        if v.is_finite() {
            let entry = days.entry(ts.date()).or_insert((0.0, 0));
            entry.0 += v;
            entry.1 += 1;
        }
    }
    days.into_iter()
        .map(|(day, (sum, n))| (day, sum / n as f64))
        .collect()
}
