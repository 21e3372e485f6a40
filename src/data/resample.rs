use std::collections::BTreeMap;

use chrono::{NaiveDateTime, TimeDelta};

use super::model::{FieldTable, Resolution};
use crate::error::{Error, Result};

/// Average `table` into bins of `interval_seconds`.
///
/// Bins are aligned to midnight of the first day and labelled with their left
/// edge. Every bin between the first and the last sample is present; a bin
/// without finite values is `NaN`. Means are rounded to two decimals.
pub fn resample_mean(
    table: &FieldTable,
    interval_seconds: u32,
    resolution: Resolution,
) -> Result<FieldTable> {
    if interval_seconds == 0 {
        return Err(Error::Config("resample interval must be positive".into()));
    }
    let (Some(first), Some(last)) = (table.timestamps().first(), table.timestamps().last())
    else {
        return Ok(FieldTable::new(resolution));
    };

    let origin = first.date().and_hms_opt(0, 0, 0).unwrap_or(*first);
    let interval = i64::from(interval_seconds);
    let bin_of = |t: &NaiveDateTime| (*t - origin).num_seconds().div_euclid(interval);

    let first_bin = bin_of(first);
    let n_bins = (bin_of(last) - first_bin + 1) as usize;
    let bins: Vec<usize> = table
        .timestamps()
        .iter()
        .map(|t| (bin_of(t) - first_bin) as usize)
        .collect();

    let timestamps: Vec<NaiveDateTime> = (0..n_bins as i64)
        .map(|i| origin + TimeDelta::seconds((first_bin + i) * interval))
        .collect();

    let columns = table
        .columns()
        .map(|(key, values)| {
            let mut sums = vec![0.0; n_bins];
            let mut counts = vec![0u32; n_bins];
            for (bin, v) in bins.iter().zip(values) {
                if v.is_finite() {
                    sums[*bin] += v;
                    counts[*bin] += 1;
                }
            }
            let means = sums
                .into_iter()
                .zip(counts)
                .map(|(s, n)| {
                    if n == 0 {
                        f64::NAN
                    } else {
                        round2(s / f64::from(n))
                    }
                })
                .collect();
            (key, means)
        })
        .collect::<BTreeMap<_, Vec<f64>>>();

    Ok(FieldTable::from_parts(resolution, timestamps, columns))
}

pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
