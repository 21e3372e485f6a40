use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::model::{BheId, Channel, ColumnKey, FieldTable};

// ---------------------------------------------------------------------------
// Flow masks: no-flow and data-gap periods plus the fluid travel time after
// ---------------------------------------------------------------------------

/// Flow below this value (l/min) counts as no flow.
pub const NO_FLOW_THRESHOLD: f64 = 0.5;

/// Missing-flow runs longer than this many samples are masked.
pub const MIN_GAP_SAMPLES: usize = 20;

/// Fluid travel time (s) through the horizontal and vertical pipe of each
/// exchanger, BHE 01 first. Temperatures within this time after a no-flow or
/// data-gap period do not represent the ground.
const TRAVEL_TIMES: [f64; 40] = [
    625.36, 593.24, 585.96, 626.64, 668.18, 706.72, 745.26, 567.54, 593.24, 640.34, //
    672.46, 638.20, 807.36, 723.85, 683.17, 642.48, 601.80, 563.26, 563.26, 603.94, //
    642.48, 685.31, 693.87, 721.71, 651.05, 616.79, 651.05, 597.52, 631.78, 578.25, //
    618.93, 563.26, 573.97, 614.65, 629.64, 655.33, 614.65, 648.91, 708.86, 747.40,
];

pub fn travel_time_seconds(bhe: BheId) -> f64 {
    TRAVEL_TIMES[usize::from(bhe.get() - 1)]
}

/// Samples to mask after a trigger: travel time rounded up to whole steps.
pub fn steps_after(bhe: BheId, step_seconds: u32) -> usize {
    (travel_time_seconds(bhe) / f64::from(step_seconds)).ceil() as usize
}

/// Boolean mask for one exchanger computed from its flow column.
///
/// A sample triggers when the flow is below [`NO_FLOW_THRESHOLD`], or when it
/// is part of (or up to `n_steps` after) a run of missing flow longer than
/// [`MIN_GAP_SAMPLES`]. Each trigger masks itself and the next `n_steps`.
pub fn flow_mask(flow: &[f64], n_steps: usize) -> Vec<bool> {
    let len = flow.len();
    let mut trigger: Vec<bool> = flow.iter().map(|v| *v < NO_FLOW_THRESHOLD).collect();

    let mut i = 0;
    while i < len {
        if flow[i].is_nan() {
            let start = i;
            while i < len && flow[i].is_nan() {
                i += 1;
            }
            if i - start > MIN_GAP_SAMPLES {
                let stop = (i + n_steps).min(len);
                trigger[start..stop].iter_mut().for_each(|t| *t = true);
            }
        } else {
            i += 1;
        }
    }

    let mut mask = vec![false; len];
    let mut remaining = 0usize;
    for (m, t) in mask.iter_mut().zip(&trigger) {
        if *t {
            remaining = n_steps + 1;
        }
        if remaining > 0 {
            *m = true;
            remaining -= 1;
        }
    }
    mask
}

/// Set `T_in`, `T_out` and `V_dot` to `NaN` wherever the exchanger's flow
/// mask is set. Exchangers without a flow column are left untouched.
///
/// The travel time is counted in steps of the table's own resolution, so a
/// 5 min table masks 3 samples after a trigger for BHE 01 where a 30 s table
/// masks 21.
pub fn apply_flow_masks(table: &mut FieldTable, bhes: impl IntoIterator<Item = BheId>) {
    let step = table.resolution().step_seconds();
    for bhe in bhes {
        let Some(flow) = table.column(ColumnKey::new(bhe, Channel::FlowRate)) else {
            log::debug!("BHE {bhe}: no flow column, mask skipped");
            continue;
        };
        let mask = flow_mask(flow, steps_after(bhe, step));
        let masked = mask.iter().filter(|m| **m).count();
        log::debug!("BHE {bhe}: masking {masked} of {} samples", mask.len());

        for channel in Channel::MEASURED {
            if let Some(column) = table.column_mut(ColumnKey::new(bhe, channel)) {
                for (v, m) in column.iter_mut().zip(&mask) {
                    if *m {
                        *v = f64::NAN;
                    }
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Known faulty sensor periods
// ---------------------------------------------------------------------------

/// A column whose readings are wrong between two dates.
///
/// Both bounds are taken at midnight and are inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskPeriod {
    pub column: ColumnKey,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl MaskPeriod {
    fn bounds(&self) -> (NaiveDateTime, NaiveDateTime) {
        (
            self.start.and_hms_opt(0, 0, 0).unwrap_or_default(),
            self.end.and_hms_opt(0, 0, 0).unwrap_or_default(),
        )
    }
}

/// Faulty sensor periods identified in the published dataset.
pub fn default_mask_periods() -> Vec<MaskPeriod> {
    [
        ("Probe_13_T_out", (2021, 2, 1), (2024, 2, 15)),
        ("Probe_35_T_in", (2019, 8, 1), (2024, 2, 15)),
        ("Probe_29_T_in", (2019, 2, 1), (2024, 2, 15)),
        ("Probe_33_T_in", (2019, 7, 1), (2024, 2, 15)),
        ("Probe_13_T_in", (2019, 2, 1), (2023, 3, 6)),
        ("Probe_26_T_in", (2018, 7, 1), (2024, 6, 30)),
    ]
    .into_iter()
    .filter_map(|(column, (y0, m0, d0), (y1, m1, d1))| {
        Some(MaskPeriod {
            column: column.parse().ok()?,
            start: NaiveDate::from_ymd_opt(y0, m0, d0)?,
            end: NaiveDate::from_ymd_opt(y1, m1, d1)?,
        })
    })
    .collect()
}

pub fn apply_mask_periods(table: &mut FieldTable, periods: &[MaskPeriod]) {
    for period in periods {
        let (start, end) = period.bounds();
        let from = table.timestamps().partition_point(|t| *t < start);
        let to = table.timestamps().partition_point(|t| *t <= end).max(from);
        if from == to {
            continue;
        }
        if let Some(column) = table.column_mut(period.column) {
            log::debug!("{}: masking {} samples", period.column, to - from);
            column[from..to].iter_mut().for_each(|v| *v = f64::NAN);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::data::model::Resolution;

    #[test]
    fn test_steps_after_rounds_up() {
        let bhe = BheId::new(1).unwrap();
        // 625.36 s
        assert_eq!(steps_after(bhe, 30), 21);
        assert_eq!(steps_after(bhe, 300), 3);
        assert_eq!(travel_time_seconds(BheId::new(40).unwrap()), 747.40);
    }

    #[test]
    fn test_no_flow_masks_following_steps() {
        let mut flow = vec![10.0; 10];
        flow[2] = 0.1;
        let mask = flow_mask(&flow, 3);
        let expected = [
            false, false, true, true, true, true, false, false, false, false,
        ];
        assert_eq!(mask, expected);
    }

    #[test]
    fn test_short_gap_is_not_masked() {
        let mut flow = vec![10.0; 40];
        flow[5..25].iter_mut().for_each(|v| *v = f64::NAN); // 20 samples
        assert!(flow_mask(&flow, 2).iter().all(|m| !m));
    }

    #[test]
    fn test_long_gap_masks_gap_and_tail() {
        let mut flow = vec![10.0; 40];
        flow[5..26].iter_mut().for_each(|v| *v = f64::NAN); // 21 samples
        let mask = flow_mask(&flow, 2);
        // gap plus n_steps after it, then each trigger extends n_steps more
        assert!(!mask[4]);
        assert!(mask[5..=29].iter().all(|m| *m));
        assert!(!mask[30]);
    }

    #[test]
    fn test_mask_clipped_at_end() {
        let flow = vec![10.0, 10.0, 0.0];
        assert_eq!(flow_mask(&flow, 5), vec![false, false, true]);
    }

    #[test]
    fn test_prepared_table_masks_in_its_own_steps() {
        let bhe = BheId::new(1).unwrap();
        let start = NaiveDate::from_ymd_opt(2021, 8, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let timestamps = (0..8)
            .map(|i| start + chrono::TimeDelta::minutes(5 * i))
            .collect();
        let mut flow = vec![25.0; 8];
        flow[1] = 0.0;
        let mut table = FieldTable::from_parts(
            Resolution::Prepared5min,
            timestamps,
            BTreeMap::from([(ColumnKey::new(bhe, Channel::FlowRate), flow)]),
        );
        apply_flow_masks(&mut table, [bhe]);
        let masked: Vec<bool> = table
            .column(ColumnKey::new(bhe, Channel::FlowRate))
            .unwrap()
            .iter()
            .map(|v| v.is_nan())
            .collect();
        // trigger plus 3 five-minute steps
        assert_eq!(masked, [false, true, true, true, true, false, false, false]);
    }

    #[test]
    fn test_apply_flow_masks_sets_all_channels_nan() {
        let bhe = BheId::new(8).unwrap();
        let start = NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let timestamps: Vec<_> = (0..50)
            .map(|i| start + chrono::TimeDelta::seconds(30 * i))
            .collect();
        let mut flow = vec![20.0; 50];
        flow[0] = 0.0;
        let columns = BTreeMap::from([
            (ColumnKey::new(bhe, Channel::FlowRate), flow),
            (ColumnKey::new(bhe, Channel::InletTemperature), vec![11.0; 50]),
            (ColumnKey::new(bhe, Channel::OutletTemperature), vec![12.0; 50]),
        ]);
        let mut table = FieldTable::from_parts(Resolution::Raw30s, timestamps, columns);

        apply_flow_masks(&mut table, [bhe]);

        // 567.54 s at 30 s -> 19 steps after the trigger
        let t_in = table
            .column(ColumnKey::new(bhe, Channel::InletTemperature))
            .unwrap();
        assert!(t_in[..20].iter().all(|v| v.is_nan()));
        assert!(t_in[20..].iter().all(|v| *v == 11.0));
    }

    #[test]
    fn test_mask_period_inclusive_midnight_bounds() {
        let key: ColumnKey = "Probe_13_T_in".parse().unwrap();
        let day = |d| {
            NaiveDate::from_ymd_opt(2022, 5, d)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        };
        let timestamps = vec![day(1), day(2), day(3), day(3) + chrono::TimeDelta::hours(1)];
        let mut table = FieldTable::from_parts(
            Resolution::Prepared5min,
            timestamps,
            BTreeMap::from([(key, vec![1.0, 2.0, 3.0, 4.0])]),
        );
        let period = MaskPeriod {
            column: key,
            start: NaiveDate::from_ymd_opt(2022, 5, 2).unwrap(),
            end: NaiveDate::from_ymd_opt(2022, 5, 3).unwrap(),
        };
        apply_mask_periods(&mut table, &[period]);

        let col = table.column(key).unwrap();
        assert_eq!(col[0], 1.0);
        assert!(col[1].is_nan() && col[2].is_nan());
        assert_eq!(col[3], 4.0);
    }

    #[test]
    fn test_default_mask_periods() {
        let periods = default_mask_periods();
        assert_eq!(periods.len(), 6);
        assert_eq!(periods[0].column.to_string(), "Probe_13_T_out");
    }
}
