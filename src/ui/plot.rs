use std::ops::RangeInclusive;

use chrono::{DateTime, NaiveDateTime};
use eframe::egui::{Color32, Ui};
use egui_plot::{GridMark, Legend, Line, Plot, PlotPoint, PlotPoints, PlotUi};

use crate::data::model::{BheId, Channel, ColumnKey, FieldTable, finite_runs};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Time axis: unix seconds on x
// ---------------------------------------------------------------------------

fn to_x(t: NaiveDateTime) -> f64 {
    t.and_utc().timestamp() as f64
}

fn format_x(x: f64) -> String {
    DateTime::from_timestamp(x as i64, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default()
}

fn time_axis(mark: GridMark, _range: &RangeInclusive<f64>) -> String {
    format_x(mark.value)
}

fn hover_label(name: &str, point: &PlotPoint) -> String {
    let time = format_x(point.x);
    if name.is_empty() {
        format!("{time}\n{:.2}", point.y)
    } else {
        format!("{name}\n{time}\n{:.2}", point.y)
    }
}

/// Scale finite values to 0..1; a constant line maps to 0.
fn minmax_scaled(values: &[f64]) -> Vec<f64> {
    let (min, max) = values
        .iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(*v), hi.max(*v))
        });
    let range = max - min;
    if !range.is_finite() || range.abs() < f64::EPSILON {
        values
            .iter()
            .map(|v| if v.is_finite() { 0.0 } else { f64::NAN })
            .collect()
    } else {
        values.iter().map(|v| (v - min) / range).collect()
    }
}

fn add_lines(
    plot_ui: &mut PlotUi,
    table: &FieldTable,
    bhes: &[BheId],
    channel: Channel,
    state: &AppState,
) {
    for bhe in bhes {
        let Some(raw) = table.column(ColumnKey::new(*bhe, channel)) else {
            continue;
        };
        let scaled;
        let values = if state.minmax_scaling {
            scaled = minmax_scaled(raw);
            scaled.as_slice()
        } else {
            raw
        };
        let color: Color32 = state.colors.color_for(*bhe);
        let name = format!("BHE {bhe}");
        // same name for every run so the legend shows one entry
        for run in finite_runs(table.timestamps(), values, |t, v| [to_x(t), v]) {
            let line = Line::new(PlotPoints::from(run))
                .name(&name)
                .color(color)
                .width(1.5);
            plot_ui.line(line);
        }
    }
}

// ---------------------------------------------------------------------------
// Central panel
// ---------------------------------------------------------------------------

/// Render the selected channel and, below it, the flow rate.
pub fn time_series_plot(ui: &mut Ui, state: &AppState) {
    let table = match &state.table {
        Some(table) => table,
        None => {
            ui.centered_and_justified(|ui: &mut Ui| {
                ui.heading("Choose a period and press Load");
            });
            return;
        }
    };
    if state.visible.is_empty() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("No exchanger selected");
        });
        return;
    }

    let show_flow = state.show_flow && state.channel != Channel::FlowRate;
    let height = ui.available_height();
    let main_height = if show_flow { height * 0.65 } else { height };
    let y_label = if state.minmax_scaling {
        "Scaled value"
    } else {
        state.channel.axis_label()
    };

    Plot::new("channel_plot")
        .height(main_height)
        .legend(Legend::default())
        .x_axis_label("Time")
        .y_axis_label(y_label)
        .x_axis_formatter(time_axis)
        .label_formatter(hover_label)
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            add_lines(plot_ui, table, &state.visible, state.channel, state);
        });

    if show_flow {
        Plot::new("flow_plot")
            .x_axis_label("Time")
            .y_axis_label(Channel::FlowRate.axis_label())
            .x_axis_formatter(time_axis)
            .label_formatter(hover_label)
            .allow_boxed_zoom(true)
            .allow_drag(true)
            .allow_scroll(true)
            .allow_zoom(true)
            .show(ui, |plot_ui| {
                add_lines(plot_ui, table, &state.visible, Channel::FlowRate, state);
            });
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn test_minmax_scaled_keeps_gaps() {
        let scaled = minmax_scaled(&[2.0, f64::NAN, 4.0, 3.0]);
        assert_eq!(scaled[0], 0.0);
        assert!(scaled[1].is_nan());
        assert_eq!(scaled[2], 1.0);
        assert_eq!(scaled[3], 0.5);

        let flat = minmax_scaled(&[5.0, 5.0]);
        assert_eq!(flat, vec![0.0, 0.0]);
    }

    #[test]
    fn test_plot_runs_and_time_axis() {
        let t0 = NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let timestamps = [t0, t0 + chrono::TimeDelta::seconds(30)];
        let runs = finite_runs(&timestamps, &[f64::NAN, 7.0], |t, v| [to_x(t), v]);
        assert_eq!(runs, vec![vec![[to_x(timestamps[1]), 7.0]]]);
        assert_eq!(format_x(to_x(t0)), "2020-01-01 00:00");
    }
}
