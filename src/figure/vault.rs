use chrono::{DateTime, Utc};
use plotters::coord::Shift;
use plotters::prelude::*;

use super::timeseries::FLOW_AXIS_MAX;
use super::{Segments, draw_err, format_time, pad, segments, time_span, to_rgb};
use crate::color::ColorMap;
use crate::data::model::{BheId, Channel, ColumnKey, FieldTable, Vault};
use crate::error::{Error, Result};

const FLOW_GREY: RGBColor = RGBColor(128, 128, 128);

struct VaultColumn {
    vault: Vault,
    inlet: Vec<(BheId, Segments)>,
    outlet: Vec<(BheId, Segments)>,
    flow: Vec<Segments>,
}

/// Inlet (top row) and outlet (bottom row) temperatures, one column per
/// vault, sharing both axes.
pub(crate) struct VaultGrid {
    columns: Vec<VaultColumn>,
    x: (DateTime<Utc>, DateTime<Utc>),
    y: (f64, f64),
}

impl VaultGrid {
    pub(crate) fn collect(table: &FieldTable, ylims: Option<(f64, f64)>) -> Result<Self> {
        let (lo, hi) = table
            .value_range(|k| k.channel.is_temperature())
            .ok_or_else(|| Error::EmptyInput("no temperature data to plot".into()))?;
        let y = ylims.unwrap_or_else(|| pad(lo, hi));

        let lines = |bhe: BheId, channel: Channel| {
            table
                .column(ColumnKey::new(bhe, channel))
                .map(|values| segments(table.timestamps(), values))
        };
        let columns = Vault::ALL
            .into_iter()
            .map(|vault| {
                let members = vault.members();
                VaultColumn {
                    vault,
                    inlet: members
                        .iter()
                        .filter_map(|b| Some((*b, lines(*b, Channel::InletTemperature)?)))
                        .collect(),
                    outlet: members
                        .iter()
                        .filter_map(|b| Some((*b, lines(*b, Channel::OutletTemperature)?)))
                        .collect(),
                    flow: members
                        .iter()
                        .filter_map(|b| lines(*b, Channel::FlowRate))
                        .collect(),
                }
            })
            .collect();

        let x = time_span(
            table
                .timestamps()
                .first()
                .copied()
                .zip(table.timestamps().last().copied()),
            table.step(),
        )?;
        Ok(VaultGrid { columns, x, y })
    }

    pub(crate) fn draw<DB: DrawingBackend>(
        &self,
        root: &DrawingArea<DB, Shift>,
        annotate: bool,
        title: &str,
        colors: &ColorMap,
    ) -> Result<()> {
        let panels = if annotate {
            root.titled(title, ("sans-serif", 24).into_font())
                .map_err(draw_err)?
                .split_evenly((2, 3))
        } else {
            root.split_evenly((2, 3))
        };

        for (index, panel) in panels.iter().enumerate() {
            let (row, col) = (index / 3, index % 3);
            let Some(column) = self.columns.get(col) else {
                continue;
            };
            if row == 0 {
                self.draw_inlet(panel, annotate, column, col, colors)?;
            } else {
                self.draw_outlet(panel, annotate, column, col, colors)?;
            }
        }
        Ok(())
    }

    fn draw_inlet<DB: DrawingBackend>(
        &self,
        area: &DrawingArea<DB, Shift>,
        annotate: bool,
        column: &VaultColumn,
        col: usize,
        colors: &ColorMap,
    ) -> Result<()> {
        let ((x0, x1), (y0, y1)) = (self.x, self.y);
        let mut builder = ChartBuilder::on(area);
        builder.margin(8);
        if annotate {
            builder
                .caption(column.vault.label(), ("sans-serif", 18).into_font())
                .y_label_area_size(if col == 0 { 60 } else { 0 })
                .right_y_label_area_size(if col == 2 { 60 } else { 0 });
        }
        let mut chart = builder
            .build_cartesian_2d(x0..x1, y0..y1)
            .map_err(draw_err)?
            .set_secondary_coord(x0..x1, 0.0..FLOW_AXIS_MAX);

        if annotate {
            let mut mesh = chart.configure_mesh();
            mesh.disable_x_axis().y_desc(Channel::InletTemperature.axis_label());
            if col != 0 {
                mesh.disable_y_axis();
            }
            mesh.draw().map_err(draw_err)?;
            if col == 2 {
                chart
                    .configure_secondary_axes()
                    .y_desc(Channel::FlowRate.axis_label())
                    .draw()
                    .map_err(draw_err)?;
            }
        }

        for flow in &column.flow {
            for seg in flow {
                chart
                    .draw_secondary_series(LineSeries::new(
                        seg.iter().copied(),
                        FLOW_GREY.mix(0.3).stroke_width(1),
                    ))
                    .map_err(draw_err)?;
            }
        }
        for (bhe, segs) in &column.inlet {
            let color = to_rgb(colors.color_for(*bhe));
            for seg in segs {
                chart
                    .draw_series(LineSeries::new(seg.iter().copied(), color.stroke_width(1)))
                    .map_err(draw_err)?;
            }
        }
        Ok(())
    }

    fn draw_outlet<DB: DrawingBackend>(
        &self,
        area: &DrawingArea<DB, Shift>,
        annotate: bool,
        column: &VaultColumn,
        col: usize,
        colors: &ColorMap,
    ) -> Result<()> {
        let ((x0, x1), (y0, y1)) = (self.x, self.y);
        let mut builder = ChartBuilder::on(area);
        builder.margin(8);
        if annotate {
            builder
                .x_label_area_size(40)
                .y_label_area_size(if col == 0 { 60 } else { 0 })
                .right_y_label_area_size(if col == 2 { 60 } else { 0 });
        }
        let mut chart = builder
            .build_cartesian_2d(x0..x1, y0..y1)
            .map_err(draw_err)?;

        if annotate {
            let mut mesh = chart.configure_mesh();
            mesh.x_labels(3)
                .x_label_formatter(&format_time)
                .y_desc(Channel::OutletTemperature.axis_label());
            if col != 0 {
                mesh.disable_y_axis();
            }
            mesh.draw().map_err(draw_err)?;
        }

        for (bhe, segs) in &column.outlet {
            let color = to_rgb(colors.color_for(*bhe));
            for seg in segs {
                chart
                    .draw_series(LineSeries::new(seg.iter().copied(), color.stroke_width(1)))
                    .map_err(draw_err)?;
            }
        }
        Ok(())
    }
}
