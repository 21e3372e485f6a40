use chrono::{DateTime, TimeDelta, Utc};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::series::DashedLineSeries;

use super::{
    Segments, common_axis_label, draw_err, format_time, segments, time_span, value_span,
};
use crate::color::ColorMap;
use crate::data::model::{BheId, Channel, ColumnKey, FieldTable, MeasurementSeries};
use crate::error::{Error, Result};

/// Upper limit of the secondary flow axis (l/min).
pub(crate) const FLOW_AXIS_MAX: f64 = 100.0;

// ---------------------------------------------------------------------------
// Overlay of arbitrary series
// ---------------------------------------------------------------------------

pub(crate) fn draw_overlay<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    annotate: bool,
    title: &str,
    series: &[MeasurementSeries],
    colors: &[RGBColor],
) -> Result<()> {
    let step = series
        .iter()
        .map(|s| s.resolution().step_seconds())
        .min()
        .unwrap_or(30);
    let (x0, x1) = time_span(
        series.iter().filter_map(|s| s.time_span()),
        TimeDelta::seconds(i64::from(step)),
    )?;
    let (y0, y1) = value_span(series.iter().flat_map(|s| s.values().iter().copied()))?;

    let mut builder = ChartBuilder::on(root);
    builder.margin(20).x_label_area_size(50).y_label_area_size(70);
    if annotate {
        builder.caption(title, ("sans-serif", 24).into_font());
    }
    let mut chart = builder
        .build_cartesian_2d(x0..x1, y0..y1)
        .map_err(draw_err)?;

    if annotate {
        chart
            .configure_mesh()
            .x_desc("Time")
            .y_desc(common_axis_label(series))
            .x_labels(6)
            .x_label_formatter(&format_time)
            .draw()
            .map_err(draw_err)?;
    }

    for (s, color) in series.iter().zip(colors) {
        let color = *color;
        for (i, seg) in segments(s.timestamps(), s.values()).into_iter().enumerate() {
            let anno = chart
                .draw_series(LineSeries::new(seg, color.stroke_width(1)))
                .map_err(draw_err)?;
            if i == 0 {
                anno.label(s.label()).legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 15, y)], color.stroke_width(2))
                });
            }
        }
    }

    if annotate {
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .margin(10)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .map_err(draw_err)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Single exchanger: temperatures left, flow on a secondary axis
// ---------------------------------------------------------------------------

struct PanelLine {
    label: String,
    color: RGBColor,
    alpha: f64,
    segments: Segments,
}

/// Data of the single-exchanger figure, validated before drawing.
pub(crate) struct BhePanel {
    title: String,
    temperatures: Vec<PanelLine>,
    flows: Vec<PanelLine>,
    x: (DateTime<Utc>, DateTime<Utc>),
    y: (f64, f64),
}

impl BhePanel {
    pub(crate) fn collect(
        table: &FieldTable,
        bhes: &[BheId],
        ylims: Option<(f64, f64)>,
        colors: &ColorMap,
    ) -> Result<Self> {
        if bhes.is_empty() {
            return Err(Error::EmptyInput("no exchanger selected".into()));
        }
        let present = table.bhes();
        if let Some(bhe) = bhes.iter().find(|b| !present.contains(*b)) {
            return Err(Error::EmptyInput(format!("BHE {bhe} is not in the loaded data")));
        }

        let line = |bhe: BheId, channel: Channel, alpha: f64| {
            table.column(ColumnKey::new(bhe, channel)).map(|values| PanelLine {
                label: ColumnKey::new(bhe, channel).to_string(),
                color: super::to_rgb(colors.color_for(bhe)),
                alpha,
                segments: segments(table.timestamps(), values),
            })
        };

        let mut temperatures = Vec::new();
        let mut flows = Vec::new();
        for bhe in bhes {
            temperatures.extend(line(*bhe, Channel::InletTemperature, 1.0));
            temperatures.extend(line(*bhe, Channel::OutletTemperature, 0.5));
            flows.extend(line(*bhe, Channel::FlowRate, 0.3));
        }

        let y = match ylims {
            Some(limits) => limits,
            None => value_span(
                temperatures
                    .iter()
                    .flat_map(|l| l.segments.iter().flatten().map(|(_, v)| *v)),
            )?,
        };
        if temperatures
            .iter()
            .chain(&flows)
            .all(|l| l.segments.is_empty())
        {
            return Err(Error::EmptyInput("selected exchangers have no finite values".into()));
        }
        let x = time_span(
            table
                .timestamps()
                .first()
                .copied()
                .zip(table.timestamps().last().copied()),
            table.step(),
        )?;

        let title = format!(
            "BHE {}",
            bhes.iter()
                .map(|b| b.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
        Ok(BhePanel {
            title,
            temperatures,
            flows,
            x,
            y,
        })
    }

    pub(crate) fn draw<DB: DrawingBackend>(
        &self,
        root: &DrawingArea<DB, Shift>,
        annotate: bool,
    ) -> Result<()> {
        let (x0, x1) = self.x;
        let (y0, y1) = self.y;

        let mut builder = ChartBuilder::on(root);
        builder
            .margin(20)
            .x_label_area_size(50)
            .y_label_area_size(70)
            .right_y_label_area_size(70);
        if annotate {
            builder.caption(&self.title, ("sans-serif", 24).into_font());
        }
        let mut chart = builder
            .build_cartesian_2d(x0..x1, y0..y1)
            .map_err(draw_err)?
            .set_secondary_coord(x0..x1, 0.0..FLOW_AXIS_MAX);

        if annotate {
            chart
                .configure_mesh()
                .x_labels(6)
                .x_label_formatter(&format_time)
                .y_desc("Fluid temperature [°C]")
                .draw()
                .map_err(draw_err)?;
            chart
                .configure_secondary_axes()
                .y_desc(Channel::FlowRate.axis_label())
                .draw()
                .map_err(draw_err)?;
        }

        for line in &self.temperatures {
            let style = line.color.mix(line.alpha).stroke_width(1);
            for (i, seg) in line.segments.iter().enumerate() {
                let anno = chart
                    .draw_series(LineSeries::new(seg.iter().copied(), style))
                    .map_err(draw_err)?;
                if i == 0 {
                    anno.label(line.label.as_str()).legend(move |(x, y)| {
                        PathElement::new(vec![(x, y), (x + 15, y)], style)
                    });
                }
            }
        }
        for line in &self.flows {
            let style = line.color.mix(line.alpha).stroke_width(1);
            for (i, seg) in line.segments.iter().enumerate() {
                let anno = chart
                    .draw_secondary_series(DashedLineSeries::new(seg.iter().copied(), 6, 4, style))
                    .map_err(draw_err)?;
                if i == 0 {
                    anno.label(line.label.as_str()).legend(move |(x, y)| {
                        PathElement::new(vec![(x, y), (x + 15, y)], style)
                    });
                }
            }
        }

        if annotate {
            chart
                .configure_series_labels()
                .position(SeriesLabelPosition::UpperLeft)
                .background_style(WHITE.mix(0.8))
                .border_style(BLACK)
                .draw()
                .map_err(draw_err)?;
        }
        Ok(())
    }
}
