use plotters::coord::Shift;
use plotters::prelude::*;

use super::{draw_err, pad};
use crate::analysis::{SeriesSummary, summarize};
use crate::data::model::MeasurementSeries;
use crate::error::{Error, Result};

struct SummaryRow {
    label: String,
    color: RGBColor,
    stats: SeriesSummary,
}

/// One column per series: mean marker, ±1σ box and min–max whisker.
/// Series without finite values are left out.
pub(crate) struct SummaryRows {
    rows: Vec<SummaryRow>,
    y_desc: &'static str,
}

impl SummaryRows {
    pub(crate) fn collect(series: &[MeasurementSeries], colors: &[RGBColor]) -> Result<Self> {
        let rows: Vec<SummaryRow> = series
            .iter()
            .zip(colors)
            .filter_map(|(s, color)| {
                Some(SummaryRow {
                    label: s.label(),
                    color: *color,
                    stats: summarize(s)?,
                })
            })
            .collect();
        if rows.is_empty() {
            return Err(Error::EmptyInput("no series with finite values".into()));
        }
        Ok(SummaryRows {
            rows,
            y_desc: super::common_axis_label(series),
        })
    }

    fn value_span(&self) -> (f64, f64) {
        let lo = self.rows.iter().map(|r| r.stats.min).fold(f64::INFINITY, f64::min);
        let hi = self.rows.iter().map(|r| r.stats.max).fold(f64::NEG_INFINITY, f64::max);
        pad(lo, hi)
    }

    pub(crate) fn draw<DB: DrawingBackend>(
        &self,
        root: &DrawingArea<DB, Shift>,
        annotate: bool,
        title: &str,
    ) -> Result<()> {
        let n = self.rows.len();
        let (y0, y1) = self.value_span();

        let mut builder = ChartBuilder::on(root);
        builder.margin(20).x_label_area_size(60).y_label_area_size(70);
        if annotate {
            builder.caption(title, ("sans-serif", 24).into_font());
        }
        let mut chart = builder
            .build_cartesian_2d(-0.5..(n as f64 - 0.5), y0..y1)
            .map_err(draw_err)?;

        if annotate {
            let label = |x: &f64| {
                let i = x.round();
                match self.rows.get(i as usize) {
                    Some(row) if i >= 0.0 && (x - i).abs() < 1e-6 => row.label.clone(),
                    _ => String::new(),
                }
            };
            chart
                .configure_mesh()
                .disable_x_mesh()
                .x_labels(n + 1)
                .x_label_formatter(&label)
                .y_desc(self.y_desc)
                .draw()
                .map_err(draw_err)?;
        }

        for (i, row) in self.rows.iter().enumerate() {
            let x = i as f64;
            let s = &row.stats;
            chart
                .draw_series(std::iter::once(Rectangle::new(
                    [(x - 0.2, s.mean - s.std_dev), (x + 0.2, s.mean + s.std_dev)],
                    row.color.mix(0.3).filled(),
                )))
                .map_err(draw_err)?;
            chart
                .draw_series([
                    PathElement::new(vec![(x, s.min), (x, s.max)], row.color.stroke_width(2)),
                    PathElement::new(vec![(x - 0.1, s.min), (x + 0.1, s.min)], row.color.stroke_width(2)),
                    PathElement::new(vec![(x - 0.1, s.max), (x + 0.1, s.max)], row.color.stroke_width(2)),
                ])
                .map_err(draw_err)?;
            chart
                .draw_series(std::iter::once(Circle::new((x, s.mean), 4, row.color.filled())))
                .map_err(draw_err)?;
        }
        Ok(())
    }
}
