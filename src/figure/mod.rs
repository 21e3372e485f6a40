//! Static figures of the publication, rendered with plotters into an RGB
//! buffer and encoded with `image`.
//!
//! Every figure validates its input first and fails with
//! [`Error::EmptyInput`] rather than producing a blank image.

mod summary;
mod timeseries;
mod vault;

use std::path::Path;

use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use image::RgbImage;
use plotters::coord::Shift;
use plotters::prelude::*;

use crate::color::{ColorMap, generate_palette};
use crate::data::model::{BheId, FieldTable, MeasurementSeries, finite_range, finite_runs};
use crate::error::{Error, Result};

/// Size and decoration of rendered figures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FigureOptions {
    pub width: u32,
    pub height: u32,
    /// Draw titles, axis labels and legends. Turned off automatically when
    /// no font can be loaded.
    pub annotate: bool,
}

impl Default for FigureOptions {
    fn default() -> Self {
        FigureOptions {
            width: 1200,
            height: 800,
            annotate: true,
        }
    }
}

/// Largest accepted width or height in pixels.
pub const MAX_FIGURE_SIDE: u32 = 10_000;

impl FigureOptions {
    /// Parse `WIDTHxHEIGHT`; each side must be within 1..=[`MAX_FIGURE_SIDE`].
    pub fn with_size(mut self, size: &str) -> Result<Self> {
        let invalid = || Error::Config(format!("invalid size '{size}', expected WIDTHxHEIGHT"));
        let (w, h) = size.split_once('x').ok_or_else(invalid)?;
        self.width = w.parse().map_err(|_| invalid())?;
        self.height = h.parse().map_err(|_| invalid())?;
        if self.width == 0 || self.height == 0 {
            return Err(invalid());
        }
        if self.width > MAX_FIGURE_SIDE || self.height > MAX_FIGURE_SIDE {
            return Err(Error::Config(format!(
                "size '{size}' exceeds {MAX_FIGURE_SIDE} pixels per side"
            )));
        }
        Ok(self)
    }
}

/// A rendered figure.
#[derive(Debug, Clone)]
pub struct Figure {
    image: RgbImage,
}

impl Figure {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Encode by file extension (PNG).
    pub fn save(&self, path: &Path) -> Result<()> {
        self.image.save(path).map_err(|source| Error::Encode {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!(
            "Wrote {}x{} figure to {}",
            self.width(),
            self.height(),
            path.display()
        );
        Ok(())
    }
}

/// Renders the figure kinds with shared options.
#[derive(Debug, Clone, Default)]
pub struct FigureRenderer {
    pub options: FigureOptions,
    pub colors: ColorMap,
}

impl FigureRenderer {
    pub fn new(options: FigureOptions) -> Self {
        FigureRenderer {
            options,
            colors: ColorMap::default(),
        }
    }

    /// Any set of series on one time axis.
    pub fn overlay(&self, title: &str, series: &[MeasurementSeries]) -> Result<Figure> {
        require_series(series)?;
        let colors = self.series_colors(series);
        self.render(|root, annotate| {
            timeseries::draw_overlay(root, annotate, title, series, &colors)
        })
    }

    /// Temperatures and flow of one or more exchangers.
    pub fn single_bhe(
        &self,
        table: &FieldTable,
        bhes: &[BheId],
        ylims: Option<(f64, f64)>,
    ) -> Result<Figure> {
        let panel = timeseries::BhePanel::collect(table, bhes, ylims, &self.colors)?;
        self.render(|root, annotate| panel.draw(root, annotate))
    }

    /// 2×3 grid: inlet (top) and outlet (bottom) temperatures per vault.
    pub fn by_vault(
        &self,
        table: &FieldTable,
        title: &str,
        ylims: Option<(f64, f64)>,
    ) -> Result<Figure> {
        let grid = vault::VaultGrid::collect(table, ylims)?;
        self.render(|root, annotate| grid.draw(root, annotate, title, &self.colors))
    }

    /// Mean with min/max whiskers per series.
    pub fn summary(&self, title: &str, series: &[MeasurementSeries]) -> Result<Figure> {
        require_series(series)?;
        let colors = self.series_colors(series);
        let rows = summary::SummaryRows::collect(series, &colors)?;
        self.render(|root, annotate| rows.draw(root, annotate, title))
    }

    /// Vault colours when every series belongs to a different exchanger,
    /// evenly spaced hues otherwise.
    fn series_colors(&self, series: &[MeasurementSeries]) -> Vec<RGBColor> {
        let mut bhes: Vec<BheId> = series.iter().map(|s| s.bhe()).collect();
        bhes.sort();
        bhes.dedup();
        if bhes.len() == series.len() {
            series
                .iter()
                .map(|s| to_rgb(self.colors.color_for(s.bhe())))
                .collect()
        } else {
            generate_palette(series.len()).into_iter().map(to_rgb).collect()
        }
    }

    fn render<F>(&self, draw: F) -> Result<Figure>
    where
        F: for<'a> Fn(&DrawingArea<BitMapBackend<'a>, Shift>, bool) -> Result<()>,
    {
        match self.render_once(&draw, self.options.annotate) {
            Err(Error::Render(reason)) if self.options.annotate => {
                log::warn!("drawing with annotations failed ({reason}), retrying without text");
                self.render_once(&draw, false)
            }
            other => other,
        }
    }

    fn render_once<F>(&self, draw: &F, annotate: bool) -> Result<Figure>
    where
        F: for<'a> Fn(&DrawingArea<BitMapBackend<'a>, Shift>, bool) -> Result<()>,
    {
        let (width, height) = (self.options.width, self.options.height);
        let mut buffer = vec![0u8; width as usize * height as usize * 3];
        {
            let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
            root.fill(&WHITE).map_err(draw_err)?;
            draw(&root, annotate)?;
            root.present().map_err(draw_err)?;
        }
        let image = RgbImage::from_raw(width, height, buffer)
            .ok_or_else(|| Error::Render("pixel buffer does not match the image size".into()))?;
        Ok(Figure { image })
    }
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

pub(crate) fn draw_err(e: impl std::fmt::Display) -> Error {
    Error::Render(e.to_string())
}

pub(crate) fn to_rgb(c: eframe::egui::Color32) -> RGBColor {
    RGBColor(c.r(), c.g(), c.b())
}

pub(crate) fn utc(t: NaiveDateTime) -> DateTime<Utc> {
    t.and_utc()
}

pub(crate) fn format_time(t: &DateTime<Utc>) -> String {
    t.format("%Y-%m-%d %H:%M").to_string()
}

/// Axis label of the series' channel, or a generic one for mixed channels.
pub(crate) fn common_axis_label(series: &[MeasurementSeries]) -> &'static str {
    match series.split_first() {
        Some((first, rest)) if rest.iter().all(|s| s.channel() == first.channel()) => {
            first.channel().axis_label()
        }
        _ => "Value",
    }
}

fn require_series(series: &[MeasurementSeries]) -> Result<()> {
    if series.is_empty() {
        return Err(Error::EmptyInput("no series to plot".into()));
    }
    if series.iter().all(|s| s.is_empty()) {
        return Err(Error::EmptyInput("all series are empty".into()));
    }
    Ok(())
}

/// Overall time span, widened by one step when it is a single instant.
pub(crate) fn time_span(
    spans: impl IntoIterator<Item = (NaiveDateTime, NaiveDateTime)>,
    step: TimeDelta,
) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let (start, end) = spans
        .into_iter()
        .reduce(|(a0, a1), (b0, b1)| (a0.min(b0), a1.max(b1)))
        .ok_or_else(|| Error::EmptyInput("no timestamps to plot".into()))?;
    let end = if end > start { end } else { start + step };
    Ok((utc(start), utc(end)))
}

/// Finite value range with 5 % padding; `EmptyInput` if nothing is finite.
pub(crate) fn value_span(values: impl IntoIterator<Item = f64>) -> Result<(f64, f64)> {
    let (lo, hi) = finite_range(values)
        .ok_or_else(|| Error::EmptyInput("no finite values to plot".into()))?;
    Ok(pad(lo, hi))
}

pub(crate) fn pad(lo: f64, hi: f64) -> (f64, f64) {
    let range = hi - lo;
    if range.abs() < f64::EPSILON {
        (lo - 1.0, hi + 1.0)
    } else {
        (lo - range * 0.05, hi + range * 0.05)
    }
}

pub(crate) type Segments = Vec<Vec<(DateTime<Utc>, f64)>>;

/// Runs of finite samples; `NaN` breaks the line.
pub(crate) fn segments(timestamps: &[NaiveDateTime], values: &[f64]) -> Segments {
    finite_runs(timestamps, values, |t, v| (utc(t), v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{Channel, Resolution};
    use chrono::NaiveDate;

    fn series(id: u8, values: Vec<f64>) -> MeasurementSeries {
        let start = NaiveDate::from_ymd_opt(2020, 6, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let timestamps = (0..values.len() as i64)
            .map(|i| start + TimeDelta::seconds(30 * i))
            .collect();
        MeasurementSeries::new(
            BheId::new(id).unwrap(),
            Channel::InletTemperature,
            Resolution::Raw30s,
            timestamps,
            values,
        )
        .unwrap()
    }

    fn renderer() -> FigureRenderer {
        FigureRenderer::new(FigureOptions {
            width: 320,
            height: 240,
            annotate: false,
        })
    }

    #[test]
    fn test_size_parsing() {
        let options = FigureOptions::default().with_size("640x480").unwrap();
        assert_eq!((options.width, options.height), (640, 480));
        for bad in ["640", "0x480", "axb", "640x480x2"] {
            assert!(FigureOptions::default().with_size(bad).is_err(), "{bad}");
        }
        assert!(matches!(
            FigureOptions::default().with_size("100000x100000"),
            Err(Error::Config(_))
        ));
        assert!(FigureOptions::default().with_size("10000x10001").is_err());
        assert!(FigureOptions::default().with_size("10000x10000").is_ok());
    }

    #[test]
    fn test_render_retries_without_text() {
        let r = FigureRenderer::new(FigureOptions {
            width: 200,
            height: 100,
            annotate: true,
        });
        let figure = r
            .render(|root, annotate| {
                if annotate {
                    return Err(Error::Render("no font".into()));
                }
                root.fill(&BLACK).map_err(draw_err)
            })
            .unwrap();
        assert_eq!((figure.width(), figure.height()), (200, 100));
        assert!(figure.image().pixels().all(|p| p.0 == [0, 0, 0]));

        // a failure without text is final
        let result = r.render(|_, _| Err(Error::Render("broken".into())));
        assert!(matches!(result, Err(Error::Render(_))));

        // other errors are not retried
        let result = r.render(|_, annotate| {
            assert!(annotate);
            Err(Error::EmptyInput("nothing".into()))
        });
        assert!(matches!(result, Err(Error::EmptyInput(_))));
    }

    #[test]
    fn test_annotated_overlay_and_summary() {
        let r = FigureRenderer::new(FigureOptions {
            width: 600,
            height: 400,
            annotate: true,
        });
        let input = [series(1, vec![20.1, 20.3, f64::NAN, 20.6]), series(23, vec![18.0, 18.4])];
        let overlay = r.overlay("Inlet", &input).unwrap();
        assert_eq!((overlay.width(), overlay.height()), (600, 400));
        let summary = r.summary("Inlet", &input).unwrap();
        assert_eq!((summary.width(), summary.height()), (600, 400));
    }

    #[test]
    fn test_empty_input_is_reported() {
        let r = renderer();
        assert!(matches!(r.overlay("t", &[]), Err(Error::EmptyInput(_))));
        assert!(matches!(
            r.overlay("t", &[series(1, vec![])]),
            Err(Error::EmptyInput(_))
        ));
        assert!(matches!(
            r.overlay("t", &[series(1, vec![f64::NAN, f64::NAN])]),
            Err(Error::EmptyInput(_))
        ));
        assert!(matches!(r.summary("t", &[]), Err(Error::EmptyInput(_))));
    }

    #[test]
    fn test_overlay_renders_image() {
        let figure = renderer()
            .overlay(
                "overlay",
                &[series(1, vec![20.1, 20.3]), series(14, vec![19.0, f64::NAN, 19.5])],
            )
            .unwrap();
        assert_eq!((figure.width(), figure.height()), (320, 240));
        // something besides the white background was drawn
        assert!(figure.image().pixels().any(|p| p.0 != [255, 255, 255]));
    }

    #[test]
    fn test_segments_split_on_nan() {
        let s = series(2, vec![1.0, f64::NAN, 2.0, 3.0, f64::NAN]);
        let segs = segments(s.timestamps(), s.values());
        assert_eq!(segs.len(), 2);
        assert_eq!(segs[0].len(), 1);
        assert_eq!(segs[1].len(), 2);
    }

    #[test]
    fn test_series_colors_fall_back_to_palette_for_repeated_bhe() {
        let r = renderer();
        let a = series(1, vec![1.0]);
        let b = series(1, vec![2.0]);
        let colors = r.series_colors(&[a.clone(), b]);
        assert_eq!(colors.len(), 2);
        assert_ne!(colors[0], colors[1]);

        let c = series(13, vec![1.0]);
        let colors = r.series_colors(&[a, c]);
        assert_eq!(colors[0], RGBColor(0x41, 0x69, 0xE1));
    }

    #[test]
    fn test_save_png() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("figure.png");
        let figure = renderer().overlay("t", &[series(3, vec![1.0, 2.0])]).unwrap();
        figure.save(&path).unwrap();
        let decoded = image::open(&path).unwrap();
        assert_eq!(decoded.width(), 320);
    }
}
