//! Chart drawing for aggregated learning curves.
//!
//! Output format follows the file extension: `.svg` goes through the SVG
//! backend, everything else is rasterized to a bitmap.

use std::error::Error;
use std::path::Path;

use plotters::coord::Shift;
use plotters::coord::ranged1d::{Ranged, ValueFormatter};
use plotters::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::aggregate::AggregateCurve;
use crate::error::{ReportError, Result};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ChartKind {
    /// Mean line with mean ± std error bars.
    #[default]
    ErrorBars,
    /// One line per run.
    Lines,
    /// One unconnected marker per run value.
    Dots,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum AxisScale {
    #[default]
    Linear,
    LogLog,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum LegendPosition {
    UpperLeft,
    UpperRight,
    LowerLeft,
    #[default]
    LowerRight,
}

impl From<LegendPosition> for SeriesLabelPosition {
    fn from(pos: LegendPosition) -> Self {
        match pos {
            LegendPosition::UpperLeft => SeriesLabelPosition::UpperLeft,
            LegendPosition::UpperRight => SeriesLabelPosition::UpperRight,
            LegendPosition::LowerLeft => SeriesLabelPosition::LowerLeft,
            LegendPosition::LowerRight => SeriesLabelPosition::LowerRight,
        }
    }
}

/// Everything drawn for one file family.
#[derive(Debug, Clone)]
pub struct SeriesPlot {
    pub label: String,
    /// File pattern the runs were loaded from.
    pub source: String,
    pub curve: AggregateCurve,
    /// Per-run `(x, value)` points, used by line and dot charts.
    pub runs: Vec<Vec<(f64, f64)>>,
    pub error_every: usize,
}

#[derive(Debug, Clone)]
pub struct Figure<'a> {
    pub title: &'a str,
    pub x_label: &'a str,
    pub y_label: &'a str,
    pub kind: ChartKind,
    pub scale: AxisScale,
    pub legend: LegendPosition,
    pub size: (u32, u32),
    pub dpi: u32,
}

impl Figure<'_> {
    /// Typographic points to pixels at the figure's resolution.
    fn pt(&self, points: f64) -> f64 {
        points * f64::from(self.dpi) / 72.0
    }

    fn px(&self, points: f64) -> u32 {
        self.pt(points).round().max(1.0) as u32
    }
}

pub fn render(path: &Path, figure: &Figure<'_>, series: &[SeriesPlot]) -> Result<()> {
    let is_svg = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"));

    let drawn = if is_svg {
        draw(
            SVGBackend::new(path, figure.size).into_drawing_area(),
            figure,
            series,
        )
    } else {
        draw(
            BitMapBackend::new(path, figure.size).into_drawing_area(),
            figure,
            series,
        )
    };
    drawn.map_err(|err| ReportError::Render {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}

fn draw<DB>(
    root: DrawingArea<DB, Shift>,
    figure: &Figure<'_>,
    series: &[SeriesPlot],
) -> std::result::Result<(), Box<dyn Error>>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;

    let log = figure.scale == AxisScale::LogLog;
    let extents = chart_extents(figure.kind, series);
    let (x_lo, x_hi) =
        axis_bounds(extents.iter().map(|p| p.0), log).ok_or("no plottable x values")?;
    let (y_lo, y_hi) =
        axis_bounds(extents.iter().map(|p| p.1), log).ok_or("no plottable y values")?;
    debug!(x_lo, x_hi, y_lo, y_hi, log, "chart bounds");

    let mut builder = ChartBuilder::on(&root);
    builder
        .caption(figure.title, ("sans-serif", figure.pt(14.0)))
        .margin(figure.px(8.0))
        .x_label_area_size(figure.px(28.0))
        .y_label_area_size(figure.px(40.0));

    if log {
        let chart =
            builder.build_cartesian_2d((x_lo..x_hi).log_scale(), (y_lo..y_hi).log_scale())?;
        draw_chart(chart, figure, series, y_lo)?;
    } else {
        let chart = builder.build_cartesian_2d(x_lo..x_hi, y_lo..y_hi)?;
        draw_chart(chart, figure, series, y_lo)?;
    }

    root.present()?;
    Ok(())
}

fn draw_chart<'a, DB, X, Y>(
    mut chart: ChartContext<'a, DB, Cartesian2d<X, Y>>,
    figure: &Figure<'_>,
    series: &[SeriesPlot],
    y_floor: f64,
) -> std::result::Result<(), Box<dyn Error>>
where
    DB: DrawingBackend + 'a,
    DB::ErrorType: 'static,
    X: Ranged<ValueType = f64> + ValueFormatter<f64>,
    Y: Ranged<ValueType = f64> + ValueFormatter<f64>,
{
    let log = figure.scale == AxisScale::LogLog;
    let label_font = ("sans-serif", figure.pt(10.0));
    let stroke = figure.px(1.2);
    let legend_len = figure.px(16.0) as i32;

    chart
        .configure_mesh()
        .x_desc(figure.x_label)
        .y_desc(figure.y_label)
        .label_style(label_font)
        .axis_desc_style(label_font)
        .x_label_formatter(&format_tick)
        .y_label_formatter(&format_tick)
        .light_line_style(BLACK.mix(0.05))
        .draw()?;

    let per_run_colors = series.len() == 1;
    for (i, s) in series.iter().enumerate() {
        let color = Palette99::pick(i).mix(0.9);
        match figure.kind {
            ChartKind::ErrorBars => {
                let line = plottable(s.curve.points.iter().map(|p| (p.x, p.mean)), log);
                let anno = chart.draw_series(LineSeries::new(line, color.stroke_width(stroke)))?;
                if !s.label.is_empty() {
                    anno.label(&s.label).legend(move |(x, y)| {
                        PathElement::new(vec![(x, y), (x + legend_len, y)], color)
                    });
                }

                let cap = figure.px(3.0);
                let bars = error_bar_indices(s.curve.len(), s.error_every)
                    .into_iter()
                    .map(|idx| s.curve.points[idx])
                    .filter(|p| !log || (p.x > 0.0 && p.mean > 0.0))
                    .map(|p| {
                        let lo = p.mean - p.std;
                        let lo = if log { lo.max(y_floor) } else { lo };
                        ErrorBar::new_vertical(p.x, lo, p.mean, p.mean + p.std, color, cap)
                    });
                chart.draw_series(bars)?;
            }
            ChartKind::Lines => {
                for (r, run) in s.runs.iter().enumerate() {
                    let c = if per_run_colors {
                        Palette99::pick(r).mix(0.9)
                    } else {
                        color
                    };
                    let points = plottable(run.iter().copied(), log);
                    let anno = chart.draw_series(LineSeries::new(points, c.stroke_width(stroke)))?;
                    if r == 0 && !s.label.is_empty() {
                        anno.label(&s.label).legend(move |(x, y)| {
                            PathElement::new(vec![(x, y), (x + legend_len, y)], c)
                        });
                    }
                }
            }
            ChartKind::Dots => {
                let radius = figure.px(1.5);
                for (r, run) in s.runs.iter().enumerate() {
                    let c = if per_run_colors {
                        Palette99::pick(r).mix(0.9)
                    } else {
                        color
                    };
                    let dots = plottable(run.iter().copied(), log)
                        .into_iter()
                        .map(|p| Circle::new(p, radius, c.filled()));
                    let anno = chart.draw_series(dots)?;
                    if r == 0 && !s.label.is_empty() {
                        anno.label(&s.label)
                            .legend(move |(x, y)| Circle::new((x, y), radius, c.filled()));
                    }
                }
            }
        }
    }

    if series.iter().any(|s| !s.label.is_empty()) {
        chart
            .configure_series_labels()
            .position(figure.legend.into())
            .label_font(label_font)
            .background_style(WHITE.mix(0.5))
            .border_style(BLACK)
            .draw()?;
    }
    Ok(())
}

/// Every point that should fit inside the plotting area.
fn chart_extents(kind: ChartKind, series: &[SeriesPlot]) -> Vec<(f64, f64)> {
    let mut extents = Vec::new();
    for s in series {
        match kind {
            ChartKind::ErrorBars => {
                for p in &s.curve.points {
                    extents.push((p.x, p.mean));
                    extents.push((p.x, p.mean - p.std));
                    extents.push((p.x, p.mean + p.std));
                }
            }
            ChartKind::Lines | ChartKind::Dots => {
                extents.extend(s.runs.iter().flatten().copied());
            }
        }
    }
    extents
}

/// Padded `(lo, hi)` over the finite values (positive only on a log axis).
fn axis_bounds(values: impl Iterator<Item = f64>, log: bool) -> Option<(f64, f64)> {
    let (lo, hi) = values
        .filter(|v| v.is_finite() && (!log || *v > 0.0))
        .fold(None, |acc: Option<(f64, f64)>, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })?;

    if log {
        return Some((lo / 1.25, hi * 1.25));
    }
    let span = hi - lo;
    let pad = if span > 0.0 {
        span * 0.05
    } else {
        (hi.abs() * 0.05).max(1.0)
    };
    Some((lo - pad, hi + pad))
}

/// Drop points a log-log chart cannot place.
fn plottable(points: impl Iterator<Item = (f64, f64)>, log: bool) -> Vec<(f64, f64)> {
    let mut dropped = 0usize;
    let kept: Vec<(f64, f64)> = points
        .filter(|&(x, y)| {
            let ok = x.is_finite() && y.is_finite() && (!log || (x > 0.0 && y > 0.0));
            if !ok {
                dropped += 1;
            }
            ok
        })
        .collect();
    if dropped > 0 {
        debug!(dropped, log, "skipping points outside the axis domain");
    }
    kept
}

/// Indices that get an error bar: the first point and every `every`-th after it.
fn error_bar_indices(len: usize, every: usize) -> Vec<usize> {
    (0..len).step_by(every.max(1)).collect()
}

fn format_tick(v: &f64) -> String {
    let a = v.abs();
    if a != 0.0 && !(1e-2..1e5).contains(&a) {
        format!("{v:.0e}")
    } else if v.fract() == 0.0 {
        format!("{v:.0}")
    } else {
        format!("{v:.2}")
    }
}
