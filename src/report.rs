//! Plot passes: load each series, aggregate, draw, save.
//!
//! Passes run one after another and share nothing; the first failure ends the
//! report.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::aggregate::{AggregateCurve, RaggedPolicy};
use crate::config::{PlotSpec, ReportConfig, SeriesSpec};
use crate::error::{ReportError, Result};
use crate::render::{self, ChartKind, Figure, SeriesPlot};
use crate::series::{Field, SeriesCollection};

/// Files written by one plot pass.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotOutcome {
    pub name: String,
    pub image: PathBuf,
    pub summary: Option<PathBuf>,
}

/// Render every configured plot, or only those named in `only`.
pub fn generate(config: &ReportConfig, only: &[String]) -> Result<Vec<PlotOutcome>> {
    ensure_data_dir(&config.data_dir)?;
    let plots = select_plots(config, only)?;
    info!(
        data_dir = %config.data_dir.display(),
        plots = plots.len(),
        "generating report"
    );

    let mut outcomes = Vec::with_capacity(plots.len());
    for plot in plots {
        outcomes.push(run_plot(config, plot)?);
    }
    Ok(outcomes)
}

pub fn ensure_data_dir(dir: &Path) -> Result<()> {
    if dir.is_dir() {
        Ok(())
    } else {
        Err(ReportError::MissingDataDir(dir.to_path_buf()))
    }
}

fn select_plots<'a>(config: &'a ReportConfig, only: &[String]) -> Result<Vec<&'a PlotSpec>> {
    if only.is_empty() {
        return Ok(config.plots.iter().collect());
    }
    only.iter()
        .map(|name| {
            config
                .plot(name)
                .ok_or_else(|| ReportError::UnknownPlot(name.clone()))
        })
        .collect()
}

fn run_plot(config: &ReportConfig, plot: &PlotSpec) -> Result<PlotOutcome> {
    let series = load_series(config, plot)?;

    let image = config.out_dir.join(&plot.output);
    if let Some(parent) = image.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| ReportError::io(parent, e))?;
    }

    let figure = Figure {
        title: &plot.title,
        x_label: &plot.x_label,
        y_label: &plot.y_label,
        kind: plot.kind,
        scale: plot.scale,
        legend: plot.legend,
        size: config.figure_size(),
        dpi: config.dpi,
    };
    render::render(&image, &figure, &series)?;
    info!(plot = %plot.name, path = %image.display(), "saved chart");

    let summary = if config.write_summary {
        let path = image.with_extension("csv");
        write_summary(&path, &series)?;
        debug!(plot = %plot.name, path = %path.display(), "wrote summary");
        Some(path)
    } else {
        None
    };

    Ok(PlotOutcome {
        name: plot.name.clone(),
        image,
        summary,
    })
}

/// Load and aggregate every series of `plot`, skipping patterns that match
/// no files.
pub fn load_series(config: &ReportConfig, plot: &PlotSpec) -> Result<Vec<SeriesPlot>> {
    let mut series = Vec::with_capacity(plot.series.len());
    for spec in &plot.series {
        let collection = SeriesCollection::load(&config.data_dir, &spec.pattern)?;
        if collection.is_empty() {
            warn!(
                plot = %plot.name,
                pattern = %spec.pattern,
                "no run files match; skipping series"
            );
            continue;
        }

        let (tags, runs) = collection.shape();
        info!(plot = %plot.name, pattern = %spec.pattern, tags, runs, "aggregated series");
        series.push(build_series(&collection, spec, plot, config.ragged)?);
    }

    if series.is_empty() {
        return Err(ReportError::NoData {
            plot: plot.name.clone(),
        });
    }
    Ok(series)
}

/// Aggregate one loaded series for `plot`.
///
/// Per-run points are only kept for line and dot charts. When `plot.bins` is
/// set they are binned on the shared tag axis, so runs missing some tags
/// still land in the same buckets as the aggregate curve.
pub fn build_series(
    collection: &SeriesCollection,
    spec: &SeriesSpec,
    plot: &PlotSpec,
    ragged: RaggedPolicy,
) -> Result<SeriesPlot> {
    let mut curve = AggregateCurve::from_series(collection, plot.field, ragged)?;
    if let Some(buckets) = plot.bins {
        curve = curve.binned(buckets)?;
    }

    let runs = match plot.kind {
        ChartKind::ErrorBars => Vec::new(),
        ChartKind::Lines | ChartKind::Dots => match plot.bins {
            Some(buckets) => bin_runs(collection, plot.field, buckets, &curve),
            None => collection
                .per_run(plot.field)
                .into_iter()
                .map(|run| run.into_iter().map(|(tag, v)| (tag as f64, v)).collect())
                .collect(),
        },
    };

    Ok(SeriesPlot {
        label: spec.label.clone(),
        source: spec.pattern.clone(),
        curve,
        runs,
        error_every: spec.error_every,
    })
}

/// Sum each run's values per bucket of the global tag axis.
///
/// Bucket `i` spans tag positions `[i * w, (i + 1) * w)`; its x is the
/// binned x of `binned`. Buckets a run has no values in are left out.
fn bin_runs(
    collection: &SeriesCollection,
    field: Field,
    buckets: usize,
    binned: &AggregateCurve,
) -> Vec<Vec<(f64, f64)>> {
    let width = (collection.len() / buckets.max(1)).max(1);
    let mut sums = vec![vec![None::<f64>; binned.len()]; collection.runs()];
    for (pos, (_, samples)) in collection.iter().enumerate() {
        let bucket = pos / width;
        for sample in samples {
            if let Some(slot) = sums[sample.run].get_mut(bucket) {
                *slot = Some(slot.unwrap_or(0.0) + sample.value(field));
            }
        }
    }

    sums.into_iter()
        .map(|run| {
            run.into_iter()
                .zip(&binned.points)
                .filter_map(|(sum, p)| sum.map(|v| (p.x, v)))
                .collect()
        })
        .collect()
}

/// Write the aggregate curve of every series as `series,x,mean,std,runs`.
pub fn write_summary(path: &Path, series: &[SeriesPlot]) -> Result<()> {
    let csv_err = |source| ReportError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;
    writer
        .write_record(["series", "x", "mean", "std", "runs"])
        .map_err(csv_err)?;

    for s in series {
        let name = if s.label.is_empty() { &s.source } else { &s.label };
        for p in &s.curve.points {
            writer
                .write_record([
                    name.clone(),
                    p.x.to_string(),
                    p.mean.to_string(),
                    p.std.to_string(),
                    p.runs.to_string(),
                ])
                .map_err(csv_err)?;
        }
    }
    writer.flush().map_err(|e| ReportError::io(path, e))
}
