use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ReportError, Result};
use crate::series::{Field, SeriesCollection};

/// What to do when tags have differing numbers of contributing runs.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum RaggedPolicy {
    #[default]
    Warn,
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurvePoint {
    pub x: f64,
    pub mean: f64,
    pub std: f64,
    pub runs: usize,
}

/// Mean and spread of one field across runs, one point per tag (or per bin).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateCurve {
    pub points: Vec<CurvePoint>,
}

impl AggregateCurve {
    pub fn from_series(
        series: &SeriesCollection,
        field: Field,
        policy: RaggedPolicy,
    ) -> Result<Self> {
        check_run_counts(series, policy)?;

        let mut values = Vec::with_capacity(series.runs());
        let points = series
            .iter()
            .map(|(tag, samples)| {
                values.clear();
                values.extend(samples.iter().map(|s| s.value(field)));
                let (mean, std) = mean_std(&values);
                CurvePoint {
                    x: tag as f64,
                    mean,
                    std,
                    runs: samples.len(),
                }
            })
            .collect();
        Ok(Self { points })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Sum `x`, `mean` and `std` over `buckets` contiguous groups of points.
    ///
    /// The bucket count must divide the number of points. `runs` of a bucket is
    /// the smallest run count among its points.
    pub fn binned(&self, buckets: usize) -> Result<Self> {
        let xs: Vec<f64> = self.points.iter().map(|p| p.x).collect();
        let means: Vec<f64> = self.points.iter().map(|p| p.mean).collect();
        let stds: Vec<f64> = self.points.iter().map(|p| p.std).collect();

        let xs = bin_sum(&xs, buckets)?;
        let means = bin_sum(&means, buckets)?;
        let stds = bin_sum(&stds, buckets)?;
        let width = self.points.len() / buckets;

        let points = self
            .points
            .chunks_exact(width)
            .enumerate()
            .map(|(i, chunk)| CurvePoint {
                x: xs[i],
                mean: means[i],
                std: stds[i],
                runs: chunk.iter().map(|p| p.runs).min().unwrap_or(0),
            })
            .collect();
        Ok(Self { points })
    }
}

/// Arithmetic mean and population standard deviation.
pub fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

/// Downsample by summing `values` into `buckets` equal contiguous groups.
pub fn bin_sum(values: &[f64], buckets: usize) -> Result<Vec<f64>> {
    if buckets == 0 || values.is_empty() || values.len() % buckets != 0 {
        return Err(ReportError::UnevenBins {
            len: values.len(),
            buckets,
        });
    }
    let width = values.len() / buckets;
    Ok(values
        .chunks_exact(width)
        .map(|chunk| chunk.iter().sum())
        .collect())
}

fn check_run_counts(series: &SeriesCollection, policy: RaggedPolicy) -> Result<()> {
    let expected = series.runs();
    let Some((tag, found)) = series
        .iter()
        .map(|(tag, samples)| (tag, samples.len()))
        .find(|(_, n)| *n != expected)
    else {
        return Ok(());
    };

    match policy {
        RaggedPolicy::Reject => Err(ReportError::RaggedRuns {
            tag,
            expected,
            found,
        }),
        RaggedPolicy::Warn => {
            warn!(
                tag,
                expected,
                found,
                "uneven run counts across tags; statistics use available runs"
            );
            Ok(())
        }
    }
}
