//! Learning-curve reports from per-run optimization fitness traces.
//!
//! Run files are grouped by glob pattern, aggregated per evaluation count
//! (mean and population standard deviation, optionally summed into bins) and
//! drawn as error-bar, line or dot charts.

pub mod aggregate;
pub mod cli;
pub mod config;
pub mod error;
pub mod render;
pub mod report;
pub mod series;

pub use aggregate::{AggregateCurve, CurvePoint, RaggedPolicy, bin_sum, mean_std};
pub use config::{PlotSpec, ReportConfig, SeriesSpec};
pub use error::{ReportError, Result};
pub use report::{PlotOutcome, generate};
pub use series::{Field, RunRecord, Sample, SeriesCollection};
