use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::aggregate::RaggedPolicy;
use crate::render::{AxisScale, ChartKind, LegendPosition};
use crate::series::Field;

const HEADER: &str = "\
# fitcurves report configuration.
# Relative `data_dir` and `out_dir` resolve against the working directory;
# relative plot outputs resolve against `out_dir`.

";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeriesSpec {
    pub pattern: String,
    #[serde(default)]
    pub label: String,
    #[serde(default = "SeriesSpec::default_error_every")]
    pub error_every: usize,
}

impl SeriesSpec {
    fn default_error_every() -> usize {
        1
    }

    pub fn new(pattern: &str, label: &str, error_every: usize) -> Self {
        Self {
            pattern: pattern.to_string(),
            label: label.to_string(),
            error_every,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlotSpec {
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default = "PlotSpec::default_x_label")]
    pub x_label: String,
    #[serde(default = "PlotSpec::default_y_label")]
    pub y_label: String,
    #[serde(default)]
    pub kind: ChartKind,
    #[serde(default)]
    pub scale: AxisScale,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bins: Option<usize>,
    #[serde(default)]
    pub field: Field,
    #[serde(default)]
    pub legend: LegendPosition,
    pub output: PathBuf,
    pub series: Vec<SeriesSpec>,
}

impl PlotSpec {
    fn default_x_label() -> String {
        "Evaluations".to_string()
    }
    fn default_y_label() -> String {
        "Fitness".to_string()
    }

    fn new(name: &str, title: &str, kind: ChartKind, output: &str, series: Vec<SeriesSpec>) -> Self {
        Self {
            name: name.to_string(),
            title: title.to_string(),
            x_label: Self::default_x_label(),
            y_label: Self::default_y_label(),
            kind,
            scale: AxisScale::Linear,
            bins: None,
            field: Field::RunningBest,
            legend: LegendPosition::LowerRight,
            output: PathBuf::from(output),
            series,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportConfig {
    #[serde(default = "ReportConfig::default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "ReportConfig::default_out_dir")]
    pub out_dir: PathBuf,
    #[serde(default = "ReportConfig::default_dpi")]
    pub dpi: u32,
    #[serde(default = "ReportConfig::default_figure_inches")]
    pub figure_inches: [f64; 2],
    #[serde(default = "ReportConfig::default_write_summary")]
    pub write_summary: bool,
    #[serde(default)]
    pub ragged: RaggedPolicy,
    #[serde(default = "ReportConfig::default_plots")]
    pub plots: Vec<PlotSpec>,
}

impl ReportConfig {
    fn default_data_dir() -> PathBuf {
        PathBuf::from("data/output")
    }
    fn default_out_dir() -> PathBuf {
        PathBuf::from(".")
    }
    fn default_dpi() -> u32 {
        650
    }
    fn default_figure_inches() -> [f64; 2] {
        [6.4, 4.8]
    }
    fn default_write_summary() -> bool {
        true
    }

    /// Bronze-set learning curves for the three search strategies plus a
    /// per-run detail view of random search.
    fn default_plots() -> Vec<PlotSpec> {
        let algorithms = || {
            vec![
                SeriesSpec::new("output_b_e?.csv", "Evolutionary Algorithm", 10),
                SeriesSpec::new("output_b_h?.csv", "Hill Climber", 10),
                SeriesSpec::new("output_b_r?.csv", "Random Search", 10),
            ]
        };
        let random_search = || vec![SeriesSpec::new("output_b_r?.csv", "", 1)];

        let learning = PlotSpec::new(
            "learning-curves",
            "Learning Curves",
            ChartKind::ErrorBars,
            "graph_s.png",
            algorithms(),
        );

        let mut log_log = PlotSpec::new(
            "learning-curves-log",
            "Learning Curves (log-log)",
            ChartKind::ErrorBars,
            "graph_s_log.png",
            algorithms(),
        );
        log_log.scale = AxisScale::LogLog;
        log_log.bins = Some(100);
        log_log.legend = LegendPosition::UpperRight;

        let detail = PlotSpec::new(
            "random-search-detail",
            "Random Search",
            ChartKind::Lines,
            "graph_s_dot.png",
            random_search(),
        );

        let scatter = PlotSpec::new(
            "random-search-scatter",
            "Random Search",
            ChartKind::Dots,
            "graph_s_scatter.png",
            random_search(),
        );

        vec![learning, log_log, detail, scatter]
    }

    /// Output image size in pixels.
    pub fn figure_size(&self) -> (u32, u32) {
        let dpi = f64::from(self.dpi);
        let [w, h] = self.figure_inches;
        ((w * dpi).round().max(1.0) as u32, (h * dpi).round().max(1.0) as u32)
    }

    pub fn plot(&self, name: &str) -> Option<&PlotSpec> {
        self.plots.iter().find(|p| p.name == name)
    }

    /// Read the config at `path`, or `None` when no file exists there.
    ///
    /// An unreadable or unparsable file falls back to defaults with a warning.
    pub fn load(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(cfg) => return Some(cfg),
                Err(err) => {
                    warn!("Failed to parse config {}: {err}. Using defaults.", path.display());
                }
            },
            Err(err) => {
                warn!("Failed to read config {}: {err}. Using defaults.", path.display());
            }
        }
        Some(Self::default())
    }

    /// Write the default configuration to `path`. Failures are only logged.
    pub fn write_default(path: &Path) {
        match toml::to_string_pretty(&Self::default()) {
            Ok(text) => {
                if let Err(err) = fs::write(path, format!("{HEADER}{text}")) {
                    warn!("Failed to write default config to {}: {err}", path.display());
                } else {
                    info!("Wrote default config to {}", path.display());
                }
            }
            Err(err) => warn!("Failed to serialize default config: {err}"),
        }
    }

    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_else(|| {
            Self::write_default(path);
            Self::default()
        })
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            data_dir: Self::default_data_dir(),
            out_dir: Self::default_out_dir(),
            dpi: Self::default_dpi(),
            figure_inches: Self::default_figure_inches(),
            write_summary: Self::default_write_summary(),
            ragged: RaggedPolicy::default(),
            plots: Self::default_plots(),
        }
    }
}
