use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("data directory {} does not exist", .0.display())]
    MissingDataDir(PathBuf),

    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid file pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("{}:{line}: {reason}", path.display())]
    Malformed {
        path: PathBuf,
        line: u64,
        reason: String,
    },

    #[error("cannot split {len} points into {buckets} equal bins")]
    UnevenBins { len: usize, buckets: usize },

    #[error("tag {tag} has {found} runs, expected {expected}")]
    RaggedRuns {
        tag: u64,
        expected: usize,
        found: usize,
    },

    #[error("plot {plot:?} has no data: no series pattern matched any file")]
    NoData { plot: String },

    #[error("no plot named {0:?} in the report configuration")]
    UnknownPlot(String),

    #[error("failed to render {}: {message}", path.display())]
    Render { path: PathBuf, message: String },

    #[error("failed to write summary {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

impl ReportError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn malformed(path: impl Into<PathBuf>, line: u64, reason: impl Into<String>) -> Self {
        Self::Malformed {
            path: path.into(),
            line,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;
