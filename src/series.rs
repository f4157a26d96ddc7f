//! Per-run fitness traces and the tag-keyed collection built from them.
//!
//! Each result file holds one optimization run. A row is
//! `label,tag,running_best,challenger[,extra...]` and the first blank line ends
//! the data section of a file.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{ReportError, Result};

const MIN_COLUMNS: usize = 4;

/// Which fitness value of a sample a plot aggregates.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Field {
    #[default]
    RunningBest,
    Challenger,
}

impl Field {
    pub fn label(self) -> &'static str {
        match self {
            Field::RunningBest => "running best",
            Field::Challenger => "challenger",
        }
    }
}

/// One parsed CSV row.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    pub label: String,
    pub tag: u64,
    pub running_best: f64,
    pub challenger: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Index of the contributing file in sorted file-name order.
    pub run: usize,
    pub running_best: f64,
    pub challenger: f64,
}

impl Sample {
    pub fn value(&self, field: Field) -> f64 {
        match field {
            Field::RunningBest => self.running_best,
            Field::Challenger => self.challenger,
        }
    }
}

/// Samples from every run of one file family, keyed by tag.
///
/// The map keeps tags ascending, so anything derived from it (aggregates,
/// bins) sees the evaluation axis in order regardless of file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeriesCollection {
    samples: BTreeMap<u64, Vec<Sample>>,
    runs: usize,
}

impl SeriesCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read every file in `dir` whose name matches `pattern`.
    pub fn load(dir: &Path, pattern: &str) -> Result<Self> {
        let mut collection = Self::new();
        for path in matching_files(dir, pattern)? {
            let contents = fs::read_to_string(&path).map_err(|e| ReportError::io(&path, e))?;
            let records = parse_records(&path, &contents)?;
            debug!(path = %path.display(), rows = records.len(), "parsed run file");
            collection.add_run(&records);
        }
        Ok(collection)
    }

    /// Append one run's records under a fresh run index and return that index.
    pub fn add_run(&mut self, records: &[RunRecord]) -> usize {
        let run = self.runs;
        for record in records {
            self.push(run, record);
        }
        self.runs = run + 1;
        run
    }

    pub fn push(&mut self, run: usize, record: &RunRecord) {
        self.samples.entry(record.tag).or_default().push(Sample {
            run,
            running_best: record.running_best,
            challenger: record.challenger,
        });
        self.runs = self.runs.max(run + 1);
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Number of distinct tags.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Number of contributing runs.
    pub fn runs(&self) -> usize {
        self.runs
    }

    pub fn get(&self, tag: u64) -> Option<&[Sample]> {
        self.samples.get(&tag).map(Vec::as_slice)
    }

    pub fn tags(&self) -> impl Iterator<Item = u64> + '_ {
        self.samples.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u64, &[Sample])> + '_ {
        self.samples.iter().map(|(tag, s)| (*tag, s.as_slice()))
    }

    /// `(tags, runs)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.len(), self.runs)
    }

    /// Values of `field` split back out per run, each ascending by tag.
    pub fn per_run(&self, field: Field) -> Vec<Vec<(u64, f64)>> {
        let mut runs = vec![Vec::new(); self.runs];
        for (tag, samples) in &self.samples {
            for sample in samples {
                runs[sample.run].push((*tag, sample.value(field)));
            }
        }
        runs
    }
}

/// Regular files directly inside `dir` whose file name matches `pattern`,
/// sorted by name.
pub fn matching_files(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let matcher = glob::Pattern::new(pattern).map_err(|source| ReportError::Pattern {
        pattern: pattern.to_string(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| ReportError::io(dir, e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        if matcher.matches(name) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Parse the data section of one run file.
pub fn parse_records(path: &Path, contents: &str) -> Result<Vec<RunRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(data_section(contents).as_bytes());

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|e| {
            let line = e.position().map(|p| p.line()).unwrap_or(0);
            ReportError::malformed(path, line, e.to_string())
        })?;
        let line = row.position().map(|p| p.line()).unwrap_or(0);
        if row.len() < MIN_COLUMNS {
            return Err(ReportError::malformed(
                path,
                line,
                format!("expected at least {MIN_COLUMNS} columns, found {}", row.len()),
            ));
        }
        records.push(RunRecord {
            label: row[0].to_string(),
            tag: parse_column(path, line, "tag", &row[1])?,
            running_best: parse_column(path, line, "running_best", &row[2])?,
            challenger: parse_column(path, line, "challenger", &row[3])?,
        });
    }
    Ok(records)
}

/// Everything before the first blank line.
fn data_section(contents: &str) -> &str {
    let mut end = 0;
    for line in contents.split_inclusive('\n') {
        if line.trim().is_empty() {
            break;
        }
        end += line.len();
    }
    &contents[..end]
}

fn parse_column<T>(path: &Path, line: u64, name: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    raw.parse::<T>()
        .map_err(|e| ReportError::malformed(path, line, format!("{name} {raw:?}: {e}")))
}
