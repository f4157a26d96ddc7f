use std::path::PathBuf;

use clap::Parser;

use crate::config::ReportConfig;
use crate::error::Result;
use crate::report;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
pub struct Args {
    /// Path to report config TOML (written with defaults if missing)
    #[arg(long, default_value = "fitcurves.toml")]
    pub config: PathBuf,

    /// Directory holding the run CSV files (overrides config)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Directory images and summaries are written to (overrides config)
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Only render the named plot; repeat for several
    #[arg(long = "plot", value_name = "NAME")]
    pub plots: Vec<String>,

    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl Args {
    /// Command-line values win over the config file.
    pub fn apply(&self, config: &mut ReportConfig) {
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(dir) = &self.out_dir {
            config.out_dir = dir.clone();
        }
    }

    /// Load the config file with overrides applied and check its data dir.
    ///
    /// A missing config file is only written out once the data dir is known
    /// to exist, so a failed run leaves the filesystem untouched.
    pub fn load_config(&self) -> Result<ReportConfig> {
        let loaded = ReportConfig::load(&self.config);
        let fresh = loaded.is_none();
        let mut config = loaded.unwrap_or_default();
        self.apply(&mut config);

        report::ensure_data_dir(&config.data_dir)?;
        if fresh {
            ReportConfig::write_default(&self.config);
        }
        Ok(config)
    }
}
