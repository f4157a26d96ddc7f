// Entry point: loads the report config and renders every plot pass.
use std::error::Error;
use std::io;

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use fitcurves::cli::Args;
use fitcurves::report;

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let config = args.load_config().inspect_err(|err| error!("{err}"))?;
    let outcomes = report::generate(&config, &args.plots).inspect_err(|err| error!("{err}"))?;
    println!(
        "Saved {} plot(s) to {}",
        outcomes.len(),
        config.out_dir.display()
    );
    Ok(())
}
