//! dead-css: removes unused CSS-module selectors from a bundled module graph.

mod cli;
mod config;
mod logging;
mod orchestrator;
mod output;

use clap::Parser;
use cli::Args;
use miette::Result;

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.log_format, args.verbose);

    let summary = orchestrator::run(&args)?;
    eprintln!("{}", output::format_summary(&summary, args.summary));
    Ok(())
}
