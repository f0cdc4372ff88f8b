//! CLI entry point for batch volume registration and median aggregation

use clap::Parser;
use volreg::io::cli::{Cli, Pipeline};
use volreg::io::logging::init_logging;

fn main() -> volreg::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let mut pipeline = Pipeline::new(cli);
    if let Err(error) = pipeline.process() {
        log::error!("{error}");
        return Err(error);
    }
    Ok(())
}
