//! windscan - scan content files for class tokens and generate the CSS they use

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use windscan::cli;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    init_tracing(cli.verbose, cli.quiet);
    cli::run(cli)
}

fn init_tracing(verbose: bool, quiet: bool) {
    let default_level = if verbose {
        "windscan=debug"
    } else if quiet {
        "off"
    } else {
        // Warnings reach the user through the command summary
        "windscan=error"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
