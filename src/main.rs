//! # openclean command line tool
//!
//! Thin front end over the library: every command opens a CSV file as a
//! [`DataPipeline`](openclean::pipeline::DataPipeline) or executes a JSON
//! pipeline spec.
//!
//! ```bash
//! openclean head people.csv -n 5
//! openclean distinct people.csv --columns City
//! openclean profile people.csv --json
//! openclean validate cleanup.json --input people.csv
//! openclean run cleanup.json --input people.csv --output clean.csv
//! ```

#![expect(clippy::print_stdout)] // Allow println! in the binary

mod cli;

use anyhow::Result;
use clap::Parser as _;
use openclean::{config, logging};

fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(config::get_config_path);
    let settings = config::load_config(&config_path)?;

    let level = if cli.verbose {
        "debug"
    } else {
        settings.log_level.as_str()
    };
    logging::init(level, settings.log_to_file)?;

    cli::run_command(cli.command, &settings)
}
