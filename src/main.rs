//! crsh - script/style bundler with watch mode.

mod cli;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    crsh::logger::set_verbose(cli.verbose);

    let config = cli::load_config(&cli)?;

    match &cli.command {
        Commands::Build { .. } => cli::build::build_all(&config, false).map(|_| ()),
        Commands::Watch { .. } => cli::watch::watch_all(&config),
        Commands::Urls { pretty, .. } => cli::urls::print_urls(&config, *pretty),
    }
}
