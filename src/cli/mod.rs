//! Command-line interface module.

mod args;
pub mod build;
pub mod urls;
pub mod watch;

pub use args::{BuildArgs, Cli, Commands};

use anyhow::{Context, Result};
use crsh::config::CrshConfig;

/// Load `crsh.toml` and apply command-line overrides.
pub fn load_config(cli: &Cli) -> Result<CrshConfig> {
    let cwd = std::env::current_dir().context("Failed to get current working directory")?;
    let mut config = CrshConfig::load(&cli.config, &cwd)?;

    let args = cli.build_args();
    if args.production {
        config.force_production();
    }
    if let Some(root) = &args.root {
        config.override_root(root, &cwd);
    }
    Ok(config)
}
