//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// crsh script/style bundler CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (searched upward from the current directory)
    #[arg(short = 'C', long, default_value = "crsh.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Compile every bundle once
    #[command(visible_alias = "b")]
    Build {
        #[command(flatten)]
        build_args: BuildArgs,
    },

    /// Compile, then rebuild bundles whenever a source changes
    #[command(visible_alias = "w")]
    Watch {
        #[command(flatten)]
        build_args: BuildArgs,
    },

    /// Compile, then print the `crsh_<name>` template keys as JSON
    #[command(visible_alias = "u")]
    Urls {
        #[command(flatten)]
        build_args: BuildArgs,

        /// Pretty-print JSON output
        #[arg(short, long)]
        pretty: bool,
    },
}

/// Shared arguments for every command
#[derive(clap::Args, Debug, Clone, Default)]
pub struct BuildArgs {
    /// Minify output and compress style dialects
    #[arg(short, long)]
    pub production: bool,

    /// Output directory (overrides `root` in the config)
    #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
    pub root: Option<PathBuf>,
}

impl Cli {
    pub const fn build_args(&self) -> &BuildArgs {
        match &self.command {
            Commands::Build { build_args }
            | Commands::Watch { build_args }
            | Commands::Urls { build_args, .. } => build_args,
        }
    }

    pub const fn is_watch(&self) -> bool {
        matches!(self.command, Commands::Watch { .. })
    }
}
