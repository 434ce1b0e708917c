//! Command-line interface implementation
//!
//! This module provides the CLI entry point and dispatches to submodules
//! for specific command implementations.

mod build;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

/// Build finished cleanly
pub(crate) const EXIT_SUCCESS: u8 = 0;
/// Build completed but reported errors
pub(crate) const EXIT_ERROR: u8 = 1;
/// Unrecoverable failure (bad config, watcher could not start)
pub(crate) const EXIT_FATAL: u8 = 2;

/// Bindle - Bundle web assets into hashed, chunked output
#[derive(Parser)]
#[command(name = "bindle")]
#[command(about = "Bindle - Bundle scripts, styles, and assets per bindle.toml")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one build according to bindle.toml
    Build {
        /// Path to a bindle.toml (default: discovered by walking up)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override output directory
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Override source directory
        #[arg(long)]
        src: Option<PathBuf>,

        /// Override build mode: development or production
        #[arg(short, long)]
        mode: Option<crate::config::Mode>,

        /// Override entry files (relative to the source directory)
        #[arg(short, long)]
        entry: Vec<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Watch the project and rebuild on changes
    Watch {
        /// Path to a bindle.toml (default: discovered by walking up)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override build mode: development or production
        #[arg(short, long)]
        mode: Option<crate::config::Mode>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },
}

/// Run the CLI application
pub fn run() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { config, out, src, mode, entry, verbose } => build::run_build(
            config.as_deref(),
            out.as_deref(),
            src.as_deref(),
            mode,
            &entry,
            verbose,
        ),
        Commands::Watch { config, mode, verbose } => {
            build::run_watch(config.as_deref(), mode, verbose)
        }
    }
}
