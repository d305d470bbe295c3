//! assetmill - incremental asset pipeline engine.

mod cache;
mod cli;
mod config;
mod core;
mod engine;
mod freshness;
mod logger;
mod pipeline;
mod transformer;
mod utils;
mod watcher;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::ProjectConfig;

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    core::setup_shutdown_handler()?;

    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }

    let mut config = ProjectConfig::load(&cli)?;
    cli::common::apply_overrides(&mut config, &cli.command);

    match &cli.command {
        Commands::Build {
            clean,
            paths,
            retry,
            ..
        } => cli::build::build_project(&config, *clean, paths, *retry),
        Commands::Watch { .. } => cli::watch::watch_project(&config),
        Commands::Status { list } => cli::status::show_status(&config, *list),
        Commands::Clean => cli::clean::clean_project(&config),
    }
}
