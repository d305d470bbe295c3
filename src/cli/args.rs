//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// Incremental asset pipeline: scan resources, run pipelines, cache outputs
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: assetmill.toml, searched upward)
    #[arg(short = 'C', long, global = true, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Enable verbose output for debugging
    #[arg(short = 'V', long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run one full update cycle
    #[command(visible_alias = "b")]
    Build {
        /// Drop the cache and persisted state first
        #[arg(short, long)]
        clean: bool,

        /// Reprocess everything under this resource path (repeatable)
        #[arg(short, long = "path", value_name = "PREFIX")]
        paths: Vec<String>,

        /// Retry assets held back after repeated failures
        #[arg(short, long)]
        retry: bool,

        /// Worker threads (0 = available parallelism)
        #[arg(short, long)]
        workers: Option<usize>,

        /// Target flavor tags, comma-separated (overrides [process] flavor)
        #[arg(short, long, value_delimiter = ',')]
        flavor: Option<Vec<String>>,
    },

    /// Build, then keep processing changes until Ctrl+C
    #[command(visible_alias = "w")]
    Watch {
        /// Worker threads (0 = available parallelism)
        #[arg(short, long)]
        workers: Option<usize>,

        /// Target flavor tags, comma-separated (overrides [process] flavor)
        #[arg(short, long, value_delimiter = ',')]
        flavor: Option<Vec<String>>,
    },

    /// Report cached assets per state and output conflicts
    #[command(visible_alias = "s")]
    Status {
        /// List every record with its state
        #[arg(short, long)]
        list: bool,
    },

    /// Delete the cache directory and the persisted state
    Clean,
}

impl Commands {
    /// CLI overrides for `[process]`.
    pub fn process_overrides(&self) -> (Option<usize>, Option<&[String]>) {
        match self {
            Self::Build { workers, flavor, .. } | Self::Watch { workers, flavor } => {
                (*workers, flavor.as_deref())
            }
            Self::Status { .. } | Self::Clean => (None, None),
        }
    }
}
