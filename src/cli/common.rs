//! Helpers shared across CLI commands.

use anyhow::{Context, Result};

use crate::config::ProjectConfig;
use crate::engine::{Engine, UpdateReport};
use crate::transformer::TransformerRegistry;
use crate::utils::plural_count;
use crate::watcher::ChangeSource;
use crate::{cli::Commands, log};

/// Apply `--workers` / `--flavor` on top of the config file.
pub fn apply_overrides(config: &mut ProjectConfig, command: &Commands) {
    let (workers, flavor) = command.process_overrides();
    if let Some(workers) = workers {
        config.process.workers = workers;
    }
    if let Some(tags) = flavor {
        config.process.flavor = tags.to_vec();
    }
}

/// Engine over the configured project with the built-in transformers.
pub fn open_engine(
    config: &ProjectConfig,
    changes: Box<dyn ChangeSource>,
    show_progress: bool,
) -> Result<Engine> {
    let mut options = config.engine_options();
    options.show_progress = show_progress;
    std::fs::create_dir_all(&options.cache_dir)
        .with_context(|| format!("cannot create cache directory {}", options.cache_dir.display()))?;

    let flavor = options.flavor.clone();
    let engine = Engine::new(options, TransformerRegistry::with_builtins(), changes)?;
    crate::debug!(
        "config";
        "resources {}, flavor {flavor}, {}",
        config.project.resources.display(),
        plural_count(engine.cache().len(), "cached record")
    );
    Ok(engine)
}

/// One-line summary of an update.
pub fn log_report(report: &UpdateReport) {
    log!("process"; "{}", report.summary());
    if let Some(cleanup) = &report.cleanup
        && !cleanup.refused_outputs.is_empty()
    {
        log!(
            "conflict";
            "{} kept because other assets still claim them",
            plural_count(cleanup.refused_outputs.len(), "output")
        );
    }
}
