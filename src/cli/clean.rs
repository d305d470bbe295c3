//! `clean`: delete the output cache and the persisted state.

use std::fs;
use std::io;
use std::path::Path;

use anyhow::{Context, Result};

use crate::cache::clear_state;
use crate::config::ProjectConfig;
use crate::log;

pub fn clean_project(config: &ProjectConfig) -> Result<()> {
    let cache_dir = &config.project.cache;
    if remove_dir(cache_dir)? {
        log!("cache"; "removed {}", cache_dir.display());
    }
    clear_state(&config.project.state)?;
    Ok(())
}

/// Returns `false` if the directory did not exist.
fn remove_dir(dir: &Path) -> Result<bool> {
    match fs::remove_dir_all(dir) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e).with_context(|| format!("cannot remove {}", dir.display())),
    }
}
