//! `status`: what the persisted state says about the project.

use anyhow::Result;
use owo_colors::OwoColorize;

use crate::cache::{AssetCache, AssetState, print_conflicts, restore_state};
use crate::config::ProjectConfig;
use crate::log;
use crate::utils::plural_count;

pub fn show_status(config: &ProjectConfig, list: bool) -> Result<()> {
    let state = restore_state(&config.project.state);
    if state.is_empty() {
        log!("cache"; "no state in {}, run `assetmill build` first", config.project.state.display());
        return Ok(());
    }

    let pipelines = state.pipelines.len();
    let cache = AssetCache::from_records(state.assets);

    log!(
        "cache";
        "{}, {}",
        plural_count(cache.len(), "record"),
        plural_count(pipelines, "pipeline")
    );
    for (asset_state, count) in cache.state_counts() {
        eprintln!("  {:<8} {count}", asset_state.to_string());
    }

    if list {
        for record in cache.records().values() {
            let label = match record.state() {
                AssetState::Valid => record.state().to_string().green().to_string(),
                AssetState::Invalid => record.state().to_string().red().to_string(),
                other => other.to_string().dimmed().to_string(),
            };
            println!(
                "{:<8} {} [{}]",
                label,
                record.resource_name,
                record.transformer_debug_string()
            );
        }
    }

    print_conflicts(&cache.output_conflicts());
    Ok(())
}
