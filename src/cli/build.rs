//! `build`: one full update cycle.

use anyhow::{Result, bail};

use super::common::{log_report, open_engine};
use crate::config::ProjectConfig;
use crate::utils::path::resource::normalize_name;
use crate::utils::plural_count;
use crate::watcher::ManualChanges;
use crate::{debug, log};

/// Run a single full cycle. Fails if any asset failed to process.
///
/// `paths` are resource prefixes reprocessed even when up to date; `retry`
/// lifts the suppression of repeatedly failing assets.
pub fn build_project(
    config: &ProjectConfig,
    clean: bool,
    paths: &[String],
    retry: bool,
) -> Result<()> {
    let prefixes = paths
        .iter()
        .map(|raw| match normalize_name(raw) {
            Some(name) => Ok(name),
            None => bail!("path `{raw}` escapes the resource root"),
        })
        .collect::<Result<Vec<_>>>()?;

    if clean {
        super::clean::clean_project(config)?;
    }

    let mut engine = open_engine(config, Box::new(ManualChanges::new()), true)?;
    if retry {
        engine.request_full_scan();
    }
    for prefix in &prefixes {
        engine.invalidate_path(prefix);
    }
    let report = engine.update();

    debug!("pipeline"; "{} loaded", plural_count(engine.pipelines().len(), "pipeline"));
    log_report(&report);
    if report.scan.total() == 0 {
        log!("scan"; "no assets matched a pipeline in {}", config.project.resources.display());
    }

    if report.has_failures() {
        bail!("{} failed", plural_count(report.failed, "asset"));
    }
    Ok(())
}
