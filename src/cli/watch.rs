//! `watch`: initial build, then an update whenever the resource tree changes.
//!
//! ```text
//! NotifyWatcher::poll ──► ManualChanges handle ──► Engine::update
//!        ▲                                              │
//!        └──────────── sleep poll_ms ◄──────────────────┘
//! ```
//!
//! Without filesystem changes a cycle still runs when failed assets are
//! waiting for a retry (`retry_ms` after the last cycle) and for the
//! periodic full rescan (`rescan_secs`).

use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use super::common::{log_report, open_engine};
use crate::config::ProjectConfig;
use crate::core::is_shutdown;
use crate::engine::UpdateReport;
use crate::logger::{status_detach, status_error, status_success, status_unchanged};
use crate::utils::plural_count;
use crate::watcher::{ChangeSource, ManualChanges, NotifyWatcher};
use crate::{debug, log};

/// Why a cycle runs although the watcher reported nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IdleCycle {
    Rescan,
    Retry,
}

/// Decide whether an idle poll should still run a cycle.
fn idle_cycle_due(
    since_cycle: Duration,
    since_rescan: Duration,
    pending_retries: bool,
    retry_interval: Duration,
    rescan_interval: Option<Duration>,
) -> Option<IdleCycle> {
    if rescan_interval.is_some_and(|every| since_rescan >= every) {
        Some(IdleCycle::Rescan)
    } else if pending_retries && since_cycle >= retry_interval {
        Some(IdleCycle::Retry)
    } else {
        None
    }
}

pub fn watch_project(config: &ProjectConfig) -> Result<()> {
    let resources = &config.project.resources;
    let mut watcher = NotifyWatcher::new(resources, config.debounce())
        .with_context(|| format!("cannot watch {}", resources.display()))?;

    let changes = ManualChanges::new();
    let mut engine = open_engine(config, Box::new(changes.clone()), true)?;
    log_report(&engine.update());
    log!("watch"; "watching {} (Ctrl+C to stop)", resources.display());

    let mut last_cycle = Instant::now();
    let mut last_rescan = Instant::now();

    while !is_shutdown() {
        let batch = watcher.poll();
        let idle = if batch.is_empty() {
            let due = idle_cycle_due(
                last_cycle.elapsed(),
                last_rescan.elapsed(),
                engine.has_pending_retries(),
                config.retry_interval(),
                config.rescan_interval(),
            );
            let Some(due) = due else {
                let wait = watcher.sleep_duration().unwrap_or(config.poll_interval());
                std::thread::sleep(wait.min(config.poll_interval()));
                continue;
            };
            Some(due)
        } else {
            debug!("watch"; "{}", plural_count(batch.len(), "change"));
            for (path, kind) in batch {
                changes.push(&path, kind);
            }
            None
        };

        if idle == Some(IdleCycle::Rescan) {
            debug!("watch"; "periodic rescan");
            engine.request_full_scan();
            last_rescan = Instant::now();
        } else if idle == Some(IdleCycle::Retry) {
            debug!("watch"; "retrying failed assets");
        }

        let report = engine.update();
        last_cycle = Instant::now();
        show_status(&report);
    }

    if engine.persist() {
        log!("cache"; "state saved");
    }
    Ok(())
}

fn show_status(report: &UpdateReport) {
    if report.has_failures() {
        // executor errors were logged above the status line
        status_detach();
        status_error(&format!("{} failed", plural_count(report.failed, "asset")), "");
    } else if report.is_idle() {
        status_unchanged("no asset changes");
    } else {
        status_success(&report.summary());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEC: Duration = Duration::from_secs(1);

    #[test]
    fn test_idle_cycle_retry_waits_for_interval() {
        let retry = 2 * SEC;
        assert_eq!(idle_cycle_due(SEC, SEC, true, retry, None), None);
        assert_eq!(idle_cycle_due(3 * SEC, SEC, true, retry, None), Some(IdleCycle::Retry));
        assert_eq!(idle_cycle_due(3 * SEC, SEC, false, retry, None), None);
    }

    #[test]
    fn test_idle_cycle_rescan_takes_precedence() {
        let rescan = Some(60 * SEC);
        assert_eq!(idle_cycle_due(SEC, 30 * SEC, false, SEC, rescan), None);
        assert_eq!(
            idle_cycle_due(5 * SEC, 61 * SEC, true, SEC, rescan),
            Some(IdleCycle::Rescan)
        );
        assert_eq!(idle_cycle_due(SEC, 61 * SEC, false, SEC, None), None);
    }
}
