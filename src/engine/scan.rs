//! Scanning: find stale assets under a path and queue them.

use std::ops::AddAssign;

use super::{Engine, ProcessingRequest};
use crate::debug;
use crate::freshness::get_mtime;
use crate::utils::path::{collect_files, to_file_path, to_resource_name};

/// Counters of one or more [`Engine::scan_path`] calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Requests queued.
    pub processed: usize,
    /// Files no transformer applies to.
    pub ignored: usize,
    pub up_to_date: usize,
    /// Records whose source vanished or no longer matches a transformer.
    pub removed: usize,
    /// Stale assets held back after repeated failures.
    pub suppressed: usize,
}

impl ScanStats {
    pub fn merge(&mut self, other: Self) {
        *self += other;
    }

    pub fn total(&self) -> usize {
        self.processed + self.ignored + self.up_to_date + self.suppressed
    }
}

impl AddAssign for ScanStats {
    fn add_assign(&mut self, other: Self) {
        self.processed += other.processed;
        self.ignored += other.ignored;
        self.up_to_date += other.up_to_date;
        self.removed += other.removed;
        self.suppressed += other.suppressed;
    }
}

impl Engine {
    /// Scan a file or directory (by resource name) and queue every asset
    /// that is not up to date.
    pub fn scan_path(&mut self, path: &str) -> ScanStats {
        let mut stats = ScanStats::default();
        let root = self.options.resource_root.clone();

        let outdated = self.cache.invalidate_outdated(path, &root);
        stats.removed += outdated.removed;

        for file in collect_files(&to_file_path(&root, path)) {
            let Some(name) = to_resource_name(&root, &file) else {
                continue;
            };
            if self.is_excluded(&name) || self.is_pipeline_file(&name) {
                continue;
            }

            let applicable = self.hierarchy.candidate_types(&name, &self.options.flavor);
            if applicable.is_empty() {
                stats.ignored += 1;
                if self.cache.mark_removed(&name) {
                    debug!("scan"; "{name} no longer matches a transformer");
                    stats.removed += 1;
                }
                continue;
            }

            let live = get_mtime(&file);
            let max_retries = self.options.max_retries;
            let record = self.cache.get_or_insert(&name);
            if record.is_up_to_date(live, &applicable) {
                stats.up_to_date += 1;
                continue;
            }
            if !record.should_retry(live, max_retries) {
                stats.suppressed += 1;
                continue;
            }

            let request = ProcessingRequest::new(name, self.options.flavor.clone());
            if self.queue.push(request) {
                stats.processed += 1;
            }
        }

        debug!(
            "scan";
            "`{path}`: {} queued, {} up to date, {} ignored, {} removed",
            stats.processed, stats.up_to_date, stats.ignored, stats.removed
        );
        stats
    }
}
