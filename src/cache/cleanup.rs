//! Cache directory cleanup.
//!
//! Two passes:
//! 1. [`AssetCache::cleanup`] drops Removed records and deletes their outputs.
//! 2. [`AssetCache::cleanup_cache_folder`] deletes files nobody claims
//!    (left over from earlier runs or crashed transformers).

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::Path;

use super::{AssetCache, AssetRecord};
use crate::log;
use crate::utils::path::{collect_files, remove_empty_dirs, to_file_path, to_resource_name};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub removed_records: usize,
    pub deleted_outputs: usize,
    /// Outputs of removed records kept because a live record claims them.
    pub refused_outputs: Vec<String>,
    pub orphans_deleted: usize,
    pub dirs_removed: usize,
}

impl CleanupReport {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn merge(&mut self, other: Self) {
        self.removed_records += other.removed_records;
        self.deleted_outputs += other.deleted_outputs;
        self.refused_outputs.extend(other.refused_outputs);
        self.orphans_deleted += other.orphans_deleted;
        self.dirs_removed += other.dirs_removed;
    }
}

/// Delete one output file; a file that is already gone counts as deleted.
pub(crate) fn delete_output(cache_dir: &Path, name: &str) -> bool {
    match fs::remove_file(to_file_path(cache_dir, name)) {
        Ok(()) => true,
        Err(e) if e.kind() == io::ErrorKind::NotFound => true,
        Err(e) => {
            log!("cache"; "cannot delete {name}: {e}");
            false
        }
    }
}

impl AssetCache {
    /// Drop Removed records and delete their outputs.
    ///
    /// An output still claimed by a remaining record is not deleted; that is
    /// a configuration error (two assets writing the same file) and is
    /// reported.
    pub fn cleanup(&mut self, cache_dir: &Path) -> CleanupReport {
        let mut report = CleanupReport::default();

        let removed: Vec<AssetRecord> = {
            let names: Vec<String> = self
                .records
                .values()
                .filter(|r| r.removed)
                .map(|r| r.resource_name.clone())
                .collect();
            names.iter().filter_map(|name| self.remove(name)).collect()
        };
        if removed.is_empty() {
            return report;
        }

        let claimed: BTreeSet<&str> = self
            .records
            .values()
            .flat_map(|r| r.outputs.iter().map(String::as_str))
            .collect();

        for record in &removed {
            for output in &record.outputs {
                if claimed.contains(output.as_str()) {
                    log!("conflict"; "{output} of removed {} is shared, not deleted", record.resource_name);
                    report.refused_outputs.push(output.clone());
                } else if delete_output(cache_dir, output) {
                    report.deleted_outputs += 1;
                }
            }
            crate::debug!("cache"; "dropped {}", record.resource_name);
        }
        report.removed_records = removed.len();
        report
    }

    /// Delete unclaimed files in the cache directory, then empty directories.
    pub fn cleanup_cache_folder(&self, cache_dir: &Path) -> CleanupReport {
        let mut report = CleanupReport::default();
        if !cache_dir.is_dir() {
            return report;
        }

        let claimed: BTreeSet<&str> = self
            .records
            .values()
            .flat_map(|r| r.outputs.iter().map(String::as_str))
            .collect();

        for path in collect_files(cache_dir) {
            let Some(name) = to_resource_name(cache_dir, &path) else {
                continue;
            };
            if claimed.contains(name.as_str()) {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => report.orphans_deleted += 1,
                Err(e) => log!("cache"; "cannot delete orphan {name}: {e}"),
            }
        }

        report.dirs_removed = remove_empty_dirs(cache_dir);
        report
    }
}
