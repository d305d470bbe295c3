//! Asset cache: per-asset records, invalidation, cleanup and persistence.
//!
//! Records are keyed by resource name in a sorted map, so "every record
//! under a directory" is a contiguous range.

mod cleanup;
mod conflict;
mod persist;
mod record;

use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::ops::Bound;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::freshness::get_mtime;
use crate::pipeline::{Flavor, TransformerHierarchy};
use crate::utils::path::{is_under, to_file_path};

pub use cleanup::CleanupReport;
pub(crate) use cleanup::delete_output;
pub use conflict::{OutputConflict, detect_conflicts, print_conflicts};
pub use persist::{PipelineStamp, STATE_FILE, clear_state, persist_state, restore_state};
pub use record::{AssetRecord, AssetState};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot encode cache state: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Result of [`AssetCache::invalidate_outdated`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutdatedCount {
    pub removed: usize,
    pub invalidated: usize,
}

#[derive(Debug, Default)]
pub struct AssetCache {
    records: BTreeMap<String, AssetRecord>,
    dirty: bool,
}

impl AssetCache {
    #[cfg(test)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from persisted records, filling in names from the keys.
    pub fn from_records(records: BTreeMap<String, AssetRecord>) -> Self {
        let records = records
            .into_iter()
            .map(|(name, mut record)| {
                record.resource_name.clone_from(&name);
                (name, record)
            })
            .collect();
        Self {
            records,
            dirty: false,
        }
    }

    pub fn records(&self) -> &BTreeMap<String, AssetRecord> {
        &self.records
    }

    pub fn get(&self, name: &str) -> Option<&AssetRecord> {
        self.records.get(name)
    }

    /// Existing record or a fresh `Unknown` one.
    pub fn get_or_insert(&mut self, name: &str) -> &mut AssetRecord {
        self.dirty = true;
        self.records
            .entry(name.to_string())
            .or_insert_with(|| AssetRecord::new(name))
    }

    pub fn remove(&mut self, name: &str) -> Option<AssetRecord> {
        let record = self.records.remove(name)?;
        self.dirty = true;
        Some(record)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Records whose resource name is `path` or lies below it.
    pub fn records_under<'a>(&'a self, path: &'a str) -> impl Iterator<Item = &'a AssetRecord> {
        self.records
            .range::<str, _>((Bound::Included(path), Bound::Unbounded))
            .take_while(move |(name, _)| name.starts_with(path))
            .filter(move |(name, _)| is_under(name, path))
            .map(|(_, record)| record)
    }

    fn names_under(&self, path: &str) -> Vec<String> {
        self.records_under(path)
            .map(|r| r.resource_name.clone())
            .collect()
    }

    /// Apply `f` to every record under `path`; count records for which it
    /// returns `true`.
    fn update_under<F>(&mut self, path: &str, mut f: F) -> usize
    where
        F: FnMut(&mut AssetRecord) -> bool,
    {
        let mut count = 0;
        for name in self.names_under(path) {
            if let Some(record) = self.records.get_mut(&name)
                && f(record)
            {
                count += 1;
            }
        }
        if count > 0 {
            self.dirty = true;
        }
        count
    }

    /// Invalidate every record under `path`.
    pub fn invalidate_in_path(&mut self, path: &str) -> usize {
        self.update_under(path, |r| !r.removed && r.invalidate())
    }

    /// Invalidate records under `path` produced by any of `types`.
    pub fn invalidate_by_transformer(&mut self, path: &str, types: &BTreeSet<String>) -> usize {
        if types.is_empty() {
            return 0;
        }
        self.update_under(path, |r| !r.removed && r.uses_any_transformer(types) && r.invalidate())
    }

    /// Invalidate records under `path` whose applicable transformer set no
    /// longer matches what was applied.
    pub fn invalidate_applicable(
        &mut self,
        path: &str,
        hierarchy: &TransformerHierarchy,
        flavor: &Flavor,
    ) -> usize {
        self.update_under(path, |r| {
            if r.removed || r.modification_time.is_none() {
                return false;
            }
            let current = hierarchy.candidate_types(&r.resource_name, flavor);
            current != r.applied_transformers && r.invalidate()
        })
    }

    /// Flag a record whose source vanished.
    pub fn mark_removed(&mut self, name: &str) -> bool {
        match self.records.get_mut(name) {
            Some(record) if !record.removed => {
                record.removed = true;
                self.dirty = true;
                true
            }
            _ => false,
        }
    }

    /// Check records under `path` against the files below `root`: missing
    /// sources become Removed, moved mtimes become Invalid.
    pub fn invalidate_outdated(&mut self, path: &str, root: &Path) -> OutdatedCount {
        let mut count = OutdatedCount::default();
        for name in self.names_under(path) {
            let live = get_mtime(&to_file_path(root, &name));
            let Some(record) = self.records.get_mut(&name) else {
                continue;
            };
            if record.removed {
                continue;
            }
            match live {
                None => {
                    record.removed = true;
                    count.removed += 1;
                }
                Some(mtime) => {
                    if record.modification_time.is_some_and(|t| t != mtime) && record.invalidate() {
                        count.invalidated += 1;
                    }
                }
            }
        }
        if count.removed + count.invalidated > 0 {
            self.dirty = true;
        }
        count
    }

    /// Forget failure counts so suppressed assets are retried.
    pub fn reset_failures(&mut self) -> usize {
        let mut count = 0;
        for record in self.records.values_mut().filter(|r| r.failures > 0) {
            record.reset_failures();
            count += 1;
        }
        if count > 0 {
            self.dirty = true;
        }
        count
    }

    /// Names of Invalid records.
    pub fn invalid_names(&self) -> Vec<String> {
        self.records
            .values()
            .filter(|r| r.state() == AssetState::Invalid)
            .map(|r| r.resource_name.clone())
            .collect()
    }

    /// Any Invalid record still below the retry limit.
    pub fn has_pending_retries(&self, max_retries: u32) -> bool {
        self.records
            .values()
            .filter(|r| r.state() == AssetState::Invalid)
            .any(|r| r.should_retry(r.failed_time, max_retries))
    }

    /// Number of records per state.
    pub fn state_counts(&self) -> BTreeMap<AssetState, usize> {
        let mut counts = BTreeMap::new();
        for record in self.records.values() {
            *counts.entry(record.state()).or_insert(0) += 1;
        }
        counts
    }

    pub fn output_conflicts(&self) -> Vec<OutputConflict> {
        detect_conflicts(self.records.values())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::freshness::mtime::from_file_time;
    use std::fs;
    use tempfile::TempDir;

    pub(crate) fn types(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    pub(crate) fn valid(cache: &mut AssetCache, name: &str, applied: &[&str], outputs: &[&str]) {
        cache.get_or_insert(name).commit(
            outputs.iter().map(|s| s.to_string()).collect(),
            types(applied),
            100,
        );
    }

    pub(crate) fn touch(path: &Path, mtime: u64) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        if !path.exists() {
            fs::write(path, "data").unwrap();
        }
        let file = fs::File::options().write(true).open(path).unwrap();
        file.set_modified(from_file_time(mtime)).unwrap();
    }

    #[test]
    fn test_records_under_excludes_siblings() {
        let mut cache = AssetCache::new();
        for name in ["a", "a-b/x", "a/x", "a/y/z", "b/x"] {
            cache.get_or_insert(name);
        }

        let names: Vec<_> = cache.records_under("a").map(|r| r.resource_name.as_str()).collect();
        assert_eq!(names, vec!["a", "a/x", "a/y/z"]);
        assert_eq!(cache.records_under("").count(), 5);
    }

    #[test]
    fn test_invalidate_in_path() {
        let mut cache = AssetCache::new();
        valid(&mut cache, "ui/a.png", &["Texture"], &[]);
        valid(&mut cache, "ui/b.png", &["Texture"], &[]);
        valid(&mut cache, "models/c.fbx", &["Copy"], &[]);
        cache.mark_clean();

        assert_eq!(cache.invalidate_in_path("ui"), 2);
        assert_eq!(cache.invalidate_in_path("ui"), 0);
        assert!(cache.is_dirty());
        assert_eq!(cache.invalid_names(), vec!["ui/a.png", "ui/b.png"]);
    }

    #[test]
    fn test_invalidate_by_transformer_narrows() {
        let mut cache = AssetCache::new();
        valid(&mut cache, "a.png", &["Texture"], &[]);
        valid(&mut cache, "b.js", &["Minify"], &[]);
        valid(&mut cache, "c.png", &["Texture", "Copy"], &[]);

        assert_eq!(cache.invalidate_by_transformer("", &types(&["Texture"])), 2);
        assert_eq!(cache.get("b.js").unwrap().state(), AssetState::Valid);
        assert_eq!(cache.invalidate_by_transformer("", &BTreeSet::new()), 0);
    }

    #[test]
    fn test_invalidate_outdated() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        touch(&root.join("a.png"), 100);
        touch(&root.join("b.png"), 200);

        let mut cache = AssetCache::new();
        valid(&mut cache, "a.png", &["Copy"], &[]);
        valid(&mut cache, "b.png", &["Copy"], &[]);
        valid(&mut cache, "gone.png", &["Copy"], &[]);

        let count = cache.invalidate_outdated("", root);
        assert_eq!(count, OutdatedCount { removed: 1, invalidated: 1 });
        assert_eq!(cache.get("a.png").unwrap().state(), AssetState::Valid);
        assert_eq!(cache.get("b.png").unwrap().state(), AssetState::Invalid);
        assert_eq!(cache.get("gone.png").unwrap().state(), AssetState::Removed);
    }

    #[test]
    fn test_mark_removed_and_counts() {
        let mut cache = AssetCache::new();
        valid(&mut cache, "a.png", &["Copy"], &[]);
        cache.get_or_insert("b.png");

        assert!(cache.mark_removed("a.png"));
        assert!(!cache.mark_removed("a.png"));
        assert!(!cache.mark_removed("missing"));

        let counts = cache.state_counts();
        assert_eq!(counts.get(&AssetState::Removed), Some(&1));
        assert_eq!(counts.get(&AssetState::Unknown), Some(&1));
    }

    #[test]
    fn test_pending_retries_stop_at_limit() {
        let mut cache = AssetCache::new();
        valid(&mut cache, "a.png", &["Copy"], &[]);
        assert!(!cache.has_pending_retries(2));

        cache.get_or_insert("a.png").record_failure(Some(100));
        assert!(cache.has_pending_retries(2));

        cache.get_or_insert("a.png").record_failure(Some(100));
        assert!(!cache.has_pending_retries(2));
        assert!(cache.has_pending_retries(0));

        assert_eq!(cache.reset_failures(), 1);
        assert!(cache.has_pending_retries(2));
    }

    #[test]
    fn test_from_records_fills_names() {
        let mut records = BTreeMap::new();
        records.insert("a.png".to_string(), AssetRecord::default());
        let cache = AssetCache::from_records(records);
        assert_eq!(cache.get("a.png").unwrap().resource_name, "a.png");
        assert!(!cache.is_dirty());
    }
}
