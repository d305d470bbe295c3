//! The asset engine: one owner of pipelines, hierarchy, cache and queue.
//!
//! # Update cycle
//!
//! ```text
//! ChangeSource::poll
//!        │
//!        ▼
//! 1. reload pipelines ─► diff ─► invalidate ─► rebuild hierarchy
//! 2. updated paths (full scan | dirty paths + pipeline scopes + invalid)
//! 3. scan paths ─► RequestQueue
//! 4. drain queue on the rayon pool ─► commit records
//! 5. cleanup (first cycle, then every `cleanup_interval` cycles)
//! 6. persist state
//! 7. on_initialized callbacks (first cycle only)
//! ```
//!
//! `update(&mut self)` is the only entry point that mutates state, so a
//! cycle can never start while another is running.

mod executor;
mod queue;
mod scan;


use std::collections::{BTreeMap, BTreeSet};
use std::mem;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use crate::cache::{self, AssetCache, CleanupReport, PipelineStamp};
use crate::pipeline::{
    DocumentParser, Flavor, JsonDocumentParser, PipelineDiff, PipelineMap, TransformerHierarchy,
    enumerate_pipeline_files, load_all_descriptors,
};
use crate::transformer::TransformerRegistry;
use crate::utils::path::resource::extension;
use crate::utils::path::{
    collapse_nested, is_hidden, is_managed_output, is_under, normalize_path, to_resource_name,
};
use crate::utils::plural_count;
use crate::watcher::{ChangeKind, ChangeSource};
use crate::{debug, log};

pub use queue::{ProcessingRequest, RequestQueue};
pub use scan::ScanStats;

// =============================================================================
// Options & report
// =============================================================================

#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub resource_root: PathBuf,
    pub cache_dir: PathBuf,
    pub state_dir: PathBuf,
    /// Pipeline file extension, without the dot.
    pub pipeline_ext: String,
    pub flavor: Flavor,
    /// Worker threads; 0 uses the available parallelism.
    pub workers: usize,
    /// Consecutive failures before an asset waits for a source change.
    /// 0 retries forever.
    pub max_retries: u32,
    /// Cycles between cleanup passes; 0 cleans only on the first cycle.
    pub cleanup_interval: u32,
    pub show_progress: bool,
}

impl EngineOptions {
    pub fn new(
        resource_root: impl Into<PathBuf>,
        cache_dir: impl Into<PathBuf>,
        state_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            resource_root: resource_root.into(),
            cache_dir: cache_dir.into(),
            state_dir: state_dir.into(),
            pipeline_ext: "assetpipeline".to_string(),
            flavor: Flavor::default(),
            workers: 0,
            max_retries: 3,
            cleanup_interval: 16,
            show_progress: false,
        }
    }
}

/// What one [`Engine::update`] did.
#[derive(Debug, Clone, Default)]
pub struct UpdateReport {
    /// Pipeline files in the diff of this cycle.
    pub pipeline_changes: usize,
    pub scanned_paths: usize,
    pub scan: ScanStats,
    pub processed: usize,
    pub failed: usize,
    pub cleanup: Option<CleanupReport>,
    pub persisted: bool,
    pub duration: Duration,
}

impl UpdateReport {
    /// Nothing was processed, removed or cleaned.
    pub fn is_idle(&self) -> bool {
        self.processed == 0
            && self.failed == 0
            && self.scan.removed == 0
            && self.pipeline_changes == 0
            && self.cleanup.as_ref().is_none_or(CleanupReport::is_empty)
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    /// `3 processed, 1 failed, 2 removed in 12ms`
    pub fn summary(&self) -> String {
        let mut parts = vec![format!("{} processed", self.processed)];
        if self.failed > 0 {
            parts.push(format!("{} failed", self.failed));
        }
        if self.scan.removed > 0 {
            parts.push(format!("{} removed", self.scan.removed));
        }
        if self.scan.suppressed > 0 {
            parts.push(format!("{} suppressed", self.scan.suppressed));
        }
        if self.pipeline_changes > 0 {
            parts.push(plural_count(self.pipeline_changes, "pipeline change"));
        }
        format!("{} in {}ms", parts.join(", "), self.duration.as_millis())
    }
}

type InitCallback = Box<dyn FnOnce(&UpdateReport) + Send>;

// =============================================================================
// Engine
// =============================================================================

pub struct Engine {
    options: EngineOptions,
    registry: TransformerRegistry,
    parser: Box<dyn DocumentParser>,
    changes: Box<dyn ChangeSource>,
    pool: rayon::ThreadPool,

    pipelines: PipelineMap,
    /// Stamps from the previous run, consumed by the first pipeline load.
    persisted_pipelines: BTreeMap<String, PipelineStamp>,
    hierarchy: TransformerHierarchy,
    cache: AssetCache,
    queue: RequestQueue,

    /// Resource names to rescan next cycle.
    pending_paths: BTreeSet<String>,
    /// Resource names of the cache and state directories when they lie
    /// inside the resource root.
    excluded_dirs: Vec<String>,
    /// Pipeline stamps differ from the last persisted state.
    pipelines_dirty: bool,
    initialized: bool,
    reload_pipelines: bool,
    scan_all: bool,
    cycle: u64,
    on_initialized: Vec<InitCallback>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("resource_root", &self.options.resource_root)
            .field("pipelines", &self.pipelines.len())
            .field("records", &self.cache.len())
            .field("cycle", &self.cycle)
            .finish()
    }
}

impl Engine {
    /// Create an engine and restore the persisted state of a previous run.
    ///
    /// Nothing is scanned until the first [`Engine::update`].
    pub fn new(
        mut options: EngineOptions,
        registry: TransformerRegistry,
        changes: Box<dyn ChangeSource>,
    ) -> Result<Self> {
        options.resource_root = normalize_path(&options.resource_root);
        options.cache_dir = normalize_path(&options.cache_dir);
        options.state_dir = normalize_path(&options.state_dir);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(options.workers)
            .thread_name(|i| format!("assetmill-worker-{i}"))
            .build()
            .context("failed to create worker pool")?;

        let excluded_dirs = [&options.cache_dir, &options.state_dir]
            .into_iter()
            .filter_map(|dir| to_resource_name(&options.resource_root, dir))
            .filter(|name| !name.is_empty())
            .collect();

        let state = cache::restore_state(&options.state_dir);
        let cache = AssetCache::from_records(state.assets);

        Ok(Self {
            options,
            registry,
            parser: Box::new(JsonDocumentParser),
            changes,
            pool,
            pipelines: PipelineMap::new(),
            persisted_pipelines: state.pipelines,
            hierarchy: TransformerHierarchy::default(),
            cache,
            queue: RequestQueue::new(),
            pending_paths: BTreeSet::new(),
            excluded_dirs,
            pipelines_dirty: true,
            initialized: false,
            reload_pipelines: true,
            scan_all: true,
            cycle: 0,
            on_initialized: Vec::new(),
        })
    }

    /// Replace the pipeline document parser.
    #[cfg(test)]
    pub fn with_parser(mut self, parser: Box<dyn DocumentParser>) -> Self {
        self.parser = parser;
        self
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn cache(&self) -> &AssetCache {
        &self.cache
    }

    pub fn pipelines(&self) -> &PipelineMap {
        &self.pipelines
    }

    #[cfg(test)]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Invalid records that the next cycle would try again. Suppressed
    /// ones wait for a source change instead.
    pub fn has_pending_retries(&self) -> bool {
        self.cache.has_pending_retries(self.options.max_retries)
    }

    // =========================================================================
    // Requests from outside the cycle
    // =========================================================================

    /// Rescan everything next cycle, retrying suppressed failures.
    pub fn request_full_scan(&mut self) {
        self.scan_all = true;
        self.reload_pipelines = true;
        self.cache.reset_failures();
    }

    /// Force reprocessing of everything under `path` next cycle.
    pub fn invalidate_path(&mut self, path: &str) {
        let count = self.cache.invalidate_in_path(path);
        debug!("cache"; "invalidated {count} under `{path}`");
        self.pending_paths.insert(path.to_string());
    }

    /// Run `callback` once the first cycle has completed. Runs it right
    /// away with an empty report when that already happened.
    pub fn on_initialized<F>(&mut self, callback: F)
    where
        F: FnOnce(&UpdateReport) + Send + 'static,
    {
        if self.initialized {
            callback(&UpdateReport::default());
        } else {
            self.on_initialized.push(Box::new(callback));
        }
    }

    // =========================================================================
    // Update cycle
    // =========================================================================

    /// Run one update cycle. Failures are logged and counted, never returned.
    pub fn update(&mut self) -> UpdateReport {
        let start = Instant::now();
        let mut report = UpdateReport::default();

        let changes = self.changes.poll();
        for (path, kind) in changes {
            self.absorb_change(&path, kind);
        }

        if self.reload_pipelines {
            report.pipeline_changes = self.update_pipelines();
        }

        let paths = self.updated_paths();
        report.scanned_paths = paths.len();
        for path in &paths {
            report.scan.merge(self.scan_path(path));
        }

        let drained = self.drain_queue();
        report.processed = drained.processed;
        report.failed = drained.failed;
        report.scan.removed += drained.missing;

        if self.cleanup_due() {
            report.cleanup = Some(self.cleanup());
        }

        report.persisted = self.persist();
        report.duration = start.elapsed();
        self.cycle += 1;

        if !self.initialized {
            self.initialized = true;
            for callback in mem::take(&mut self.on_initialized) {
                callback(&report);
            }
        }
        report
    }

    /// Write the state file if the cache changed. Returns `true` if written.
    pub fn persist(&mut self) -> bool {
        if !self.cache.is_dirty() && !self.pipelines_dirty {
            return false;
        }
        match cache::persist_state(&self.options.state_dir, &self.cache, &self.pipelines) {
            Ok(written) => {
                self.cache.mark_clean();
                self.pipelines_dirty = false;
                written
            }
            Err(e) => {
                log!("cache"; "{e}");
                false
            }
        }
    }

    /// Route one watcher change: pipeline files trigger a reload, other
    /// resources a rescan of their path.
    fn absorb_change(&mut self, path: &Path, kind: ChangeKind) {
        let Some(name) = to_resource_name(&self.options.resource_root, path) else {
            return;
        };
        if self.is_excluded(&name) {
            return;
        }
        if self.is_pipeline_file(&name) {
            debug!("watch"; "pipeline {}: {name}", kind.label());
            self.reload_pipelines = true;
            return;
        }
        debug!("watch"; "{}: {name}", kind.label());
        self.pending_paths.insert(name);
    }

    fn is_pipeline_file(&self, name: &str) -> bool {
        extension(name).as_deref() == Some(self.options.pipeline_ext.as_str())
    }

    /// Outputs, hidden paths and engine-owned directories are never assets.
    fn is_excluded(&self, name: &str) -> bool {
        is_managed_output(name)
            || is_hidden(name)
            || self.excluded_dirs.iter().any(|dir| is_under(name, dir))
    }

    /// Reload pipeline files, diff against the previous load, invalidate and
    /// rebuild the hierarchy. Returns the diff size.
    fn update_pipelines(&mut self) -> usize {
        self.reload_pipelines = false;
        let root = &self.options.resource_root;
        let files = enumerate_pipeline_files(root, &self.options.pipeline_ext);
        let loaded = load_all_descriptors(
            root,
            &files,
            &self.pipelines,
            &self.registry,
            self.parser.as_ref(),
        );

        if !self.initialized {
            let changed = self.invalidate_against_persisted(&loaded);
            self.pipelines = loaded;
            self.hierarchy = TransformerHierarchy::rebuild(&self.pipelines);
            debug!("pipeline"; "loaded {}", plural_count(self.pipelines.len(), "pipeline"));
            return changed;
        }

        let diff = PipelineDiff::compute(&self.pipelines, &loaded);
        if diff.is_empty() {
            self.pipelines = loaded;
            return 0;
        }
        self.pipelines_dirty = true;

        for (name, entry) in diff.iter() {
            let scope = entry.scope();
            let count = self.cache.invalidate_by_transformer(scope, &entry.affected_types);
            debug!("pipeline"; "{name} {}: {count} invalidated in `{scope}`", entry.label());
        }

        self.pipelines = loaded;
        self.hierarchy = TransformerHierarchy::rebuild(&self.pipelines);

        let flavor = self.options.flavor.clone();
        for scope in diff.scopes() {
            self.cache.invalidate_applicable(&scope, &self.hierarchy, &flavor);
            self.pending_paths.insert(scope);
        }
        log!("pipeline"; "{} changed", plural_count(diff.len(), "pipeline"));
        diff.len()
    }

    /// First load: compare against the stamps of the previous run. A scope
    /// whose pipeline (or one of its imports) changed is invalidated as a
    /// whole, since the previous declarations are gone.
    fn invalidate_against_persisted(&mut self, loaded: &PipelineMap) -> usize {
        let persisted = mem::take(&mut self.persisted_pipelines);
        if persisted.is_empty() {
            // Cold start: the full scan decides everything.
            return 0;
        }

        let mut changed: BTreeSet<String> = loaded
            .iter()
            .filter(|(name, desc)| persisted.get(*name).is_none_or(|stamp| !stamp.matches(desc)))
            .map(|(name, _)| name.clone())
            .collect();
        let vanished: Vec<&String> = persisted.keys().filter(|n| !loaded.contains_key(*n)).collect();

        // Importers of a changed pipeline inherit the change.
        loop {
            let before = changed.len();
            for (name, desc) in loaded {
                if desc.dependencies.iter().any(|d| changed.contains(d) || vanished.contains(&d)) {
                    changed.insert(name.clone());
                }
            }
            if changed.len() == before {
                break;
            }
        }

        let mut scopes: Vec<String> = changed
            .iter()
            .filter_map(|name| loaded.get(name))
            .map(|desc| desc.scope().to_string())
            .collect();
        scopes.extend(vanished.iter().map(|name| crate::utils::path::parent_dir(name).to_string()));

        for scope in collapse_nested(&scopes) {
            let count = self.cache.invalidate_in_path(&scope);
            if count > 0 {
                log!("pipeline"; "pipelines changed since last run, {} invalidated in `{scope}`", count);
            }
        }
        changed.len() + vanished.len()
    }

    /// Paths to scan this cycle, with nested paths collapsed.
    fn updated_paths(&mut self) -> Vec<String> {
        let mut paths = mem::take(&mut self.pending_paths);
        if mem::take(&mut self.scan_all) {
            return vec![String::new()];
        }
        paths.extend(self.cache.invalid_names());
        collapse_nested(&paths)
    }

    fn cleanup_due(&self) -> bool {
        let interval = u64::from(self.options.cleanup_interval);
        self.cycle == 0 || (interval > 0 && self.cycle % interval == 0)
    }

    fn cleanup(&mut self) -> CleanupReport {
        let cache_dir = &self.options.cache_dir;
        let mut report = self.cache.cleanup(cache_dir);
        report.merge(self.cache.cleanup_cache_folder(cache_dir));

        if report.removed_records + report.orphans_deleted > 0 {
            log!(
                "cache";
                "dropped {}, deleted {}",
                plural_count(report.removed_records, "record"),
                plural_count(report.deleted_outputs + report.orphans_deleted, "file")
            );
        }
        cache::print_conflicts(&self.cache.output_conflicts());
        report
    }
}
