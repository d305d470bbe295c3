//! Processing: run candidate transformers for queued assets in parallel,
//! then commit the results on the engine's thread.

use std::collections::BTreeSet;
use std::path::Path;

use rayon::prelude::*;

use super::{Engine, ProcessingRequest};
use crate::cache::delete_output;
use crate::freshness::{FileTime, get_mtime};
use crate::logger::ProgressLine;
use crate::pipeline::TransformerEntry;
use crate::transformer::{TransformError, TransformInput, TransformOutput};
use crate::utils::path::to_file_path;
use crate::{debug, log};

/// Counters of one queue drain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainStats {
    pub processed: usize,
    pub failed: usize,
    /// Sources that vanished before they could be processed.
    pub missing: usize,
}

/// Result of processing one asset, produced on a worker thread.
#[derive(Debug)]
pub(super) enum Outcome {
    Done {
        outputs: Vec<String>,
        applied: BTreeSet<String>,
        mtime: FileTime,
    },
    Failed {
        error: TransformError,
        /// `Type` from `pipeline` that failed.
        culprit: String,
        mtime: FileTime,
    },
    Missing,
}

/// Run `entries` in order on one asset, stopping at the first error.
///
/// The source mtime is sampled before running, so a file edited during
/// processing is seen as stale on the next cycle.
pub(super) fn process_one(
    request: &ProcessingRequest,
    entries: &[TransformerEntry],
    resource_root: &Path,
    cache_dir: &Path,
) -> Outcome {
    let input_file = to_file_path(resource_root, &request.resource_name);
    let Some(mtime) = get_mtime(&input_file) else {
        return Outcome::Missing;
    };

    let input = TransformInput {
        resource_name: &request.resource_name,
        input_file: &input_file,
        cache_dir,
        flavor: &request.flavor,
    };
    let mut output = TransformOutput::new(cache_dir);
    let mut applied = BTreeSet::new();

    for entry in entries {
        if let Err(error) = entry.instance.execute(&input, &mut output) {
            let culprit = format!("{} from {}", entry.type_name, entry.origin);
            return Outcome::Failed {
                error,
                culprit,
                mtime,
            };
        }
        debug!("process"; "{} {}", entry.type_name, request.resource_name);
        applied.insert(entry.type_name.clone());
    }

    Outcome::Done {
        outputs: output.into_outputs(),
        applied,
        mtime,
    }
}

impl Engine {
    /// Process every queued request and commit the results.
    pub(super) fn drain_queue(&mut self) -> DrainStats {
        let batch = self.queue.take_batch();
        if batch.is_empty() {
            return DrainStats::default();
        }

        let jobs: Vec<(ProcessingRequest, Vec<TransformerEntry>)> = batch
            .into_iter()
            .map(|request| {
                let entries = self
                    .hierarchy
                    .candidates(&request.resource_name, &request.flavor)
                    .into_iter()
                    .cloned()
                    .collect();
                (request, entries)
            })
            .collect();

        let progress = self
            .options
            .show_progress
            .then(|| ProgressLine::new(&[("assets", jobs.len())]));
        let in_flight = self.queue.in_flight();
        let resource_root = &self.options.resource_root;
        let cache_dir = &self.options.cache_dir;

        let outcomes: Vec<(String, Outcome)> = self.pool.install(|| {
            jobs.par_iter()
                .map(|(request, entries)| {
                    let outcome = process_one(request, entries, resource_root, cache_dir);
                    in_flight.remove(&request.resource_name);
                    if let Some(progress) = &progress {
                        progress.inc("assets");
                    }
                    (request.resource_name.clone(), outcome)
                })
                .collect()
        });

        if let Some(progress) = progress {
            progress.finish();
        }

        let mut stats = DrainStats::default();
        for (name, outcome) in outcomes {
            self.commit(&name, outcome, &mut stats);
        }
        stats
    }

    fn commit(&mut self, name: &str, outcome: Outcome, stats: &mut DrainStats) {
        match outcome {
            Outcome::Done {
                outputs,
                applied,
                mtime,
            } => {
                let stale = self.cache.get_or_insert(name).commit(outputs, applied, mtime);
                for output in stale {
                    let shared = self
                        .cache
                        .records()
                        .values()
                        .any(|r| r.resource_name != name && !r.removed && r.outputs.contains(&output));
                    if !shared {
                        delete_output(&self.options.cache_dir, &output);
                    }
                }
                debug!("process"; "{name} -> {}", self.cache.get(name).map_or(0, |r| r.outputs.len()));
                stats.processed += 1;
            }
            Outcome::Failed {
                error,
                culprit,
                mtime,
            } => {
                log!("error"; "{name}: {culprit}: {error}");
                self.cache.get_or_insert(name).record_failure(Some(mtime));
                stats.failed += 1;
            }
            Outcome::Missing => {
                if self.cache.mark_removed(name) {
                    debug!("process"; "{name} vanished before processing");
                }
                stats.missing += 1;
            }
        }
    }
}
