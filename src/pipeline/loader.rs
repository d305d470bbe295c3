//! Pipeline discovery and loading.
//!
//! Loading never fails as a whole: a broken declaration is logged and
//! skipped, a broken file yields an empty descriptor.

use std::collections::BTreeMap;
use std::path::Path;

use regex::Regex;

use super::document::DocumentParser;
use super::{PipelineDescriptor, PipelineError, TransformerEntry};
use crate::freshness::{FileTime, fingerprint, get_mtime, hash_bytes};
use crate::transformer::TransformerRegistry;
use crate::utils::path::resource::{extension, join, normalize_name};
use crate::utils::path::{collect_files, is_managed_output, parent_dir, to_file_path, to_resource_name};
use crate::log;

/// Pipeline file resource name → modification time, sorted by name.
pub type PipelineFileList = BTreeMap<String, FileTime>;

/// Loaded descriptors keyed by pipeline resource name.
pub type PipelineMap = BTreeMap<String, PipelineDescriptor>;

/// List every pipeline file (`*.<ext>`) under `root`.
///
/// Hidden entries and managed output directories are skipped.
pub fn enumerate_pipeline_files(root: &Path, pipeline_ext: &str) -> PipelineFileList {
    collect_files(root)
        .into_iter()
        .filter_map(|path| {
            let name = to_resource_name(root, &path)?;
            if is_managed_output(&name) || extension(&name).as_deref() != Some(pipeline_ext) {
                return None;
            }
            let mtime = get_mtime(&path)?;
            Some((name, mtime))
        })
        .collect()
}

/// Build a descriptor from raw file content.
pub fn load_descriptor(
    bytes: &[u8],
    resource_name: &str,
    modification_time: FileTime,
    registry: &TransformerRegistry,
    parser: &dyn DocumentParser,
) -> PipelineDescriptor {
    let document = match parser.parse(bytes) {
        Ok(document) => document,
        Err(e) => {
            log!("pipeline"; "{resource_name}: {e}");
            return PipelineDescriptor::empty(resource_name, modification_time, hash_bytes(bytes));
        }
    };

    let mut transformers = Vec::with_capacity(document.transformers.len());
    for decl in &document.transformers {
        match resolve_entry(decl, resource_name, registry) {
            Ok(entry) => transformers.push(entry),
            Err(e) => log!("pipeline"; "{resource_name}: skipping `{}`: {e}", decl.type_name),
        }
    }

    let scope = parent_dir(resource_name);
    let mut dependencies: Vec<String> = Vec::with_capacity(document.dependencies.len());
    for raw in &document.dependencies {
        match resolve_dependency(scope, raw) {
            Some(dep) if dep == resource_name => {
                log!("pipeline"; "{resource_name}: ignoring dependency on itself");
            }
            Some(dep) => {
                if !dependencies.contains(&dep) {
                    dependencies.push(dep);
                }
            }
            None => {
                let e = PipelineError::InvalidDependency(raw.clone());
                log!("pipeline"; "{resource_name}: {e}");
            }
        }
    }

    let fingerprint = fingerprint(&(&document.transformers, &dependencies));
    PipelineDescriptor {
        resource_name: resource_name.to_string(),
        modification_time,
        transformers,
        dependencies,
        fingerprint,
    }
}

fn resolve_entry(
    decl: &super::document::TransformerDecl,
    origin: &str,
    registry: &TransformerRegistry,
) -> Result<TransformerEntry, PipelineError> {
    let instance = registry.create(&decl.type_name, &decl.config)?;
    let pattern = decl
        .pattern
        .as_deref()
        .map(|p| {
            Regex::new(p).map_err(|source| PipelineError::InvalidPattern {
                pattern: p.to_string(),
                source,
            })
        })
        .transpose()?;

    Ok(TransformerEntry {
        type_name: decl.type_name.clone(),
        flavor: decl.flavor.trim().to_ascii_lowercase(),
        extensions: decl
            .extensions
            .iter()
            .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
            .collect(),
        pattern,
        fingerprint: fingerprint(decl),
        instance,
        origin: origin.to_string(),
    })
}

/// `/x` is rooted at the resource root; anything else is relative to `scope`.
fn resolve_dependency(scope: &str, raw: &str) -> Option<String> {
    let raw = raw.trim();
    let joined = match raw.strip_prefix('/') {
        Some(rooted) => rooted.to_string(),
        None => join(scope, raw),
    };
    normalize_name(&joined).filter(|name| !name.is_empty())
}

/// Load every file in `files`.
///
/// Descriptors in `previous` whose modification time is unchanged are
/// reused without touching the disk.
pub fn load_all_descriptors(
    root: &Path,
    files: &PipelineFileList,
    previous: &PipelineMap,
    registry: &TransformerRegistry,
    parser: &dyn DocumentParser,
) -> PipelineMap {
    files
        .iter()
        .map(|(name, &mtime)| {
            if let Some(old) = previous.get(name)
                && old.modification_time == mtime
            {
                return (name.clone(), old.clone());
            }

            let path = to_file_path(root, name);
            let descriptor = match std::fs::read(&path) {
                Ok(bytes) => load_descriptor(&bytes, name, mtime, registry, parser),
                Err(source) => {
                    let e = PipelineError::Io { path, source };
                    log!("pipeline"; "{e}");
                    PipelineDescriptor::empty(name, mtime, hash_bytes(&[]))
                }
            };
            (name.clone(), descriptor)
        })
        .collect()
}
