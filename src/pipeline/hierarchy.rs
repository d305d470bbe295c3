//! Directory-indexed effective transformer lists.
//!
//! ```text
//! main.assetpipeline          [Texture(A)]
//! ui/main.assetpipeline       [Texture(B), Minify]
//!
//! node ""    → [Texture(A)]
//! node "ui"  → [Texture(B), Minify]     Texture(B) shadows Texture(A)
//! ```
//!
//! The hierarchy is rebuilt from scratch whenever any pipeline changes.

use std::collections::{BTreeMap, BTreeSet};

use rustc_hash::FxHashSet;

use super::loader::PipelineMap;
use super::{Flavor, TransformerEntry};
use crate::log;
use crate::utils::path::parent_dir;
use crate::utils::path::resource::ancestors;

#[derive(Debug, Clone, Default)]
pub struct TransformerHierarchy {
    /// Directory → effective transformers, in execution order.
    nodes: BTreeMap<String, Vec<TransformerEntry>>,
}

impl TransformerHierarchy {
    /// Build the hierarchy for a complete pipeline set.
    pub fn rebuild(pipelines: &PipelineMap) -> Self {
        // 1. Effective list per pipeline (imports first, then own entries).
        let mut resolved: BTreeMap<String, Vec<TransformerEntry>> = BTreeMap::new();
        for name in pipelines.keys() {
            let mut visiting = FxHashSet::default();
            resolve(name, pipelines, &mut resolved, &mut visiting);
        }

        // 2. Merge pipelines sharing a scope, in name order.
        let mut scoped: BTreeMap<String, Vec<TransformerEntry>> = BTreeMap::new();
        for (name, desc) in pipelines {
            let list = scoped.entry(desc.scope().to_string()).or_default();
            if let Some(entries) = resolved.get(name) {
                merge(list, entries);
            }
        }

        // 3. Inherit from the nearest ancestor node, root to leaf.
        let mut nodes: BTreeMap<String, Vec<TransformerEntry>> = BTreeMap::new();
        for (scope, own) in scoped {
            let mut list = ancestors(&scope)
                .skip(1)
                .find_map(|dir| nodes.get(dir))
                .cloned()
                .unwrap_or_default();
            merge(&mut list, &own);
            nodes.insert(scope, list);
        }

        Self { nodes }
    }

    /// Effective transformers for an asset: those of the deepest node whose
    /// directory contains it.
    pub fn applicable_transformers(&self, resource_name: &str) -> &[TransformerEntry] {
        ancestors(parent_dir(resource_name))
            .find_map(|dir| self.nodes.get(dir))
            .map_or(&[], Vec::as_slice)
    }

    /// Applicable transformers that accept this asset under `flavor`.
    pub fn candidates(&self, resource_name: &str, flavor: &Flavor) -> Vec<&TransformerEntry> {
        self.applicable_transformers(resource_name)
            .iter()
            .filter(|e| e.matches_flavor(flavor) && e.matches_resource(resource_name))
            .collect()
    }

    /// Type names of [`Self::candidates`].
    pub fn candidate_types(&self, resource_name: &str, flavor: &Flavor) -> BTreeSet<String> {
        self.candidates(resource_name, flavor)
            .into_iter()
            .map(|e| e.type_name.clone())
            .collect()
    }
}

/// Append `entries`; an entry replaces any existing entry of the same type.
fn merge(list: &mut Vec<TransformerEntry>, entries: &[TransformerEntry]) {
    for entry in entries {
        list.retain(|e| e.type_name != entry.type_name);
        list.push(entry.clone());
    }
}

fn resolve(
    name: &str,
    pipelines: &PipelineMap,
    resolved: &mut BTreeMap<String, Vec<TransformerEntry>>,
    visiting: &mut FxHashSet<String>,
) {
    if resolved.contains_key(name) {
        return;
    }
    let Some(desc) = pipelines.get(name) else {
        return;
    };
    visiting.insert(name.to_string());

    let mut list = Vec::new();
    for dep in &desc.dependencies {
        if visiting.contains(dep) {
            log!("pipeline"; "dependency cycle: {name} → {dep}, import ignored");
            continue;
        }
        if !pipelines.contains_key(dep) {
            log!("pipeline"; "{name}: missing dependency {dep}");
            continue;
        }
        resolve(dep, pipelines, resolved, visiting);
        if let Some(imported) = resolved.get(dep) {
            merge(&mut list, imported);
        }
    }
    merge(&mut list, &desc.transformers);

    visiting.remove(name);
    resolved.insert(name.to_string(), list);
}
