//! Structural comparison of two pipeline sets.
//!
//! ```text
//! old: {a, b, c}        new: {b', c, d}        (b' = b with a new mtime)
//!
//! diff: a → (a, -)      removed
//!       b → (b, b')     changed
//!       d → (-, d)      added
//!       + every pipeline importing a, b or d, directly or transitively
//! ```

use std::collections::{BTreeMap, BTreeSet};

use rustc_hash::FxHashSet;

use super::loader::PipelineMap;
use super::PipelineDescriptor;

/// Old and new state of one pipeline file.
#[derive(Debug, Clone, Default)]
pub struct PipelineDiffEntry {
    pub old: Option<PipelineDescriptor>,
    pub new: Option<PipelineDescriptor>,
    /// Transformer types whose effective configuration may differ for
    /// assets in this pipeline's scope (own changes plus imported ones).
    pub affected_types: BTreeSet<String>,
}

impl PipelineDiffEntry {
    /// Directory the pipeline applies to.
    pub fn scope(&self) -> &str {
        self.new
            .as_ref()
            .or(self.old.as_ref())
            .map_or("", PipelineDescriptor::scope)
    }

    pub fn is_added(&self) -> bool {
        self.old.is_none() && self.new.is_some()
    }

    pub fn is_removed(&self) -> bool {
        self.old.is_some() && self.new.is_none()
    }

    pub fn label(&self) -> &'static str {
        if self.is_added() {
            "added"
        } else if self.is_removed() {
            "removed"
        } else {
            "changed"
        }
    }

    /// Types whose declaration fingerprint differs between old and new,
    /// including types present on one side only.
    pub fn changed_transformer_types(&self) -> BTreeSet<String> {
        let fingerprints = |desc: Option<&PipelineDescriptor>| -> BTreeMap<String, _> {
            desc.into_iter()
                .flat_map(|d| d.transformers.iter())
                .map(|e| (e.type_name.clone(), e.fingerprint))
                .collect()
        };
        let old = fingerprints(self.old.as_ref());
        let new = fingerprints(self.new.as_ref());

        old.keys()
            .chain(new.keys())
            .filter(|ty| old.get(*ty) != new.get(*ty))
            .cloned()
            .collect()
    }

    fn dependencies(&self) -> impl Iterator<Item = &String> {
        self.old
            .iter()
            .chain(self.new.iter())
            .flat_map(|d| d.dependencies.iter())
    }

    fn dependencies_changed(&self) -> bool {
        match (&self.old, &self.new) {
            (Some(old), Some(new)) => old.dependencies != new.dependencies,
            _ => true,
        }
    }
}

/// Pipeline resource name → old/new pair, for every pipeline that changed.
#[derive(Debug, Clone, Default)]
pub struct PipelineDiff {
    entries: BTreeMap<String, PipelineDiffEntry>,
}

impl PipelineDiff {
    /// Compare two pipeline sets.
    ///
    /// A pipeline is changed when its modification time or its content
    /// fingerprint differs. Pipelines that import a changed pipeline are
    /// included too.
    pub fn compute(old: &PipelineMap, new: &PipelineMap) -> Self {
        let mut entries: BTreeMap<String, PipelineDiffEntry> = BTreeMap::new();

        for (name, old_desc) in old {
            match new.get(name) {
                None => {
                    entries.insert(name.clone(), entry(Some(old_desc), None));
                }
                Some(new_desc)
                    if new_desc.modification_time != old_desc.modification_time
                        || !new_desc.same_content(old_desc) =>
                {
                    entries.insert(name.clone(), entry(Some(old_desc), Some(new_desc)));
                }
                Some(_) => {}
            }
        }
        for (name, new_desc) in new {
            if !old.contains_key(name) {
                entries.insert(name.clone(), entry(None, Some(new_desc)));
            }
        }

        // Imported types count as affected when the import list itself moved.
        for e in entries.values_mut() {
            if e.dependencies_changed() {
                let imported: Vec<String> = e
                    .dependencies()
                    .flat_map(|dep| old.get(dep).into_iter().chain(new.get(dep)))
                    .flat_map(|d| d.transformers.iter().map(|t| t.type_name.clone()))
                    .collect();
                e.affected_types.extend(imported);
            }
        }

        // Transitive dependents.
        let mut dependents: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for desc in old.values().chain(new.values()) {
            for (dependent, dependency) in desc.edges() {
                dependents.entry(dependency).or_default().insert(dependent);
            }
        }
        let mut stack: Vec<String> = entries.keys().cloned().collect();
        while let Some(name) = stack.pop() {
            let Some(users) = dependents.get(name.as_str()) else {
                continue;
            };
            for user in users {
                if !entries.contains_key(*user) {
                    entries.insert(user.to_string(), entry(old.get(*user), new.get(*user)));
                    stack.push(user.to_string());
                }
            }
        }

        // Propagate affected types from dependencies to dependents.
        let names: Vec<String> = entries.keys().cloned().collect();
        for name in names {
            let mut visited = FxHashSet::default();
            let inherited = collect_affected(&entries, &name, &mut visited);
            if let Some(e) = entries.get_mut(&name) {
                e.affected_types.extend(inherited);
            }
        }

        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn get(&self, name: &str) -> Option<&PipelineDiffEntry> {
        self.entries.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &PipelineDiffEntry)> {
        self.entries.iter()
    }

    /// Scopes of every entry, deduplicated.
    pub fn scopes(&self) -> BTreeSet<String> {
        self.entries
            .values()
            .map(|e| e.scope().to_string())
            .collect()
    }
}

fn entry(old: Option<&PipelineDescriptor>, new: Option<&PipelineDescriptor>) -> PipelineDiffEntry {
    let mut e = PipelineDiffEntry {
        old: old.cloned(),
        new: new.cloned(),
        affected_types: BTreeSet::new(),
    };
    e.affected_types = e.changed_transformer_types();
    e
}

fn collect_affected(
    entries: &BTreeMap<String, PipelineDiffEntry>,
    name: &str,
    visited: &mut FxHashSet<String>,
) -> BTreeSet<String> {
    let mut result = BTreeSet::new();
    if !visited.insert(name.to_string()) {
        return result;
    }
    let Some(e) = entries.get(name) else {
        return result;
    };
    result.extend(e.affected_types.iter().cloned());
    for dep in e.dependencies() {
        result.extend(collect_affected(entries, dep, visited));
    }
    result
}
