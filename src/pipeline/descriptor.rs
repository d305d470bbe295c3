//! Loaded pipeline descriptors.

use std::sync::Arc;

use regex::Regex;

use super::Flavor;
use crate::freshness::{ContentHash, FileTime};
use crate::transformer::Transformer;
use crate::utils::path::parent_dir;
use crate::utils::path::resource::extension;

/// One resolved transformer declaration.
///
/// Entries are cheap to clone: the instance is shared.
#[derive(Debug, Clone)]
pub struct TransformerEntry {
    pub type_name: String,
    /// Flavor filter; empty or `*` applies to every flavor.
    pub flavor: String,
    pub extensions: Vec<String>,
    pub pattern: Option<Regex>,
    /// Fingerprint of the whole declaration (type, filters, config).
    pub fingerprint: ContentHash,
    pub instance: Arc<dyn Transformer>,
    /// Pipeline file that declared this entry.
    pub origin: String,
}

impl TransformerEntry {
    pub fn matches_flavor(&self, flavor: &Flavor) -> bool {
        flavor.matches(&self.flavor)
    }

    /// Extension filter, pattern filter, then the transformer's own check.
    pub fn matches_resource(&self, resource_name: &str) -> bool {
        if !self.extensions.is_empty() {
            let Some(ext) = extension(resource_name) else {
                return false;
            };
            if !self.extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext)) {
                return false;
            }
        }
        if let Some(pattern) = &self.pattern
            && !pattern.is_match(resource_name)
        {
            return false;
        }
        self.instance.is_applicable(resource_name)
    }
}

/// One pipeline file, loaded.
#[derive(Debug, Clone)]
pub struct PipelineDescriptor {
    pub resource_name: String,
    pub modification_time: FileTime,
    pub transformers: Vec<TransformerEntry>,
    /// Resource names of the pipeline files this one imports, in
    /// declaration order.
    pub dependencies: Vec<String>,
    pub fingerprint: ContentHash,
}

impl PipelineDescriptor {
    /// Descriptor with no transformers, used when a file cannot be loaded.
    pub fn empty(resource_name: &str, modification_time: FileTime, fingerprint: ContentHash) -> Self {
        Self {
            resource_name: resource_name.to_string(),
            modification_time,
            transformers: Vec::new(),
            dependencies: Vec::new(),
            fingerprint,
        }
    }

    /// Directory this pipeline applies to.
    pub fn scope(&self) -> &str {
        parent_dir(&self.resource_name)
    }

    /// `(dependent, dependency)` edges.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str)> {
        self.dependencies
            .iter()
            .map(move |dep| (self.resource_name.as_str(), dep.as_str()))
    }

    /// Same content as `other` (ignores modification time).
    pub fn same_content(&self, other: &Self) -> bool {
        self.fingerprint == other.fingerprint
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::freshness::hash_bytes;
    use crate::transformer::builtin::CopyTransformer;

    pub(crate) fn entry(type_name: &str, origin: &str) -> TransformerEntry {
        TransformerEntry {
            type_name: type_name.to_string(),
            flavor: String::new(),
            extensions: Vec::new(),
            pattern: None,
            fingerprint: hash_bytes(format!("{origin}:{type_name}").as_bytes()),
            instance: Arc::new(CopyTransformer::default()),
            origin: origin.to_string(),
        }
    }

    #[test]
    fn test_scope_and_edges() {
        let mut desc = PipelineDescriptor::empty("textures/ui/main.assetpipeline", 1, hash_bytes(b""));
        desc.dependencies = vec!["common.assetpipeline".into()];

        assert_eq!(desc.scope(), "textures/ui");
        let edges: Vec<_> = desc.edges().collect();
        assert_eq!(edges, vec![("textures/ui/main.assetpipeline", "common.assetpipeline")]);

        let root = PipelineDescriptor::empty("main.assetpipeline", 1, hash_bytes(b""));
        assert_eq!(root.scope(), "");
    }

    #[test]
    fn test_matches_resource_filters() {
        let mut e = entry("Copy", "main.assetpipeline");
        assert!(e.matches_resource("a/b.png"));

        e.extensions = vec!["png".into()];
        assert!(e.matches_resource("a/b.PNG"));
        assert!(!e.matches_resource("a/b.jpg"));
        assert!(!e.matches_resource("a/noext"));

        e.pattern = Some(Regex::new("^ui/").unwrap());
        assert!(e.matches_resource("ui/b.png"));
        assert!(!e.matches_resource("a/b.png"));
    }

    #[test]
    fn test_matches_flavor() {
        let mut e = entry("Copy", "main.assetpipeline");
        assert!(e.matches_flavor(&Flavor::from_tags(["pc"])));

        e.flavor = "mobile".into();
        assert!(!e.matches_flavor(&Flavor::from_tags(["pc"])));
        assert!(e.matches_flavor(&Flavor::from_tags(["mobile"])));
        assert!(e.matches_flavor(&Flavor::default()));
    }
}
