//! Engine state persistence.
//!
//! ```text
//! <state_dir>/assets.json
//! {
//!   "version": 1,
//!   "pipelines": { "main.assetpipeline": { "modification_time": 1700000000000, "fingerprint": "ab12…" } },
//!   "assets":    { "textures/a.png": { "outputs": [...], "applied_transformers": [...], ... } }
//! }
//! ```
//!
//! A missing, corrupt or foreign-version file restores as empty state,
//! which makes the next update a cold full rescan.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{AssetCache, AssetRecord, CacheError};
use crate::freshness::{ContentHash, FileTime};
use crate::pipeline::{PipelineDescriptor, PipelineMap};
use crate::{debug, log};

pub const STATE_FILE: &str = "assets.json";
const STATE_VERSION: u32 = 1;

/// What a pipeline looked like when the state was saved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStamp {
    pub modification_time: FileTime,
    pub fingerprint: ContentHash,
}

impl From<&PipelineDescriptor> for PipelineStamp {
    fn from(desc: &PipelineDescriptor) -> Self {
        Self {
            modification_time: desc.modification_time,
            fingerprint: desc.fingerprint,
        }
    }
}

impl PipelineStamp {
    pub fn matches(&self, desc: &PipelineDescriptor) -> bool {
        *self == Self::from(desc)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersistedState {
    pub version: u32,
    #[serde(default)]
    pub pipelines: BTreeMap<String, PipelineStamp>,
    #[serde(default)]
    pub assets: BTreeMap<String, AssetRecord>,
}

impl PersistedState {
    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty() && self.assets.is_empty()
    }
}

/// Check if file content is the same as new content
fn file_content_matches(path: &Path, content: &str) -> bool {
    fs::read_to_string(path).is_ok_and(|existing| existing == content)
}

/// Write the state file. Returns `false` when the content on disk was
/// already identical.
pub fn persist_state(
    state_dir: &Path,
    cache: &AssetCache,
    pipelines: &PipelineMap,
) -> Result<bool, CacheError> {
    let state = PersistedState {
        version: STATE_VERSION,
        pipelines: pipelines
            .iter()
            .map(|(name, desc)| (name.clone(), PipelineStamp::from(desc)))
            .collect(),
        assets: cache
            .records()
            .iter()
            .filter(|(_, r)| !r.removed)
            .map(|(name, r)| (name.clone(), r.clone()))
            .collect(),
    };

    let path = state_dir.join(STATE_FILE);
    let json = serde_json::to_string_pretty(&state)?;
    if file_content_matches(&path, &json) {
        debug!("cache"; "state unchanged, skipping write");
        return Ok(false);
    }

    fs::create_dir_all(state_dir).map_err(|source| CacheError::Io {
        path: state_dir.to_path_buf(),
        source,
    })?;
    fs::write(&path, json).map_err(|source| CacheError::Io {
        path: path.clone(),
        source,
    })?;
    debug!("cache"; "saved {} records, {} pipelines", state.assets.len(), state.pipelines.len());
    Ok(true)
}

/// Load the state file; any problem yields empty state.
pub fn restore_state(state_dir: &Path) -> PersistedState {
    let path = state_dir.join(STATE_FILE);
    let json = match fs::read_to_string(&path) {
        Ok(json) => json,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return PersistedState::default(),
        Err(e) => {
            log!("cache"; "cannot read {}: {e}, starting cold", path.display());
            return PersistedState::default();
        }
    };

    match serde_json::from_str::<PersistedState>(&json) {
        Ok(state) if state.version == STATE_VERSION => {
            debug!("cache"; "restored {} records, {} pipelines", state.assets.len(), state.pipelines.len());
            state
        }
        Ok(state) => {
            log!("cache"; "state version {} is not {STATE_VERSION}, starting cold", state.version);
            PersistedState::default()
        }
        Err(e) => {
            log!("cache"; "corrupt state file {}: {e}, starting cold", path.display());
            PersistedState::default()
        }
    }
}

/// Delete the state file.
pub fn clear_state(state_dir: &Path) -> Result<(), CacheError> {
    let path = state_dir.join(STATE_FILE);
    match fs::remove_file(&path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(CacheError::Io { path, source }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::tests::valid;
    use crate::freshness::hash_bytes;
    use tempfile::TempDir;

    fn pipelines() -> PipelineMap {
        let desc = PipelineDescriptor::empty("main.assetpipeline", 42, hash_bytes(b"main"));
        PipelineMap::from([(desc.resource_name.clone(), desc)])
    }

    #[test]
    fn test_persist_and_restore() {
        let dir = TempDir::new().unwrap();
        let mut cache = AssetCache::new();
        valid(&mut cache, "a.png", &["Copy"], &["a.png.d/a.png"]);
        valid(&mut cache, "gone.png", &["Copy"], &[]);
        cache.mark_removed("gone.png");

        assert!(persist_state(dir.path(), &cache, &pipelines()).unwrap());
        // Second write with identical content is skipped.
        assert!(!persist_state(dir.path(), &cache, &pipelines()).unwrap());

        let state = restore_state(dir.path());
        assert_eq!(state.version, STATE_VERSION);
        assert_eq!(state.assets.len(), 1);
        assert_eq!(state.assets["a.png"].outputs, vec!["a.png.d/a.png"]);

        let stamp = state.pipelines["main.assetpipeline"];
        assert!(stamp.matches(&pipelines()["main.assetpipeline"]));

        let restored = AssetCache::from_records(state.assets);
        assert_eq!(restored.get("a.png").unwrap().resource_name, "a.png");
    }

    #[test]
    fn test_restore_missing_corrupt_or_foreign() {
        let dir = TempDir::new().unwrap();
        assert!(restore_state(dir.path()).is_empty());

        fs::write(dir.path().join(STATE_FILE), "{ not json").unwrap();
        assert!(restore_state(dir.path()).is_empty());

        fs::write(
            dir.path().join(STATE_FILE),
            r#"{ "version": 99, "assets": { "a.png": {} } }"#,
        )
        .unwrap();
        assert!(restore_state(dir.path()).is_empty());
    }

    #[test]
    fn test_clear_state() {
        let dir = TempDir::new().unwrap();
        clear_state(dir.path()).unwrap();

        persist_state(dir.path(), &AssetCache::new(), &PipelineMap::new()).unwrap();
        assert!(dir.path().join(STATE_FILE).exists());
        clear_state(dir.path()).unwrap();
        assert!(!dir.path().join(STATE_FILE).exists());
    }
}
