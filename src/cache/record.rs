//! Per-asset cache records.
//!
//! ```text
//!            first success
//!  Unknown ────────────────► Valid ◄──────────┐
//!     │                        │              │ reprocess
//!     │ failure                │ mtime moved, │
//!     ▼                        ▼ types moved  │
//!  Invalid ◄───────────────────┘──────────────┘
//!     │
//!     ▼  source missing (from any state)
//!  Removed ──► dropped by cleanup
//! ```

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::freshness::FileTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AssetState {
    Unknown,
    Valid,
    Invalid,
    Removed,
}

impl fmt::Display for AssetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unknown => "unknown",
            Self::Valid => "valid",
            Self::Invalid => "invalid",
            Self::Removed => "removed",
        })
    }
}

/// What the cache knows about one source asset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetRecord {
    /// Key in the cache map; not stored inside the record on disk.
    #[serde(skip)]
    pub resource_name: String,
    /// Output names relative to the cache directory, in production order.
    pub outputs: Vec<String>,
    pub applied_transformers: BTreeSet<String>,
    /// Source mtime at the last successful processing.
    pub modification_time: Option<FileTime>,
    pub cache_invalid: bool,
    pub removed: bool,
    /// Consecutive failures for the source mtime in `failed_time`.
    pub failures: u32,
    pub failed_time: Option<FileTime>,
}

impl AssetRecord {
    pub fn new(resource_name: impl Into<String>) -> Self {
        Self {
            resource_name: resource_name.into(),
            ..Default::default()
        }
    }

    pub fn state(&self) -> AssetState {
        if self.removed {
            AssetState::Removed
        } else if self.cache_invalid {
            AssetState::Invalid
        } else if self.modification_time.is_none() {
            AssetState::Unknown
        } else {
            AssetState::Valid
        }
    }

    /// Valid, same source mtime, and produced by exactly the transformer
    /// types that apply now.
    pub fn is_up_to_date(
        &self,
        live_mtime: Option<FileTime>,
        applicable_types: &BTreeSet<String>,
    ) -> bool {
        !self.cache_invalid
            && !self.removed
            && self.modification_time.is_some()
            && self.modification_time == live_mtime
            && self.applied_transformers == *applicable_types
    }

    pub fn uses_any_transformer(&self, types: &BTreeSet<String>) -> bool {
        !self.applied_transformers.is_disjoint(types)
    }

    /// `Copy, Texture` (or `-` when nothing was applied).
    pub fn transformer_debug_string(&self) -> String {
        if self.applied_transformers.is_empty() {
            return "-".to_string();
        }
        self.applied_transformers
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Returns `true` if the record was not already invalid.
    pub fn invalidate(&mut self) -> bool {
        !std::mem::replace(&mut self.cache_invalid, true)
    }

    /// Record a successful processing. Returns outputs that are no longer
    /// produced.
    pub fn commit(
        &mut self,
        outputs: Vec<String>,
        applied: BTreeSet<String>,
        modification_time: FileTime,
    ) -> Vec<String> {
        let stale: Vec<String> = self
            .outputs
            .iter()
            .filter(|old| !outputs.contains(old))
            .cloned()
            .collect();

        self.outputs = outputs;
        self.applied_transformers = applied;
        self.modification_time = Some(modification_time);
        self.cache_invalid = false;
        self.removed = false;
        self.failures = 0;
        self.failed_time = None;
        stale
    }

    /// Record a failed processing attempt of the source at `live_mtime`.
    pub fn record_failure(&mut self, live_mtime: Option<FileTime>) {
        if self.failed_time != live_mtime {
            self.failures = 0;
        }
        self.failures = self.failures.saturating_add(1);
        self.failed_time = live_mtime;
        self.cache_invalid = true;
    }

    /// Whether another attempt is worthwhile. `max_retries == 0` never
    /// suppresses.
    pub fn should_retry(&self, live_mtime: Option<FileTime>, max_retries: u32) -> bool {
        max_retries == 0
            || self.failures == 0
            || self.failed_time != live_mtime
            || self.failures < max_retries
    }

    pub fn reset_failures(&mut self) {
        self.failures = 0;
        self.failed_time = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn types(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_state_transitions() {
        let mut record = AssetRecord::new("a.png");
        assert_eq!(record.state(), AssetState::Unknown);

        record.commit(vec!["a.png.d/a.png".into()], types(&["Texture"]), 100);
        assert_eq!(record.state(), AssetState::Valid);

        assert!(record.invalidate());
        assert!(!record.invalidate());
        assert_eq!(record.state(), AssetState::Invalid);

        record.commit(vec![], types(&["Texture"]), 200);
        assert_eq!(record.state(), AssetState::Valid);

        record.removed = true;
        assert_eq!(record.state(), AssetState::Removed);
    }

    #[test]
    fn test_is_up_to_date() {
        let mut record = AssetRecord::new("a.png");
        let texture = types(&["Texture"]);
        assert!(!record.is_up_to_date(Some(100), &texture));

        record.commit(vec![], texture.clone(), 100);
        assert!(record.is_up_to_date(Some(100), &texture));
        assert!(!record.is_up_to_date(Some(200), &texture));
        assert!(!record.is_up_to_date(None, &texture));
        assert!(!record.is_up_to_date(Some(100), &types(&["Texture", "Copy"])));

        record.invalidate();
        assert!(!record.is_up_to_date(Some(100), &texture));
    }

    #[test]
    fn test_commit_returns_stale_outputs() {
        let mut record = AssetRecord::new("a.png");
        record.commit(vec!["x".into(), "y".into()], types(&["A"]), 1);
        let stale = record.commit(vec!["y".into(), "z".into()], types(&["A"]), 2);
        assert_eq!(stale, vec!["x"]);
        assert_eq!(record.outputs, vec!["y", "z"]);
    }

    #[test]
    fn test_retry_suppression() {
        let mut record = AssetRecord::new("a.png");
        assert!(record.should_retry(Some(1), 2));

        record.record_failure(Some(1));
        assert_eq!(record.state(), AssetState::Invalid);
        assert!(record.should_retry(Some(1), 2));

        record.record_failure(Some(1));
        assert!(!record.should_retry(Some(1), 2));
        assert!(record.should_retry(Some(2), 2));
        assert!(record.should_retry(Some(1), 0));

        // A failure at a new mtime restarts the count.
        record.record_failure(Some(2));
        assert_eq!(record.failures, 1);

        record.commit(vec![], types(&["A"]), 2);
        assert_eq!(record.failures, 0);
        assert!(record.failed_time.is_none());
    }

    #[test]
    fn test_transformer_debug_string() {
        let mut record = AssetRecord::new("a.png");
        assert_eq!(record.transformer_debug_string(), "-");
        record.applied_transformers = types(&["Texture", "Copy"]);
        assert_eq!(record.transformer_debug_string(), "Copy, Texture");
    }

    #[test]
    fn test_serde_skips_name() {
        let mut record = AssetRecord::new("a.png");
        record.commit(vec!["a.png.d/a.png".into()], types(&["Copy"]), 7);

        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("resource_name"));

        let back: AssetRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.outputs, record.outputs);
        assert_eq!(back.modification_time, Some(7));
        assert!(back.resource_name.is_empty());
    }
}
