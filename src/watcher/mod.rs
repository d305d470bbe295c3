//! Filesystem change sources.
//!
//! ```text
//! notify ──► crossbeam channel ──► Debouncer ──► ChangeSet ──► Engine::update
//!                                      ▲
//! ManualChanges::push ─────────────────┘ (same levelling rules)
//! ```
//!
//! The engine only sees a levelled `path → ChangeKind` map per poll.

mod debouncer;
mod manual;
mod notify;

use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;

pub use debouncer::Debouncer;
pub use manual::ManualChanges;
pub use notify::NotifyWatcher;

/// What happened to a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Created,
    Modified,
    Removed,
}

impl ChangeKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Modified => "modified",
            Self::Removed => "removed",
        }
    }
}

/// Levelled changes since the previous poll.
pub type ChangeSet = FxHashMap<PathBuf, ChangeKind>;

/// Producer of filesystem changes, polled by the engine once per update.
pub trait ChangeSource: Send {
    /// Take the changes that are ready. Never blocks.
    fn poll(&mut self) -> ChangeSet;
}

/// Fold one event for `path` into `changes`.
///
/// - Removed → Created/Modified: restored, the new kind wins
/// - Modified → Removed: upgraded to Removed
/// - Created → Removed: appeared and vanished, dropped
/// - anything else: the first kind wins
///
/// Returns `true` if `changes` was modified.
pub fn merge_change(changes: &mut ChangeSet, path: PathBuf, kind: ChangeKind) -> bool {
    let Some(&existing) = changes.get(&path) else {
        changes.insert(path, kind);
        return true;
    };

    match (existing, kind) {
        (ChangeKind::Removed, ChangeKind::Created | ChangeKind::Modified) => {
            crate::debug!("watch"; "restored {}: {}", kind.label(), path.display());
            changes.insert(path, kind);
            true
        }
        (ChangeKind::Modified, ChangeKind::Removed) => {
            crate::debug!("watch"; "upgrade modified->removed: {}", path.display());
            changes.insert(path, ChangeKind::Removed);
            true
        }
        (ChangeKind::Created, ChangeKind::Removed) => {
            crate::debug!("watch"; "discard created+removed: {}", path.display());
            changes.remove(&path);
            true
        }
        _ => false,
    }
}

/// Editor artifacts and hidden files never reach the engine.
pub fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(entries: &[(&str, ChangeKind)]) -> ChangeSet {
        let mut changes = ChangeSet::default();
        for (path, kind) in entries {
            merge_change(&mut changes, PathBuf::from(path), *kind);
        }
        changes
    }

    #[test]
    fn test_merge_rules() {
        use ChangeKind::*;

        assert_eq!(set(&[("/a", Removed), ("/a", Created)])[Path::new("/a")], Created);
        assert_eq!(set(&[("/a", Modified), ("/a", Removed)])[Path::new("/a")], Removed);
        assert!(set(&[("/a", Created), ("/a", Removed)]).is_empty());
        assert_eq!(set(&[("/a", Created), ("/a", Modified)])[Path::new("/a")], Created);
        assert_eq!(set(&[("/a", Modified), ("/a", Modified)]).len(), 1);
    }

    #[test]
    fn test_is_temp_file() {
        assert!(is_temp_file(Path::new("/x/a.png~")));
        assert!(is_temp_file(Path::new("/x/.a.png.swp")));
        assert!(is_temp_file(Path::new("/x/a.tmp")));
        assert!(!is_temp_file(Path::new("/x/a.png")));
        assert!(!is_temp_file(Path::new("/x/main.assetpipeline")));
    }
}
