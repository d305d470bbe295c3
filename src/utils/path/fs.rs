//! Filesystem path utilities.
//!
//! - `normalize_path` - absolute, canonical form used for watcher events
//! - `ensure_parent` - create the parent directory of an output file
//! - `remove_empty_dirs` - prune directories left empty by output cleanup
//! - `collect_files` - recursive file listing used by scans

use jwalk::WalkDir;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Normalize a file system path to absolute form.
///
/// Tries `canonicalize()` first (resolves symlinks, `.`, `..`).
/// Falls back to:
/// - Return as-is if already absolute
/// - Join with current directory if relative
#[inline]
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
        }
    })
}

/// Create the parent directory of `path` if it does not exist.
pub fn ensure_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

/// Remove empty directories below `root` (bottom-up). `root` itself is kept.
///
/// Returns the number of directories removed.
pub fn remove_empty_dirs(root: &Path) -> usize {
    fn walk(dir: &Path, is_root: bool) -> usize {
        let Ok(entries) = fs::read_dir(dir) else {
            return 0;
        };

        let mut removed = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                removed += walk(&path, false);
            }
        }

        if !is_root && fs::remove_dir(dir).is_ok() {
            removed += 1;
        }
        removed
    }

    walk(root, true)
}

const IGNORED_FILES: &[&str] = &[".DS_Store", "Thumbs.db"];

/// Collect all files below `dir` (or `dir` itself if it is a file).
///
/// Hidden entries are skipped. The result is sorted.
pub fn collect_files(dir: &Path) -> Vec<PathBuf> {
    if dir.is_file() {
        let hidden = dir
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with('.') || IGNORED_FILES.contains(&n));
        return if hidden { Vec::new() } else { vec![dir.to_path_buf()] };
    }
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .skip_hidden(true)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            let name = e.file_name().to_str().unwrap_or_default();
            !IGNORED_FILES.contains(&name)
        })
        .map(|e| e.path())
        .collect();
    files.sort();
    files
}
