//! Modification-time stamps for source files.
//!
//! Stamps are milliseconds since the Unix epoch. They are only ever
//! compared for equality against the stamp recorded at the last successful
//! processing, so clock skew between machines does not matter.

use std::path::Path;
use std::time::SystemTime;

/// Source modification time in milliseconds since the Unix epoch.
pub type FileTime = u64;

/// Get the modification time of a file.
///
/// Returns `None` if the path doesn't exist, isn't a file, or mtime
/// cannot be read.
pub fn get_mtime(path: &Path) -> Option<FileTime> {
    let metadata = path.metadata().ok()?;
    if !metadata.is_file() {
        return None;
    }
    metadata.modified().ok().map(to_file_time)
}

/// Convert a `SystemTime` into a [`FileTime`] stamp.
#[allow(clippy::cast_possible_truncation)] // u64 milliseconds last ~584 million years
pub fn to_file_time(time: SystemTime) -> FileTime {
    time.duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Convert a [`FileTime`] stamp back into a `SystemTime`.
#[cfg(test)]
pub fn from_file_time(stamp: FileTime) -> SystemTime {
    SystemTime::UNIX_EPOCH + std::time::Duration::from_millis(stamp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_get_mtime_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.png");
        fs::write(&path, "png").unwrap();

        let file = fs::File::options().write(true).open(&path).unwrap();
        file.set_modified(from_file_time(100_000)).unwrap();

        assert_eq!(get_mtime(&path), Some(100_000));
    }

    #[test]
    fn test_get_mtime_missing_or_directory() {
        let dir = TempDir::new().unwrap();
        assert_eq!(get_mtime(&dir.path().join("missing")), None);
        assert_eq!(get_mtime(dir.path()), None);
    }
}
