//! Configuration utility functions.

use std::path::{Path, PathBuf};

use crate::utils::path::normalize_path;

/// Find the config file by searching upward from `start`.
///
/// ```text
/// /home/user/game/Data/textures/  ← start
/// /home/user/game/assetmill.toml  ← found!
/// ```
pub fn find_config_file(config_name: &Path, start: &Path) -> Option<PathBuf> {
    if config_name.is_absolute() {
        return config_name.is_file().then(|| config_name.to_path_buf());
    }

    start
        .ancestors()
        .map(|dir| dir.join(config_name))
        .find(|candidate| candidate.is_file())
}

/// Resolve a configured path: expand `~`, then join relative paths onto
/// `root`.
pub fn resolve_path(path: &Path, root: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    let expanded = PathBuf::from(shellexpand::tilde(&raw).into_owned());
    let full = if expanded.is_relative() {
        root.join(expanded)
    } else {
        expanded
    };
    normalize_path(&full)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_find_config_file_upward() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("Data/textures");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join("assetmill.toml"), "").unwrap();

        let found = find_config_file(Path::new("assetmill.toml"), &nested).unwrap();
        assert_eq!(found, dir.path().join("assetmill.toml"));
        assert!(find_config_file(Path::new("missing.toml"), &nested).is_none());
    }

    #[test]
    fn test_resolve_path() {
        let root = Path::new("/project");
        assert_eq!(resolve_path(Path::new("Data"), root), PathBuf::from("/project/Data"));
        assert_eq!(resolve_path(Path::new("/abs/cache"), root), PathBuf::from("/abs/cache"));

        if let Some(home) = std::env::var_os("HOME") {
            let resolved = resolve_path(Path::new("~/assets"), root);
            assert!(resolved.starts_with(normalize_path(Path::new(&home))) || resolved.starts_with(&home));
        }
    }
}
