//! Resource name helpers.
//!
//! A resource name is a `/`-separated path relative to the resource root,
//! without leading or trailing slashes. The root directory itself is `""`.
//!
//! ```text
//! Data/                      ← resource root ("")
//! ├── textures/              ← "textures"
//! │   ├── main.assetpipeline ← "textures/main.assetpipeline"
//! │   └── a.png              ← "textures/a.png"
//! └── models/hero.fbx        ← "models/hero.fbx"
//! ```

use std::path::{Component, Path, PathBuf};

/// Suffix that marks a directory of managed outputs (`a.png` → `a.png.d/`).
///
/// Any resource name with a component ending in this suffix is generated
/// data and never treated as a source asset.
pub const RESOURCE_NAME_SUFFIX: &str = ".d";

/// Check whether `name` is `dir` itself or lies below it.
pub fn is_under(name: &str, dir: &str) -> bool {
    if dir.is_empty() {
        return true;
    }
    name == dir
        || (name.len() > dir.len() && name.starts_with(dir) && name.as_bytes()[dir.len()] == b'/')
}

/// Directory part of a resource name (`"a/b/c.png"` → `"a/b"`, `"c.png"` → `""`).
pub fn parent_dir(name: &str) -> &str {
    name.rfind('/').map_or("", |idx| &name[..idx])
}

/// File part of a resource name.
pub fn file_name(name: &str) -> &str {
    name.rfind('/').map_or(name, |idx| &name[idx + 1..])
}

/// Lowercase extension of a resource name, without the dot.
pub fn extension(name: &str) -> Option<String> {
    let file = file_name(name);
    let idx = file.rfind('.')?;
    if idx == 0 || idx + 1 == file.len() {
        return None;
    }
    Some(file[idx + 1..].to_ascii_lowercase())
}

/// Join a directory and a relative name.
pub fn join(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else if name.is_empty() {
        dir.to_string()
    } else {
        format!("{dir}/{name}")
    }
}

/// Iterate a directory and all of its ancestors, deepest first, ending at `""`.
pub fn ancestors(dir: &str) -> impl Iterator<Item = &str> {
    let mut next = Some(dir);
    std::iter::from_fn(move || {
        let current = next?;
        next = if current.is_empty() {
            None
        } else {
            Some(parent_dir(current))
        };
        Some(current)
    })
}

/// Normalize a user-written resource path.
///
/// Collapses `.`, `..` and repeated slashes, strips leading and trailing
/// slashes. Returns `None` if the path escapes the resource root.
pub fn normalize_name(raw: &str) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();
    for part in raw.split(['/', '\\']) {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }
    Some(parts.join("/"))
}

/// Check whether the name points into a managed output directory.
pub fn is_managed_output(name: &str) -> bool {
    name.split('/')
        .any(|part| part.len() > RESOURCE_NAME_SUFFIX.len() && part.ends_with(RESOURCE_NAME_SUFFIX))
}

/// Check whether any component of the name is hidden (`.git/x`, `a/.cache`).
pub fn is_hidden(name: &str) -> bool {
    name.split('/').any(|part| part.starts_with('.'))
}

/// Convert an absolute filesystem path into a resource name under `root`.
///
/// Returns `None` for paths outside the root or with non UTF-8 components.
pub fn to_resource_name(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let mut parts = Vec::new();
    for component in rel.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(parts.join("/"))
}

/// Convert a resource name into a filesystem path under `root`.
pub fn to_file_path(root: &Path, name: &str) -> PathBuf {
    if name.is_empty() {
        return root.to_path_buf();
    }
    name.split('/').fold(root.to_path_buf(), |path, part| path.join(part))
}

/// Collapse a sorted set of directories so that no entry lies under another.
pub fn collapse_nested<'a, I>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut sorted: Vec<&String> = names.into_iter().collect();
    sorted.sort();
    sorted.dedup();

    let mut result: Vec<String> = Vec::new();
    for name in sorted {
        // Ancestors sort before descendants, but unrelated names can sit in
        // between ("a", "a-b", "a/c"), so test against every kept entry.
        if result.iter().any(|kept| is_under(name, kept)) {
            continue;
        }
        result.push(name.clone());
    }
    result
}
