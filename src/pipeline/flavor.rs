//! Target platform flavors.
//!
//! A flavor is a set of lowercase tags (`["pc", "dx11"]`). The wildcard tag
//! `*` matches every transformer filter.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

pub const WILDCARD: &str = "*";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Flavor(BTreeSet<String>);

impl Default for Flavor {
    fn default() -> Self {
        Self::from_tags([WILDCARD])
    }
}

impl Flavor {
    /// Build from tags. Empty tags are dropped; an empty set becomes `*`.
    pub fn from_tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let set: BTreeSet<String> = tags
            .into_iter()
            .map(|t| t.as_ref().trim().to_ascii_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        if set.is_empty() {
            Self::default()
        } else {
            Self(set)
        }
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.contains(tag)
    }

    pub fn is_wildcard(&self) -> bool {
        self.contains(WILDCARD)
    }

    /// Whether a transformer declared for `filter` runs under this flavor.
    ///
    /// An empty or `*` filter always matches; otherwise the flavor must carry
    /// the tag or be the wildcard flavor.
    pub fn matches(&self, filter: &str) -> bool {
        let filter = filter.trim();
        filter.is_empty()
            || filter == WILDCARD
            || self.is_wildcard()
            || self.0.iter().any(|tag| tag.eq_ignore_ascii_case(filter))
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tags: Vec<&str> = self.tags().collect();
        write!(f, "{}", tags.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_wildcard() {
        let flavor = Flavor::default();
        assert!(flavor.is_wildcard());
        assert_eq!(flavor.to_string(), "*");
        assert_eq!(Flavor::from_tags([" ", ""]), flavor);
    }

    #[test]
    fn test_matches() {
        let mobile = Flavor::from_tags(["Mobile", "gles"]);
        assert!(mobile.matches(""));
        assert!(mobile.matches("*"));
        assert!(mobile.matches("mobile"));
        assert!(mobile.matches("GLES"));
        assert!(!mobile.matches("pc"));

        assert!(Flavor::default().matches("pc"));
        assert_eq!(mobile.to_string(), "gles,mobile");
    }
}
