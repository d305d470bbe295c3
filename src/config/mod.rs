//! Project configuration management for `assetmill.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── error.rs     # ConfigError
//! ├── section.rs   # [project] [pipeline] [process] [cache] [watch] [log]
//! ├── util.rs      # config discovery, path resolution
//! └── mod.rs       # ProjectConfig (this file)
//! ```
//!
//! # Sections
//!
//! | Section      | Purpose                                          |
//! |--------------|--------------------------------------------------|
//! | `[project]`  | Resource root, cache and state directories       |
//! | `[pipeline]` | Pipeline file extension                          |
//! | `[process]`  | Worker count, target flavor, retry limit         |
//! | `[cache]`    | Cleanup cadence                                  |
//! | `[watch]`    | Debounce and poll intervals                      |
//! | `[log]`      | Verbose output                                   |

mod error;
mod section;
mod util;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::cli::Cli;
use crate::engine::EngineOptions;
use crate::pipeline::Flavor;
use crate::{debug, log};

pub use error::ConfigError;
pub use section::{
    CacheSection, LogSection, PipelineSection, ProcessSection, ProjectSection, WatchSection,
};
pub use util::{find_config_file, resolve_path};

/// Default config file name.
pub const CONFIG_FILE: &str = "assetmill.toml";

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing `assetmill.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Absolute path to the config file; empty when running on defaults.
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Directory relative paths are resolved against.
    #[serde(skip)]
    pub root: PathBuf,

    pub project: ProjectSection,
    pub pipeline: PipelineSection,
    pub process: ProcessSection,
    pub cache: CacheSection,
    pub watch: WatchSection,
    pub log: LogSection,
}

impl ProjectConfig {
    /// Load configuration for the CLI invocation and apply global flags.
    pub fn load(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current working directory")?;
        let mut config = Self::discover(cli.config.as_deref(), &cwd)?;
        if cli.verbose {
            config.log.verbose = true;
        }
        crate::logger::set_verbose(config.log.verbose);
        config.validate()?;
        Ok(config)
    }

    /// Locate and parse the config file, searching upward from `cwd`.
    ///
    /// An explicit path must exist. Without one, a missing file means
    /// defaults rooted at `cwd`.
    pub fn discover(explicit: Option<&Path>, cwd: &Path) -> Result<Self> {
        let name = explicit.unwrap_or(Path::new(CONFIG_FILE));
        match find_config_file(name, cwd) {
            Some(path) => Self::from_path(&path),
            None if explicit.is_some() => Err(ConfigError::NotFound(name.to_path_buf()).into()),
            None => {
                debug!("config"; "no {CONFIG_FILE} found, using defaults in {}", cwd.display());
                let mut config = Self::default();
                config.finalize(cwd);
                Ok(config)
            }
        }
    }

    /// Parse configuration from a TOML string without resolving paths.
    #[cfg(test)]
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::from)?;
        Ok(config)
    }

    /// Load configuration from a file, warning about unknown fields.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (mut config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        let path = crate::utils::path::normalize_path(path);
        let root = path.parent().map(Path::to_path_buf).unwrap_or_default();
        config.config_path = path;
        config.finalize(&root);
        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("config"; "unknown fields in {display_path}, ignoring:");
        for field in fields {
            eprintln!("- {field}");
        }
    }

    /// Resolve every configured path against `root`.
    fn finalize(&mut self, root: &Path) {
        let root = crate::utils::path::normalize_path(root);
        self.project.resources = resolve_path(&self.project.resources, &root);
        self.project.cache = resolve_path(&self.project.cache, &root);
        self.project.state = resolve_path(&self.project.state, &root);
        self.pipeline.extension = self.pipeline.extension.trim_start_matches('.').to_string();
        self.root = root;
    }

    // ========================================================================
    // validation
    // ========================================================================

    /// Check values that parsed but cannot work.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let project = &self.project;

        if self.pipeline.extension.trim().is_empty() {
            return Err(ConfigError::Validation(
                "[pipeline] extension must not be empty".into(),
            ));
        }
        if !project.resources.is_dir() {
            return Err(ConfigError::Validation(format!(
                "[project] resources `{}` is not a directory",
                project.resources.display()
            )));
        }
        if project.cache.starts_with(&project.resources) {
            return Err(ConfigError::Validation(format!(
                "[project] cache `{}` must not be inside resources `{}`",
                project.cache.display(),
                project.resources.display()
            )));
        }
        if project.resources.starts_with(&project.cache) {
            return Err(ConfigError::Validation(format!(
                "[project] resources `{}` must not be inside cache `{}`",
                project.resources.display(),
                project.cache.display()
            )));
        }
        if project.state.starts_with(&project.cache) {
            return Err(ConfigError::Validation(format!(
                "[project] state `{}` must not be inside cache `{}`",
                project.state.display(),
                project.cache.display()
            )));
        }
        Ok(())
    }

    // ========================================================================
    // derived settings
    // ========================================================================

    pub fn flavor(&self) -> Flavor {
        Flavor::from_tags(&self.process.flavor)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.watch.debounce_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.watch.poll_ms.max(1))
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.watch.retry_ms)
    }

    /// `None` when periodic rescans are disabled.
    pub fn rescan_interval(&self) -> Option<Duration> {
        (self.watch.rescan_secs > 0).then(|| Duration::from_secs(self.watch.rescan_secs))
    }

    /// Engine options for this project.
    pub fn engine_options(&self) -> EngineOptions {
        let mut options = EngineOptions::new(
            &self.project.resources,
            &self.project.cache,
            &self.project.state,
        );
        options.pipeline_ext.clone_from(&self.pipeline.extension);
        options.flavor = self.flavor();
        options.workers = self.process.workers;
        options.max_retries = self.process.max_retries;
        options.cleanup_interval = self.cache.cleanup_interval;
        options
    }
}

// ============================================================================
// tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn project(toml: &str) -> (TempDir, ProjectConfig) {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("Data")).unwrap();
        fs::write(dir.path().join(CONFIG_FILE), toml).unwrap();
        let config = ProjectConfig::from_path(&dir.path().join(CONFIG_FILE)).unwrap();
        (dir, config)
    }

    #[test]
    fn test_defaults() {
        let config = ProjectConfig::from_str("").unwrap();
        assert_eq!(config.project.resources, PathBuf::from("Data"));
        assert_eq!(config.pipeline.extension, "assetpipeline");
        assert_eq!(config.process.max_retries, 3);
        assert_eq!(config.cache.cleanup_interval, 16);
        assert_eq!(config.watch.debounce_ms, 300);
        assert_eq!(config.rescan_interval(), Some(Duration::from_secs(600)));
        assert!(!config.log.verbose);
        assert!(config.flavor().is_wildcard());
    }

    #[test]
    fn test_rescan_disabled() {
        let config = ProjectConfig::from_str("[watch]\nrescan_secs = 0\nretry_ms = 50").unwrap();
        assert_eq!(config.rescan_interval(), None);
        assert_eq!(config.retry_interval(), Duration::from_millis(50));
    }

    #[test]
    fn test_from_str_invalid_toml() {
        assert!(ProjectConfig::from_str("[project\nresources = 1").is_err());
    }

    #[test]
    fn test_paths_resolved_against_config_dir() {
        let (dir, config) = project("[project]\nresources = \"Data\"\ncache = \"out/cache\"\n");
        let root = crate::utils::path::normalize_path(dir.path());
        assert_eq!(config.root, root);
        assert_eq!(config.project.resources, root.join("Data"));
        assert_eq!(config.project.cache, root.join("out/cache"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_fields_detected() {
        let (config, ignored) =
            ProjectConfig::parse_with_ignored("[process]\nworkers = 2\nthreads = 4\n[unknown]\nx = 1")
                .unwrap();
        assert_eq!(config.process.workers, 2);
        assert!(ignored.iter().any(|f| f.contains("threads")));
        assert!(ignored.iter().any(|f| f.contains("unknown")));
    }

    #[test]
    fn test_extension_dot_trimmed_and_empty_rejected() {
        let (_dir, config) = project("[pipeline]\nextension = \".pipe\"\n");
        assert_eq!(config.pipeline.extension, "pipe");

        let (_dir, config) = project("[pipeline]\nextension = \"\"\n");
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_cache_inside_resources_rejected() {
        let (_dir, config) = project("[project]\ncache = \"Data/cache\"\n");
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_state_inside_cache_rejected() {
        let (_dir, config) = project("[project]\ncache = \"build\"\nstate = \"build/state\"\n");
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_discover_without_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = ProjectConfig::discover(None, dir.path()).unwrap();
        assert!(config.config_path.as_os_str().is_empty());
        assert!(config.project.resources.ends_with("Data"));

        let missing = ProjectConfig::discover(Some(Path::new("nope.toml")), dir.path());
        assert!(missing.is_err());
    }

    #[test]
    fn test_engine_options() {
        let (_dir, config) = project(
            "[process]\nworkers = 3\nflavor = [\"PC\", \"dx11\"]\nmax_retries = 0\n[cache]\ncleanup_interval = 4\n",
        );
        let options = config.engine_options();
        assert_eq!(options.workers, 3);
        assert_eq!(options.max_retries, 0);
        assert_eq!(options.cleanup_interval, 4);
        assert!(options.flavor.contains("pc"));
        assert!(options.flavor.contains("dx11"));
    }
}
