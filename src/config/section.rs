//! `assetmill.toml` sections.
//!
//! ```toml
//! [project]
//! resources = "Data"
//! cache = ".assetmill/cache"
//! state = ".assetmill"
//!
//! [pipeline]
//! extension = "assetpipeline"
//!
//! [process]
//! workers = 0
//! flavor = ["*"]
//! max_retries = 3
//!
//! [cache]
//! cleanup_interval = 16
//!
//! [watch]
//! debounce_ms = 300
//! poll_ms = 100
//! retry_ms = 2000
//! rescan_secs = 600
//!
//! [log]
//! verbose = false
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// `[project]`: directory layout. Relative paths are resolved against the
/// directory holding the config file; `~` is expanded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectSection {
    /// Resource root scanned for assets and pipeline files.
    pub resources: PathBuf,
    /// Output cache directory.
    pub cache: PathBuf,
    /// Directory for the persisted engine state.
    pub state: PathBuf,
}

impl Default for ProjectSection {
    fn default() -> Self {
        Self {
            resources: PathBuf::from("Data"),
            cache: PathBuf::from(".assetmill/cache"),
            state: PathBuf::from(".assetmill"),
        }
    }
}

/// `[pipeline]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSection {
    /// Pipeline file extension, with or without the leading dot.
    pub extension: String,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            extension: "assetpipeline".to_string(),
        }
    }
}

/// `[process]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessSection {
    /// Worker threads; 0 uses the available parallelism.
    pub workers: usize,
    /// Target flavor tags.
    pub flavor: Vec<String>,
    /// Consecutive failures before an asset waits for a source change.
    pub max_retries: u32,
}

impl Default for ProcessSection {
    fn default() -> Self {
        Self {
            workers: 0,
            flavor: vec!["*".to_string()],
            max_retries: 3,
        }
    }
}

/// `[cache]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    /// Update cycles between cleanup passes.
    pub cleanup_interval: u32,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            cleanup_interval: 16,
        }
    }
}

/// `[watch]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchSection {
    /// Quiet period before a burst of events is handed to the engine.
    pub debounce_ms: u64,
    /// Sleep between polls when nothing is pending.
    pub poll_ms: u64,
    /// Delay before failed assets get another cycle without any change.
    pub retry_ms: u64,
    /// Full rescan period; 0 disables it.
    pub rescan_secs: u64,
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            poll_ms: 100,
            retry_ms: 2000,
            rescan_secs: 600,
        }
    }
}

/// `[log]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSection {
    pub verbose: bool,
}
