//! Asset transformers.
//!
//! A transformer turns one source asset into zero or more output files in
//! the cache directory. Pipelines name transformers by type; the
//! [`TransformerRegistry`] turns a `(type, config)` declaration into a shared
//! instance.
//!
//! # Output layout
//!
//! ```text
//! <cache>/
//! └── textures/
//!     └── a.png.d/          ← output dir of "textures/a.png"
//!         └── a.png
//! ```
//!
//! Output names are always relative to the cache directory.

pub mod builtin;
mod registry;

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::pipeline::Flavor;
use crate::utils::path::resource::{file_name, normalize_name};
use crate::utils::path::{RESOURCE_NAME_SUFFIX, ensure_parent, to_file_path};

pub use registry::TransformerRegistry;

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("unknown transformer type `{0}`")]
    UnknownType(String),

    #[error("invalid configuration for `{type_name}`: {message}")]
    InvalidConfig { type_name: String, message: String },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{0}")]
    Failed(String),
}

impl TransformError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

// =============================================================================
// Capability trait
// =============================================================================

/// One transformation step.
///
/// Instances are created once per pipeline load and shared across worker
/// threads, so `execute` takes `&self`.
pub trait Transformer: Send + Sync + fmt::Debug {
    /// Reject configurations that deserialized but cannot work.
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }

    /// Whether this transformer can handle the asset at all.
    fn is_applicable(&self, _resource_name: &str) -> bool {
        true
    }

    fn execute(
        &self,
        input: &TransformInput<'_>,
        output: &mut TransformOutput,
    ) -> Result<(), TransformError>;
}

// =============================================================================
// Input / Output
// =============================================================================

/// Everything a transformer may read while processing one asset.
#[derive(Debug, Clone, Copy)]
pub struct TransformInput<'a> {
    pub resource_name: &'a str,
    /// Absolute path of the source file.
    pub input_file: &'a Path,
    pub cache_dir: &'a Path,
    pub flavor: &'a Flavor,
}

impl TransformInput<'_> {
    /// Resource name of this asset's output directory, relative to the cache.
    pub fn output_prefix(&self) -> String {
        format!("{}{RESOURCE_NAME_SUFFIX}", self.resource_name)
    }

    /// Absolute path of this asset's output directory.
    pub fn output_dir(&self) -> PathBuf {
        to_file_path(self.cache_dir, &self.output_prefix())
    }

    /// Output name for `file` inside this asset's output directory.
    pub fn output_name(&self, file: &str) -> String {
        format!("{}/{file}", self.output_prefix())
    }

    /// File name of the source (`"textures/a.png"` → `"a.png"`).
    pub fn file_name(&self) -> &str {
        file_name(self.resource_name)
    }

    /// Source file name without its last extension.
    pub fn file_stem(&self) -> &str {
        let name = self.file_name();
        match name.rfind('.') {
            Some(idx) if idx > 0 => &name[..idx],
            _ => name,
        }
    }

    /// Read the source file.
    pub fn read(&self) -> Result<Vec<u8>, TransformError> {
        std::fs::read(self.input_file).map_err(|e| TransformError::io(self.input_file, e))
    }
}

/// Outputs produced while processing one asset, across all transformers.
#[derive(Debug)]
pub struct TransformOutput {
    cache_dir: PathBuf,
    outputs: Vec<String>,
}

impl TransformOutput {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            outputs: Vec::new(),
        }
    }

    /// Write `bytes` to the output `name` and record it.
    pub fn write(&mut self, name: &str, bytes: &[u8]) -> Result<(), TransformError> {
        let path = self.resolve(name)?;
        ensure_parent(&path).map_err(|e| TransformError::io(&path, e))?;
        std::fs::write(&path, bytes).map_err(|e| TransformError::io(&path, e))?;
        self.add(name)
    }

    /// Record an output that was already written to disk (e.g. by a tool).
    pub fn add(&mut self, name: &str) -> Result<(), TransformError> {
        let name = checked_name(name)?;
        if !self.outputs.contains(&name) {
            self.outputs.push(name);
        }
        Ok(())
    }

    /// Absolute path of output `name`.
    pub fn resolve(&self, name: &str) -> Result<PathBuf, TransformError> {
        Ok(to_file_path(&self.cache_dir, &checked_name(name)?))
    }

    pub fn outputs(&self) -> &[String] {
        &self.outputs
    }

    pub fn into_outputs(self) -> Vec<String> {
        self.outputs
    }
}

fn checked_name(name: &str) -> Result<String, TransformError> {
    match normalize_name(name) {
        Some(normalized) if !normalized.is_empty() => Ok(normalized),
        _ => Err(TransformError::Failed(format!(
            "output `{name}` is outside the cache directory"
        ))),
    }
}
