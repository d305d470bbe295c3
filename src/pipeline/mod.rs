//! Pipeline files: discovery, loading, diffing and the transformer hierarchy.
//!
//! # Architecture
//!
//! ```text
//! *.assetpipeline files
//!        │  enumerate_pipeline_files / load_all_descriptors
//!        ▼
//! PipelineMap (name → PipelineDescriptor)
//!        │  PipelineDiff::compute(old, new)
//!        ▼
//! PipelineDiff ──► cache invalidation
//!        │
//!        ▼
//! TransformerHierarchy::rebuild ──► per-asset candidate transformers
//! ```

pub mod descriptor;
pub mod diff;
pub mod document;
pub mod flavor;
pub mod hierarchy;
pub mod loader;

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::transformer::TransformError;

pub use descriptor::{PipelineDescriptor, TransformerEntry};
pub use diff::PipelineDiff;
pub use document::{DocumentParser, JsonDocumentParser};
pub use flavor::Flavor;
pub use hierarchy::TransformerHierarchy;
pub use loader::{PipelineMap, enumerate_pipeline_files, load_all_descriptors};

/// Errors while loading a pipeline file. Logged, never fatal.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed pipeline: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("invalid pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid dependency `{0}`")]
    InvalidDependency(String),

    #[error(transparent)]
    Transformer(#[from] TransformError),
}
