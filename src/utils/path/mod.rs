//! Path utilities.
//!
//! - [`fs`]: Filesystem path helpers (`normalize_path`, `ensure_parent`, `collect_files`, ...)
//! - [`resource`]: Resource-name arithmetic (`is_under`, `parent_dir`, `to_resource_name`, ...)

pub mod fs;
pub mod resource;

pub use fs::{collect_files, ensure_parent, normalize_path, remove_empty_dirs};
pub use resource::{
    RESOURCE_NAME_SUFFIX, collapse_nested, is_hidden, is_managed_output, is_under, parent_dir,
    to_file_path, to_resource_name,
};
