//! Command-line interface module.

mod args;
pub mod build;
pub mod clean;
pub mod common;
pub mod status;
pub mod watch;

pub use args::{Cli, Commands};
