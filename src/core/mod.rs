//! Process-wide state shared between the CLI loop and signal handlers.

mod state;

pub use state::{is_shutdown, setup_shutdown_handler};
