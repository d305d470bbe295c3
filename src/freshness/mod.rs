//! Freshness primitives: mtime stamps for sources, blake3 fingerprints for
//! pipeline declarations.

mod hash;
pub mod mtime;

pub use hash::{ContentHash, fingerprint, hash_bytes};
pub use mtime::{FileTime, get_mtime};
