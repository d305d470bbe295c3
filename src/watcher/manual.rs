use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{ChangeKind, ChangeSet, ChangeSource, merge_change};
use crate::utils::path::normalize_path;

/// Change source fed by explicit pushes.
///
/// Cloning yields another handle to the same buffer, so one handle can be
/// given to the engine while another reports changes.
#[derive(Debug, Clone, Default)]
pub struct ManualChanges {
    pending: Arc<Mutex<ChangeSet>>,
}

impl ManualChanges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, path: &Path, kind: ChangeKind) {
        merge_change(&mut self.pending.lock(), normalize_path(path), kind);
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }
}

impl ChangeSource for ManualChanges {
    fn poll(&mut self) -> ChangeSet {
        std::mem::take(&mut *self.pending.lock())
    }
}
