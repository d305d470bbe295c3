use std::path::Path;
use std::time::{Duration, Instant};

use super::{ChangeKind, ChangeSet, is_temp_file, merge_change};
use crate::utils::path::normalize_path;

/// Pure debouncer: timing and event levelling, no business logic.
#[derive(Debug)]
pub struct Debouncer {
    changes: ChangeSet,
    last_event: Option<Instant>,
    debounce: Duration,
}

impl Debouncer {
    pub fn new(debounce: Duration) -> Self {
        Self {
            changes: ChangeSet::default(),
            last_event: None,
            debounce,
        }
    }

    /// Add one change for `path`. Temp files are ignored.
    pub fn add(&mut self, path: &Path, kind: ChangeKind) {
        if is_temp_file(path) {
            return;
        }
        let path = normalize_path(path);
        crate::debug!("watch"; "event {}: {}", kind.label(), path.display());
        if merge_change(&mut self.changes, path, kind) {
            self.last_event = Some(Instant::now());
        }
    }

    /// Add a notify event. Freshness is judged by mtime, so write-time
    /// changes count as modifications; access time, permission and
    /// ownership changes are dropped.
    pub fn add_event(&mut self, event: &notify::Event) {
        use notify::EventKind;
        use notify::event::{MetadataKind, ModifyKind, RenameMode};

        let kind = match event.kind {
            EventKind::Create(_) => ChangeKind::Created,
            EventKind::Remove(_) => ChangeKind::Removed,
            EventKind::Modify(ModifyKind::Metadata(
                MetadataKind::WriteTime | MetadataKind::Any,
            )) => ChangeKind::Modified,
            EventKind::Modify(ModifyKind::Metadata(_)) => return,
            EventKind::Modify(ModifyKind::Name(RenameMode::From)) => ChangeKind::Removed,
            EventKind::Modify(ModifyKind::Name(RenameMode::To)) => ChangeKind::Created,
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if event.paths.len() == 2 => {
                self.add(&event.paths[0], ChangeKind::Removed);
                self.add(&event.paths[1], ChangeKind::Created);
                return;
            }
            EventKind::Modify(_) => ChangeKind::Modified,
            _ => return,
        };

        for path in &event.paths {
            self.add(path, kind);
        }
    }

    /// Take the levelled changes once the debounce window has passed.
    pub fn take_if_ready(&mut self) -> Option<ChangeSet> {
        if !self.is_ready() {
            return None;
        }
        self.last_event = None;
        Some(std::mem::take(&mut self.changes))
    }

    pub fn is_ready(&self) -> bool {
        let Some(last_event) = self.last_event else {
            return false;
        };
        last_event.elapsed() >= self.debounce && !self.changes.is_empty()
    }

    /// Time until the pending changes become ready.
    pub fn sleep_duration(&self) -> Option<Duration> {
        let last_event = self.last_event?;
        Some(
            self.debounce
                .saturating_sub(last_event.elapsed())
                .max(Duration::from_millis(1)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn make_event(paths: Vec<&str>, kind: notify::EventKind) -> notify::Event {
        notify::Event {
            kind,
            paths: paths.into_iter().map(PathBuf::from).collect(),
            attrs: Default::default(),
        }
    }

    fn modify_kind() -> notify::EventKind {
        notify::EventKind::Modify(notify::event::ModifyKind::Data(
            notify::event::DataChange::Any,
        ))
    }

    fn create_kind() -> notify::EventKind {
        notify::EventKind::Create(notify::event::CreateKind::File)
    }

    fn remove_kind() -> notify::EventKind {
        notify::EventKind::Remove(notify::event::RemoveKind::File)
    }

    #[test]
    fn test_debouncer_empty() {
        let mut debouncer = Debouncer::new(Duration::ZERO);
        assert!(!debouncer.is_ready());
        assert!(debouncer.take_if_ready().is_none());
        assert!(debouncer.sleep_duration().is_none());
    }

    #[test]
    fn test_event_kinds() {
        let mut debouncer = Debouncer::new(Duration::ZERO);

        debouncer.add_event(&make_event(vec!["/tmp/a.png"], create_kind()));
        debouncer.add_event(&make_event(vec!["/tmp/b.png"], modify_kind()));
        debouncer.add_event(&make_event(vec!["/tmp/c.png"], remove_kind()));
        debouncer.add_event(&make_event(vec!["/tmp/d.png~"], modify_kind()));

        let changes = debouncer.take_if_ready().unwrap();
        assert_eq!(changes.len(), 3);
        assert_eq!(changes[&PathBuf::from("/tmp/a.png")], ChangeKind::Created);
        assert_eq!(changes[&PathBuf::from("/tmp/b.png")], ChangeKind::Modified);
        assert_eq!(changes[&PathBuf::from("/tmp/c.png")], ChangeKind::Removed);
        assert!(debouncer.take_if_ready().is_none());
    }

    fn metadata_kind(kind: notify::event::MetadataKind) -> notify::EventKind {
        notify::EventKind::Modify(notify::event::ModifyKind::Metadata(kind))
    }

    #[test]
    fn test_write_time_change_is_modification() {
        use notify::event::MetadataKind;

        let mut debouncer = Debouncer::new(Duration::ZERO);
        let events = [
            ("/tmp/touched.png", MetadataKind::WriteTime),
            ("/tmp/any.png", MetadataKind::Any),
            ("/tmp/read.png", MetadataKind::AccessTime),
            ("/tmp/chmod.png", MetadataKind::Permissions),
            ("/tmp/chown.png", MetadataKind::Ownership),
        ];
        for (path, kind) in events {
            debouncer.add_event(&make_event(vec![path], metadata_kind(kind)));
        }

        let changes = debouncer.take_if_ready().unwrap();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[&PathBuf::from("/tmp/touched.png")], ChangeKind::Modified);
        assert_eq!(changes[&PathBuf::from("/tmp/any.png")], ChangeKind::Modified);
    }

    #[test]
    fn test_rename_both() {
        let mut debouncer = Debouncer::new(Duration::ZERO);
        debouncer.add_event(&make_event(
            vec!["/tmp/old.png", "/tmp/new.png"],
            notify::EventKind::Modify(notify::event::ModifyKind::Name(
                notify::event::RenameMode::Both,
            )),
        ));

        let changes = debouncer.take_if_ready().unwrap();
        assert_eq!(changes[&PathBuf::from("/tmp/old.png")], ChangeKind::Removed);
        assert_eq!(changes[&PathBuf::from("/tmp/new.png")], ChangeKind::Created);
    }

    #[test]
    fn test_debounce_window() {
        let mut debouncer = Debouncer::new(Duration::from_secs(3600));
        debouncer.add_event(&make_event(vec!["/tmp/a.png"], modify_kind()));

        assert!(!debouncer.is_ready());
        assert!(debouncer.take_if_ready().is_none());
        assert!(debouncer.sleep_duration().unwrap() > Duration::from_secs(60));
    }

    #[test]
    fn test_created_then_removed_is_not_ready() {
        let mut debouncer = Debouncer::new(Duration::ZERO);
        debouncer.add_event(&make_event(vec!["/tmp/a.png"], create_kind()));
        debouncer.add_event(&make_event(vec!["/tmp/a.png"], remove_kind()));

        assert!(!debouncer.is_ready());
    }
}
