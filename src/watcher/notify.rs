use std::path::Path;
use std::time::Duration;

use crossbeam::channel::{Receiver, unbounded};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};

use super::{ChangeSet, ChangeSource, Debouncer};
use crate::log;

/// Recursive `notify` watcher over one root, levelled by a [`Debouncer`].
///
/// The watcher starts buffering events as soon as it is created, so
/// changes made during the initial update are not lost.
pub struct NotifyWatcher {
    /// Kept alive for the lifetime of the source.
    _watcher: RecommendedWatcher,
    rx: Receiver<notify::Result<notify::Event>>,
    debouncer: Debouncer,
}

impl NotifyWatcher {
    pub fn new(root: &Path, debounce: Duration) -> notify::Result<Self> {
        let (tx, rx) = unbounded();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = tx.send(res);
        })?;
        watcher.watch(root, RecursiveMode::Recursive)?;

        Ok(Self {
            _watcher: watcher,
            rx,
            debouncer: Debouncer::new(debounce),
        })
    }

    /// Time until buffered changes become ready, if any are buffered.
    pub fn sleep_duration(&self) -> Option<Duration> {
        self.debouncer.sleep_duration()
    }

    fn drain(&mut self) {
        for result in self.rx.try_iter() {
            match result {
                Ok(event) => self.debouncer.add_event(&event),
                Err(e) => log!("watch"; "notify error: {e}"),
            }
        }
    }
}

impl ChangeSource for NotifyWatcher {
    fn poll(&mut self) -> ChangeSet {
        self.drain();
        self.debouncer.take_if_ready().unwrap_or_default()
    }
}
