// SPDX-License-Identifier: Apache-2.0

//! Native tree watcher using the `notify` crate.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, RecvTimeoutError, channel};

use notify::event::{AccessKind, AccessMode, CreateKind, ModifyKind};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use super::{FileEvent, WatcherConfig, WatcherError, WriteTrigger};
use crate::bounded_channel::BoundedSender;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WatchStats {
    pub directories_registered: u64,
    pub registration_failures: u64,
    pub events_forwarded: u64,
}

/// Watches a directory tree and forwards write completions on regular files.
pub struct DirWatcher {
    root: PathBuf,
    config: WatcherConfig,
    watcher: RecommendedWatcher,
    receiver: Receiver<notify::Result<Event>>,
    stats: WatchStats,
}

impl DirWatcher {
    /// Create the notification subscription and register `root` and every directory below it.
    ///
    /// Fails when the root is missing, is not a directory or cannot be registered. Failures
    /// below the root are logged and counted.
    pub fn new(root: impl Into<PathBuf>, config: WatcherConfig) -> Result<Self, WatcherError> {
        let root = root.into();
        match fs::metadata(&root) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Err(WatcherError::NotADirectory(root)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(WatcherError::RootMissing(root));
            }
            Err(e) => {
                return Err(WatcherError::Register {
                    path: root,
                    source: notify::Error::io(e),
                });
            }
        }

        let (tx, rx) = channel();
        let watcher = RecommendedWatcher::new(
            move |res| {
                let _ = tx.send(res);
            },
            Config::default(),
        )
        .map_err(WatcherError::Init)?;

        let mut dir_watcher = Self {
            root,
            config,
            watcher,
            receiver: rx,
            stats: WatchStats::default(),
        };

        let root = dir_watcher.root.clone();
        dir_watcher.add_tree(&root)?;

        Ok(dir_watcher)
    }

    /// Register `dir` and all directories below it.
    ///
    /// Only a failure on `dir` itself is returned.
    fn add_tree(&mut self, dir: &Path) -> Result<(), WatcherError> {
        for entry in WalkDir::new(dir) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => {
                    return Err(WatcherError::Walk {
                        path: dir.to_path_buf(),
                        source: e,
                    });
                }
                Err(e) => {
                    warn!(path = ?e.path(), error = %e, "Failed to walk directory, skipping");
                    self.stats.registration_failures += 1;
                    continue;
                }
            };

            if !entry.file_type().is_dir() {
                continue;
            }

            match self.watcher.watch(entry.path(), RecursiveMode::NonRecursive) {
                Ok(()) => {
                    debug!(dir = %entry.path().display(), "Directory added to watcher");
                    self.stats.directories_registered += 1;
                }
                Err(e) if entry.depth() == 0 => {
                    return Err(WatcherError::Register {
                        path: entry.path().to_path_buf(),
                        source: e,
                    });
                }
                Err(e) => {
                    warn!(dir = %entry.path().display(), error = %e, "Failed to add directory to watcher");
                    self.stats.registration_failures += 1;
                }
            }
        }

        Ok(())
    }

    /// Block the calling thread, forwarding events until `cancel` fires, the receiving
    /// side of `events_tx` goes away or the notification stream is lost.
    ///
    /// Each send waits for the dispatcher to take the event. Cancellation is checked
    /// between notifications, at least once per poll interval.
    pub fn run(
        mut self,
        events_tx: BoundedSender<FileEvent>,
        cancel: CancellationToken,
    ) -> Result<WatchStats, WatcherError> {
        info!(
            root = %self.root.display(),
            directories = self.stats.directories_registered,
            trigger = ?self.config.write_trigger,
            "Watching directory tree"
        );

        while !cancel.is_cancelled() {
            let event = match self.receiver.recv_timeout(self.config.poll_interval) {
                Ok(Ok(event)) => event,
                Ok(Err(e)) => {
                    warn!(error = %e, "File watcher error");
                    continue;
                }
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    error!("File watcher notification stream closed");
                    return Err(WatcherError::StreamClosed);
                }
            };

            if event.need_rescan() {
                warn!("Notification queue overflowed, some file events were lost");
            }

            for file_event in self.classify(event) {
                debug!(path = %file_event.path.display(), "File ready");
                if events_tx.send_blocking(file_event).is_err() {
                    warn!("Dispatcher is gone, stopping watcher");
                    return Ok(self.stats);
                }
                self.stats.events_forwarded += 1;
            }
        }

        debug!("Watcher cancelled");
        Ok(self.stats)
    }

    fn classify(&mut self, event: Event) -> Vec<FileEvent> {
        match event.kind {
            EventKind::Create(kind) => {
                for path in &event.paths {
                    if kind == CreateKind::Folder || path.is_dir() {
                        if let Err(e) = self.add_tree(path) {
                            warn!(dir = %path.display(), error = %e, "Failed to add new directory to watcher");
                            self.stats.registration_failures += 1;
                        }
                    } else {
                        debug!(path = %path.display(), "File created");
                    }
                }
                Vec::new()
            }
            EventKind::Access(AccessKind::Close(AccessMode::Write))
                if self.config.write_trigger == WriteTrigger::Close =>
            {
                written_files(event.paths)
            }
            EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Any)
                if self.config.write_trigger == WriteTrigger::Modify =>
            {
                written_files(event.paths)
            }
            _ => Vec::new(),
        }
    }
}

fn written_files(paths: Vec<PathBuf>) -> Vec<FileEvent> {
    paths
        .into_iter()
        .filter(|path| path.is_file())
        .map(FileEvent::written)
        .collect()
}
