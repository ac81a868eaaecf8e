// SPDX-License-Identifier: Apache-2.0

//! Directory tree watcher.
//!
//! Every directory under the root is registered individually with the OS notification
//! backend (inotify on Linux) so that directories created while running can be picked up
//! on their `Create` event. Only write completions on regular files are forwarded.

mod event;
mod native;

pub use event::{FileEvent, FileOperation};
pub use native::{DirWatcher, WatchStats};

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Which notification marks a file as ready to read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum WriteTrigger {
    /// A writer closed the file (`IN_CLOSE_WRITE`).
    #[default]
    Close,
    /// Any data modification. Producers that write in several steps may be read early.
    Modify,
}

/// Configuration for the directory watcher
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// How long the watcher waits for a notification before checking for cancellation
    pub poll_interval: Duration,
    pub write_trigger: WriteTrigger,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(250),
            write_trigger: WriteTrigger::Close,
        }
    }
}

#[derive(Error, Debug)]
pub enum WatcherError {
    #[error("failed to initialize notification backend: {0}")]
    Init(#[source] notify::Error),

    #[error("watch root {} does not exist", .0.display())]
    RootMissing(PathBuf),

    #[error("watch root {} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("failed to register {}: {source}", path.display())]
    Register {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    #[error("failed to walk {}: {source}", path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("notification stream closed")]
    StreamClosed,
}
