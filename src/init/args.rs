// SPDX-License-Identifier: Apache-2.0

use crate::init::parse;
use crate::watcher::{WatcherConfig, WriteTrigger};
use clap::Args;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Args, Clone)]
pub struct AgentRun {
    /// Root of the directory tree that producers write exports into
    #[arg(long, env = "GOAT_EXPORTER_WATCH_DIR")]
    pub watch_dir: PathBuf,

    /// Prometheus scrape endpoint
    #[arg(
        long,
        env = "GOAT_EXPORTER_METRICS_ENDPOINT",
        default_value = "localhost:9623",
        value_parser = parse::parse_endpoint
    )]
    pub metrics_endpoint: SocketAddr,

    /// How often an idle watcher checks for shutdown, in milliseconds
    #[arg(
        long = "watch-poll-interval-ms",
        env = "GOAT_EXPORTER_WATCH_POLL_INTERVAL_MS",
        default_value = "250",
        value_parser = parse::parse_millis
    )]
    pub watch_poll_interval: Duration,

    /// Notification that marks a file as completely written
    #[arg(
        value_enum,
        long,
        env = "GOAT_EXPORTER_WRITE_TRIGGER",
        default_value = "close"
    )]
    pub write_trigger: WriteTrigger,

    /// Deadline for in-flight files to drain on shutdown, in milliseconds
    #[arg(
        long = "shutdown-drain-timeout-ms",
        env = "GOAT_EXPORTER_SHUTDOWN_DRAIN_TIMEOUT_MS",
        default_value = "30000",
        value_parser = parse::parse_millis
    )]
    pub shutdown_drain_timeout: Duration,
}

impl AgentRun {
    /// Defaults for everything except the watched directory.
    pub fn new(watch_dir: impl Into<PathBuf>) -> Self {
        Self {
            watch_dir: watch_dir.into(),
            metrics_endpoint: SocketAddr::from(([127, 0, 0, 1], 9623)),
            watch_poll_interval: Duration::from_millis(250),
            write_trigger: WriteTrigger::Close,
            shutdown_drain_timeout: Duration::from_secs(30),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.watch_dir.as_os_str().is_empty() {
            return Err("watch directory must not be empty".to_string());
        }
        if self.watch_poll_interval >= self.shutdown_drain_timeout {
            return Err(format!(
                "watch poll interval ({:?}) must be shorter than the shutdown drain timeout ({:?})",
                self.watch_poll_interval, self.shutdown_drain_timeout
            ));
        }
        Ok(())
    }

    pub fn watcher_config(&self) -> WatcherConfig {
        WatcherConfig {
            poll_interval: self.watch_poll_interval,
            write_trigger: self.write_trigger,
        }
    }
}
