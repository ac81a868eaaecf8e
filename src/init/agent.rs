// SPDX-License-Identifier: Apache-2.0

use crate::bounded_channel::rendezvous;
use crate::exporters::gauge::Gauges;
use crate::exporters::{ExportStats, Exporter, RecordSink};
use crate::init::args::AgentRun;
use crate::init::wait::{self, TaskSet};
use crate::listener::Listener;
use crate::parser::{DispatchStats, Dispatcher};
use crate::record::Record;
use crate::telemetry::metrics_server::MetricsServer;
use crate::watcher::{DirWatcher, FileEvent, WatchStats};
use prometheus::Registry;
use std::sync::Arc;
use std::time::Duration;
use tokio::select;
use tokio::sync::oneshot;
use tokio::time::{Instant, timeout_at};
use tokio_util::sync::CancellationToken;
use tower::BoxError;
use tracing::{debug, error, info, warn};

const METRICS_SERVER_STOP_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AgentState {
    Running,
    Draining,
}

/// Counters reported by each stage once the pipeline has stopped.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PipelineStats {
    pub watch: WatchStats,
    pub dispatch: DispatchStats,
    pub export: ExportStats,
}

pub struct Agent {
    config: AgentRun,
    listener: Listener,
    registry: Registry,
    sink: Option<Arc<dyn RecordSink>>,
}

impl Agent {
    pub fn new(config: AgentRun, listener: Listener) -> Self {
        Self {
            config,
            listener,
            registry: Registry::new(),
            sink: None,
        }
    }

    /// Publish gauges into `registry` instead of a private one.
    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.registry = registry;
        self
    }

    /// Export records to `sink` instead of the registry gauges.
    pub fn with_sink(mut self, sink: Arc<dyn RecordSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Run the pipeline until `agent_cancel` fires, then drain it.
    ///
    /// Shutdown order: the watcher stops and drops the only event sender, the dispatcher
    /// finishes the files it was handed and drops the record sender, the exporter exports
    /// what it receives and reports completion. Only then does the scrape endpoint stop.
    pub async fn run(self, agent_cancel: CancellationToken) -> Result<PipelineStats, BoxError> {
        let config = self.config;
        config.validate()?;

        info!(watch_dir = %config.watch_dir.display(), "Starting goat-exporter.");

        let sink: Arc<dyn RecordSink> = match self.sink {
            Some(sink) => sink,
            None => {
                let gauges = Gauges::new()?;
                gauges.register(&self.registry)?;
                Arc::new(gauges)
            }
        };

        // Fails on a missing root before anything else is started
        let watcher = DirWatcher::new(&config.watch_dir, config.watcher_config())?;

        let mut server_task_set = TaskSet::new();
        let server_cancel = CancellationToken::new();
        {
            let server = MetricsServer::new(self.registry.clone());
            let listener = self.listener;
            let cancel = server_cancel.clone();
            server_task_set.spawn(async move { server.serve(listener, cancel).await });
        }

        let (events_tx, events_rx) = rendezvous::<FileEvent>();
        let (records_tx, records_rx) = rendezvous::<Record>();

        let (export_done_tx, export_done_rx) = oneshot::channel();
        let exporter_handle = tokio::spawn(Exporter::new(records_rx, sink).start(export_done_tx));

        let dispatcher_stop = CancellationToken::new();
        let mut dispatcher_handle =
            tokio::spawn(Dispatcher::new(events_rx, records_tx).run(dispatcher_stop.clone()));

        let watcher_cancel = CancellationToken::new();
        let (watcher_done_tx, mut watcher_done_rx) = oneshot::channel();
        let watcher_thread = {
            let cancel = watcher_cancel.clone();
            std::thread::Builder::new()
                .name("dir-watcher".to_string())
                .spawn(move || {
                    let _ = watcher_done_tx.send(watcher.run(events_tx, cancel));
                })?
        };

        let mut state = AgentState::Running;
        debug!(?state, "Pipeline started.");

        let mut result: Result<(), BoxError> = Ok(());
        let mut watcher_outcome = None;
        select! {
            _ = agent_cancel.cancelled() => {
                debug!("Agent cancellation signaled.");
            },
            res = &mut watcher_done_rx => {
                watcher_outcome = Some(res);
            },
            e = wait::wait_for_any_task(&mut server_task_set) => {
                match e {
                    Ok(()) => warn!("Unexpected early exit of metrics server."),
                    Err(e) => result = Err(e),
                }
            },
        }

        state = AgentState::Draining;
        info!(?state, "Stopping watcher and draining pipeline.");
        let drain_deadline = Instant::now() + config.shutdown_drain_timeout;

        // Step one, stop the watcher. The event queue closes when its thread drops the sender.
        watcher_cancel.cancel();
        let watcher_outcome = match watcher_outcome {
            Some(outcome) => Some(outcome),
            None => timeout_at(drain_deadline, watcher_done_rx).await.ok(),
        };
        let mut watch_stats = WatchStats::default();
        match watcher_outcome {
            Some(Ok(Ok(stats))) => watch_stats = stats,
            Some(Ok(Err(e))) => {
                error!(error = %e, "Watcher failed, no further files will be ingested.");
                if result.is_ok() {
                    result = Err(e.into());
                }
            }
            Some(Err(_)) => error!("Watcher thread exited without reporting."),
            None => warn!("Watcher did not stop before the drain deadline."),
        }

        // Step two, the dispatcher drains every event it accepted, then closes the record queue.
        let dispatch_stats = match timeout_at(drain_deadline, &mut dispatcher_handle).await {
            Ok(res) => res,
            Err(_) => {
                warn!("Dispatcher did not drain before the deadline, force stopping.");
                dispatcher_stop.cancel();
                dispatcher_handle.await
            }
        };
        let dispatch_stats = dispatch_stats.unwrap_or_else(|e| {
            error!(error = %e, "Dispatcher task failed.");
            DispatchStats::default()
        });

        // Step three, block on the exporter's completion signal.
        let export_stats = match export_done_rx.await {
            Ok(stats) => stats,
            Err(_) => {
                error!("Exporter exited without signalling completion.");
                Default::default()
            }
        };
        if let Err(e) = exporter_handle.await {
            error!(error = %e, "Exporter task failed.");
        }

        // The watcher is unblocked by now: either cancelled or its receiver is gone.
        match tokio::task::spawn_blocking(move || watcher_thread.join()).await {
            Ok(Ok(())) => debug!("Watcher thread joined."),
            Ok(Err(_)) => error!("Watcher thread panicked."),
            Err(e) => error!(error = %e, "Failed to join watcher thread."),
        }

        server_cancel.cancel();
        if let Err(e) =
            wait::wait_for_tasks_with_timeout(&mut server_task_set, METRICS_SERVER_STOP_TIMEOUT)
                .await
        {
            warn!(error = %e, "Metrics server did not stop cleanly.");
        }

        info!(
            directories_registered = watch_stats.directories_registered,
            events_forwarded = watch_stats.events_forwarded,
            files_decoded = dispatch_stats.files_decoded,
            files_rejected = dispatch_stats.files_rejected,
            records_dropped = dispatch_stats.records_dropped,
            records_exported = export_stats.records,
            entries_exported = export_stats.entries,
            "Pipeline stopped."
        );

        result.map(|()| PipelineStats {
            watch: watch_stats,
            dispatch: dispatch_stats,
            export: export_stats,
        })
    }
}
