// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use tokio::sync::oneshot;
use tracing::{debug, info};

use crate::bounded_channel::BoundedReceiver;
use crate::exporters::RecordSink;
use crate::record::Record;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExportStats {
    pub records: u64,
    pub entries: u64,
}

/// Last pipeline stage, the only writer of the sink.
pub struct Exporter<S: ?Sized> {
    rx: BoundedReceiver<Record>,
    sink: Arc<S>,
}

impl<S: RecordSink + ?Sized> Exporter<S> {
    pub fn new(rx: BoundedReceiver<Record>, sink: Arc<S>) -> Self {
        Self { rx, sink }
    }

    /// Export records until the queue closes, then report on `finished`.
    ///
    /// There is no cancellation input: the exporter stops only once the dispatcher has
    /// dropped its sender, so everything handed over is exported.
    pub async fn start(mut self, finished: oneshot::Sender<ExportStats>) {
        let mut stats = ExportStats::default();

        while let Some(record) = self.rx.next().await {
            let entries = record.len();
            debug!(record_type = %record.kind(), entries, "Exporting record");
            self.sink.export(&record);

            stats.records += 1;
            stats.entries += entries as u64;
        }

        info!(
            records = stats.records,
            entries = stats.entries,
            "Export finished"
        );
        let _ = finished.send(stats);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounded_channel::rendezvous;
    use crate::record::{IpBatch, IpEntry, RecordKind, StorageBatch, VmBatch, VmEntry};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        seen: Mutex<Vec<(RecordKind, usize)>>,
    }

    impl RecordSink for RecordingSink {
        fn export(&self, record: &Record) {
            self.seen
                .lock()
                .unwrap()
                .push((record.kind(), record.len()));
        }
    }

    #[tokio::test]
    async fn test_exports_in_order_and_signals_once() {
        let (tx, rx) = rendezvous();
        let sink = Arc::new(RecordingSink::default());
        let (finished_tx, finished_rx) = oneshot::channel();
        let jh = tokio::spawn(Exporter::new(rx, sink.clone()).start(finished_tx));

        tx.send(Record::Vm(VmBatch {
            vms: vec![VmEntry::default(), VmEntry::default()],
        }))
        .await
        .unwrap();
        tx.send(Record::Storage(StorageBatch::default()))
            .await
            .unwrap();
        tx.send(Record::Ip(IpBatch {
            ips: vec![IpEntry::default()],
        }))
        .await
        .unwrap();
        drop(tx);

        let stats = finished_rx.await.unwrap();
        assert_eq!(ExportStats { records: 3, entries: 3 }, stats);
        jh.await.unwrap();

        assert_eq!(
            vec![
                (RecordKind::Vm, 2),
                (RecordKind::Storage, 0),
                (RecordKind::Ip, 1)
            ],
            *sink.seen.lock().unwrap()
        );
    }

    #[tokio::test]
    async fn test_closed_queue_finishes_immediately() {
        let (tx, rx) = rendezvous::<Record>();
        drop(tx);

        let (finished_tx, finished_rx) = oneshot::channel();
        Exporter::new(rx, Arc::new(RecordingSink::default()))
            .start(finished_tx)
            .await;
        assert_eq!(ExportStats::default(), finished_rx.await.unwrap());
    }
}
