// SPDX-License-Identifier: Apache-2.0

//! Content sniffing, the three record decoders, and the dispatcher that ties them to the
//! watcher output.

pub mod apel;
pub mod error;
pub mod json;
pub mod sniff;
pub mod xml;

pub use error::{DecodeError, FileError};

use std::fs::File;
use std::io::{Cursor, Read};
use std::path::Path;

use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::bounded_channel::{BoundedReceiver, BoundedSender};
use crate::record::{Record, RecordKind};
use crate::watcher::FileEvent;

/// Decode `input` with the decoder for `kind`.
pub fn decode<R: Read>(kind: RecordKind, input: R) -> Result<Record, DecodeError> {
    match kind {
        RecordKind::Ip => json::ip_records(input).map(Record::from),
        RecordKind::Storage => xml::storage_records(input).map(Record::from),
        RecordKind::Vm => apel::vm_records(input).map(Record::from),
    }
}

/// Open, sniff and decode a single file. Blocking.
///
/// The sniffed head is chained back in front of the rest of the file so decoders see
/// the whole stream. The file is closed when this returns, on every path.
pub fn decode_file(path: &Path) -> Result<Record, FileError> {
    let mut file = File::open(path).map_err(FileError::Open)?;
    let head = sniff::read_head(&mut file).map_err(FileError::Read)?;

    let media_type = sniff::sniff(&head);
    let kind = media_type
        .record_kind()
        .ok_or(FileError::Unsupported(media_type))?;

    decode(kind, Cursor::new(head).chain(file)).map_err(|source| FileError::Decode { kind, source })
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchStats {
    pub files_decoded: u64,
    pub files_rejected: u64,
    pub records_dropped: u64,
}

/// Turns file events into records, one file at a time in arrival order.
pub struct Dispatcher {
    events_rx: BoundedReceiver<FileEvent>,
    records_tx: BoundedSender<Record>,
}

impl Dispatcher {
    pub fn new(events_rx: BoundedReceiver<FileEvent>, records_tx: BoundedSender<Record>) -> Self {
        Self {
            events_rx,
            records_tx,
        }
    }

    /// Run until the event queue closes. Dropping `self` on return closes the record
    /// queue.
    ///
    /// `force_stop` abandons the drain: a record decoded but not yet handed over is logged
    /// as dropped.
    pub async fn run(mut self, force_stop: CancellationToken) -> DispatchStats {
        let mut stats = DispatchStats::default();

        loop {
            let event = select! {
                biased;

                _ = force_stop.cancelled() => {
                    warn!("Dispatcher force stopped, pending file events are abandoned");
                    break;
                }
                event = self.events_rx.next() => match event {
                    Some(event) => event,
                    None => break,
                },
            };

            let path = event.path.clone();
            let decoded = tokio::task::spawn_blocking(move || decode_file(&event.path)).await;

            let record = match decoded {
                Ok(Ok(record)) => record,
                Ok(Err(e)) => {
                    log_rejected(&path, &e);
                    stats.files_rejected += 1;
                    continue;
                }
                Err(e) => {
                    error!(path = %path.display(), error = %e, "Decode task failed");
                    stats.files_rejected += 1;
                    continue;
                }
            };
            stats.files_decoded += 1;

            let record_type = record.kind();
            let entries = record.len();
            debug!(path = %path.display(), %record_type, entries, "Decoded file");

            let sent = select! {
                biased;

                _ = force_stop.cancelled() => false,
                res = self.records_tx.send(record) => res.is_ok(),
            };

            if !sent {
                warn!(
                    path = %path.display(),
                    %record_type,
                    entries,
                    "Record dropped before export"
                );
                stats.records_dropped += 1;
                break;
            }
        }

        debug!(
            files_decoded = stats.files_decoded,
            files_rejected = stats.files_rejected,
            "Dispatcher exiting"
        );
        stats
    }
}

fn log_rejected(path: &Path, err: &FileError) {
    match err {
        FileError::Unsupported(media_type) => {
            warn!(path = %path.display(), %media_type, "Unsupported file content, skipping")
        }
        FileError::Decode { kind, source } => {
            error!(path = %path.display(), record_type = %kind, error = %source, "Failed to decode file")
        }
        FileError::Open(e) | FileError::Read(e) => {
            error!(path = %path.display(), error = %e, "Failed to read file")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounded_channel::rendezvous;
    use crate::parser::sniff::MediaType;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const IP_EXPORT: &str = r#"{"Ips": [{"SiteName": "a", "IPCount": 1}, {"SiteName": "b", "IPCount": 2}]}"#;
    const STORAGE_EXPORT: &str =
        "<?xml version=\"1.0\"?>\n<STORAGES><STORAGE><RECORD_ID>r1</RECORD_ID></STORAGE></STORAGES>";
    const VM_EXPORT: &str = "APEL-cloud-message: v0.4\nVMUUID: 1\n%%\nVMUUID: 2\n%%\nVMUUID: 3\n%%\n";

    fn write(dir: &TempDir, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_routes_by_content_not_extension() {
        let dir = TempDir::new().unwrap();

        let ip = decode_file(&write(&dir, "export.xml", IP_EXPORT.as_bytes())).unwrap();
        assert_eq!(RecordKind::Ip, ip.kind());
        assert_eq!(2, ip.len());

        let storage = decode_file(&write(&dir, "export.json", STORAGE_EXPORT.as_bytes())).unwrap();
        assert_eq!(RecordKind::Storage, storage.kind());
        assert_eq!(1, storage.len());

        let vm = decode_file(&write(&dir, "export", VM_EXPORT.as_bytes())).unwrap();
        assert_eq!(RecordKind::Vm, vm.kind());
        assert_eq!(3, vm.len());
    }

    #[test]
    fn test_content_longer_than_sniff_window() {
        let dir = TempDir::new().unwrap();
        let mut content = String::from("APEL-cloud-message: v0.4\n");
        let mut count = 0;
        while content.len() < sniff::SNIFF_LEN * 3 {
            content.push_str(&format!("VMUUID: {count}\nSiteName: CESNET\n%%\n"));
            count += 1;
        }

        let record = decode_file(&write(&dir, "big", content.as_bytes())).unwrap();
        assert_eq!(count, record.len());
    }

    #[test]
    fn test_binary_is_unsupported() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "blob.gz", b"\x1f\x8b\x08\x00\x00\x00");
        assert!(matches!(
            decode_file(&path),
            Err(FileError::Unsupported(MediaType::OctetStream))
        ));
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = decode_file(&dir.path().join("gone")).unwrap_err();
        assert!(matches!(err, FileError::Open(_)));
        assert_eq!(None, err.record_kind());
    }

    #[test]
    fn test_structural_error_carries_record_kind() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "bad", b"{\"Ips\": {\"SiteName\": 1}}");
        let err = decode_file(&path).unwrap_err();
        assert_eq!(Some(RecordKind::Ip), err.record_kind());

        // Not JSON, so it is read as an APEL message without a banner
        let path = write(&dir, "truncated", b"{\"Ips\": [");
        let err = decode_file(&path).unwrap_err();
        assert_eq!(Some(RecordKind::Vm), err.record_kind());

        let path = write(&dir, "empty", b"");
        let err = decode_file(&path).unwrap_err();
        assert_eq!(Some(RecordKind::Vm), err.record_kind());
    }

    #[tokio::test]
    async fn test_dispatches_in_arrival_order() {
        let dir = TempDir::new().unwrap();
        let paths = vec![
            write(&dir, "1", VM_EXPORT.as_bytes()),
            write(&dir, "2", b"\x00\x01 not text"),
            write(&dir, "3", IP_EXPORT.as_bytes()),
            write(&dir, "4", b"APEL-cloud-message: v0.3\n"),
            write(&dir, "5", STORAGE_EXPORT.as_bytes()),
        ];

        let (events_tx, events_rx) = rendezvous();
        let (records_tx, mut records_rx) = rendezvous();
        let dispatcher = tokio::spawn(
            Dispatcher::new(events_rx, records_tx).run(CancellationToken::new()),
        );

        tokio::spawn(async move {
            for path in paths {
                events_tx.send(FileEvent::written(path)).await.unwrap();
            }
        });

        let mut kinds = Vec::new();
        while let Some(record) = records_rx.next().await {
            kinds.push(record.kind());
        }
        assert_eq!(
            vec![RecordKind::Vm, RecordKind::Ip, RecordKind::Storage],
            kinds
        );

        let stats = dispatcher.await.unwrap();
        assert_eq!(3, stats.files_decoded);
        assert_eq!(2, stats.files_rejected);
        assert_eq!(0, stats.records_dropped);
    }

    #[tokio::test]
    async fn test_force_stop_drops_undelivered_record() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "vm", VM_EXPORT.as_bytes());

        let (events_tx, events_rx) = rendezvous();
        // Held but never read, so the hand-off can not complete.
        let (records_tx, _records_rx) = rendezvous();
        let force_stop = CancellationToken::new();
        let dispatcher =
            tokio::spawn(Dispatcher::new(events_rx, records_tx).run(force_stop.clone()));

        events_tx.send(FileEvent::written(path)).await.unwrap();
        force_stop.cancel();

        let stats = dispatcher.await.unwrap();
        assert_eq!(1, stats.files_decoded);
        assert_eq!(1, stats.records_dropped);
    }
}
