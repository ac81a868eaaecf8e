// SPDX-License-Identifier: Apache-2.0

//! Decoded accounting records.
//!
//! A [`Record`] is the unit that moves through the pipeline: one per successfully decoded
//! file, holding every entry of that file in file order.

pub mod coerce;
pub mod ip;
pub mod storage;
pub mod vm;

pub use ip::{IpBatch, IpEntry};
pub use storage::{StorageBatch, StorageEntry};
pub use vm::{VmBatch, VmEntry};

use std::fmt;

/// Kind of accounting data a file carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Ip,
    Storage,
    Vm,
}

impl RecordKind {
    /// Short name used in log fields and as the gauge namespace.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Ip => "ip",
            RecordKind::Storage => "st",
            RecordKind::Vm => "vm",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Ip(IpBatch),
    Storage(StorageBatch),
    Vm(VmBatch),
}

impl Record {
    pub fn kind(&self) -> RecordKind {
        match self {
            Record::Ip(_) => RecordKind::Ip,
            Record::Storage(_) => RecordKind::Storage,
            Record::Vm(_) => RecordKind::Vm,
        }
    }

    /// Number of entries in the batch.
    pub fn len(&self) -> usize {
        match self {
            Record::Ip(b) => b.ips.len(),
            Record::Storage(b) => b.storages.len(),
            Record::Vm(b) => b.vms.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<IpBatch> for Record {
    fn from(batch: IpBatch) -> Self {
        Record::Ip(batch)
    }
}

impl From<StorageBatch> for Record {
    fn from(batch: StorageBatch) -> Self {
        Record::Storage(batch)
    }
}

impl From<VmBatch> for Record {
    fn from(batch: VmBatch) -> Self {
        Record::Vm(batch)
    }
}
