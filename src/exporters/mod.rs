// SPDX-License-Identifier: Apache-2.0

pub mod gauge;

mod exporter;

pub use exporter::{ExportStats, Exporter};

use crate::record::Record;

/// Destination for decoded records.
pub trait RecordSink: Send + Sync + 'static {
    /// Publish every entry of `record`. Never fails; a batch is either fully applied or
    /// not at all.
    fn export(&self, record: &Record);
}
