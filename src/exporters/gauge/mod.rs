// SPDX-License-Identifier: Apache-2.0

//! Projection of accounting records onto Prometheus gauges.
//!
//! Each record kind owns a set of `GaugeVec`s under its own namespace (`ip_`, `st_`,
//! `vm_`). Every entry sets a `Timestamp` gauge to the export wall time, labelled with
//! the entry's descriptive fields, plus one gauge per numeric field labelled with the
//! owner of the resource. Absent label values render as the empty string; absent
//! optional values leave their gauge untouched.

mod ip;
mod storage;
mod vm;

pub use ip::IpGauges;
pub use storage::StorageGauges;
pub use vm::VmGauges;

use prometheus::{GaugeVec, Opts, Registry};
use tracing::debug;

use crate::exporters::RecordSink;
use crate::record::Record;

pub(crate) trait GaugeSet {
    fn gauges(&self) -> Vec<&GaugeVec>;

    fn register(&self, registry: &Registry) -> prometheus::Result<()> {
        for gauge in self.gauges() {
            registry.register(Box::new(gauge.clone()))?;
        }
        Ok(())
    }
}

pub(crate) fn gauge_vec(
    namespace: &str,
    name: &str,
    help: &str,
    labels: &[&str],
) -> prometheus::Result<GaugeVec> {
    GaugeVec::new(Opts::new(name, help).namespace(namespace), labels)
}

pub(crate) fn label(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("")
}

/// Gauges for every record kind.
pub struct Gauges {
    ip: IpGauges,
    storage: StorageGauges,
    vm: VmGauges,
}

impl Gauges {
    pub fn new() -> prometheus::Result<Self> {
        Ok(Self {
            ip: IpGauges::new()?,
            storage: StorageGauges::new()?,
            vm: VmGauges::new()?,
        })
    }

    /// Register every gauge with `registry`.
    ///
    /// Registering twice with the same registry fails with `AlreadyReg`.
    pub fn register(&self, registry: &Registry) -> prometheus::Result<()> {
        self.ip.register(registry)?;
        self.storage.register(registry)?;
        self.vm.register(registry)?;
        debug!("Gauges registered");
        Ok(())
    }
}

impl RecordSink for Gauges {
    fn export(&self, record: &Record) {
        let exported_at = chrono::Utc::now().timestamp() as f64;
        match record {
            Record::Ip(batch) => self.ip.export(batch, exported_at),
            Record::Storage(batch) => self.storage.export(batch, exported_at),
            Record::Vm(batch) => self.vm.export(batch, exported_at),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::record::{IpBatch, IpEntry, VmBatch, VmEntry};
    use prometheus::{Encoder, TextEncoder};

    /// Register `set` with a fresh registry and render it in the text format.
    pub(crate) fn render(set: &impl GaugeSet) -> String {
        let registry = Registry::new();
        set.register(&registry).unwrap();
        let mut buf = Vec::new();
        TextEncoder::new()
            .encode(&registry.gather(), &mut buf)
            .unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let registry = Registry::new();
        let gauges = Gauges::new().unwrap();
        gauges.register(&registry).unwrap();

        let err = gauges.register(&registry).unwrap_err();
        assert!(matches!(err, prometheus::Error::AlreadyReg));

        let other = Gauges::new().unwrap();
        assert!(other.register(&registry).is_err());
    }

    #[test]
    fn test_separate_registries_are_independent() {
        let gauges = Gauges::new().unwrap();
        gauges.register(&Registry::new()).unwrap();
        Gauges::new().unwrap().register(&Registry::new()).unwrap();
    }

    #[test]
    fn test_export_dispatches_by_kind() {
        let registry = Registry::new();
        let gauges = Gauges::new().unwrap();
        gauges.register(&registry).unwrap();

        gauges.export(&Record::Ip(IpBatch {
            ips: vec![IpEntry {
                ip_count: 3,
                ..Default::default()
            }],
        }));
        gauges.export(&Record::Vm(VmBatch {
            vms: vec![VmEntry {
                vm_uuid: "vm-1".to_string(),
                ..Default::default()
            }],
        }));

        let mut buf = Vec::new();
        TextEncoder::new()
            .encode(&registry.gather(), &mut buf)
            .unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.contains("ip_IPCount{"));
        assert!(text.contains("vm_CPUCount{"));
        assert!(!text.contains("st_Timestamp"));
    }
}
