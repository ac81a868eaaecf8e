// SPDX-License-Identifier: Apache-2.0

use prometheus::GaugeVec;

use super::{GaugeSet, gauge_vec, label};
use crate::record::coerce;
use crate::record::{VmBatch, VmEntry};

const NAMESPACE: &str = "vm";

const TIMESTAMP_LABELS: &[&str] = &[
    "VMUUID",
    "SiteName",
    "CloudComputeService",
    "MachineName",
    "LocalUserID",
    "LocalGroupID",
    "GlobalUserName",
    "FQAN",
    "Status",
    "Benchmark",
    "BenchmarkType",
    "StorageRecordId",
    "ImageId",
    "CloudType",
];

const USER_LABELS: &[&str] = &["VMUUID", "LocalUserID", "LocalGroupID", "GlobalUserName"];

const NETWORK_LABELS: &[&str] = &[
    "VMUUID",
    "NetworkType",
    "LocalUserID",
    "LocalGroupID",
    "GlobalUserName",
];

pub struct VmGauges {
    timestamp: GaugeVec,
    start_time: GaugeVec,
    end_time: GaugeVec,
    suspend_duration: GaugeVec,
    wall_duration: GaugeVec,
    cpu_duration: GaugeVec,
    cpu_count: GaugeVec,
    network_inbound: GaugeVec,
    network_outbound: GaugeVec,
    public_ip_count: GaugeVec,
    memory: GaugeVec,
    disk: GaugeVec,
}

impl VmGauges {
    pub fn new() -> prometheus::Result<Self> {
        let user = |name: &str, help: &str| gauge_vec(NAMESPACE, name, help, USER_LABELS);
        let network = |name: &str, help: &str| gauge_vec(NAMESPACE, name, help, NETWORK_LABELS);

        Ok(Self {
            timestamp: gauge_vec(
                NAMESPACE,
                "Timestamp",
                "Time when the measurements were exported.",
                TIMESTAMP_LABELS,
            )?,
            start_time: user("StartTime", "Time when the virtual machine was started.")?,
            end_time: user(
                "EndTime",
                "Time when the virtual machine was finished or recorded.",
            )?,
            suspend_duration: user(
                "SuspendDuration",
                "Time the virtual machine was suspended (end time - start time - wall duration).",
            )?,
            wall_duration: user("WallDuration", "Time the virtual machine was running.")?,
            cpu_duration: user("CPUDuration", "Time the CPUs were running.")?,
            cpu_count: user("CPUCount", "Number of CPUs.")?,
            network_inbound: network("NetworkInbound", "Network inbound.")?,
            network_outbound: network("NetworkOutbound", "Network outbound.")?,
            public_ip_count: user("PublicIPCount", "Number of public IPs used.")?,
            memory: user("Memory", "Size of memory.")?,
            disk: user("Disk", "Size of disks.")?,
        })
    }

    pub fn export(&self, batch: &VmBatch, exported_at: f64) {
        for vm in &batch.vms {
            let benchmark = vm.benchmark.map(|b| format!("{b:.6}")).unwrap_or_default();
            self.timestamp
                .with_label_values(&timestamp_labels(vm, &benchmark))
                .set(exported_at);

            let user = [
                vm.vm_uuid.as_str(),
                label(&vm.local_user_id),
                label(&vm.local_group_id),
                label(&vm.global_user_name),
            ];
            let network = [
                vm.vm_uuid.as_str(),
                label(&vm.network_type),
                label(&vm.local_user_id),
                label(&vm.local_group_id),
                label(&vm.global_user_name),
            ];

            let numeric_strings = [
                (&self.start_time, &vm.start_time),
                (&self.end_time, &vm.end_time),
                (&self.suspend_duration, &vm.suspend_duration),
                (&self.wall_duration, &vm.wall_duration),
                (&self.cpu_duration, &vm.cpu_duration),
            ];
            for (gauge, value) in numeric_strings {
                if let Some(value) = value {
                    gauge
                        .with_label_values(&user)
                        .set(coerce::f64_or_zero(value));
                }
            }

            self.cpu_count
                .with_label_values(&user)
                .set(f64::from(vm.cpu_count));

            if let Some(inbound) = vm.network_inbound {
                self.network_inbound
                    .with_label_values(&network)
                    .set(inbound as f64);
            }
            if let Some(outbound) = vm.network_outbound {
                self.network_outbound
                    .with_label_values(&network)
                    .set(outbound as f64);
            }

            let counts = [
                (&self.public_ip_count, vm.public_ip_count),
                (&self.memory, vm.memory),
                (&self.disk, vm.disk),
            ];
            for (gauge, value) in counts {
                if let Some(value) = value {
                    gauge.with_label_values(&user).set(value as f64);
                }
            }
        }
    }
}

fn timestamp_labels<'a>(vm: &'a VmEntry, benchmark: &'a str) -> [&'a str; 14] {
    [
        vm.vm_uuid.as_str(),
        vm.site_name.as_str(),
        label(&vm.cloud_compute_service),
        vm.machine_name.as_str(),
        label(&vm.local_user_id),
        label(&vm.local_group_id),
        label(&vm.global_user_name),
        label(&vm.fqan),
        label(&vm.status),
        benchmark,
        label(&vm.benchmark_type),
        label(&vm.storage_record_id),
        label(&vm.image_id),
        label(&vm.cloud_type),
    ]
}

impl GaugeSet for VmGauges {
    fn gauges(&self) -> Vec<&GaugeVec> {
        vec![
            &self.timestamp,
            &self.start_time,
            &self.end_time,
            &self.suspend_duration,
            &self.wall_duration,
            &self.cpu_duration,
            &self.cpu_count,
            &self.network_inbound,
            &self.network_outbound,
            &self.public_ip_count,
            &self.memory,
            &self.disk,
        ]
    }
}
