// SPDX-License-Identifier: Apache-2.0

/// Virtual machine / server accounting record in APEL cloud message terms.
///
/// Times and durations stay as the numeric strings the message carries; they are only
/// converted when projected onto gauges.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VmEntry {
    pub vm_uuid: String,
    pub site_name: String,
    pub cloud_compute_service: Option<String>,
    pub machine_name: String,
    pub local_user_id: Option<String>,
    pub local_group_id: Option<String>,
    pub global_user_name: Option<String>,
    pub fqan: Option<String>,
    pub status: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub suspend_duration: Option<String>,
    pub wall_duration: Option<String>,
    pub cpu_duration: Option<String>,
    pub cpu_count: u32,
    pub network_type: Option<String>,
    pub network_inbound: Option<u64>,
    pub network_outbound: Option<u64>,
    pub public_ip_count: Option<u64>,
    pub memory: Option<u64>,
    pub disk: Option<u64>,
    pub storage_record_id: Option<String>,
    pub image_id: Option<String>,
    pub cloud_type: Option<String>,
    pub benchmark_type: Option<String>,
    pub benchmark: Option<f32>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VmBatch {
    pub vms: Vec<VmEntry>,
}
