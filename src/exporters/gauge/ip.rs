// SPDX-License-Identifier: Apache-2.0

use prometheus::GaugeVec;

use super::{GaugeSet, gauge_vec, label};
use crate::record::IpBatch;

const NAMESPACE: &str = "ip";

const TIMESTAMP_LABELS: &[&str] = &[
    "SiteName",
    "CloudComputeService",
    "CloudType",
    "LocalUser",
    "LocalGroup",
    "GlobalUserName",
    "FQAN",
    "IPVersion",
];

const USER_LABELS: &[&str] = &["LocalUser", "LocalGroup", "GlobalUserName"];

pub struct IpGauges {
    timestamp: GaugeVec,
    measurement_time: GaugeVec,
    ip_count: GaugeVec,
}

impl IpGauges {
    pub fn new() -> prometheus::Result<Self> {
        Ok(Self {
            timestamp: gauge_vec(
                NAMESPACE,
                "Timestamp",
                "Time when the measurements were exported.",
                TIMESTAMP_LABELS,
            )?,
            measurement_time: gauge_vec(
                NAMESPACE,
                "MeasurementTime",
                "Time when the measurements were recorded.",
                USER_LABELS,
            )?,
            ip_count: gauge_vec(
                NAMESPACE,
                "IPCount",
                "Number of IPs owned by a given user.",
                USER_LABELS,
            )?,
        })
    }

    pub fn export(&self, batch: &IpBatch, exported_at: f64) {
        for ip in &batch.ips {
            let ip_version = ip.ip_version.to_string();
            self.timestamp
                .with_label_values(&[
                    ip.site_name.as_str(),
                    label(&ip.cloud_compute_service),
                    ip.cloud_type.as_str(),
                    ip.local_user.as_str(),
                    ip.local_group.as_str(),
                    ip.global_user_name.as_str(),
                    ip.fqan.as_str(),
                    ip_version.as_str(),
                ])
                .set(exported_at);

            let user = [
                ip.local_user.as_str(),
                ip.local_group.as_str(),
                ip.global_user_name.as_str(),
            ];
            self.measurement_time
                .with_label_values(&user)
                .set(ip.measurement_time as f64);
            self.ip_count
                .with_label_values(&user)
                .set(ip.ip_count as f64);
        }
    }
}

impl GaugeSet for IpGauges {
    fn gauges(&self) -> Vec<&GaugeVec> {
        vec![&self.timestamp, &self.measurement_time, &self.ip_count]
    }
}
