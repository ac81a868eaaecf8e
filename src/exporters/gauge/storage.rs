// SPDX-License-Identifier: Apache-2.0

use prometheus::GaugeVec;

use super::{GaugeSet, gauge_vec, label};
use crate::record::coerce;
use crate::record::{StorageBatch, StorageEntry};

const NAMESPACE: &str = "st";

const TIMESTAMP_LABELS: &[&str] = &[
    "RecordId",
    "StorageSystem",
    "Site",
    "StorageShare",
    "StorageMedia",
    "StorageClass",
    "DirectoryPath",
    "LocalUser",
    "LocalGroup",
    "UserIdentity",
    "Group",
    "GroupAttribute",
    "GroupAttributeType",
];

const OWNER_LABELS: &[&str] = &["RecordId", "Site", "LocalUser", "LocalGroup", "UserIdentity"];

pub struct StorageGauges {
    timestamp: GaugeVec,
    create_time: GaugeVec,
    file_count: GaugeVec,
    start_time: GaugeVec,
    end_time: GaugeVec,
    resource_capacity_used: GaugeVec,
    logical_capacity_used: GaugeVec,
    resource_capacity_allocated: GaugeVec,
}

impl StorageGauges {
    pub fn new() -> prometheus::Result<Self> {
        let owner = |name: &str, help: &str| gauge_vec(NAMESPACE, name, help, OWNER_LABELS);

        Ok(Self {
            timestamp: gauge_vec(
                NAMESPACE,
                "Timestamp",
                "Time when the measurements were exported.",
                TIMESTAMP_LABELS,
            )?,
            create_time: owner("CreateTime", "Time when the measurements were recorded.")?,
            file_count: owner("FileCount", "Number of files.")?,
            start_time: owner(
                "StartTime",
                "Time when the storage was created or registered.",
            )?,
            end_time: owner("EndTime", "Time when the storage was finished or recorded.")?,
            resource_capacity_used: owner(
                "ResourceCapacityUsed",
                "Amount of resource capacity used.",
            )?,
            logical_capacity_used: owner(
                "LogicalCapacityUsed",
                "Amount of logical capacity used.",
            )?,
            resource_capacity_allocated: owner(
                "ResourceCapacityAllocated",
                "Amount of resource capacity allocated.",
            )?,
        })
    }

    pub fn export(&self, batch: &StorageBatch, exported_at: f64) {
        for storage in &batch.storages {
            self.timestamp
                .with_label_values(&timestamp_labels(storage))
                .set(exported_at);

            let owner = [
                storage.record_id.as_str(),
                label(&storage.site),
                label(&storage.local_user),
                label(&storage.local_group),
                label(&storage.user_identity),
            ];

            self.create_time
                .with_label_values(&owner)
                .set(storage.create_time.timestamp() as f64);
            if let Some(file_count) = &storage.file_count {
                self.file_count
                    .with_label_values(&owner)
                    .set(coerce::f64_or_zero(file_count));
            }
            self.start_time
                .with_label_values(&owner)
                .set(storage.start_time.timestamp() as f64);
            self.end_time
                .with_label_values(&owner)
                .set(storage.end_time.timestamp() as f64);
            self.resource_capacity_used
                .with_label_values(&owner)
                .set(storage.resource_capacity_used as f64);
            if let Some(used) = storage.logical_capacity_used {
                self.logical_capacity_used
                    .with_label_values(&owner)
                    .set(used as f64);
            }
            if let Some(allocated) = storage.resource_capacity_allocated {
                self.resource_capacity_allocated
                    .with_label_values(&owner)
                    .set(allocated as f64);
            }
        }
    }
}

fn timestamp_labels(storage: &StorageEntry) -> [&str; 13] {
    [
        storage.record_id.as_str(),
        storage.storage_system.as_str(),
        label(&storage.site),
        label(&storage.storage_share),
        label(&storage.storage_media),
        label(&storage.storage_class),
        label(&storage.directory_path),
        label(&storage.local_user),
        label(&storage.local_group),
        label(&storage.user_identity),
        label(&storage.group),
        label(&storage.group_attribute),
        label(&storage.group_attribute_type),
    ]
}

impl GaugeSet for StorageGauges {
    fn gauges(&self) -> Vec<&GaugeVec> {
        vec![
            &self.timestamp,
            &self.create_time,
            &self.file_count,
            &self.start_time,
            &self.end_time,
            &self.resource_capacity_used,
            &self.logical_capacity_used,
            &self.resource_capacity_allocated,
        ]
    }
}
