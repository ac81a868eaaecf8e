// SPDX-License-Identifier: Apache-2.0

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::record::coerce;

/// Storage usage record (EMI StAR style element names).
///
/// Element order in the source document does not matter and elements that are not
/// listed here are ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "SCREAMING_SNAKE_CASE")]
pub struct StorageEntry {
    pub record_id: String,
    pub create_time: DateTime<Utc>,
    pub storage_system: String,
    #[serde(deserialize_with = "coerce::optional_string")]
    pub site: Option<String>,
    #[serde(deserialize_with = "coerce::optional_string")]
    pub storage_share: Option<String>,
    #[serde(deserialize_with = "coerce::optional_string")]
    pub storage_media: Option<String>,
    #[serde(deserialize_with = "coerce::optional_string")]
    pub storage_class: Option<String>,
    #[serde(deserialize_with = "coerce::optional_string")]
    pub file_count: Option<String>,
    #[serde(deserialize_with = "coerce::optional_string")]
    pub directory_path: Option<String>,
    #[serde(deserialize_with = "coerce::optional_string")]
    pub local_user: Option<String>,
    #[serde(deserialize_with = "coerce::optional_string")]
    pub local_group: Option<String>,
    #[serde(deserialize_with = "coerce::optional_string")]
    pub user_identity: Option<String>,
    #[serde(deserialize_with = "coerce::optional_string")]
    pub group: Option<String>,
    #[serde(deserialize_with = "coerce::optional_string")]
    pub group_attribute: Option<String>,
    #[serde(deserialize_with = "coerce::optional_string")]
    pub group_attribute_type: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub resource_capacity_used: u64,
    #[serde(deserialize_with = "coerce::optional_u64")]
    pub logical_capacity_used: Option<u64>,
    #[serde(deserialize_with = "coerce::optional_u64")]
    pub resource_capacity_allocated: Option<u64>,
}

/// Storage entries decoded from one `<STORAGES>` document.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StorageBatch {
    #[serde(rename = "STORAGE", default)]
    pub storages: Vec<StorageEntry>,
}

/// Root element every storage export must use.
pub const STORAGE_ROOT_ELEMENT: &str = "STORAGES";
