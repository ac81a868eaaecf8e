// SPDX-License-Identifier: Apache-2.0

use serde::Deserialize;

use crate::record::coerce;

/// Public IP usage of one user, as measured by the cloud site.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct IpEntry {
    #[serde(alias = "measurementTime")]
    pub measurement_time: i64,
    #[serde(alias = "siteName")]
    pub site_name: String,
    #[serde(
        alias = "cloudComputeService",
        deserialize_with = "coerce::optional_string"
    )]
    pub cloud_compute_service: Option<String>,
    #[serde(alias = "cloudType")]
    pub cloud_type: String,
    #[serde(alias = "localUser")]
    pub local_user: String,
    #[serde(alias = "localGroup")]
    pub local_group: String,
    #[serde(alias = "globalUserName")]
    pub global_user_name: String,
    #[serde(rename = "FQAN", alias = "fqan")]
    pub fqan: String,
    #[serde(rename = "IPVersion", alias = "ipVersion")]
    pub ip_version: u8,
    #[serde(rename = "IPCount", alias = "ipCount")]
    pub ip_count: i64,
}

/// IP entries decoded from one JSON export.
///
/// The export wraps the entries in an object under `Ips`; a document without that key
/// is not an IP batch.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct IpBatch {
    #[serde(rename = "Ips", alias = "ips", alias = "IPs")]
    pub ips: Vec<IpEntry>,
}
