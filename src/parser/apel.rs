// SPDX-License-Identifier: Apache-2.0

//! Decoder for APEL cloud accounting messages.
//!
//! A message is a banner line followed by `%`-delimited entries of `Key: value` lines:
//!
//! ```text
//! APEL-cloud-message: v0.4
//! VMUUID: 4e7e6a6c-...
//! SiteName: CESNET
//! MachineName: one-42
//! CpuCount: 2
//! %%
//! VMUUID: ...
//! %%
//! ```
//!
//! Only the banner is validated. Once it matches, decoding always produces a batch:
//! malformed lines are skipped, unknown keys ignored, and bad numbers become absent
//! values. A trailing entry without a closing `%` is dropped whole.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read};
use std::sync::LazyLock;

use tracing::{debug, warn};

use crate::parser::error::{DecodeError, Result};
use crate::record::coerce;
use crate::record::{VmBatch, VmEntry};

/// First line of every accepted message, newline included.
pub const APEL_BANNER: &str = "APEL-cloud-message: v0.4\n";

const ENTRY_DELIMITER: u8 = b'%';
const KEY_VALUE_SEPARATOR: &str = ": ";

/// How much of a rejected first line is quoted in the error.
const BANNER_QUOTE_LEN: usize = 64;

type Setter = fn(&mut VmEntry, &str);

/// Message key to field assignment.
const VM_FIELDS: &[(&str, Setter)] = &[
    ("VMUUID", |vm, v| vm.vm_uuid = v.to_string()),
    ("SiteName", |vm, v| vm.site_name = v.to_string()),
    ("CloudComputeService", |vm, v| {
        vm.cloud_compute_service = coerce::string(v)
    }),
    ("MachineName", |vm, v| vm.machine_name = v.to_string()),
    ("LocalUserId", |vm, v| vm.local_user_id = coerce::string(v)),
    ("LocalGroupId", |vm, v| vm.local_group_id = coerce::string(v)),
    ("GlobalUserName", |vm, v| {
        vm.global_user_name = coerce::string(v)
    }),
    ("FQAN", |vm, v| vm.fqan = coerce::string(v)),
    ("Status", |vm, v| vm.status = coerce::string(v)),
    ("StartTime", |vm, v| vm.start_time = coerce::string(v)),
    ("EndTime", |vm, v| vm.end_time = coerce::string(v)),
    ("SuspendDuration", |vm, v| {
        vm.suspend_duration = coerce::string(v)
    }),
    ("WallDuration", |vm, v| vm.wall_duration = coerce::string(v)),
    ("CpuDuration", |vm, v| vm.cpu_duration = coerce::string(v)),
    ("CpuCount", |vm, v| {
        vm.cpu_count = coerce::u32("CpuCount", v).unwrap_or(0)
    }),
    ("NetworkType", |vm, v| vm.network_type = coerce::string(v)),
    ("NetworkInbound", |vm, v| {
        vm.network_inbound = coerce::u64("NetworkInbound", v)
    }),
    ("NetworkOutbound", |vm, v| {
        vm.network_outbound = coerce::u64("NetworkOutbound", v)
    }),
    ("PublicIPCount", |vm, v| {
        vm.public_ip_count = coerce::u64("PublicIPCount", v)
    }),
    ("Memory", |vm, v| vm.memory = coerce::u64("Memory", v)),
    ("Disk", |vm, v| vm.disk = coerce::u64("Disk", v)),
    ("StorageRecordId", |vm, v| {
        vm.storage_record_id = coerce::string(v)
    }),
    ("ImageId", |vm, v| vm.image_id = coerce::string(v)),
    ("CloudType", |vm, v| vm.cloud_type = coerce::string(v)),
    ("BenchmarkType", |vm, v| vm.benchmark_type = coerce::string(v)),
    ("Benchmark", |vm, v| vm.benchmark = coerce::f32("Benchmark", v)),
];

static VM_FIELD_INDEX: LazyLock<HashMap<&'static str, Setter>> =
    LazyLock::new(|| VM_FIELDS.iter().copied().collect());

/// Decode an APEL cloud message into VM entries.
pub fn vm_records<R: Read>(input: R) -> Result<VmBatch> {
    let mut reader = BufReader::new(input);
    check_envelope(&mut reader)?;

    let mut batch = VmBatch::default();
    let mut chunk = Vec::new();

    loop {
        chunk.clear();
        match reader.read_until(ENTRY_DELIMITER, &mut chunk) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, entries = batch.vms.len(), "Failed to read APEL message, keeping entries read so far");
                break;
            }
        }

        if chunk.last() != Some(&ENTRY_DELIMITER) {
            // End of stream inside an entry.
            if !chunk.trim_ascii().is_empty() {
                debug!(
                    bytes = chunk.len(),
                    "Discarding unterminated trailing APEL entry"
                );
            }
            break;
        }
        chunk.pop();

        // Back-to-back delimiters
        if chunk.is_empty() {
            continue;
        }

        batch.vms.push(parse_entry(&String::from_utf8_lossy(&chunk)));
    }

    Ok(batch)
}

fn check_envelope<R: BufRead>(reader: &mut R) -> Result<()> {
    let mut line = Vec::new();
    reader
        .read_until(b'\n', &mut line)
        .map_err(|e| DecodeError::Envelope(format!("unable to read first line: {e}")))?;

    if line == APEL_BANNER.as_bytes() {
        return Ok(());
    }

    if line.is_empty() {
        return Err(DecodeError::Envelope("empty input".to_string()));
    }

    let quoted = &line[..line.len().min(BANNER_QUOTE_LEN)];
    Err(DecodeError::Envelope(format!(
        "unexpected first line {:?}",
        String::from_utf8_lossy(quoted)
    )))
}

fn parse_entry(text: &str) -> VmEntry {
    let mut vm = VmEntry::default();

    for line in text.split('\n') {
        let Some((key, value)) = line.split_once(KEY_VALUE_SEPARATOR) else {
            continue;
        };
        if key.is_empty() {
            continue;
        }

        if let Some(set) = VM_FIELD_INDEX.get(key) {
            set(&mut vm, value);
        }
    }

    vm
}
