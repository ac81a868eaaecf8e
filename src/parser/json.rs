// SPDX-License-Identifier: Apache-2.0

use std::io::Read;

use crate::parser::error::Result;
use crate::record::IpBatch;

/// Decode a JSON IP export.
///
/// Any syntax or type error rejects the whole document.
pub fn ip_records<R: Read>(mut input: R) -> Result<IpBatch> {
    let mut buf = Vec::new();
    input.read_to_end(&mut buf)?;
    let batch = serde_json::from_slice(&buf)?;
    Ok(batch)
}
