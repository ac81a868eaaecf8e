// SPDX-License-Identifier: Apache-2.0

//! Text-to-value coercion shared by every decoder.
//!
//! Upstream exporters write "no value" in several ways. Any field whose raw text is one
//! of [`NULL_SENTINELS`] decodes to `None` instead of an empty or zero value. Text that
//! passes the sentinel check but fails to parse is logged and also decodes to `None`;
//! a single bad field never rejects the entry it belongs to.

use serde::{Deserialize, Deserializer};
use std::fmt::Display;
use std::str::FromStr;
use tracing::warn;

pub const NULL_SENTINELS: [&str; 5] = ["", "NULL", "null", "nil", "<nil>"];

pub fn is_null(s: &str) -> bool {
    NULL_SENTINELS.contains(&s)
}

/// Optional string field.
pub fn string(s: &str) -> Option<String> {
    if is_null(s) {
        return None;
    }
    Some(s.to_string())
}

pub fn u64(field: &str, s: &str) -> Option<u64> {
    number(field, s)
}

pub fn u32(field: &str, s: &str) -> Option<u32> {
    number(field, s)
}

pub fn f32(field: &str, s: &str) -> Option<f32> {
    number(field, s)
}

/// Lenient conversion used when projecting numeric-string fields onto gauges:
/// sentinels and unparseable text both become zero.
pub fn f64_or_zero(s: &str) -> f64 {
    if is_null(s) {
        return 0.0;
    }
    s.parse().unwrap_or(0.0)
}

fn number<T>(field: &str, s: &str) -> Option<T>
where
    T: FromStr,
    T::Err: Display,
{
    if is_null(s) {
        return None;
    }

    match s.parse::<T>() {
        Ok(v) => Some(v),
        Err(e) => {
            warn!(field, value = s, error = %e, "Unable to parse numeric field, treating as absent");
            None
        }
    }
}

/// Serde adapter for optional string fields in the structured formats.
pub fn optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|s| string(&s)))
}

/// Serde adapter for optional unsigned fields carried as element text (XML).
///
/// Unlike the APEL decoder, an unparseable number here is a structural error of
/// the document, matching how the structured decoders treat every other type error.
pub fn optional_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(s) if is_null(s.trim()) => Ok(None),
        Some(s) => s
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}
