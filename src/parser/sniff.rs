// SPDX-License-Identifier: Apache-2.0

//! Content based media type detection.
//!
//! Producers name their exports freely, so the file extension is never consulted. Only
//! the first [`SNIFF_LEN`] bytes are inspected.

use std::fmt;
use std::io::{self, Read};

use serde::de::IgnoredAny;

use crate::record::RecordKind;

/// Number of leading bytes inspected when sniffing.
pub const SNIFF_LEN: usize = 3072;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    PlainText,
    Json,
    Xml,
    OctetStream,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::PlainText => "text/plain; charset=utf-8",
            MediaType::Json => "application/json",
            MediaType::Xml => "text/xml; charset=utf-8",
            MediaType::OctetStream => "application/octet-stream",
        }
    }

    /// Which decoder handles content of this type, if any.
    pub fn record_kind(&self) -> Option<RecordKind> {
        match self {
            MediaType::PlainText => Some(RecordKind::Vm),
            MediaType::Json => Some(RecordKind::Ip),
            MediaType::Xml => Some(RecordKind::Storage),
            MediaType::OctetStream => None,
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read up to [`SNIFF_LEN`] bytes from the start of `input`.
///
/// The bytes are consumed; callers chain them back in front of the remaining stream.
pub fn read_head<R: Read>(input: &mut R) -> io::Result<Vec<u8>> {
    let mut head = Vec::with_capacity(SNIFF_LEN);
    input.by_ref().take(SNIFF_LEN as u64).read_to_end(&mut head)?;
    Ok(head)
}

pub fn sniff(head: &[u8]) -> MediaType {
    let window_full = head.len() >= SNIFF_LEN;
    let head = head.strip_prefix(UTF8_BOM).unwrap_or(head);

    if !is_text(head) {
        return MediaType::OctetStream;
    }

    let trimmed = head.trim_ascii_start();
    match trimmed.first() {
        Some(b'{') | Some(b'[') if is_json(trimmed, window_full) => MediaType::Json,
        Some(b'<') if looks_like_markup(&trimmed[1..]) => MediaType::Xml,
        // An empty file is text; the decoder rejects it.
        _ => MediaType::PlainText,
    }
}

/// A complete JSON value, or a valid prefix of one when the window cut the file short.
fn is_json(head: &[u8], window_full: bool) -> bool {
    match serde_json::from_slice::<IgnoredAny>(head) {
        Ok(_) => true,
        Err(e) => window_full && e.is_eof(),
    }
}

fn looks_like_markup(after_lt: &[u8]) -> bool {
    match after_lt.first() {
        Some(b'?') => after_lt[1..]
            .get(..3)
            .is_some_and(|tag| tag.eq_ignore_ascii_case(b"xml")),
        Some(b'!') => true,
        Some(c) => c.is_ascii_alphabetic() || *c == b'_',
        None => false,
    }
}

/// UTF-8 without binary control bytes. A multi-byte character cut off by the sniff
/// window does not count against the content.
fn is_text(head: &[u8]) -> bool {
    let valid_utf8 = match std::str::from_utf8(head) {
        Ok(_) => true,
        Err(e) => e.error_len().is_none(),
    };

    valid_utf8
        && !head
            .iter()
            .any(|b| b.is_ascii_control() && !matches!(b, b'\t' | b'\n' | b'\r' | b'\x0c' | b'\x1b'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apel_message_is_plain_text() {
        let head = b"APEL-cloud-message: v0.4\nVMUUID: 1\n%%\n";
        assert_eq!(MediaType::PlainText, sniff(head));
    }

    #[test]
    fn test_json() {
        assert_eq!(MediaType::Json, sniff(b"{\"Ips\": []}"));
        assert_eq!(MediaType::Json, sniff(b"\n  [1, 2]"));
        assert_eq!(MediaType::Json, sniff(b"\xEF\xBB\xBF{}"));
    }

    #[test]
    fn test_malformed_json_is_text() {
        assert_eq!(MediaType::PlainText, sniff(b"{\"Ips\": ["));
        assert_eq!(MediaType::PlainText, sniff(b"{ not json }"));
        assert_eq!(MediaType::PlainText, sniff(b"[1, 2] trailing"));
    }

    #[test]
    fn test_json_cut_by_window() {
        let mut head = b"{\"Ips\": [".to_vec();
        while head.len() < SNIFF_LEN {
            head.extend_from_slice(b"{\"IPCount\": 1}, ");
        }
        head.truncate(SNIFF_LEN);
        assert_eq!(MediaType::Json, sniff(&head));
    }

    #[test]
    fn test_xml() {
        assert_eq!(
            MediaType::Xml,
            sniff(b"<?xml version=\"1.0\"?>\n<STORAGES></STORAGES>")
        );
        assert_eq!(MediaType::Xml, sniff(b"<STORAGES/>"));
        assert_eq!(MediaType::Xml, sniff(b"<!-- export --><STORAGES/>"));
    }

    #[test]
    fn test_lone_angle_bracket_is_text() {
        assert_eq!(MediaType::PlainText, sniff(b"< 3 apples"));
    }

    #[test]
    fn test_empty_is_text() {
        assert_eq!(MediaType::PlainText, sniff(b""));
    }

    #[test]
    fn test_binary() {
        assert_eq!(MediaType::OctetStream, sniff(b"\x1f\x8b\x08\x00\x00"));
        assert_eq!(MediaType::OctetStream, sniff(b"PK\x03\x04\x14\x00"));
        assert_eq!(MediaType::OctetStream, sniff(&[0xff, 0xfe, 0x41, 0x00]));
    }

    #[test]
    fn test_truncated_utf8_tail_is_text() {
        // "é" is 0xC3 0xA9; the window cut it in half
        assert_eq!(MediaType::PlainText, sniff(b"Site: caf\xC3"));
    }

    #[test]
    fn test_read_head_is_bounded() {
        let data = vec![b'a'; SNIFF_LEN * 2];
        let mut input = data.as_slice();
        let head = read_head(&mut input).unwrap();
        assert_eq!(SNIFF_LEN, head.len());
        assert_eq!(SNIFF_LEN, input.len());
    }

    #[test]
    fn test_media_type_routes_to_decoder() {
        assert_eq!(Some(RecordKind::Vm), MediaType::PlainText.record_kind());
        assert_eq!(Some(RecordKind::Ip), MediaType::Json.record_kind());
        assert_eq!(Some(RecordKind::Storage), MediaType::Xml.record_kind());
        assert_eq!(None, MediaType::OctetStream.record_kind());
    }
}
