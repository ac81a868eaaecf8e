// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

use crate::parser::sniff::MediaType;
use crate::record::RecordKind;

/// Structural failure to decode a whole file. Field-level problems never surface here.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::DeError),

    #[error("XML reading error: {0}")]
    XmlReader(#[from] quick_xml::Error),

    #[error("not an APEL cloud message: {0}")]
    Envelope(String),

    #[error("unexpected root element <{found}>, expected <{expected}>")]
    RootElement {
        expected: &'static str,
        found: String,
    },

    #[error("document has no root element")]
    MissingRoot,
}

pub type Result<T> = std::result::Result<T, DecodeError>;

/// Why a single file produced no record.
#[derive(Error, Debug)]
pub enum FileError {
    #[error("failed to open file: {0}")]
    Open(#[source] std::io::Error),

    #[error("failed to read file: {0}")]
    Read(#[source] std::io::Error),

    #[error("unsupported content type {0}")]
    Unsupported(MediaType),

    #[error("failed to decode {kind} records: {source}")]
    Decode {
        kind: RecordKind,
        #[source]
        source: DecodeError,
    },
}

impl FileError {
    /// Record type the file was routed to, if sniffing got that far.
    pub fn record_kind(&self) -> Option<RecordKind> {
        match self {
            FileError::Decode { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}
