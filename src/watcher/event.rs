// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::path::PathBuf;

/// What happened to a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOperation {
    Created,
    Written,
}

impl fmt::Display for FileOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileOperation::Created => f.write_str("created"),
            FileOperation::Written => f.write_str("written"),
        }
    }
}

/// A file under the watched tree that is ready to be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEvent {
    pub path: PathBuf,
    pub operation: FileOperation,
}

impl FileEvent {
    pub fn written(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            operation: FileOperation::Written,
        }
    }
}
