// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! File records flowing in and out of a transport invocation

use crate::error::{Result, TransportError};
use crate::path;
use std::path::{Path, PathBuf};

/// A file handed over by the host pipeline, or produced by the emitter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Absolute location
    pub path: PathBuf,
    /// Base directory the record is relative to
    pub base: PathBuf,
    /// Raw contents
    pub contents: Vec<u8>,
    /// The source file this record was derived from
    pub origin: PathBuf,
}

impl FileRecord {
    /// Create a record whose origin is its own path
    pub fn new(path: impl Into<PathBuf>, base: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        let path = path.into();
        Self {
            origin: path.clone(),
            path,
            base: base.into(),
            contents: contents.into(),
        }
    }

    /// Path relative to `base`, always with forward slashes
    pub fn relative(&self) -> String {
        path::relative_to(&self.base, &self.path).unwrap_or_else(|| path::to_slash(&self.path))
    }

    /// UTF-8 view of the contents
    pub fn text(&self) -> Result<&str> {
        std::str::from_utf8(&self.contents).map_err(|e| TransportError::InvalidAsset {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }

    /// Final path component
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Replace the final path component
    pub fn set_file_name(&mut self, name: &str) {
        self.path.set_file_name(name);
    }

    /// Insert `suffix` before the final extension (`index.js` -> `index-debug.js`)
    pub fn add_suffix(&mut self, suffix: &str) {
        let name = self.file_name();
        let renamed = match name.rfind('.') {
            Some(dot) if dot > 0 => format!("{}{}{}", &name[..dot], suffix, &name[dot..]),
            _ => format!("{}{}", name, suffix),
        };
        self.set_file_name(&renamed);
    }

    /// Directory holding the record
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new("."))
    }
}
