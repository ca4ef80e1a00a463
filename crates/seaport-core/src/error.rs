// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Error types for the transport engine

use std::path::PathBuf;
use thiserror::Error;

/// Result type for transport operations
pub type Result<T> = std::result::Result<T, TransportError>;

/// Errors that can abort a transport invocation
#[derive(Debug, Error)]
pub enum TransportError {
    /// A scanned reference does not map to any file
    #[error("Cannot resolve '{target}' from {from}")]
    UnresolvedReference {
        /// Raw reference text
        target: String,
        /// Package-relative path of the requiring file
        from: String,
    },

    /// A named package is not part of the resolvable package set
    #[error("{name} not exist, but required {required}")]
    MissingDependency {
        /// Package name
        name: String,
        /// Who required it (an extension for type plugins, `by <file>` otherwise)
        required: String,
    },

    /// Options rejected at setup time
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A package.json could not be understood
    #[error("Invalid manifest {path}: {reason}")]
    InvalidManifest {
        /// Manifest location
        path: PathBuf,
        /// Reason for failure
        reason: String,
    },

    /// An asset's contents cannot be transported
    #[error("Invalid asset {path}: {reason}")]
    InvalidAsset {
        /// Asset location
        path: PathBuf,
        /// Reason for failure
        reason: String,
    },

    /// A walk was resumed after it had already failed
    #[error("Walk aborted by an earlier error")]
    Aborted,

    /// File system error
    #[error("File system error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TransportError {
    /// Create an unresolved reference error
    pub fn unresolved(target: impl Into<String>, from: impl Into<String>) -> Self {
        Self::UnresolvedReference {
            target: target.into(),
            from: from.into(),
        }
    }

    /// Create a missing dependency error
    pub fn missing(name: impl Into<String>, required: impl Into<String>) -> Self {
        Self::MissingDependency {
            name: name.into(),
            required: required.into(),
        }
    }

    /// Create an invalid configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }
}
