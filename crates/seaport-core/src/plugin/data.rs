// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! JSON data modules

use super::{AssetHandler, RenderInput, define};
use crate::error::{Result, TransportError};

/// Exports a parsed JSON document
#[derive(Debug, Clone, Copy, Default)]
pub struct DataHandler;

impl AssetHandler for DataHandler {
    fn render(&self, input: &RenderInput<'_>) -> Result<String> {
        let value: serde_json::Value =
            serde_json::from_str(input.source).map_err(|e| TransportError::InvalidAsset {
                path: input.path.to_path_buf(),
                reason: e.to_string(),
            })?;
        let body = format!("module.exports = {};", serde_json::to_string(&value)?);
        Ok(define(input.id, input.dependencies, &body))
    }
}
