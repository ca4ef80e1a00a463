// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! CMD scripts

use super::{AssetHandler, RenderInput, define};
use crate::error::Result;
use crate::scan::{AssetKind, ModuleReference, scan};

/// Wraps a CommonJS-style script into a `define` call
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptHandler;

impl AssetHandler for ScriptHandler {
    fn scan(&self, source: &str) -> Vec<ModuleReference> {
        scan(source, AssetKind::Script)
    }

    fn render(&self, input: &RenderInput<'_>) -> Result<String> {
        // already a module definition: only its requires were rewritten
        if input.source.trim_start().starts_with("define(") {
            return Ok(input.source.to_string());
        }
        Ok(define(input.id, input.dependencies, input.source))
    }
}
