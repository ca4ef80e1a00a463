// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Stylesheets, standalone and required from scripts

use super::{AssetHandler, RenderInput, define, js_string};
use crate::error::Result;
use crate::scan::{AssetKind, ModuleReference, scan};

/// Runtime package that injects style modules into the page
pub const IMPORT_STYLE: &str = "import-style";

/// Rewrites `@import` and `url()`; the output stays a stylesheet
#[derive(Debug, Clone, Copy, Default)]
pub struct StylesheetHandler;

impl AssetHandler for StylesheetHandler {
    fn scan(&self, source: &str) -> Vec<ModuleReference> {
        scan(source, AssetKind::Stylesheet)
    }

    fn render(&self, input: &RenderInput<'_>) -> Result<String> {
        Ok(input.source.to_string())
    }
}

/// A stylesheet required from a script, compiled into a module that
/// hands its text to `import-style`
#[derive(Debug, Clone, Copy, Default)]
pub struct StyleModuleHandler;

impl AssetHandler for StyleModuleHandler {
    fn runtime_dependencies(&self) -> Vec<String> {
        vec![IMPORT_STYLE.to_string()]
    }

    fn render(&self, input: &RenderInput<'_>) -> Result<String> {
        let body = format!(
            "require({})({});",
            js_string(input.runtime_id(IMPORT_STYLE)),
            js_string(input.source.trim())
        );
        Ok(define(input.id, input.dependencies, &body))
    }
}
