// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Handlebars templates
//!
//! Only the runtime wiring lives here. The template source is compiled by
//! the Handlebars runtime package in the browser.

use super::{AssetHandler, RenderInput, define, js_string};
use crate::error::Result;

/// Runtime package of compiled Handlebars templates
pub const HANDLEBARS_RUNTIME: &str = "handlebars-runtime";

/// Compiles `.handlebars` templates against `handlebars-runtime`
#[derive(Debug, Clone, Copy, Default)]
pub struct HandlebarsHandler;

impl AssetHandler for HandlebarsHandler {
    fn runtime_dependencies(&self) -> Vec<String> {
        vec![HANDLEBARS_RUNTIME.to_string()]
    }

    fn render(&self, input: &RenderInput<'_>) -> Result<String> {
        let body = format!(
            "var Handlebars = require({})[\"default\"];\nmodule.exports = Handlebars.compile({});",
            js_string(input.runtime_id(HANDLEBARS_RUNTIME)),
            js_string(input.source)
        );
        Ok(define(input.id, input.dependencies, &body))
    }
}
