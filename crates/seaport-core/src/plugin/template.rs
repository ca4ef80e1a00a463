// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Plain text templates

use super::{AssetHandler, RenderInput, define, js_string};
use crate::error::Result;
use regex::Regex;
use std::sync::LazyLock;

static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_$][\w$]*(?:\.[A-Za-z_$][\w$]*)*)\s*\}\}")
        .expect("placeholder pattern is valid")
});

const RENDER_PRELUDE: &str = r#"module.exports = function(data) {
  data = data || {};
  var escape = function(value) {
    return String(value == null ? "" : value).replace(/[&<>"']/g, function(c) {
      return {"&": "&amp;", "<": "&lt;", ">": "&gt;", "\"": "&quot;", "'": "&#39;"}[c];
    });
  };
  var lookup = function(path) {
    return path.split(".").reduce(function(o, k) {
      return o == null ? o : o[k];
    }, data);
  };
"#;

/// Compiles `.tpl` files into a render function
///
/// `{{ key }}` and `{{ a.b }}` are looked up on the render argument and
/// HTML-escaped. Everything else is literal text.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateHandler;

impl AssetHandler for TemplateHandler {
    fn render(&self, input: &RenderInput<'_>) -> Result<String> {
        let mut body = String::from(RENDER_PRELUDE);
        body.push_str("  return ");
        body.push_str(&compile(input.source));
        body.push_str(";\n};");
        Ok(define(input.id, input.dependencies, &body))
    }
}

/// String concatenation expression of a template
fn compile(source: &str) -> String {
    let mut parts = Vec::new();
    let mut last = 0;
    for caps in PLACEHOLDER_RE.captures_iter(source) {
        let (Some(whole), Some(key)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if whole.start() > last {
            parts.push(js_string(&source[last..whole.start()]));
        }
        parts.push(format!("escape(lookup({}))", js_string(key.as_str())));
        last = whole.end();
    }
    if last < source.len() {
        parts.push(js_string(&source[last..]));
    }
    if parts.is_empty() {
        return "\"\"".to_string();
    }
    parts.join(" + ")
}

/// Exports `.html` files as a string
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlHandler;

impl AssetHandler for HtmlHandler {
    fn render(&self, input: &RenderInput<'_>) -> Result<String> {
        let body = format!("module.exports = {};", js_string(input.source));
        Ok(define(input.id, input.dependencies, &body))
    }
}
