// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Type plugins
//!
//! Every output form is handled by an [`AssetHandler`] created from a
//! [`HandlerFactory`]. Factories are keyed by output extension (`.js`,
//! `.css`, `.css.js`, ...). Callers may override any key; overrides get the
//! same [`HandlerContext`] as the built-ins and can delegate to them through
//! [`TypePluginRegistry::builtin`].

mod data;
mod handlebars;
mod script;
mod style;
mod template;

pub use data::DataHandler;
pub use handlebars::{HANDLEBARS_RUNTIME, HandlebarsHandler};
pub use script::ScriptHandler;
pub use style::{IMPORT_STYLE, StyleModuleHandler, StylesheetHandler};
pub use template::{HtmlHandler, TemplateHandler};

use crate::error::Result;
use crate::package::Package;
use crate::policy::Include;
use crate::scan::ModuleReference;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Creates a handler for one package
pub type HandlerFactory = Arc<dyn Fn(&HandlerContext) -> Result<Arc<dyn AssetHandler>> + Send + Sync>;

/// Output extensions with a built-in handler
pub const BUILTIN_KEYS: &[&str] = &[
    ".js",
    ".css",
    ".css.js",
    ".json.js",
    ".tpl.js",
    ".html.js",
    ".handlebars.js",
];

/// What a handler factory is told about the invocation
#[derive(Clone)]
pub struct HandlerContext {
    /// Package whose files the handler will render
    pub package: Arc<Package>,
    /// Ignore patterns as given
    pub ignore: Vec<String>,
    /// Inclusion mode
    pub include: Include,
    /// Module id prefix
    pub idleading: String,
    /// The registry the handler was created from
    pub registry: Arc<TypePluginRegistry>,
}

impl fmt::Debug for HandlerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerContext")
            .field("package", &self.package.id())
            .field("ignore", &self.ignore)
            .field("include", &self.include)
            .field("idleading", &self.idleading)
            .finish_non_exhaustive()
    }
}

/// Everything a handler needs to render one node
#[derive(Debug, Clone, Copy)]
pub struct RenderInput<'a> {
    /// Module id of the node
    pub id: &'a str,
    /// Source location
    pub path: &'a Path,
    /// Source path relative to the package root
    pub relative: &'a str,
    /// Source text with every reference already rewritten
    pub source: &'a str,
    /// Deep dependencies, in discovery order
    pub dependencies: &'a [String],
    /// Runtime package name -> text that addresses it
    pub runtime: &'a BTreeMap<String, String>,
}

impl RenderInput<'_> {
    /// How to address the runtime package `name`
    pub fn runtime_id<'b>(&'b self, name: &'b str) -> &'b str {
        self.runtime.get(name).map(String::as_str).unwrap_or(name)
    }
}

/// Renders one output form
pub trait AssetHandler: Send + Sync {
    /// References in the source text
    fn scan(&self, _source: &str) -> Vec<ModuleReference> {
        Vec::new()
    }

    /// Packages the rendered module requires at runtime
    fn runtime_dependencies(&self) -> Vec<String> {
        Vec::new()
    }

    /// Produce the output text
    fn render(&self, input: &RenderInput<'_>) -> Result<String>;
}

/// Factories by output extension
#[derive(Clone, Default)]
pub struct TypePluginRegistry {
    overrides: BTreeMap<String, HandlerFactory>,
}

impl fmt::Debug for TypePluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypePluginRegistry")
            .field("overrides", &self.overrides.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl TypePluginRegistry {
    /// Create a registry with caller overrides
    pub fn new(overrides: BTreeMap<String, HandlerFactory>) -> Self {
        Self { overrides }
    }

    /// Built-in factory for `key`, ignoring overrides
    pub fn builtin(&self, key: &str) -> Option<HandlerFactory> {
        let factory = match key {
            ".js" => handler_of::<ScriptHandler>(),
            ".css" => handler_of::<StylesheetHandler>(),
            ".css.js" => handler_of::<StyleModuleHandler>(),
            ".json.js" => handler_of::<DataHandler>(),
            ".tpl.js" => handler_of::<TemplateHandler>(),
            ".html.js" => handler_of::<HtmlHandler>(),
            ".handlebars.js" => handler_of::<HandlebarsHandler>(),
            _ => return None,
        };
        Some(factory)
    }

    /// Factory for `key`: the override if any, else the built-in
    pub fn factory(&self, key: &str) -> Option<HandlerFactory> {
        self.overrides
            .get(key)
            .cloned()
            .or_else(|| self.builtin(key))
    }

    /// Whether `key` has a factory
    pub fn supports(&self, key: &str) -> bool {
        self.overrides.contains_key(key) || BUILTIN_KEYS.contains(&key)
    }

    /// Keys with a factory, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = BUILTIN_KEYS.iter().map(|k| k.to_string()).collect();
        keys.extend(self.overrides.keys().cloned());
        keys.sort();
        keys.dedup();
        keys
    }
}

fn handler_of<H>() -> HandlerFactory
where
    H: AssetHandler + Default + 'static,
{
    Arc::new(|_: &HandlerContext| -> Result<Arc<dyn AssetHandler>> { Ok(Arc::new(H::default())) })
}

/// `define("<id>", [deps], function(require, exports, module) { ... });`
pub fn define(id: &str, dependencies: &[String], body: &str) -> String {
    let mut out = String::with_capacity(body.len() + id.len() + 64);
    out.push_str("define(");
    out.push_str(&js_string(id));
    out.push_str(", [");
    for (i, dep) in dependencies.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(&js_string(dep));
    }
    out.push_str("], function(require, exports, module) {\n");
    out.push_str(body);
    if !body.ends_with('\n') {
        out.push('\n');
    }
    out.push_str("});\n");
    out
}

/// A double-quoted JavaScript string literal
pub fn js_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
