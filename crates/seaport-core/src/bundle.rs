// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Self-executing bundles and plain concatenation

use crate::file::FileRecord;
use crate::plugin::js_string;

/// Registry the bundled `define` calls land in
///
/// Unknown ids resolve to `null`, so ignored references dereference to
/// nothing.
const RUNTIME: &str = r#"var __modules = {}, __cache = {};
function define(id, deps, factory) {
  if (typeof id === "string") {
    __modules[id] = factory;
  }
}
function require(id) {
  if (Object.prototype.hasOwnProperty.call(__cache, id)) {
    return __cache[id].exports;
  }
  var factory = __modules[id];
  if (!factory) {
    return null;
  }
  var module = __cache[id] = { id: id, exports: {} };
  var result = typeof factory === "function" ? factory(require, module.exports, module) : factory;
  if (result !== undefined) {
    module.exports = result;
  }
  return module.exports;
}
"#;

fn join_modules(modules: &[FileRecord]) -> String {
    let mut body = String::new();
    for module in modules {
        body.push_str(&String::from_utf8_lossy(&module.contents));
        if !body.ends_with('\n') {
            body.push('\n');
        }
    }
    body
}

/// Wrap `modules` into a self-executing function that runs `entry_id`
pub fn standalone(entry_id: &str, modules: &[FileRecord]) -> String {
    format!(
        "(function() {{\n{}{}require({});\n}})();\n",
        RUNTIME,
        join_modules(modules),
        js_string(entry_id)
    )
}

/// Wrap `modules` into a universal module definition exporting `entry_id`
///
/// CommonJS hosts get `module.exports`, AMD and CMD loaders get a `define`,
/// anything else a global named `global`.
pub fn umd(entry_id: &str, global: &str, modules: &[FileRecord]) -> String {
    format!(
        concat!(
            "(function(root, factory) {{\n",
            "  if (typeof module === \"object\" && module.exports) {{\n",
            "    module.exports = factory();\n",
            "  }} else if (typeof define === \"function\" && (define.amd || define.cmd)) {{\n",
            "    define(function() {{\n",
            "      return factory();\n",
            "    }});\n",
            "  }} else {{\n",
            "    root[{global}] = factory();\n",
            "  }}\n",
            "}})(this, function() {{\n",
            "{runtime}{body}return require({entry});\n",
            "}});\n"
        ),
        global = js_string(global),
        runtime = RUNTIME,
        body = join_modules(modules),
        entry = js_string(entry_id)
    )
}

/// Join records into one at the first record's location
pub fn concat(records: Vec<FileRecord>) -> Option<FileRecord> {
    let mut records = records.into_iter();
    let mut first = records.next()?;
    for record in records {
        if !first.contents.ends_with(b"\n") {
            first.contents.push(b'\n');
        }
        first.contents.extend_from_slice(&record.contents);
    }
    Some(first)
}
