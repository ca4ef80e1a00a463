// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! End-to-end transport tests over in-memory packages

use seaport_core::{
    AssetHandler, FileRecord, HandlerContext, HandlerFactory, Include, ManifestResolver,
    MemoryTree, ModuleReference, Rename, RenderInput, SourceTree, Transport, TransportConfig,
    TransportError, TransportOptions,
};
use sha1::{Digest, Sha1};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// A project root with its files
struct Project {
    root: String,
    tree: MemoryTree,
}

impl Project {
    fn new(root: &str, files: &[(&str, &str)]) -> Self {
        let mut tree = MemoryTree::new();
        for (path, contents) in files {
            tree.insert(format!("{}/{}", root, path), contents.as_bytes().to_vec());
        }
        Self {
            root: root.to_string(),
            tree,
        }
    }

    fn transport(&self, options: TransportOptions) -> seaport_core::Result<Transport> {
        let packages = ManifestResolver::new(self.tree.clone(), &self.root, "sea-modules");
        Transport::new(options, Arc::new(packages), Arc::new(self.tree.clone()))
    }

    fn options(&self) -> TransportOptions {
        TransportOptions::new(&self.root)
    }

    fn entry(&self, path: &str) -> FileRecord {
        let full = format!("{}/{}", self.root, path);
        let contents = self.tree.read(Path::new(&full)).unwrap();
        FileRecord::new(full, &self.root, contents)
    }

    fn run(&self, options: TransportOptions, entries: &[&str]) -> seaport_core::Result<Vec<FileRecord>> {
        let files = entries.iter().map(|e| self.entry(e)).collect();
        self.transport(options)?.run(files)
    }
}

fn paths(records: &[FileRecord]) -> Vec<String> {
    records.iter().map(FileRecord::relative).collect()
}

fn text(records: &[FileRecord], relative: &str) -> String {
    let record = records
        .iter()
        .find(|r| r.relative() == relative)
        .unwrap_or_else(|| panic!("no record {} in {:?}", relative, paths(records)));
    record.text().unwrap().to_string()
}

fn simple_transport() -> Project {
    Project::new(
        "/p/simple-transport",
        &[
            (
                "package.json",
                r#"{"name":"simple-transport","version":"1.0.0","spm":{"dependencies":{"b":"1.0.0"}}}"#,
            ),
            ("index.js", "var b = require('b');\nvar c = require('./c');\n"),
            ("c.js", "module.exports = 'c';\n"),
        ],
    )
}

/// Package `a` with a relative script, a directory, an installed package
/// `b` (which depends on `c`) and the style runtime
fn package_a() -> Project {
    Project::new(
        "/p/a",
        &[
            (
                "package.json",
                r#"{"name":"a","version":"1.0.0","spm":{"dependencies":{"b":"1.0.0","import-style":"1.0.0","jquery":"1.7.2"}}}"#,
            ),
            ("index.js", "require('./x');\nrequire('b');\n"),
            ("x.js", "module.exports = 'x';\n"),
            ("lib/index.js", "module.exports = 'lib';\n"),
            ("a.css", "body { color: red; }\n"),
            ("sea-modules/b/1.0.0/package.json", r#"{"name":"b","version":"1.0.0","spm":{"dependencies":{"c":"1.0.0"}}}"#),
            ("sea-modules/b/1.0.0/index.js", "require('c');\nmodule.exports = 'b';\n"),
            ("sea-modules/c/1.0.0/package.json", r#"{"name":"c","version":"1.0.0"}"#),
            ("sea-modules/c/1.0.0/index.js", "module.exports = 'c';\n"),
            ("sea-modules/import-style/1.0.0/package.json", r#"{"name":"import-style","version":"1.0.0"}"#),
            ("sea-modules/import-style/1.0.0/index.js", "module.exports = function(css) {};\n"),
            (
                "sea-modules/jquery/1.7.2/package.json",
                r#"{"name":"jquery","version":"1.7.2","spm":{"main":"jquery.js"}}"#,
            ),
            ("sea-modules/jquery/1.7.2/jquery.js", "module.exports = {};\n"),
        ],
    )
}

#[test]
fn test_ignored_package_is_never_emitted() {
    let project = simple_transport();
    let options = TransportOptions {
        include: Include::All,
        ignore: vec!["b".into()],
        ..project.options()
    };
    let records = project.run(options, &["index.js"]).unwrap();

    assert_eq!(paths(&records), ["simple-transport/1.0.0/index.js", "simple-transport/1.0.0/c.js"]);
    assert_eq!(
        text(&records, "simple-transport/1.0.0/index.js"),
        "define(\"simple-transport/1.0.0/index\", [\"simple-transport/1.0.0/c\"], function(require, exports, module) {\nvar b = require('b');\nvar c = require('simple-transport/1.0.0/c');\n});\n"
    );
    assert_eq!(
        text(&records, "simple-transport/1.0.0/c.js"),
        "define(\"simple-transport/1.0.0/c\", [], function(require, exports, module) {\nmodule.exports = 'c';\n});\n"
    );
}

#[test]
fn test_suffix_rename() {
    let project = Project::new(
        "/p/type-transport",
        &[
            ("package.json", r#"{"name":"type-transport","version":"1.0.0"}"#),
            ("index.js", "var data = require('./a.json');\n"),
            ("a.json", "{ \"a\": 1 }\n"),
        ],
    );
    let options = TransportOptions {
        include: Include::Relative,
        rename: Some(Rename::suffix("-debug")),
        ..project.options()
    };
    let records = project.run(options, &["index.js"]).unwrap();

    assert_eq!(
        paths(&records),
        ["type-transport/1.0.0/index-debug.js", "type-transport/1.0.0/a-debug.json.js"]
    );
    assert_eq!(
        text(&records, "type-transport/1.0.0/index-debug.js"),
        "define(\"type-transport/1.0.0/index-debug\", [\"type-transport/1.0.0/a-debug.json\"], function(require, exports, module) {\nvar data = require('type-transport/1.0.0/a-debug.json');\n});\n"
    );
    assert_eq!(
        text(&records, "type-transport/1.0.0/a-debug.json.js"),
        "define(\"type-transport/1.0.0/a-debug.json\", [], function(require, exports, module) {\nmodule.exports = {\"a\":1};\n});\n"
    );
}

#[test]
fn test_content_hash_rename_runs_on_final_contents() {
    let project = package_a();
    let plain = project.run(project.options(), &["x.js"]).unwrap();
    assert_eq!(paths(&plain), ["a/1.0.0/x.js"]);

    let digest = hex::encode(Sha1::digest(&plain[0].contents));
    let options = TransportOptions {
        rename: Some(Rename::content_hash(8)),
        ..project.options()
    };
    let hashed = project.run(options, &["x.js"]).unwrap();

    assert_eq!(paths(&hashed), [format!("a/1.0.0/x-{}.js", &digest[..8])]);
    assert_eq!(hashed[0].contents, plain[0].contents);
    assert_eq!(hashed[0].origin, Path::new("/p/a/x.js"));
}

#[test]
fn test_missing_template_runtime() {
    let project = Project::new(
        "/p/a",
        &[
            ("package.json", r#"{"name":"a","version":"1.0.0"}"#),
            ("index.js", "var tpl = require('./a.handlebars');\n"),
            ("a.handlebars", "<p>{{name}}</p>\n"),
        ],
    );

    let err = project.run(project.options(), &["a.handlebars"]).unwrap_err();
    assert!(matches!(err, TransportError::MissingDependency { .. }));
    assert_eq!(err.to_string(), "handlebars-runtime not exist, but required .handlebars");

    // reached through a script, once the template is visited
    let options = TransportOptions {
        include: Include::SelfOnly,
        ..project.options()
    };
    let err = project.run(options, &["index.js"]).unwrap_err();
    assert_eq!(err.to_string(), "handlebars-runtime not exist, but required .handlebars");
}

#[test]
fn test_template_runtime_is_rewritten() {
    let project = Project::new(
        "/p/a",
        &[
            (
                "package.json",
                r#"{"name":"a","version":"1.0.0","spm":{"dependencies":{"handlebars-runtime":"1.3.0"}}}"#,
            ),
            ("a.handlebars", "<p>{{name}}</p>"),
            (
                "sea-modules/handlebars-runtime/1.3.0/package.json",
                r#"{"name":"handlebars-runtime","version":"1.3.0","spm":{"main":"handlebars.js"}}"#,
            ),
            ("sea-modules/handlebars-runtime/1.3.0/handlebars.js", ""),
        ],
    );
    let records = project.run(project.options(), &["a.handlebars"]).unwrap();

    assert_eq!(paths(&records), ["a/1.0.0/a.handlebars.js"]);
    assert_eq!(
        text(&records, "a/1.0.0/a.handlebars.js"),
        "define(\"a/1.0.0/a.handlebars\", [\"handlebars-runtime/1.3.0/handlebars\"], function(require, exports, module) {\nvar Handlebars = require(\"handlebars-runtime/1.3.0/handlebars\")[\"default\"];\nmodule.exports = Handlebars.compile(\"<p>{{name}}</p>\");\n});\n"
    );
}

#[test]
fn test_skipped_package_is_rewritten_not_emitted() {
    let project = Project::new(
        "/p/a",
        &[
            (
                "package.json",
                r#"{"name":"a","version":"1.0.0","spm":{"dependencies":{"jquery":"1.7.2"}}}"#,
            ),
            ("index.js", "var $ = require('jquery');\n"),
            (
                "sea-modules/jquery/1.7.2/package.json",
                r#"{"name":"jquery","version":"1.7.2","spm":{"main":"jquery.js"}}"#,
            ),
            ("sea-modules/jquery/1.7.2/jquery.js", "module.exports = {};\n"),
        ],
    );
    for include in [Include::Relative, Include::All] {
        let options = TransportOptions {
            include,
            skip: vec!["jquery".into()],
            ..project.options()
        };
        let records = project.run(options, &["index.js"]).unwrap();

        assert_eq!(paths(&records), ["a/1.0.0/index.js"], "{include}");
        assert_eq!(
            text(&records, "a/1.0.0/index.js"),
            "define(\"a/1.0.0/index\", [\"jquery/1.7.2/jquery\"], function(require, exports, module) {\nvar $ = require('jquery/1.7.2/jquery');\n});\n"
        );
    }
}

#[test]
fn test_unresolvable_skip_keeps_raw_text() {
    let project = Project::new(
        "/p/a",
        &[
            ("package.json", r#"{"name":"a","version":"1.0.0"}"#),
            ("index.js", "var $ = require('jquery');\n"),
        ],
    );
    let options = TransportOptions {
        skip: vec!["jquery".into()],
        ..project.options()
    };
    let records = project.run(options, &["index.js"]).unwrap();
    assert_eq!(
        text(&records, "a/1.0.0/index.js"),
        "define(\"a/1.0.0/index\", [\"jquery\"], function(require, exports, module) {\nvar $ = require('jquery');\n});\n"
    );

    // without the skip the package must resolve
    let err = project.run(project.options(), &["index.js"]).unwrap_err();
    assert_eq!(err.to_string(), "jquery not exist, but required by index.js");
}

#[test]
fn test_ignore_wins_over_skip() {
    let project = package_a();
    let options = TransportOptions {
        include: Include::All,
        ignore: vec!["b".into()],
        skip: vec!["b".into()],
        ..project.options()
    };
    let records = project.run(options, &["index.js"]).unwrap();

    assert_eq!(paths(&records), ["a/1.0.0/index.js", "a/1.0.0/x.js"]);
    assert_eq!(
        text(&records, "a/1.0.0/index.js"),
        "define(\"a/1.0.0/index\", [\"a/1.0.0/x\"], function(require, exports, module) {\nrequire('a/1.0.0/x');\nrequire('b');\n});\n"
    );
}

#[test]
fn test_include_modes() {
    let project = package_a();
    let run = |include| {
        let options = TransportOptions {
            include,
            ..project.options()
        };
        project.run(options, &["index.js"]).unwrap()
    };

    let none = run(Include::None);
    assert_eq!(paths(&none), ["a/1.0.0/index.js"]);
    assert!(text(&none, "a/1.0.0/index.js").starts_with(
        "define(\"a/1.0.0/index\", [\"a/1.0.0/x\", \"b/1.0.0/index\"], function"
    ));

    // b's own dependency shows up once b is traversed
    let self_only = run(Include::SelfOnly);
    assert_eq!(paths(&self_only), ["a/1.0.0/index.js"]);

    let relative = run(Include::Relative);
    assert_eq!(paths(&relative), ["a/1.0.0/index.js", "a/1.0.0/x.js"]);

    let all = run(Include::All);
    assert_eq!(
        paths(&all),
        ["a/1.0.0/index.js", "a/1.0.0/x.js", "b/1.0.0/index.js", "c/1.0.0/index.js"]
    );
    assert!(text(&all, "a/1.0.0/index.js").starts_with(
        "define(\"a/1.0.0/index\", [\"a/1.0.0/x\", \"b/1.0.0/index\", \"c/1.0.0/index\"], function"
    ));
    assert_eq!(
        text(&all, "b/1.0.0/index.js"),
        "define(\"b/1.0.0/index\", [\"c/1.0.0/index\"], function(require, exports, module) {\nrequire('c/1.0.0/index');\nmodule.exports = 'b';\n});\n"
    );
}

#[test]
fn test_directory_reference_resolves_to_index() {
    let mut project = package_a();
    project.tree.insert("/p/a/dir.js", "require('./lib');\nrequire('./lib/');\n");
    let options = TransportOptions {
        include: Include::Relative,
        ..project.options()
    };
    let records = project.run(options, &["dir.js"]).unwrap();

    assert_eq!(paths(&records), ["a/1.0.0/dir.js", "a/1.0.0/lib/index.js"]);
    assert_eq!(
        text(&records, "a/1.0.0/dir.js"),
        "define(\"a/1.0.0/dir\", [\"a/1.0.0/lib/index\"], function(require, exports, module) {\nrequire('a/1.0.0/lib/index');\nrequire('a/1.0.0/lib/index');\n});\n"
    );
}

#[test]
fn test_shared_dependency_is_emitted_once() {
    let mut project = package_a();
    project.tree.insert("/p/a/y.js", "require('./x');\n");
    let options = TransportOptions {
        include: Include::Relative,
        ..project.options()
    };
    let records = project.run(options, &["index.js", "y.js", "index.js"]).unwrap();
    assert_eq!(paths(&records), ["a/1.0.0/index.js", "a/1.0.0/y.js", "a/1.0.0/x.js"]);
}

#[test]
fn test_unresolved_reference_fails() {
    let mut project = package_a();
    project.tree.insert("/p/a/bad.js", "require('./missing');\n");
    let err = project.run(project.options(), &["bad.js"]).unwrap_err();
    assert!(matches!(err, TransportError::UnresolvedReference { .. }));
    assert_eq!(err.to_string(), "Cannot resolve './missing' from bad.js");
}

#[test]
fn test_repeated_runs_are_identical() {
    let project = package_a();
    let options = || TransportOptions {
        include: Include::All,
        ..project.options()
    };
    let first = project.run(options(), &["index.js"]).unwrap();
    let second = project.run(options(), &["index.js"]).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_style_module_modes() {
    let mut project = package_a();
    project.tree.insert("/p/a/style.js", "require('./a.css');\n");
    let run = |include| {
        let options = TransportOptions {
            include,
            ..project.options()
        };
        project.run(options, &["style.js"]).unwrap()
    };

    let none = run(Include::None);
    assert_eq!(paths(&none), ["a/1.0.0/style.js"]);
    assert!(text(&none, "a/1.0.0/style.js").starts_with("define(\"a/1.0.0/style\", [\"a/1.0.0/a.css\"], function"));

    let self_only = run(Include::SelfOnly);
    assert_eq!(paths(&self_only), ["a/1.0.0/style.js"]);
    assert!(text(&self_only, "a/1.0.0/style.js")
        .starts_with("define(\"a/1.0.0/style\", [\"a/1.0.0/a.css\", \"import-style/1.0.0/index\"], function"));

    let relative = run(Include::Relative);
    assert_eq!(paths(&relative), ["a/1.0.0/style.js", "a/1.0.0/a.css.js"]);
    assert_eq!(
        text(&relative, "a/1.0.0/a.css.js"),
        "define(\"a/1.0.0/a.css\", [\"import-style/1.0.0/index\"], function(require, exports, module) {\nrequire(\"import-style/1.0.0/index\")(\"body { color: red; }\");\n});\n"
    );

    let all = run(Include::All);
    assert_eq!(
        paths(&all),
        ["a/1.0.0/style.js", "a/1.0.0/a.css.js", "import-style/1.0.0/index.js"]
    );
}

#[test]
fn test_ignored_style_runtime_keeps_its_name() {
    let mut project = package_a();
    project.tree.insert("/p/a/style.js", "require('./a.css');\n");
    let options = TransportOptions {
        include: Include::Relative,
        ignore: vec!["import-style".into()],
        ..project.options()
    };
    let records = project.run(options, &["style.js"]).unwrap();
    assert_eq!(
        text(&records, "a/1.0.0/a.css.js"),
        "define(\"a/1.0.0/a.css\", [], function(require, exports, module) {\nrequire(\"import-style\")(\"body { color: red; }\");\n});\n"
    );
}

fn stylesheets() -> Project {
    Project::new(
        "/p/a",
        &[
            (
                "package.json",
                r#"{"name":"a","version":"1.0.0","spm":{"dependencies":{"s":"2.0.0"}}}"#,
            ),
            (
                "index.css",
                "@import \"./b.css\";\n@import \"s\";\nbody { background: url(./img/x.png); }\n",
            ),
            ("b.css", "b { color: blue; }\n"),
            ("img/x.png", "png"),
            ("sea-modules/s/2.0.0/package.json", r#"{"name":"s","version":"2.0.0","main":"s.css"}"#),
            ("sea-modules/s/2.0.0/s.css", "s { margin: 0; }\n"),
        ],
    )
}

#[test]
fn test_stylesheet_rename() {
    let project = stylesheets();
    let options = TransportOptions {
        rename: Some(Rename::suffix("-debug")),
        ..project.options()
    };
    let records = project.run(options, &["index.css"]).unwrap();

    assert_eq!(paths(&records), ["a/1.0.0/index-debug.css"]);
    assert_eq!(
        text(&records, "a/1.0.0/index-debug.css"),
        "@import \"./b-debug.css\";\n@import \"../../s/2.0.0/s-debug.css\";\nbody { background: url(./img/x.png); }\n"
    );
}

#[test]
fn test_stylesheet_modes() {
    let project = stylesheets();
    let run = |include| {
        let options = TransportOptions {
            include,
            ..project.options()
        };
        project.run(options, &["index.css"]).unwrap()
    };

    assert_eq!(paths(&run(Include::SelfOnly)), ["a/1.0.0/index.css"]);
    assert_eq!(paths(&run(Include::Relative)), ["a/1.0.0/index.css", "a/1.0.0/b.css"]);

    let all = run(Include::All);
    assert_eq!(paths(&all), ["a/1.0.0/index.css", "a/1.0.0/b.css", "s/2.0.0/s.css"]);
    assert_eq!(text(&all, "s/2.0.0/s.css"), "s { margin: 0; }\n");

    // no module registry for stylesheets: bundling emits them as they are
    assert_eq!(paths(&run(Include::Standalone)), paths(&all));
}

fn font_faces() -> Project {
    Project::new(
        "/p/a",
        &[
            (
                "package.json",
                r#"{"name":"a","version":"1.0.0","spm":{"dependencies":{"s":"2.0.0"}}}"#,
            ),
            (
                "index.css",
                "@import \"s\";\n@font-face { src: url(./f.eot?#iefix) format(\"embedded-opentype\"), url('./f.woff?v=1'); }\n",
            ),
            ("f.eot", "eot"),
            ("f.woff", "woff"),
            ("sea-modules/s/2.0.0/package.json", r#"{"name":"s","version":"2.0.0","main":"s.css"}"#),
            ("sea-modules/s/2.0.0/s.css", "s { background: url(\"./bg.png?v=3#top\"); }\n"),
            ("sea-modules/s/2.0.0/bg.png", "png"),
        ],
    )
}

#[test]
fn test_url_query_and_fragment_are_kept() {
    let project = font_faces();
    let records = project.run(project.options(), &["index.css"]).unwrap();

    assert_eq!(paths(&records), ["a/1.0.0/index.css"]);
    assert_eq!(
        text(&records, "a/1.0.0/index.css"),
        "@import \"../../s/2.0.0/s.css\";\n@font-face { src: url(./f.eot?#iefix) format(\"embedded-opentype\"), url('./f.woff?v=1'); }\n"
    );
}

#[test]
fn test_url_query_inside_renamed_package() {
    let project = font_faces();
    let options = TransportOptions {
        include: Include::All,
        rename: Some(Rename::suffix("-debug")),
        ..project.options()
    };
    let records = project.run(options, &["index.css"]).unwrap();

    assert_eq!(paths(&records), ["a/1.0.0/index-debug.css", "s/2.0.0/s-debug.css"]);
    assert_eq!(
        text(&records, "a/1.0.0/index-debug.css"),
        "@import \"../../s/2.0.0/s-debug.css\";\n@font-face { src: url(./f.eot?#iefix) format(\"embedded-opentype\"), url('./f.woff?v=1'); }\n"
    );
    assert_eq!(
        text(&records, "s/2.0.0/s-debug.css"),
        "s { background: url(\"./bg.png?v=3#top\"); }\n"
    );
}

#[test]
fn test_url_with_missing_file_still_fails() {
    let mut project = font_faces();
    project.tree.insert("/p/a/bad.css", "a { src: url(./gone.eot?#iefix); }\n");
    let err = project.run(project.options(), &["bad.css"]).unwrap_err();
    assert_eq!(err.to_string(), "Cannot resolve './gone.eot' from bad.css");
}

#[test]
fn test_requires_beside_regex_and_template_literals() {
    let project = Project::new(
        "/p/a",
        &[
            ("package.json", r#"{"name":"a","version":"1.0.0"}"#),
            (
                "index.js",
                "var q = s.replace(/'/g, ''), b = require('./b');\nvar t = `<p>${require('./c')}</p>`;\nvar u = `require('./no')`;\n",
            ),
            ("b.js", "module.exports = 'b';\n"),
            ("c.js", "module.exports = 'c';\n"),
        ],
    );
    let options = TransportOptions {
        include: Include::Relative,
        ..project.options()
    };
    let records = project.run(options, &["index.js"]).unwrap();

    assert_eq!(paths(&records), ["a/1.0.0/index.js", "a/1.0.0/b.js", "a/1.0.0/c.js"]);
    assert_eq!(
        text(&records, "a/1.0.0/index.js"),
        "define(\"a/1.0.0/index\", [\"a/1.0.0/b\", \"a/1.0.0/c\"], function(require, exports, module) {\nvar q = s.replace(/'/g, ''), b = require('a/1.0.0/b');\nvar t = `<p>${require('a/1.0.0/c')}</p>`;\nvar u = `require('./no')`;\n});\n"
    );
}

fn other_extensions() -> Project {
    Project::new(
        "/p/a",
        &[
            ("package.json", r#"{"name":"a","version":"1.0.0"}"#),
            ("index.js", "require('./a.tpl');\nrequire('./b.html');\n"),
            ("a.tpl", "<b>{{name}}</b>"),
            ("b.html", "<i>\"hi\"</i>\n"),
        ],
    )
}

#[test]
fn test_other_extensions() {
    let project = other_extensions();
    let options = TransportOptions {
        include: Include::Relative,
        ..project.options()
    };
    let records = project.run(options, &["index.js"]).unwrap();

    assert_eq!(paths(&records), ["a/1.0.0/index.js", "a/1.0.0/a.tpl.js", "a/1.0.0/b.html.js"]);
    assert!(text(&records, "a/1.0.0/index.js").contains("require('a/1.0.0/a.tpl');\nrequire('a/1.0.0/b.html');"));
    assert!(text(&records, "a/1.0.0/a.tpl.js").contains("return \"<b>\" + escape(lookup(\"name\")) + \"</b>\";"));
    assert_eq!(
        text(&records, "a/1.0.0/b.html.js"),
        "define(\"a/1.0.0/b.html\", [], function(require, exports, module) {\nmodule.exports = \"<i>\\\"hi\\\"</i>\\n\";\n});\n"
    );
}

#[test]
fn test_other_extensions_with_suffix() {
    let project = other_extensions();
    let options = TransportOptions {
        include: Include::Relative,
        rename: Some(Rename::suffix("-debug")),
        ..project.options()
    };
    let records = project.run(options, &["index.js"]).unwrap();

    assert_eq!(
        paths(&records),
        ["a/1.0.0/index-debug.js", "a/1.0.0/a-debug.tpl.js", "a/1.0.0/b-debug.html.js"]
    );
    assert!(text(&records, "a/1.0.0/index-debug.js")
        .contains("require('a/1.0.0/a-debug.tpl');\nrequire('a/1.0.0/b-debug.html');"));
    assert!(text(&records, "a/1.0.0/b-debug.html.js").starts_with("define(\"a/1.0.0/b-debug.html\", [], function"));
}

/// Prepends a banner to whatever the wrapped handler renders
struct Banner(Arc<dyn AssetHandler>);

impl AssetHandler for Banner {
    fn scan(&self, source: &str) -> Vec<ModuleReference> {
        self.0.scan(source)
    }

    fn render(&self, input: &RenderInput<'_>) -> seaport_core::Result<String> {
        Ok(format!("/*! {} */\n{}", input.relative, self.0.render(input)?))
    }
}

#[test]
fn test_custom_script_handler() {
    let project = package_a();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let calls = Arc::clone(&seen);
    let factory: HandlerFactory =
        Arc::new(move |ctx: &HandlerContext| -> seaport_core::Result<Arc<dyn AssetHandler>> {
            calls.lock().unwrap().push((
                ctx.package.name.clone(),
                ctx.ignore.clone(),
                ctx.include,
                ctx.idleading.clone(),
            ));
            let builtin = ctx
                .registry
                .builtin(".js")
                .ok_or_else(|| TransportError::config("no script handler"))?;
            Ok(Arc::new(Banner(builtin(ctx)?)))
        });

    let options = TransportOptions {
        include: Include::Relative,
        ignore: vec!["b".into()],
        idleading: "lib".into(),
        stream: BTreeMap::from([(".js".to_string(), factory)]),
        ..project.options()
    };
    let records = project.run(options, &["index.js"]).unwrap();

    assert_eq!(paths(&records), ["a/1.0.0/index.js", "a/1.0.0/x.js"]);
    assert_eq!(
        text(&records, "a/1.0.0/index.js"),
        "/*! index.js */\ndefine(\"lib/a/1.0.0/index\", [\"lib/a/1.0.0/x\"], function(require, exports, module) {\nrequire('lib/a/1.0.0/x');\nrequire('b');\n});\n"
    );
    assert!(text(&records, "a/1.0.0/x.js").starts_with("/*! x.js */\ndefine(\"lib/a/1.0.0/x\""));

    // one handler per package and form
    let seen = seen.lock().unwrap();
    assert_eq!(
        *seen,
        [("a".to_string(), vec!["b".to_string()], Include::Relative, "lib".to_string())]
    );
}

#[test]
fn test_standalone_bundle() {
    let project = package_a();
    let options = TransportOptions {
        include: Include::Standalone,
        ..project.options()
    };
    let records = project.run(options, &["index.js"]).unwrap();

    assert_eq!(paths(&records), ["a/1.0.0/index.js"]);
    let bundle = text(&records, "a/1.0.0/index.js");
    assert!(bundle.starts_with("(function() {\n"));
    assert!(bundle.contains(
        "define(\"a/1.0.0/index\", [\"a/1.0.0/x\", \"b/1.0.0/index\", \"c/1.0.0/index\"], function"
    ));
    assert!(bundle.contains("define(\"a/1.0.0/x\", [], function"));
    assert!(bundle.contains("define(\"b/1.0.0/index\", [\"c/1.0.0/index\"], function"));
    assert!(bundle.contains("define(\"c/1.0.0/index\", [], function"));
    assert!(bundle.ends_with("require(\"a/1.0.0/index\");\n})();\n"));
}

#[test]
fn test_umd_bundle_per_entry() {
    let project = package_a();
    let options = TransportOptions {
        include: Include::Umd,
        rename: Some(Rename::suffix("-debug")),
        ..project.options()
    };
    let records = project.run(options, &["index.js", "x.js"]).unwrap();

    assert_eq!(paths(&records), ["a/1.0.0/index-debug.js", "a/1.0.0/x-debug.js"]);
    let bundle = text(&records, "a/1.0.0/index-debug.js");
    assert!(bundle.contains("root[\"a\"] = factory();"));
    assert!(bundle.contains("define(\"b/1.0.0/index-debug\", [\"c/1.0.0/index-debug\"], function"));
    assert!(bundle.ends_with("return require(\"a/1.0.0/index-debug\");\n});\n"));

    let single = text(&records, "a/1.0.0/x-debug.js");
    assert!(!single.contains("b/1.0.0/index"));
    assert!(single.ends_with("return require(\"a/1.0.0/x-debug\");\n});\n"));
}

#[test]
fn test_options_from_config_file() {
    let project = simple_transport();
    let config: TransportConfig = toml::from_str(
        r#"
include = "all"
ignore = "b"
rename = { suffix = "-debug" }
"#,
    )
    .unwrap();
    let options = config.into_options(&project.root).unwrap();
    let records = project.transport(options).unwrap().run(vec![project.entry("index.js")]).unwrap();

    assert_eq!(
        paths(&records),
        ["simple-transport/1.0.0/index-debug.js", "simple-transport/1.0.0/c-debug.js"]
    );
}

#[test]
fn test_concurrent_runs() {
    let project = package_a();
    let transport = project
        .transport(TransportOptions {
            include: Include::All,
            ..project.options()
        })
        .unwrap();
    let expected = transport.run(vec![project.entry("index.js")]).unwrap();

    std::thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|_| s.spawn(|| transport.run(vec![project.entry("index.js")]).unwrap()))
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    });
}
