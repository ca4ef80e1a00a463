// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Reference scanning
//!
//! A textual pass, not a parse: `require("x")` in scripts, `@import` and
//! `url()` in stylesheets. Each reference records the exact span of its
//! target so the emitter can replace it without touching anything else.

use crate::path::is_relative;
use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;
use tracing::trace;

static REQUIRE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\brequire\s*\(\s*(?:"([^"\r\n]*)"|'([^'\r\n]*)')\s*\)"#)
        .expect("require pattern is valid")
});

static IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"@import\s+(?:url\(\s*)?(?:"([^"\r\n]*)"|'([^'\r\n]*)'|([^\s;"')]+))"#)
        .expect("import pattern is valid")
});

static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"url\(\s*(?:"([^"\r\n]*)"|'([^'\r\n]*)'|([^\s"')]+))\s*\)"#)
        .expect("url pattern is valid")
});

/// Asset type, decided by the source extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    /// `.js`
    Script,
    /// `.css`
    Stylesheet,
    /// `.json`
    Data,
    /// `.tpl`, `.html`
    Template,
    /// `.handlebars`
    RichTemplate,
    /// Anything else (images, fonts, ...)
    Other,
}

impl AssetKind {
    /// Classify an extension (with the leading dot)
    pub fn from_extension(ext: &str) -> Self {
        match ext {
            ".js" => AssetKind::Script,
            ".css" => AssetKind::Stylesheet,
            ".json" => AssetKind::Data,
            ".tpl" | ".html" => AssetKind::Template,
            ".handlebars" => AssetKind::RichTemplate,
            _ => AssetKind::Other,
        }
    }

    /// Classify a path by its final extension
    pub fn of(relative: &str) -> Self {
        crate::path::extension(relative)
            .map(Self::from_extension)
            .unwrap_or(AssetKind::Other)
    }
}

/// How the reference target is spelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    /// `./x`, `../x`
    Relative,
    /// `pkg` or `pkg/sub/path`
    Named,
    /// `.`, `..`, `./dir/`
    DirectoryImplicit,
}

/// Which syntax produced the reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceSyntax {
    /// `require("x")`
    Require,
    /// `@import "x"`
    Import,
    /// `url(x)`
    Url,
    /// Implied by a type plugin (a runtime package); has no span
    Runtime,
}

/// A raw, unresolved reference found in a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleReference {
    /// Target exactly as written
    pub raw: String,
    /// Spelling class of the target
    pub kind: ReferenceKind,
    /// Producing syntax
    pub syntax: ReferenceSyntax,
    /// Byte span of the target text (inside the quotes)
    pub span: Option<Range<usize>>,
}

impl ModuleReference {
    /// A reference implied by a type plugin
    pub fn runtime(package: impl Into<String>) -> Self {
        Self {
            raw: package.into(),
            kind: ReferenceKind::Named,
            syntax: ReferenceSyntax::Runtime,
            span: None,
        }
    }

    /// Whether the target addresses a module (as opposed to a stylesheet or asset)
    pub fn is_module(&self) -> bool {
        matches!(self.syntax, ReferenceSyntax::Require | ReferenceSyntax::Runtime)
    }
}

/// Scan `content` for references, in source order
pub fn scan(content: &str, asset: AssetKind) -> Vec<ModuleReference> {
    match asset {
        AssetKind::Script => scan_script(content),
        AssetKind::Stylesheet => scan_stylesheet(content),
        _ => Vec::new(),
    }
}

fn scan_script(content: &str) -> Vec<ModuleReference> {
    let skipped = script_literal_ranges(content);
    let mut refs = Vec::new();

    for caps in REQUIRE_RE.captures_iter(content) {
        let Some(whole) = caps.get(0) else { continue };
        if inside(&skipped, whole.start()) {
            continue;
        }
        // member calls such as `loader.require("x")` are not CMD requires
        if content[..whole.start()].trim_end().ends_with(['.', '$']) {
            continue;
        }
        let Some(target) = caps.get(1).or_else(|| caps.get(2)) else {
            continue;
        };
        trace!("require({}) at {}", target.as_str(), target.start());
        refs.push(ModuleReference {
            raw: target.as_str().to_string(),
            kind: classify(target.as_str()),
            syntax: ReferenceSyntax::Require,
            span: Some(target.range()),
        });
    }

    refs
}

fn scan_stylesheet(content: &str) -> Vec<ModuleReference> {
    let comments = css_comment_ranges(content);
    let mut refs = Vec::new();
    let mut imports: Vec<Range<usize>> = Vec::new();

    for caps in IMPORT_RE.captures_iter(content) {
        let Some(whole) = caps.get(0) else { continue };
        if inside(&comments, whole.start()) {
            continue;
        }
        imports.push(whole.range());
        let Some(target) = caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3)) else {
            continue;
        };
        let raw = without_query(target.as_str());
        if raw.is_empty() || is_external(raw) {
            continue;
        }
        let kind = if is_relative(raw) || (!raw.contains('/') && raw.ends_with(".css")) {
            classify_relative(raw)
        } else {
            ReferenceKind::Named
        };
        refs.push(ModuleReference {
            raw: raw.to_string(),
            kind,
            syntax: ReferenceSyntax::Import,
            span: Some(target.start()..target.start() + raw.len()),
        });
    }

    for caps in URL_RE.captures_iter(content) {
        let Some(whole) = caps.get(0) else { continue };
        if inside(&comments, whole.start()) || inside(&imports, whole.start()) {
            continue;
        }
        let Some(target) = caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3)) else {
            continue;
        };
        let raw = without_query(target.as_str());
        if raw.is_empty() || is_external(raw) {
            continue;
        }
        // bare url() targets are relative to the stylesheet
        refs.push(ModuleReference {
            raw: raw.to_string(),
            kind: classify_relative(raw),
            syntax: ReferenceSyntax::Url,
            span: Some(target.start()..target.start() + raw.len()),
        });
    }

    refs.sort_by_key(|r| r.span.as_ref().map(|s| s.start));
    refs
}

/// Spelling class of a raw target
pub fn classify(raw: &str) -> ReferenceKind {
    if is_relative(raw) {
        classify_relative(raw)
    } else {
        ReferenceKind::Named
    }
}

fn classify_relative(raw: &str) -> ReferenceKind {
    if raw == "." || raw == ".." || raw.ends_with('/') {
        ReferenceKind::DirectoryImplicit
    } else {
        ReferenceKind::Relative
    }
}

/// The path part of a stylesheet target; `?query` and `#fragment` stay in
/// the source untouched
fn without_query(raw: &str) -> &str {
    raw.find(['?', '#']).map_or(raw, |end| &raw[..end])
}

/// Targets that never point into a package
fn is_external(raw: &str) -> bool {
    let lower = raw.to_ascii_lowercase();
    ["http:", "https:", "//", "data:", "/", "#", "about:"]
        .iter()
        .any(|p| lower.starts_with(p))
}

fn inside(ranges: &[Range<usize>], pos: usize) -> bool {
    ranges.iter().any(|r| r.contains(&pos))
}

/// Byte ranges of comments, string and regex literals, and template text
/// outside `${}`, in a script
fn script_literal_ranges(src: &str) -> Vec<Range<usize>> {
    let bytes = src.as_bytes();
    let mut ranges = Vec::new();
    // brace depth inside each open `${`
    let mut templates: Vec<usize> = Vec::new();
    // last significant byte outside comments
    let mut last: Option<usize> = None;
    let mut i = 0;

    while i < bytes.len() {
        let start = i;
        match bytes[i] {
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
                ranges.push(start..i);
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i += 2;
                while i < bytes.len() && !(bytes[i] == b'*' && bytes.get(i + 1) == Some(&b'/')) {
                    i += 1;
                }
                i = (i + 2).min(bytes.len());
                ranges.push(start..i);
            }
            b'/' if regex_allowed(bytes, last) => {
                i = regex_end(bytes, i);
                ranges.push(start..i);
                last = Some(i - 1);
            }
            quote @ (b'"' | b'\'') => {
                i += 1;
                while i < bytes.len() && bytes[i] != quote {
                    // an unterminated quote ends with the line
                    if bytes[i] == b'\n' {
                        break;
                    }
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
                i = (i + 1).min(bytes.len());
                ranges.push(start..i);
                last = Some(i - 1);
            }
            b'`' => {
                let (end, open) = template_chunk(bytes, i + 1);
                if open {
                    templates.push(0);
                }
                ranges.push(start..end);
                last = Some(end - 1);
                i = end;
            }
            b'}' if templates.last() == Some(&0) => {
                templates.pop();
                let (end, open) = template_chunk(bytes, i + 1);
                if open {
                    templates.push(0);
                }
                ranges.push(start..end);
                last = Some(end - 1);
                i = end;
            }
            brace @ (b'{' | b'}') if !templates.is_empty() => {
                if let Some(depth) = templates.last_mut() {
                    if brace == b'{' {
                        *depth += 1;
                    } else {
                        *depth -= 1;
                    }
                }
                last = Some(i);
                i += 1;
            }
            c if c.is_ascii_whitespace() => i += 1,
            _ => {
                last = Some(i);
                i += 1;
            }
        }
    }

    ranges
}

/// Template text from `i` up to the closing backtick or the next `${`,
/// and whether it stopped at `${`
fn template_chunk(bytes: &[u8], mut i: usize) -> (usize, bool) {
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'`' => return (i + 1, false),
            b'$' if bytes.get(i + 1) == Some(&b'{') => return (i + 2, true),
            _ => i += 1,
        }
    }
    (bytes.len(), false)
}

/// Whether a `/` after the significant byte at `last` starts a regex
/// literal rather than a division
fn regex_allowed(bytes: &[u8], last: Option<usize>) -> bool {
    let Some(at) = last else { return true };
    match bytes[at] {
        b'(' | b',' | b'=' | b':' | b'[' | b'!' | b'&' | b'|' | b'?' | b'{' | b'}' | b';'
        | b'+' | b'-' | b'*' | b'%' | b'<' | b'>' | b'~' | b'^' => true,
        c if is_word_byte(c) => {
            let word = bytes[..at]
                .iter()
                .rposition(|b| !is_word_byte(*b))
                .map_or(0, |p| p + 1);
            matches!(
                &bytes[word..=at],
                b"return" | b"typeof" | b"case" | b"void" | b"delete" | b"in" | b"of" | b"new"
                    | b"throw" | b"else" | b"do"
            )
        }
        _ => false,
    }
}

/// End of the regex literal opening at `i`; an unterminated one ends with the line
fn regex_end(bytes: &[u8], mut i: usize) -> usize {
    let mut class = false;
    i += 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 1,
            b'\n' => return i,
            b'[' => class = true,
            b']' => class = false,
            b'/' if !class => return i + 1,
            _ => {}
        }
        i += 1;
    }
    bytes.len()
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b >= 0x80
}

/// Byte ranges of `/* */` comments in a stylesheet
fn css_comment_ranges(src: &str) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut rest = 0;
    while let Some(open) = src[rest..].find("/*") {
        let start = rest + open;
        let end = src[start + 2..]
            .find("*/")
            .map(|close| start + 2 + close + 2)
            .unwrap_or(src.len());
        ranges.push(start..end);
        rest = end;
    }
    ranges
}
