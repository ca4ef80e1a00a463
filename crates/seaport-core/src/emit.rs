// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Rewriting visited nodes into output records

use crate::error::{Result, TransportError};
use crate::file::FileRecord;
use crate::graph::{DependencyGraph, Node, NodeId};
use crate::options::Rename;
use crate::path::relative_url;
use crate::plugin::RenderInput;
use crate::scan::ReferenceSyntax;
use std::collections::BTreeMap;
use std::ops::Range;
use tracing::trace;

/// One span of source text and what replaces it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    /// Byte range in the source
    pub span: Range<usize>,
    /// New text
    pub text: String,
}

/// Replacements of a visited node, in scan order
///
/// Module references become module ids. Stylesheet targets become URLs
/// relative to the node's own output path. Ignored references keep their
/// text.
pub fn replacements(node: &Node) -> Vec<Replacement> {
    node.references
        .iter()
        .filter_map(|edge| {
            let span = edge.reference.span.clone()?;
            let rewrite = edge.rewrite.as_deref()?;
            let text = match edge.reference.syntax {
                ReferenceSyntax::Require | ReferenceSyntax::Runtime => rewrite.to_string(),
                ReferenceSyntax::Import | ReferenceSyntax::Url => relative_url(&node.output, rewrite),
            };
            Some(Replacement { span, text })
        })
        .collect()
}

/// Apply replacements in one pass; overlapping or out-of-range spans are dropped
pub fn apply_replacements(source: &str, mut replacements: Vec<Replacement>) -> String {
    replacements.sort_by_key(|r| r.span.start);

    let mut out = String::with_capacity(source.len());
    let mut cursor = 0;
    for Replacement { span, text } in replacements {
        let valid = span.start >= cursor
            && span.end <= source.len()
            && source.is_char_boundary(span.start)
            && source.is_char_boundary(span.end);
        if !valid {
            trace!("Dropping replacement at {:?}", span);
            continue;
        }
        out.push_str(&source[cursor..span.start]);
        out.push_str(&text);
        cursor = span.end;
    }
    out.push_str(&source[cursor..]);
    out
}

/// Turns visited nodes into records
#[derive(Debug, Clone, Copy, Default)]
pub struct RewriteEmitter<'a> {
    rename: Option<&'a Rename>,
}

impl<'a> RewriteEmitter<'a> {
    /// Create an emitter applying `rename` to each record
    pub fn new(rename: Option<&'a Rename>) -> Self {
        Self { rename }
    }

    /// Rewrite, render and relocate `id`, without renaming
    pub fn render(&self, graph: &DependencyGraph, id: NodeId) -> Result<FileRecord> {
        let node = graph.node(id);
        let handler = node.handler().ok_or_else(|| TransportError::InvalidAsset {
            path: node.path.clone(),
            reason: "node was never visited".to_string(),
        })?;

        let source = apply_replacements(node.text()?, replacements(node));
        let dependencies = graph.deep_dependencies(id);
        let runtime: BTreeMap<String, String> = node
            .references
            .iter()
            .filter(|edge| edge.reference.syntax == ReferenceSyntax::Runtime)
            .map(|edge| (edge.reference.raw.clone(), edge.text().to_string()))
            .collect();

        let contents = handler.render(&RenderInput {
            id: &node.id,
            path: &node.path,
            relative: &node.relative,
            source: &source,
            dependencies: &dependencies,
            runtime: &runtime,
        })?;

        Ok(FileRecord {
            path: node.base.join(&node.output),
            base: node.base.clone(),
            contents: contents.into_bytes(),
            origin: node.origin.clone(),
        })
    }

    /// Apply the rename function, if any
    pub fn rename(&self, record: FileRecord) -> FileRecord {
        match self.rename {
            Some(rename) => rename.apply(record),
            None => record,
        }
    }

    /// Final record of `id`
    pub fn emit(&self, graph: &DependencyGraph, id: NodeId) -> Result<FileRecord> {
        self.render(graph, id).map(|record| self.rename(record))
    }

    /// Records of every emitted node, in emission order
    pub fn emit_all(&self, graph: &DependencyGraph) -> Result<Vec<FileRecord>> {
        graph
            .emitted()
            .into_iter()
            .map(|id| self.emit(graph, id))
            .collect()
    }
}
