// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! One transport invocation, end to end

use crate::bundle;
use crate::emit::RewriteEmitter;
use crate::error::{Result, TransportError};
use crate::file::FileRecord;
use crate::graph::{DependencyGraph, Entry, GraphWalker, WalkContext};
use crate::options::TransportOptions;
use crate::package::{ManifestResolver, PackageResolver};
use crate::plugin::TypePluginRegistry;
use crate::policy::{Include, InclusionPolicy, PatternSet};
use crate::resolve::ReferenceResolver;
use crate::tree::{DiskTree, SourceTree};
use std::sync::Arc;
use tracing::{debug, info};

/// A configured transport
///
/// Options are validated once in [`Transport::new`]. Every [`Transport::run`]
/// builds a fresh graph and rereads package manifests, so one `Transport`
/// can serve concurrent runs and sees `package.json` edits between them.
pub struct Transport {
    options: TransportOptions,
    policy: InclusionPolicy,
    registry: Arc<TypePluginRegistry>,
    packages: Arc<dyn PackageResolver>,
    tree: Arc<dyn SourceTree>,
}

impl Transport {
    /// Validate `options` and set up a transport
    pub fn new(
        options: TransportOptions,
        packages: Arc<dyn PackageResolver>,
        tree: Arc<dyn SourceTree>,
    ) -> Result<Self> {
        options.validate()?;

        let policy = InclusionPolicy::new(
            options.include,
            PatternSet::new(options.ignore.iter().cloned())?,
            PatternSet::new(options.skip.iter().cloned())?,
        );

        let registry = Arc::new(TypePluginRegistry::new(options.stream.clone()));
        for (from, to) in options.extensions.iter() {
            if !registry.supports(to) {
                return Err(TransportError::config(format!(
                    "no handler for '{}' (mapped from '{}')",
                    to, from
                )));
            }
        }

        debug!("Transport configured: {:?}", options);
        Ok(Self {
            options,
            policy,
            registry,
            packages,
            tree,
        })
    }

    /// A transport reading packages from disk under the project directory
    pub fn on_disk(options: TransportOptions) -> Result<Self> {
        let root = match &options.pkg {
            Some(pkg) => pkg.root.clone(),
            None => options.cwd.clone(),
        };
        let packages = ManifestResolver::new(DiskTree, root, options.module_dir.clone());
        Self::new(options, Arc::new(packages), Arc::new(DiskTree))
    }

    /// The options in effect
    pub fn options(&self) -> &TransportOptions {
        &self.options
    }

    /// Transport `entries` and return the output records in emission order
    pub fn run(&self, entries: Vec<FileRecord>) -> Result<Vec<FileRecord>> {
        self.packages.refresh();
        let entries = entries
            .into_iter()
            .map(|file| self.entry(file))
            .collect::<Result<Vec<_>>>()?;

        if self.options.include.bundles() {
            let mut out = Vec::with_capacity(entries.len());
            for entry in entries {
                out.extend(self.bundle(entry)?);
            }
            return Ok(out);
        }

        let graph = self.walk(entries)?;
        let records = self.emitter().emit_all(&graph)?;
        info!(
            "Transported {} file(s): {} visited, {} emitted",
            graph.entries().len(),
            graph.visit_order().len(),
            records.len()
        );
        Ok(records)
    }

    /// Pair an entry file with its package
    pub fn entry(&self, file: FileRecord) -> Result<Entry> {
        let package = match &self.options.pkg {
            Some(pkg) => Arc::clone(pkg),
            None => self.packages.identity_of(file.dir())?,
        };
        Ok(Entry { file, package })
    }

    /// Walk `entries` into a graph without emitting anything
    pub fn walk(&self, entries: Vec<Entry>) -> Result<DependencyGraph> {
        let resolver = ReferenceResolver::new(
            self.tree.as_ref(),
            self.packages.as_ref(),
            &self.options.index,
            &self.options.extensions,
        );
        let walker = GraphWalker::new(WalkContext {
            resolver,
            policy: &self.policy,
            registry: &self.registry,
            idleading: &self.options.idleading,
            suffix: self.options.suffix(),
        });
        walker.walk(entries).finish()
    }

    fn emitter(&self) -> RewriteEmitter<'_> {
        RewriteEmitter::new(self.options.rename.as_ref())
    }

    /// Walk one entry on its own and wrap its closure into one file
    fn bundle(&self, entry: Entry) -> Result<Vec<FileRecord>> {
        let graph = self.walk(vec![entry])?;
        let emitter = self.emitter();
        let Some(&root) = graph.entries().first() else {
            return Ok(Vec::new());
        };

        let node = graph.node(root);
        if !node.form.is_module() {
            // stylesheets have no module registry to bundle into
            return emitter.emit_all(&graph);
        }

        let modules = graph
            .emitted()
            .into_iter()
            .filter(|id| graph.node(*id).form.is_module())
            .map(|id| emitter.render(&graph, id))
            .collect::<Result<Vec<_>>>()?;

        let contents = match self.options.include {
            Include::Umd => bundle::umd(&node.id, &node.package.name, &modules),
            _ => bundle::standalone(&node.id, &modules),
        };
        info!(
            "Bundled {} module(s) into {} ({})",
            modules.len(),
            node.output,
            self.options.include
        );

        let record = FileRecord {
            path: node.base.join(&node.output),
            base: node.base.clone(),
            contents: contents.into_bytes(),
            origin: node.origin.clone(),
        };
        Ok(vec![emitter.rename(record)])
    }
}
