// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Reference resolution
//!
//! Maps a raw reference found in a package file to a concrete
//! package + version + file triple and its canonical module id.

use crate::error::{Result, TransportError};
use crate::options::ExtensionMap;
use crate::package::{Package, PackageResolver};
use crate::path::{self, extension, module_id, parse_package_specifier};
use crate::scan::{ModuleReference, ReferenceKind, ReferenceSyntax};
use crate::tree::SourceTree;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Index tried for directory `@import`s
const STYLE_INDEX: &str = "index.css";

/// A reference mapped onto a package file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedReference {
    /// Package owning the target
    pub package: Arc<Package>,
    /// Target relative to the package root, forward slashes
    pub relative: String,
    /// Absolute target path
    pub path: PathBuf,
    /// Canonical module id, without leading prefix or rename suffix
    pub id: String,
}

impl ResolvedReference {
    fn new(package: Arc<Package>, relative: String) -> Self {
        let path = path::normalize(&package.root.join(&relative));
        let id = module_id("", &package.name, &package.version, &relative, "");
        Self {
            package,
            relative,
            path,
            id,
        }
    }
}

/// Resolves references against a source tree and a package resolver
pub struct ReferenceResolver<'a> {
    tree: &'a dyn SourceTree,
    packages: &'a dyn PackageResolver,
    index: &'a str,
    extensions: &'a ExtensionMap,
}

impl<'a> ReferenceResolver<'a> {
    /// Create a resolver
    pub fn new(
        tree: &'a dyn SourceTree,
        packages: &'a dyn PackageResolver,
        index: &'a str,
        extensions: &'a ExtensionMap,
    ) -> Self {
        Self {
            tree,
            packages,
            index,
            extensions,
        }
    }

    /// Tree the targets are looked up in
    pub fn tree(&self) -> &'a dyn SourceTree {
        self.tree
    }

    /// Compiled asset extensions
    pub fn extensions(&self) -> &'a ExtensionMap {
        self.extensions
    }

    /// Resolve `reference`, found in `from` (relative to `source`'s root)
    pub fn resolve(
        &self,
        reference: &ModuleReference,
        source: &Arc<Package>,
        from: &str,
    ) -> Result<ResolvedReference> {
        let resolved = match reference.kind {
            ReferenceKind::Relative | ReferenceKind::DirectoryImplicit => {
                let dir = from.rsplit_once('/').map(|(d, _)| d).unwrap_or("");
                self.resolve_in(source, dir, reference, &reference.raw, from)?
            }
            ReferenceKind::Named => self.resolve_named(reference, source, from)?,
        };
        debug!("{} -> {}", reference.raw, resolved.id);
        Ok(resolved)
    }

    fn resolve_named(
        &self,
        reference: &ModuleReference,
        source: &Arc<Package>,
        from: &str,
    ) -> Result<ResolvedReference> {
        let (name, subpath) = parse_package_specifier(&reference.raw);

        let package = self.packages.dependency_of(source, name)?.ok_or_else(|| {
            let required = match reference.syntax {
                // type plugins report the extension that needed the runtime
                ReferenceSyntax::Runtime => extension(from).unwrap_or(from).to_string(),
                _ => format!("by {}", from),
            };
            TransportError::missing(name, required)
        })?;

        let target = match subpath {
            Some(sub) => sub.to_string(),
            None if reference.syntax == ReferenceSyntax::Import && !package.main.ends_with(".css") => {
                STYLE_INDEX.to_string()
            }
            None => package.main.clone(),
        };
        self.resolve_in(&package, "", reference, &target, from)
    }

    /// Resolve `target` against `dir` inside `package`
    fn resolve_in(
        &self,
        package: &Arc<Package>,
        dir: &str,
        reference: &ModuleReference,
        target: &str,
        from: &str,
    ) -> Result<ResolvedReference> {
        let unresolved = || TransportError::unresolved(&reference.raw, from);

        let joined = path::normalize(&package.root.join(dir).join(target));
        let relative = path::relative_to(&package.root, &joined)
            .filter(|r| !r.is_empty() || reference.kind == ReferenceKind::DirectoryImplicit)
            .ok_or_else(unresolved)?;

        let index = match reference.syntax {
            ReferenceSyntax::Import => STYLE_INDEX,
            _ => self.index,
        };

        if reference.kind != ReferenceKind::DirectoryImplicit {
            let known = reference.syntax == ReferenceSyntax::Url
                || extension(&relative).is_some_and(|ext| self.is_known(ext));
            if known && self.tree.is_file(&joined) {
                return Ok(ResolvedReference::new(Arc::clone(package), relative));
            }

            let fallback = match reference.syntax {
                ReferenceSyntax::Import => ".css",
                _ => ".js",
            };
            let with_ext = format!("{}{}", relative, fallback);
            if !known && self.tree.is_file(&package.root.join(&with_ext)) {
                return Ok(ResolvedReference::new(Arc::clone(package), with_ext));
            }
        }

        if self.tree.is_dir(&joined) {
            let relative = join_relative(&relative, index);
            if self.tree.is_file(&package.root.join(&relative)) {
                return Ok(ResolvedReference::new(Arc::clone(package), relative));
            }
        }

        Err(unresolved())
    }

    fn is_known(&self, ext: &str) -> bool {
        ext == ".js" || ext == ".css" || self.extensions.contains(ext)
    }
}

fn join_relative(dir: &str, file: &str) -> String {
    let dir = dir.trim_end_matches('/');
    if dir.is_empty() {
        file.to_string()
    } else {
        format!("{}/{}", dir, file)
    }
}

/// Path of `file` relative to the package `root`, if it lies strictly inside
pub fn package_relative(root: &Path, file: &Path) -> Option<String> {
    path::relative_to(root, file).filter(|r| !r.is_empty())
}
