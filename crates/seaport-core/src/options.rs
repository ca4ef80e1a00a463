// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Invocation options
//!
//! [`TransportOptions`] is the programmatic surface. [`TransportConfig`] is
//! its serialisable counterpart, read from TOML or JSON by hosts.

use crate::error::{Result, TransportError};
use crate::file::FileRecord;
use crate::package::Package;
use crate::plugin::HandlerFactory;
use crate::policy::Include;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Default directory holding installed packages
pub const DEFAULT_MODULE_DIR: &str = "sea-modules";

/// Default file tried for directory requires
pub const DEFAULT_INDEX: &str = "index.js";

/// A caller-supplied rename function
pub type RenameFn = Arc<dyn Fn(FileRecord) -> FileRecord + Send + Sync>;

/// How emitted files are renamed
#[derive(Clone)]
pub enum Rename {
    /// Static suffix inserted before the extension, in paths and module ids
    Suffix(String),
    /// Function applied to each emitted record after its content is final
    With(RenameFn),
}

impl Rename {
    /// Static suffix rename
    pub fn suffix(suffix: impl Into<String>) -> Self {
        Rename::Suffix(suffix.into())
    }

    /// Rename through a function
    pub fn with<F>(f: F) -> Self
    where
        F: Fn(FileRecord) -> FileRecord + Send + Sync + 'static,
    {
        Rename::With(Arc::new(f))
    }

    /// Append `-<hash>` where hash is the first `len` hex characters of the
    /// SHA-1 of the emitted contents
    pub fn content_hash(len: usize) -> Self {
        Rename::with(move |mut record| {
            let digest = hex::encode(Sha1::digest(&record.contents));
            let hash = &digest[..len.min(digest.len())];
            record.add_suffix(&format!("-{}", hash));
            record
        })
    }

    /// The static suffix, empty for function renames
    pub fn static_suffix(&self) -> &str {
        match self {
            Rename::Suffix(s) => s,
            Rename::With(_) => "",
        }
    }

    /// Apply a function rename; static suffixes are already part of the path
    pub fn apply(&self, record: FileRecord) -> FileRecord {
        match self {
            Rename::Suffix(_) => record,
            Rename::With(f) => f(record),
        }
    }
}

impl fmt::Debug for Rename {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rename::Suffix(s) => f.debug_tuple("Suffix").field(s).finish(),
            Rename::With(_) => f.write_str("With(<fn>)"),
        }
    }
}

/// Source extension -> output extension of compiled assets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionMap(BTreeMap<String, String>);

impl Default for ExtensionMap {
    fn default() -> Self {
        let mut map = ExtensionMap::empty();
        for ext in [".css", ".json", ".tpl", ".html", ".handlebars"] {
            map.insert(ext, format!("{}.js", ext));
        }
        map
    }
}

impl ExtensionMap {
    /// A map with no entries
    pub fn empty() -> Self {
        ExtensionMap(BTreeMap::new())
    }

    /// Output extension for `ext`
    pub fn get(&self, ext: &str) -> Option<&str> {
        self.0.get(ext).map(String::as_str)
    }

    /// Whether `ext` is mapped
    pub fn contains(&self, ext: &str) -> bool {
        self.0.contains_key(ext)
    }

    /// Add or replace a mapping
    pub fn insert(&mut self, from: impl Into<String>, to: impl Into<String>) {
        self.0.insert(from.into(), to.into());
    }

    /// Mappings in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Options of one transport invocation
#[derive(Clone)]
pub struct TransportOptions {
    /// Project directory, used to find packages when `pkg` is not given
    pub cwd: PathBuf,
    /// Pre-resolved entry package
    pub pkg: Option<Arc<Package>>,
    /// Directory holding installed packages
    pub module_dir: String,
    /// Inclusion mode
    pub include: Include,
    /// Module id / package name patterns kept verbatim and never traversed
    pub ignore: Vec<String>,
    /// Package name patterns rewritten but never emitted
    pub skip: Vec<String>,
    /// Output rename
    pub rename: Option<Rename>,
    /// Prefix of every module id
    pub idleading: String,
    /// Handler overrides keyed by output extension
    pub stream: BTreeMap<String, HandlerFactory>,
    /// File tried for directory requires
    pub index: String,
    /// Compiled asset extensions
    pub extensions: ExtensionMap,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            cwd: PathBuf::from("."),
            pkg: None,
            module_dir: DEFAULT_MODULE_DIR.to_string(),
            include: Include::None,
            ignore: Vec::new(),
            skip: Vec::new(),
            rename: None,
            idleading: String::new(),
            stream: BTreeMap::new(),
            index: DEFAULT_INDEX.to_string(),
            extensions: ExtensionMap::default(),
        }
    }
}

impl fmt::Debug for TransportOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportOptions")
            .field("cwd", &self.cwd)
            .field("pkg", &self.pkg.as_ref().map(|p| p.id()))
            .field("module_dir", &self.module_dir)
            .field("include", &self.include)
            .field("ignore", &self.ignore)
            .field("skip", &self.skip)
            .field("rename", &self.rename)
            .field("idleading", &self.idleading)
            .field("stream", &self.stream.keys().collect::<Vec<_>>())
            .field("index", &self.index)
            .field("extensions", &self.extensions)
            .finish()
    }
}

impl TransportOptions {
    /// Options rooted at `cwd`
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            cwd: cwd.into(),
            ..Self::default()
        }
    }

    /// Static suffix of the rename, empty when there is none
    pub fn suffix(&self) -> &str {
        self.rename.as_ref().map(Rename::static_suffix).unwrap_or("")
    }

    /// Reject option values that cannot work
    pub fn validate(&self) -> Result<()> {
        if let Some(Rename::Suffix(suffix)) = &self.rename {
            if suffix.is_empty() {
                return Err(TransportError::config("rename suffix must not be empty"));
            }
            if suffix.contains('/') {
                return Err(TransportError::config(format!(
                    "rename suffix '{}' must not contain '/'",
                    suffix
                )));
            }
        }

        if self.index.is_empty() || self.index.contains(['/', '\\']) {
            return Err(TransportError::config(format!(
                "index '{}' must be a plain file name",
                self.index
            )));
        }

        if self.module_dir.is_empty() {
            return Err(TransportError::config("module_dir must not be empty"));
        }

        for key in self.stream.keys() {
            if !key.starts_with('.') {
                return Err(TransportError::config(format!(
                    "stream key '{}' must be an extension starting with '.'",
                    key
                )));
            }
        }

        for (from, to) in self.extensions.iter() {
            if !from.starts_with('.') || !to.starts_with('.') {
                return Err(TransportError::config(format!(
                    "extension mapping '{}' -> '{}' must use extensions starting with '.'",
                    from, to
                )));
            }
        }

        Ok(())
    }
}

/// One pattern or a list of them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Patterns {
    /// `ignore = "b"`
    One(String),
    /// `ignore = ["b", "c"]`
    Many(Vec<String>),
}

impl Patterns {
    /// Flatten into a list
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Patterns::One(p) => vec![p],
            Patterns::Many(ps) => ps,
        }
    }
}

/// Serialised rename: exactly one of `suffix` or `hash`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RenameConfig {
    /// Static suffix
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    /// Content hash length
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<usize>,
}

impl RenameConfig {
    fn into_rename(self) -> Result<Rename> {
        match (self.suffix, self.hash) {
            (Some(suffix), None) => Ok(Rename::Suffix(suffix)),
            (None, Some(len)) if (1..=40).contains(&len) => Ok(Rename::content_hash(len)),
            (None, Some(len)) => Err(TransportError::config(format!(
                "rename hash length must be between 1 and 40, got {}",
                len
            ))),
            _ => Err(TransportError::config(
                "rename must set exactly one of 'suffix' or 'hash'",
            )),
        }
    }
}

/// Serialisable transport options
///
/// Every field is optional so configuration layers can be merged; later
/// layers win field by field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Directory holding installed packages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module_dir: Option<String>,
    /// Inclusion mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include: Option<String>,
    /// Ignore patterns
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore: Option<Patterns>,
    /// Skip patterns
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<Patterns>,
    /// Rename
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rename: Option<RenameConfig>,
    /// Module id prefix
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idleading: Option<String>,
    /// Directory index file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
    /// Extra compiled extensions
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extensions: BTreeMap<String, String>,
}

impl TransportConfig {
    /// Overlay `other` on top of `self`
    pub fn merge(&mut self, other: TransportConfig) {
        if other.module_dir.is_some() {
            self.module_dir = other.module_dir;
        }
        if other.include.is_some() {
            self.include = other.include;
        }
        if other.ignore.is_some() {
            self.ignore = other.ignore;
        }
        if other.skip.is_some() {
            self.skip = other.skip;
        }
        if other.rename.is_some() {
            self.rename = other.rename;
        }
        if other.idleading.is_some() {
            self.idleading = other.idleading;
        }
        if other.index.is_some() {
            self.index = other.index;
        }
        self.extensions.extend(other.extensions);
    }

    /// Convert into options rooted at `cwd`
    pub fn into_options(self, cwd: impl Into<PathBuf>) -> Result<TransportOptions> {
        let mut options = TransportOptions::new(cwd);

        if let Some(module_dir) = self.module_dir {
            options.module_dir = module_dir;
        }
        if let Some(include) = self.include {
            options.include = include.parse()?;
        }
        if let Some(ignore) = self.ignore {
            options.ignore = ignore.into_vec();
        }
        if let Some(skip) = self.skip {
            options.skip = skip.into_vec();
        }
        if let Some(rename) = self.rename {
            options.rename = Some(rename.into_rename()?);
        }
        if let Some(idleading) = self.idleading {
            options.idleading = idleading;
        }
        if let Some(index) = self.index {
            options.index = index;
        }
        for (from, to) in self.extensions {
            options.extensions.insert(from, to);
        }

        options.validate()?;
        Ok(options)
    }
}
