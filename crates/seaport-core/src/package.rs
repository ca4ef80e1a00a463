// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Package identities and their discovery

use crate::error::{Result, TransportError};
use crate::path::normalize;
use crate::tree::SourceTree;
use parking_lot::Mutex;
use semver::{Version, VersionReq};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Manifest file name looked up in package roots
pub const MANIFEST: &str = "package.json";

/// A resolved package: `name@version` rooted at `root`
///
/// Two packages are the same package when name and version match,
/// wherever they live on disk.
#[derive(Debug, Clone)]
pub struct Package {
    /// Package name
    pub name: String,
    /// Package version
    pub version: String,
    /// Module root (the directory holding the manifest)
    pub root: PathBuf,
    /// Main file, relative to `root`
    pub main: String,
    /// Declared dependencies (name -> version or range)
    pub dependencies: BTreeMap<String, String>,
}

impl Package {
    /// Create a package with no dependencies and `index.js` as main
    pub fn new(name: impl Into<String>, version: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            root: root.into(),
            main: "index.js".to_string(),
            dependencies: BTreeMap::new(),
        }
    }

    /// Builder: declare a dependency
    pub fn depends_on(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.dependencies.insert(name.into(), version.into());
        self
    }

    /// `name@version`
    pub fn id(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }

    /// Whether `name` is a declared dependency
    pub fn declares(&self, name: &str) -> bool {
        self.dependencies.contains_key(name)
    }
}

impl PartialEq for Package {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.version == other.version
    }
}

impl Eq for Package {}

impl Hash for Package {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.version.hash(state);
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

/// Source of package identities consumed by the engine
pub trait PackageResolver: Send + Sync {
    /// The package owning `dir`
    fn identity_of(&self, dir: &Path) -> Result<Arc<Package>>;

    /// The version of `name` that `source` depends on, if it can be found
    fn dependency_of(&self, source: &Package, name: &str) -> Result<Option<Arc<Package>>>;

    /// Forget anything remembered from earlier lookups
    fn refresh(&self) {}
}

/// The `spm` section of a manifest
#[derive(Debug, Clone, Default, Deserialize)]
struct SpmSection {
    main: Option<String>,
    #[serde(default)]
    dependencies: BTreeMap<String, String>,
}

/// Minimal package.json structure for transport
#[derive(Debug, Clone, Default, Deserialize)]
struct Manifest {
    name: Option<String>,
    version: Option<String>,
    main: Option<String>,
    #[serde(default)]
    dependencies: BTreeMap<String, String>,
    spm: Option<SpmSection>,
}

impl Manifest {
    fn into_package(self, root: PathBuf, path: &Path) -> Result<Package> {
        let invalid = |reason: &str| TransportError::InvalidManifest {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        };
        let name = self.name.ok_or_else(|| invalid("missing \"name\""))?;
        let version = self.version.ok_or_else(|| invalid("missing \"version\""))?;

        let (main, dependencies) = match self.spm {
            Some(spm) => {
                let deps = if spm.dependencies.is_empty() {
                    self.dependencies
                } else {
                    spm.dependencies
                };
                (spm.main.or(self.main), deps)
            }
            None => (self.main, self.dependencies),
        };

        let main = main.unwrap_or_else(|| "index.js".to_string());
        let main = main.trim_start_matches("./").to_string();

        Ok(Package {
            name,
            version,
            root,
            main,
            dependencies,
        })
    }
}

/// Resolves packages from `package.json` manifests
///
/// Dependencies are laid out as `<root>/<module_dir>/<name>/<version>/`.
pub struct ManifestResolver<T: SourceTree> {
    tree: T,
    root: PathBuf,
    module_dir: String,
    manifests: Mutex<HashMap<PathBuf, Arc<Package>>>,
}

impl<T: SourceTree> ManifestResolver<T> {
    /// Create a resolver for the project at `root`
    pub fn new(tree: T, root: impl Into<PathBuf>, module_dir: impl Into<String>) -> Self {
        Self {
            tree,
            root: normalize(&root.into()),
            module_dir: module_dir.into(),
            manifests: Mutex::new(HashMap::new()),
        }
    }

    /// Directory holding installed dependencies
    pub fn modules_root(&self) -> PathBuf {
        self.root.join(&self.module_dir)
    }

    /// Read (and memoise) the package rooted at `dir`
    fn load(&self, dir: &Path) -> Result<Arc<Package>> {
        if let Some(pkg) = self.manifests.lock().get(dir) {
            return Ok(Arc::clone(pkg));
        }

        let path = dir.join(MANIFEST);
        let bytes = self.tree.read(&path)?;
        let manifest: Manifest =
            serde_json::from_slice(&bytes).map_err(|e| TransportError::InvalidManifest {
                path: path.clone(),
                reason: e.to_string(),
            })?;
        let pkg = Arc::new(manifest.into_package(dir.to_path_buf(), &path)?);
        debug!("Loaded {} from {}", pkg, path.display());

        self.manifests
            .lock()
            .insert(dir.to_path_buf(), Arc::clone(&pkg));
        Ok(pkg)
    }

    /// Pick the installed version of `name` satisfying `declared`
    fn installed_version(&self, name: &str, declared: &str) -> Option<PathBuf> {
        let exact = self.modules_root().join(name).join(declared);
        if self.tree.is_file(&exact.join(MANIFEST)) {
            return Some(exact);
        }

        let req = VersionReq::parse(declared).ok()?;
        let candidates = self.installed_versions(name);
        candidates
            .into_iter()
            .filter(|v| req.matches(v))
            .max()
            .map(|v| self.modules_root().join(name).join(v.to_string()))
    }

    /// Versions of `name` present under the module directory
    fn installed_versions(&self, name: &str) -> Vec<Version> {
        let dir = self.modules_root().join(name);
        let names = self.tree.list(&dir).unwrap_or_default();
        names
            .iter()
            .filter_map(|n| Version::parse(n).ok())
            .filter(|v| self.tree.is_file(&dir.join(v.to_string()).join(MANIFEST)))
            .collect()
    }
}

impl<T: SourceTree> PackageResolver for ManifestResolver<T> {
    fn identity_of(&self, dir: &Path) -> Result<Arc<Package>> {
        let start = normalize(dir);
        let mut current = Some(start.as_path());

        while let Some(dir) = current {
            if self.tree.is_file(&dir.join(MANIFEST)) {
                return self.load(dir);
            }
            current = dir.parent();
        }

        Err(TransportError::InvalidManifest {
            path: start.join(MANIFEST),
            reason: "no package.json found in any parent directory".to_string(),
        })
    }

    fn dependency_of(&self, source: &Package, name: &str) -> Result<Option<Arc<Package>>> {
        let Some(declared) = source.dependencies.get(name) else {
            return Ok(None);
        };

        match self.installed_version(name, declared) {
            Some(dir) => self.load(&dir).map(Some),
            None => Ok(None),
        }
    }

    fn refresh(&self) {
        self.manifests.lock().clear();
    }
}
