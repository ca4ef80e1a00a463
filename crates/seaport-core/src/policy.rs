// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Inclusion policy: which references pull their target into the output

use crate::error::{Result, TransportError};
use crate::package::Package;
use crate::path::parse_package_specifier;
use crate::scan::{ModuleReference, ReferenceKind, ReferenceSyntax};
use glob::Pattern;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Inclusion mode of an invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Include {
    /// Rewrite references only
    #[default]
    None,
    /// Rewrite, and walk same-package files to collect their dependencies
    #[serde(rename = "self")]
    SelfOnly,
    /// Emit same-package files reached through relative references
    Relative,
    /// Emit the whole closure across packages
    All,
    /// `All`, wrapped into one self-executing bundle
    Standalone,
    /// `Standalone` with a universal module definition header
    Umd,
}

impl Include {
    /// Whether other packages are pulled into the output
    pub fn crosses_packages(self) -> bool {
        matches!(self, Include::All | Include::Standalone | Include::Umd)
    }

    /// Whether the output is one bundle per entry
    pub fn bundles(self) -> bool {
        matches!(self, Include::Standalone | Include::Umd)
    }

    /// Option spelling
    pub fn as_str(self) -> &'static str {
        match self {
            Include::None => "none",
            Include::SelfOnly => "self",
            Include::Relative => "relative",
            Include::All => "all",
            Include::Standalone => "standalone",
            Include::Umd => "umd",
        }
    }
}

impl fmt::Display for Include {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Include {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(Include::None),
            "self" => Ok(Include::SelfOnly),
            "relative" => Ok(Include::Relative),
            "all" => Ok(Include::All),
            "standalone" => Ok(Include::Standalone),
            "umd" => Ok(Include::Umd),
            other => Err(TransportError::config(format!(
                "include must be one of none, self, relative, all, standalone, umd; got '{}'",
                other
            ))),
        }
    }
}

/// Why a reference was elided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Elision {
    /// Matched the ignore set: kept verbatim, never traversed
    Ignored,
    /// Matched the skip set: rewritten, never emitted
    Skipped,
}

/// What happens to one reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InclusionDecision {
    /// Traverse and emit the target
    EmitFile,
    /// Rewrite the reference; `traverse` scans the target without emitting it
    RewriteOnly {
        /// Whether the walker still visits the target
        traverse: bool,
    },
    /// Leave the target out
    Elide(Elision),
}

impl InclusionDecision {
    /// Whether the walker visits the target
    pub fn traverses(self) -> bool {
        matches!(
            self,
            InclusionDecision::EmitFile | InclusionDecision::RewriteOnly { traverse: true }
        )
    }

    /// Whether the reference keeps its raw text
    pub fn is_ignored(self) -> bool {
        self == InclusionDecision::Elide(Elision::Ignored)
    }
}

/// A list of glob patterns over package names and module ids
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    sources: Vec<String>,
    patterns: Vec<Pattern>,
}

impl PatternSet {
    /// Compile patterns; a plain name matches itself exactly
    pub fn new<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = PatternSet::default();
        for source in patterns {
            let source = source.into();
            let pattern = Pattern::new(&source).map_err(|e| {
                TransportError::config(format!("invalid pattern '{}': {}", source, e))
            })?;
            set.sources.push(source);
            set.patterns.push(pattern);
        }
        Ok(set)
    }

    /// Whether any pattern matches `candidate`
    pub fn matches(&self, candidate: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(candidate))
    }

    /// The patterns as given
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Inclusion decisions for one invocation
#[derive(Debug, Clone)]
pub struct InclusionPolicy {
    include: Include,
    ignore: PatternSet,
    skip: PatternSet,
}

impl InclusionPolicy {
    /// Create a policy
    pub fn new(include: Include, ignore: PatternSet, skip: PatternSet) -> Self {
        Self {
            include,
            ignore,
            skip,
        }
    }

    /// Inclusion mode
    pub fn include(&self) -> Include {
        self.include
    }

    /// Ignore patterns
    pub fn ignore(&self) -> &PatternSet {
        &self.ignore
    }

    /// Skip patterns
    pub fn skip(&self) -> &PatternSet {
        &self.skip
    }

    /// Decision available before resolution, if any
    ///
    /// Named references are screened by package name and raw target so an
    /// ignored or skipped package never has to be resolvable.
    pub fn screen(&self, reference: &ModuleReference) -> Option<Elision> {
        if reference.kind != ReferenceKind::Named {
            return self.elision(&[reference.raw.as_str()]);
        }
        let (name, _) = parse_package_specifier(&reference.raw);
        self.elision(&[name, reference.raw.as_str()])
    }

    /// Decision for a resolved reference
    ///
    /// `source` is the package of the requiring file, `target` the package
    /// the reference resolved into, `id` its canonical module id without
    /// leading prefix.
    pub fn decide(
        &self,
        reference: &ModuleReference,
        source: &Package,
        target: &Package,
        id: &str,
    ) -> InclusionDecision {
        if let Some(elision) = self.elision(&[id, target.name.as_str()]) {
            return InclusionDecision::Elide(elision);
        }

        // stylesheet assets are rewritten in place, never bundled
        if reference.syntax == ReferenceSyntax::Url {
            return InclusionDecision::RewriteOnly { traverse: false };
        }

        let same_package = reference.kind != ReferenceKind::Named && target == source;
        match (self.include, same_package) {
            (Include::None, _) => InclusionDecision::RewriteOnly { traverse: false },
            (Include::SelfOnly, true) => InclusionDecision::RewriteOnly { traverse: true },
            (Include::SelfOnly, false) => InclusionDecision::RewriteOnly { traverse: false },
            (Include::Relative, true) => InclusionDecision::EmitFile,
            (Include::Relative, false) => InclusionDecision::RewriteOnly { traverse: false },
            (Include::All | Include::Standalone | Include::Umd, _) => InclusionDecision::EmitFile,
        }
    }

    /// Ignore wins over skip
    fn elision(&self, candidates: &[&str]) -> Option<Elision> {
        if candidates.iter().any(|c| self.ignore.matches(c)) {
            Some(Elision::Ignored)
        } else if candidates.iter().any(|c| self.skip.matches(c)) {
            Some(Elision::Skipped)
        } else {
            None
        }
    }
}
