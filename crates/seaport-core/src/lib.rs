// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # Seaport Core
//!
//! Transports source files of versioned `sea-modules` packages into CMD
//! modules: every file becomes a `define("<family>/<version>/<path>", deps,
//! factory)` call with its references rewritten to canonical ids.
//!
//! ## Example
//!
//! ```rust,ignore
//! use seaport_core::{FileRecord, Include, Transport, TransportOptions};
//!
//! let options = TransportOptions {
//!     include: Include::Relative,
//!     ..TransportOptions::new("./my-package")
//! };
//! let transport = Transport::on_disk(options)?;
//! let entry = FileRecord::new("./my-package/index.js", "./my-package", source);
//! for record in transport.run(vec![entry])? {
//!     println!("{}", record.relative());
//! }
//! ```

pub mod bundle;
pub mod emit;
pub mod error;
pub mod file;
pub mod graph;
pub mod options;
pub mod package;
pub mod path;
pub mod plugin;
pub mod policy;
pub mod resolve;
pub mod scan;
pub mod transport;
pub mod tree;

pub use bundle::concat;
pub use emit::RewriteEmitter;
pub use error::{Result, TransportError};
pub use file::FileRecord;
pub use graph::{DependencyGraph, EmissionState, Entry, Form, GraphWalker, Node, NodeId, Walk};
pub use options::{ExtensionMap, Rename, TransportConfig, TransportOptions};
pub use package::{ManifestResolver, Package, PackageResolver};
pub use plugin::{AssetHandler, HandlerContext, HandlerFactory, RenderInput, TypePluginRegistry};
pub use policy::{Include, InclusionDecision, InclusionPolicy};
pub use resolve::{ReferenceResolver, ResolvedReference};
pub use scan::{AssetKind, ModuleReference, ReferenceKind, ReferenceSyntax};
pub use transport::Transport;
pub use tree::{DiskTree, MemoryTree, SourceTree};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
