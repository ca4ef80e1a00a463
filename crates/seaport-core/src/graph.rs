// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Dependency graph of one invocation
//!
//! Nodes live in an arena owned by the [`DependencyGraph`] and are addressed
//! by [`NodeId`]. The [`GraphWalker`] fills the arena breadth first from the
//! entry files: references are followed in the order the scanner found them
//! and each (path, form) pair is visited at most once.

use crate::error::{Result, TransportError};
use crate::file::FileRecord;
use crate::package::Package;
use crate::path::{extension, module_id, normalize, output_relative};
use crate::plugin::{AssetHandler, HandlerContext, TypePluginRegistry};
use crate::policy::{Elision, InclusionDecision, InclusionPolicy};
use crate::resolve::{ReferenceResolver, ResolvedReference, package_relative};
use crate::scan::{ModuleReference, ReferenceSyntax};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Index of a node in its graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Position in the arena
    pub fn index(self) -> usize {
        self.0
    }
}

/// Output form of a node
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Form {
    /// A CMD script
    Script,
    /// A stylesheet that stays a stylesheet
    Stylesheet,
    /// A non-script asset compiled into a CMD module, with its output extension
    Compiled(String),
}

impl Form {
    /// Handler key of the form
    pub fn key(&self) -> &str {
        match self {
            Form::Script => ".js",
            Form::Stylesheet => ".css",
            Form::Compiled(ext) => ext,
        }
    }

    /// Extension replacing the source extension in the output path
    pub fn output_extension(&self) -> Option<&str> {
        match self {
            Form::Compiled(ext) => Some(ext),
            _ => None,
        }
    }

    /// Whether the output is a CMD module
    pub fn is_module(&self) -> bool {
        !matches!(self, Form::Stylesheet)
    }
}

/// Where a node is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EmissionState {
    /// Known, not yet queued
    Unvisited,
    /// Waiting to be visited
    Queued,
    /// Visited and part of the output
    Emitted,
    /// Visited for its references only
    Elided,
}

/// One outgoing reference of a node
#[derive(Debug, Clone)]
pub struct Edge {
    /// The reference as scanned
    pub reference: ModuleReference,
    /// What the policy made of it
    pub decision: InclusionDecision,
    /// Resolution result, absent for references that were never resolved
    pub target: Option<ResolvedReference>,
    /// Module id (scripts) or output path (stylesheet targets) replacing the
    /// raw text; `None` keeps the raw text
    pub rewrite: Option<String>,
    /// Target node when the walk traversed it
    pub node: Option<NodeId>,
}

impl Edge {
    fn verbatim(reference: ModuleReference, decision: InclusionDecision) -> Self {
        Self {
            reference,
            decision,
            target: None,
            rewrite: None,
            node: None,
        }
    }

    /// Text the reference is addressed by in the output
    pub fn text(&self) -> &str {
        self.rewrite.as_deref().unwrap_or(&self.reference.raw)
    }
}

/// One file of the graph
pub struct Node {
    /// Absolute source location
    pub path: PathBuf,
    /// Owning package
    pub package: Arc<Package>,
    /// Source path relative to the package root
    pub relative: String,
    /// Output form
    pub form: Form,
    /// Output base directory
    pub base: PathBuf,
    /// File the node was read from
    pub origin: PathBuf,
    /// Module id, with leading prefix and static suffix
    pub id: String,
    /// Output path relative to `base`
    pub output: String,
    /// Source contents, loaded when the node is visited
    pub contents: Vec<u8>,
    /// Outgoing references in scan order
    pub references: Vec<Edge>,
    /// Lifecycle state
    pub state: EmissionState,
    /// Whether the node was handed in as an entry
    pub entry: bool,
    emit: bool,
    handler: Option<Arc<dyn AssetHandler>>,
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("path", &self.path)
            .field("package", &self.package.id())
            .field("relative", &self.relative)
            .field("form", &self.form)
            .field("id", &self.id)
            .field("output", &self.output)
            .field("references", &self.references.len())
            .field("state", &self.state)
            .field("entry", &self.entry)
            .finish_non_exhaustive()
    }
}

impl Node {
    fn new(
        path: PathBuf,
        package: Arc<Package>,
        relative: String,
        form: Form,
        base: PathBuf,
        naming: (&str, &str),
    ) -> Self {
        let (idleading, suffix) = naming;
        let id = module_id(idleading, &package.name, &package.version, &relative, suffix);
        let output = output_relative(
            &package.name,
            &package.version,
            &relative,
            form.output_extension(),
            suffix,
        );
        Self {
            origin: path.clone(),
            path,
            package,
            relative,
            form,
            base,
            id,
            output,
            contents: Vec::new(),
            references: Vec::new(),
            state: EmissionState::Unvisited,
            entry: false,
            emit: false,
            handler: None,
        }
    }

    /// UTF-8 view of the contents
    pub fn text(&self) -> Result<&str> {
        std::str::from_utf8(&self.contents).map_err(|e| TransportError::InvalidAsset {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }

    /// Handler the node was visited with
    pub fn handler(&self) -> Option<&Arc<dyn AssetHandler>> {
        self.handler.as_ref()
    }

    /// Whether the walker has visited the node
    pub fn is_visited(&self) -> bool {
        matches!(self.state, EmissionState::Emitted | EmissionState::Elided)
    }
}

/// Arena of nodes reached from the entries
#[derive(Debug, Default)]
pub struct DependencyGraph {
    nodes: Vec<Node>,
    index: HashMap<(PathBuf, Form), NodeId>,
    order: Vec<NodeId>,
}

impl DependencyGraph {
    /// Node by id
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node for a file in a given form
    pub fn find(&self, path: &Path, form: &Form) -> Option<NodeId> {
        self.index.get(&(normalize(path), form.clone())).copied()
    }

    /// Visited nodes in visit order
    pub fn visit_order(&self) -> &[NodeId] {
        &self.order
    }

    /// Emitted nodes in visit order
    pub fn emitted(&self) -> Vec<NodeId> {
        self.order
            .iter()
            .copied()
            .filter(|id| self.node(*id).state == EmissionState::Emitted)
            .collect()
    }

    /// Entry nodes in the order they were given
    pub fn entries(&self) -> Vec<NodeId> {
        (0..self.nodes.len())
            .map(NodeId)
            .filter(|id| self.node(*id).entry)
            .collect()
    }

    /// Module ids `id` depends on, directly or through visited nodes
    ///
    /// Breadth first over module references, deduplicated, ignored
    /// references left out.
    pub fn deep_dependencies(&self, id: NodeId) -> Vec<String> {
        let own = self.node(id).id.as_str();
        let mut deps = Vec::new();
        let mut seen_ids: HashSet<&str> = HashSet::new();
        let mut seen_nodes = HashSet::from([id]);
        let mut queue = VecDeque::from([id]);

        while let Some(current) = queue.pop_front() {
            for edge in &self.node(current).references {
                if !edge.reference.is_module() || edge.decision.is_ignored() {
                    continue;
                }
                let dep = edge.text();
                if dep != own && seen_ids.insert(dep) {
                    deps.push(dep.to_string());
                }
                if let Some(next) = edge.node {
                    if self.node(next).is_visited() && seen_nodes.insert(next) {
                        queue.push_back(next);
                    }
                }
            }
        }

        deps
    }

    fn insert(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.index.insert((node.path.clone(), node.form.clone()), id);
        self.nodes.push(node);
        id
    }
}

/// One entry file and the package it belongs to
#[derive(Debug, Clone)]
pub struct Entry {
    /// The file as handed in by the host
    pub file: FileRecord,
    /// Its package
    pub package: Arc<Package>,
}

/// Collaborators of a walk
pub struct WalkContext<'a> {
    /// Reference resolution
    pub resolver: ReferenceResolver<'a>,
    /// Inclusion decisions
    pub policy: &'a InclusionPolicy,
    /// Handler factories
    pub registry: &'a Arc<TypePluginRegistry>,
    /// Module id prefix
    pub idleading: &'a str,
    /// Static rename suffix
    pub suffix: &'a str,
}

/// Breadth-first walker over the references of the entry files
pub struct GraphWalker<'a> {
    ctx: WalkContext<'a>,
    graph: DependencyGraph,
    queue: VecDeque<NodeId>,
    handlers: HashMap<(String, String), Arc<dyn AssetHandler>>,
}

impl<'a> GraphWalker<'a> {
    /// Create a walker with an empty graph
    pub fn new(ctx: WalkContext<'a>) -> Self {
        Self {
            ctx,
            graph: DependencyGraph::default(),
            queue: VecDeque::new(),
            handlers: HashMap::new(),
        }
    }

    /// Queue `entries` in order and start walking
    pub fn walk(mut self, entries: Vec<Entry>) -> Walk<'a> {
        let mut error = None;
        for entry in entries {
            if let Err(e) = self.add_entry(entry) {
                error = Some(e);
                break;
            }
        }
        Walk {
            walker: self,
            error,
            failed: false,
        }
    }

    fn add_entry(&mut self, entry: Entry) -> Result<()> {
        let Entry { file, package } = entry;
        let relative = package_relative(&package.root, &file.path).unwrap_or_else(|| file.relative());
        let form = self.entry_form(&relative).ok_or_else(|| TransportError::InvalidAsset {
            path: file.path.clone(),
            reason: format!("no handler for '{}'", relative),
        })?;

        let path = normalize(&file.path);
        if let Some(id) = self.graph.find(&path, &form) {
            self.graph.nodes[id.0].entry = true;
            return Ok(());
        }

        let mut node = Node::new(path, package, relative, form, file.base, self.naming());
        node.origin = file.origin;
        node.contents = file.contents;
        node.entry = true;
        node.emit = true;
        node.state = EmissionState::Queued;
        let id = self.graph.insert(node);
        self.queue.push_back(id);
        Ok(())
    }

    fn naming(&self) -> (&'a str, &'a str) {
        (self.ctx.idleading, self.ctx.suffix)
    }

    fn entry_form(&self, relative: &str) -> Option<Form> {
        match extension(relative)? {
            ".js" => Some(Form::Script),
            ".css" => Some(Form::Stylesheet),
            ext => self
                .ctx
                .resolver
                .extensions()
                .get(ext)
                .map(|out| Form::Compiled(out.to_string())),
        }
    }

    fn visit(&mut self, id: NodeId) -> Result<()> {
        let (package, path, relative, form, base, entry) = {
            let node = &self.graph.nodes[id.0];
            (
                Arc::clone(&node.package),
                node.path.clone(),
                node.relative.clone(),
                node.form.clone(),
                node.base.clone(),
                node.entry,
            )
        };

        if !entry {
            self.graph.nodes[id.0].contents = self.ctx.resolver.tree().read(&path)?;
        }

        let handler = self.handler(&form, &package)?;
        let mut references = handler.scan(self.graph.nodes[id.0].text()?);
        references.extend(
            handler
                .runtime_dependencies()
                .into_iter()
                .map(ModuleReference::runtime),
        );
        debug!(
            "Visiting {} as {} ({} references)",
            self.graph.nodes[id.0].id,
            form.key(),
            references.len()
        );

        let mut edges = Vec::with_capacity(references.len());
        for reference in references {
            edges.push(self.link(&package, &relative, &base, reference)?);
        }

        let node = &mut self.graph.nodes[id.0];
        node.references = edges;
        node.handler = Some(handler);
        node.state = if node.emit {
            EmissionState::Emitted
        } else {
            EmissionState::Elided
        };
        self.graph.order.push(id);
        Ok(())
    }

    /// Resolve and classify one reference of a file in `source`
    fn link(
        &mut self,
        source: &Arc<Package>,
        from: &str,
        base: &Path,
        reference: ModuleReference,
    ) -> Result<Edge> {
        let policy = self.ctx.policy;
        let screened = policy.screen(&reference);
        if screened == Some(Elision::Ignored) {
            return Ok(Edge::verbatim(reference, InclusionDecision::Elide(Elision::Ignored)));
        }

        let resolved = match self.ctx.resolver.resolve(&reference, source, from) {
            Ok(resolved) => resolved,
            Err(
                err @ (TransportError::MissingDependency { .. }
                | TransportError::UnresolvedReference { .. }),
            ) if screened == Some(Elision::Skipped) => {
                warn!("Skipped {} kept as written in {}: {}", reference.raw, from, err);
                return Ok(Edge::verbatim(reference, InclusionDecision::Elide(Elision::Skipped)));
            }
            Err(err) => return Err(err),
        };

        let decision = match screened {
            Some(elision) => InclusionDecision::Elide(elision),
            None => policy.decide(&reference, source, &resolved.package, &resolved.id),
        };
        if decision.is_ignored() {
            return Ok(Edge {
                target: Some(resolved),
                ..Edge::verbatim(reference, decision)
            });
        }

        let form = self.reference_form(&reference, &resolved, from)?;
        let (idleading, suffix) = self.naming();
        let target = &resolved.package;
        let rewrite = match (&reference.syntax, &form) {
            (ReferenceSyntax::Require | ReferenceSyntax::Runtime, _) => module_id(
                idleading,
                &target.name,
                &target.version,
                &resolved.relative,
                suffix,
            ),
            (ReferenceSyntax::Import, Some(form)) => output_relative(
                &target.name,
                &target.version,
                &resolved.relative,
                form.output_extension(),
                suffix,
            ),
            _ => output_relative(&target.name, &target.version, &resolved.relative, None, ""),
        };

        let node = match form {
            Some(form) if decision.traverses() => Some(self.enqueue(
                &resolved,
                form,
                base,
                decision == InclusionDecision::EmitFile,
            )),
            _ => None,
        };

        Ok(Edge {
            reference,
            decision,
            target: Some(resolved),
            rewrite: Some(rewrite),
            node,
        })
    }

    /// Output form of a reference target; `None` for plain assets
    fn reference_form(
        &self,
        reference: &ModuleReference,
        resolved: &ResolvedReference,
        from: &str,
    ) -> Result<Option<Form>> {
        match reference.syntax {
            ReferenceSyntax::Url => Ok(None),
            ReferenceSyntax::Import => Ok(Some(Form::Stylesheet)),
            ReferenceSyntax::Require | ReferenceSyntax::Runtime => {
                match extension(&resolved.relative) {
                    Some(".js") => Ok(Some(Form::Script)),
                    Some(ext) => self
                        .ctx
                        .resolver
                        .extensions()
                        .get(ext)
                        .map(|out| Some(Form::Compiled(out.to_string())))
                        .ok_or_else(|| TransportError::unresolved(&reference.raw, from)),
                    None => Err(TransportError::unresolved(&reference.raw, from)),
                }
            }
        }
    }

    fn enqueue(&mut self, resolved: &ResolvedReference, form: Form, base: &Path, emit: bool) -> NodeId {
        if let Some(id) = self.graph.find(&resolved.path, &form) {
            let node = &mut self.graph.nodes[id.0];
            if emit && !node.emit {
                node.emit = true;
                if node.state == EmissionState::Elided {
                    node.state = EmissionState::Emitted;
                }
            }
            return id;
        }

        let mut node = Node::new(
            resolved.path.clone(),
            Arc::clone(&resolved.package),
            resolved.relative.clone(),
            form,
            base.to_path_buf(),
            self.naming(),
        );
        node.emit = emit;
        node.state = EmissionState::Queued;
        let id = self.graph.insert(node);
        self.queue.push_back(id);
        id
    }

    /// Handler for `form` in `package`, created once per walk
    fn handler(&mut self, form: &Form, package: &Arc<Package>) -> Result<Arc<dyn AssetHandler>> {
        let key = (form.key().to_string(), package.id());
        if let Some(handler) = self.handlers.get(&key) {
            return Ok(Arc::clone(handler));
        }

        let factory = self.ctx.registry.factory(form.key()).ok_or_else(|| {
            TransportError::config(format!("no handler registered for '{}'", form.key()))
        })?;
        let ctx = HandlerContext {
            package: Arc::clone(package),
            ignore: self.ctx.policy.ignore().sources().to_vec(),
            include: self.ctx.policy.include(),
            idleading: self.ctx.idleading.to_string(),
            registry: Arc::clone(self.ctx.registry),
        };
        let handler = factory(&ctx)?;
        self.handlers.insert(key, Arc::clone(&handler));
        Ok(handler)
    }
}

/// A walk in progress; yields nodes as they are visited
///
/// The first error ends the walk.
pub struct Walk<'a> {
    walker: GraphWalker<'a>,
    error: Option<TransportError>,
    failed: bool,
}

impl Walk<'_> {
    /// Drain the walk and hand over the graph
    pub fn finish(mut self) -> Result<DependencyGraph> {
        for step in self.by_ref() {
            step?;
        }
        if self.failed {
            return Err(TransportError::Aborted);
        }
        Ok(self.walker.graph)
    }

    /// The graph built so far
    pub fn graph(&self) -> &DependencyGraph {
        &self.walker.graph
    }
}

impl Iterator for Walk<'_> {
    type Item = Result<NodeId>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        if let Some(err) = self.error.take() {
            self.failed = true;
            return Some(Err(err));
        }

        let id = self.walker.queue.pop_front()?;
        match self.walker.visit(id) {
            Ok(()) => Some(Ok(id)),
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}
