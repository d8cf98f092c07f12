//! The inspection dispatcher.
//!
//! An [`Inspector`] runs one source unit through the registry's hooks:
//! initial hooks first, then tree transformers, then a pre-order walk
//! that shows every node to the hooks registered for its kind and,
//! once the node's subtree is done, to the node-finalize event hooks
//! that handle the kind. Hook verdicts turn into [`Report`]s keyed by
//! the owning plugin.

use std::fs;
use std::path::Path;

use ocelint_ast::{NodeId, Tree, first_annotation_line};
use ocelint_parser::parse_module;
use tracing::{debug, trace};

use crate::error::EngineError;
use crate::hookdb::HookDb;
use crate::registry::{Event, HookFn, HookId, Registry, Verdict};
use crate::report::{Inspection, Report};

/// Plugin key for hooks that were never stamped with an owner.
const UNKNOWN_PLUGIN: &str = "unknown";

/// Inspects a single source unit against a registry.
pub struct Inspector<'r> {
    registry: &'r Registry,
    unit: String,
    source: Option<String>,
    tree: Tree,
    db: HookDb,
    results: Inspection,
}

impl<'r> Inspector<'r> {
    /// Parses `source` and prepares an inspection named `unit`.
    pub fn from_source(
        registry: &'r Registry,
        unit: impl Into<String>,
        source: &str,
    ) -> Result<Self, EngineError> {
        let unit = unit.into();
        let tree = parse_module(source).map_err(|err| EngineError::syntax(&unit, err))?;
        Ok(Self {
            registry,
            unit,
            source: Some(source.to_owned()),
            tree,
            db: HookDb::new(),
            results: Inspection::new(),
        })
    }

    /// Reads and parses a file.
    pub fn from_file(registry: &'r Registry, path: &Path) -> Result<Self, EngineError> {
        let source = fs::read_to_string(path)?;
        Self::from_source(registry, path.display().to_string(), &source)
    }

    /// Wraps an already-built tree. No source text is available, so
    /// reports carry no annotations.
    pub fn from_tree(registry: &'r Registry, tree: Tree) -> Self {
        Self {
            registry,
            unit: "<unknown>".to_owned(),
            source: None,
            tree,
            db: HookDb::new(),
            results: Inspection::new(),
        }
    }

    /// Runs the inspection and returns its findings.
    pub fn handle(mut self) -> Inspection {
        let registry = self.registry;
        for id in registry.event_hooks(Event::Initial) {
            if let HookFn::Initial(func) = registry.hook(id).func() {
                func(&mut self.db);
            }
        }
        for id in registry.event_hooks(Event::TreeTransformer) {
            if let HookFn::Transform(func) = registry.hook(id).func() {
                func(&mut self.tree, &mut self.db);
            }
        }
        if let Some(root) = self.tree.root() {
            self.visit(root);
        }
        self.results
    }

    fn visit(&mut self, id: NodeId) {
        let registry = self.registry;
        let kind = self.tree.kind(id);
        trace!(?kind, "visit");

        for hook_id in registry.node_hooks(kind) {
            let HookFn::Node(func) = registry.hook(hook_id).func() else {
                continue;
            };
            match func(&self.tree, id, &mut self.db) {
                Verdict::Miss => {}
                verdict => self.emit(hook_id, id, verdict),
            }
        }

        let children: Vec<NodeId> = self.tree.children_of(id).collect();
        for child in children {
            self.visit(child);
        }

        for hook_id in registry.event_hooks(Event::NodeFinalize) {
            let hook = registry.hook(hook_id);
            if !hook.handles().contains(&kind) {
                continue;
            }
            if let HookFn::Node(func) = hook.func() {
                match func(&self.tree, id, &mut self.db) {
                    Verdict::Miss => {}
                    verdict => self.emit(hook_id, id, verdict),
                }
            }
        }
    }

    fn emit(&mut self, hook_id: HookId, node: NodeId, verdict: Verdict) {
        let hook = self.registry.hook(hook_id);
        let code = hook.name().to_uppercase();
        let plugin = hook
            .plugin()
            .map(|plugin| plugin.name().to_owned())
            .unwrap_or_else(|| UNKNOWN_PLUGIN.to_owned());
        let (line, column) = self
            .tree
            .span(node)
            .map(|span| (span.start_line, span.column))
            .unwrap_or((0, 0));
        let annotation = match verdict {
            Verdict::HitAt(anchor) => self.source.as_deref().and_then(|source| {
                self.tree
                    .span(anchor)
                    .and_then(|span| first_annotation_line(source, span))
            }),
            _ => None,
        };
        debug!(%code, unit = %self.unit, line, "finding");
        self.results.entry(plugin).or_default().push(Report {
            code,
            line,
            column,
            file: self.unit.clone(),
            annotation,
        });
    }
}
