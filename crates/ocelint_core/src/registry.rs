//! Hook registration and dispatch tables.
//!
//! The registry owns every hook the loaded plugins registered and
//! answers one question for the dispatcher: which hooks run for this
//! node kind (or event), in what order. Order is decided lazily and
//! cached as a stable sort by [`Priority`]; hooks whose required
//! plugins went inactive are dropped on every read, since activation
//! can change without the registry being touched.
//!
//! Loading a plugin happens inside a *scope* ([`Registry::load_scope`]):
//! registrations go to a buffer that is merged into the live tables
//! only if the whole scope succeeds, so a plugin that bails out half
//! way leaves no trace. Scopes nest; an inner commit lands in the
//! enclosing scope's buffer and is discarded with it if the outer
//! scope aborts.

use std::collections::{BTreeSet, HashMap};

use ocelint_ast::{NodeId, NodeKind, Tree};
use parking_lot::RwLock;

use crate::hookdb::HookDb;
use crate::plugin::Plugin;

/// Index of a hook in the registry's slab.
pub type HookId = usize;

/// What a node hook decided about the node it was shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Nothing to report.
    Miss,
    /// Report, anchored at the visited node itself.
    Hit,
    /// Report, annotated with the source of another node (a child that
    /// pinpoints the problem better than the whole statement).
    HitAt(NodeId),
}

/// Dispatch points that are not node visits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    /// Before traversal, once per inspection.
    Initial,
    /// After a node's entire subtree has been visited.
    NodeFinalize,
    /// Tree-mutating pass between [`Event::Initial`] and traversal.
    TreeTransformer,
}

/// Relative order of hooks registered for the same node kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    First,
    #[default]
    Average,
    Last,
}

/// A hook inspecting one node.
pub type NodeHookFn = fn(&Tree, NodeId, &mut HookDb) -> Verdict;
/// A hook run once before traversal.
pub type InitialHookFn = fn(&mut HookDb);
/// A hook rewriting the tree before traversal.
pub type TransformHookFn = fn(&mut Tree, &mut HookDb);

#[derive(Debug, Clone, Copy)]
pub enum HookFn {
    Node(NodeHookFn),
    Initial(InitialHookFn),
    Transform(TransformHookFn),
}

/// A registered hook and its dispatch metadata.
#[derive(Debug)]
pub struct Hook {
    name: &'static str,
    func: HookFn,
    priority: Priority,
    requires: Vec<Plugin>,
    handles: BTreeSet<NodeKind>,
    plugin: Option<Plugin>,
}

impl Hook {
    /// The hook's registered name. Report codes derive from it.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn func(&self) -> HookFn {
        self.func
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// Node kinds this hook was ever registered under. For event
    /// hooks promoted from node hooks this keeps the original kinds,
    /// and `NodeFinalize` dispatch filters on it.
    pub fn handles(&self) -> &BTreeSet<NodeKind> {
        &self.handles
    }

    /// The plugin that loaded this hook, once stamped.
    pub fn plugin(&self) -> Option<&Plugin> {
        self.plugin.as_ref()
    }

    fn gated(&self) -> bool {
        self.requires.iter().any(Plugin::is_inactive)
    }
}

/// Signals that the current load scope must be abandoned.
#[derive(Debug)]
pub struct LoadAbort;

/// The result of a load scope.
#[derive(Debug)]
pub enum LoadOutcome {
    /// Scope committed; carries the hooks it registered.
    Committed(Vec<HookId>),
    /// Scope aborted; its registrations were discarded.
    Aborted,
}

#[derive(Debug, Default)]
struct Tables {
    nodes: HashMap<NodeKind, Vec<HookId>>,
    events: HashMap<Event, Vec<HookId>>,
}

impl Tables {
    fn merge(&mut self, other: Tables) {
        for (kind, ids) in other.nodes {
            self.nodes.entry(kind).or_default().extend(ids);
        }
        for (event, ids) in other.events {
            self.events.entry(event).or_default().extend(ids);
        }
    }

    fn remove(&mut self, id: HookId) {
        for ids in self.nodes.values_mut() {
            ids.retain(|&entry| entry != id);
        }
    }

    fn contains_node(&self, kind: NodeKind, id: HookId) -> bool {
        self.nodes.get(&kind).is_some_and(|ids| ids.contains(&id))
    }

    fn contains_event(&self, event: Event, id: HookId) -> bool {
        self.events
            .get(&event)
            .is_some_and(|ids| ids.contains(&id))
    }
}

#[derive(Debug, Default)]
struct Frame {
    tables: Tables,
    new_hooks: Vec<HookId>,
}

#[derive(Debug)]
struct DispatchCache {
    nodes: HashMap<NodeKind, Vec<HookId>>,
    events: HashMap<Event, Vec<HookId>>,
}

/// The hook registry.
#[derive(Debug, Default)]
pub struct Registry {
    hooks: Vec<Hook>,
    tables: Tables,
    frames: Vec<Frame>,
    cache: RwLock<Option<DispatchCache>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a node hook for the given kinds and returns its id.
    ///
    /// Registering the same name again extends the existing hook to
    /// the extra kinds instead of creating a second hook, so a hook
    /// shows up at most once per node list.
    pub fn on_node(&mut self, name: &'static str, kinds: &[NodeKind], func: NodeHookFn) -> HookId {
        self.invalidate();
        let id = match self.find_by_name(name) {
            Some(id) => id,
            None => self.push_hook(name, HookFn::Node(func)),
        };
        self.hooks[id].handles.extend(kinds.iter().copied());
        for &kind in kinds {
            if !self.node_registered(kind, id) {
                self.active_tables_mut()
                    .nodes
                    .entry(kind)
                    .or_default()
                    .push(id);
            }
        }
        id
    }

    /// Registers a hook on [`Event::Initial`].
    pub fn on_initial(&mut self, name: &'static str, func: InitialHookFn) -> HookId {
        self.register_event_hook(name, Event::Initial, HookFn::Initial(func))
    }

    /// Registers a hook on [`Event::TreeTransformer`].
    pub fn on_transformer(&mut self, name: &'static str, func: TransformHookFn) -> HookId {
        self.register_event_hook(name, Event::TreeTransformer, HookFn::Transform(func))
    }

    fn register_event_hook(&mut self, name: &'static str, event: Event, func: HookFn) -> HookId {
        self.invalidate();
        let id = match self.find_by_name(name) {
            Some(id) => id,
            None => self.push_hook(name, func),
        };
        if !self.event_registered(event, id) {
            self.active_tables_mut()
                .events
                .entry(event)
                .or_default()
                .push(id);
        }
        id
    }

    /// Promotes a node hook to the given events: the hook is removed
    /// from every node list and dispatched on the events instead. Its
    /// recorded node kinds are kept and used to filter
    /// [`Event::NodeFinalize`] deliveries.
    pub fn promote_to_event(&mut self, id: HookId, events: &[Event]) {
        self.invalidate();
        self.tables.remove(id);
        for frame in &mut self.frames {
            frame.tables.remove(id);
        }
        for &event in events {
            if !self.event_registered(event, id) {
                self.active_tables_mut()
                    .events
                    .entry(event)
                    .or_default()
                    .push(id);
            }
        }
    }

    /// Declares that a hook only runs while `plugin` is active.
    pub fn declare_requirement(&mut self, id: HookId, plugin: Plugin) {
        self.invalidate();
        self.hooks[id].requires.push(plugin);
    }

    pub fn set_priority(&mut self, id: HookId, priority: Priority) {
        self.invalidate();
        self.hooks[id].priority = priority;
    }

    /// Records `plugin` as the owner of the given hooks.
    pub fn stamp(&mut self, ids: &[HookId], plugin: &Plugin) {
        for &id in ids {
            self.hooks[id].plugin = Some(plugin.clone());
        }
    }

    /// Runs `scope` against a registration buffer. On `Ok` the buffer
    /// is merged into the enclosing scope (or the live tables) and the
    /// newly registered hook ids are returned; on `Err` every
    /// registration made inside the scope is discarded.
    pub fn load_scope<F>(&mut self, scope: F) -> LoadOutcome
    where
        F: FnOnce(&mut Registry) -> Result<(), LoadAbort>,
    {
        self.frames.push(Frame::default());
        let result = scope(self);
        let frame = self.frames.pop().expect("load scopes are balanced");
        self.invalidate();
        match result {
            Ok(()) => {
                let Frame { tables, new_hooks } = frame;
                match self.frames.last_mut() {
                    Some(parent) => {
                        parent.tables.merge(tables);
                        parent.new_hooks.extend(new_hooks.iter().copied());
                    }
                    None => self.tables.merge(tables),
                }
                LoadOutcome::Committed(new_hooks)
            }
            Err(LoadAbort) => LoadOutcome::Aborted,
        }
    }

    /// The hook behind an id.
    pub fn hook(&self, id: HookId) -> &Hook {
        &self.hooks[id]
    }

    /// All hooks, in registration order. Aborted scopes leave slab
    /// entries behind that no table references; they are reported
    /// here as well but never dispatched.
    pub fn hooks(&self) -> impl Iterator<Item = &Hook> {
        self.hooks.iter()
    }

    /// Hooks to run for a node of `kind`, gated and ordered.
    pub fn node_hooks(&self, kind: NodeKind) -> Vec<HookId> {
        self.ensure_cache();
        let ids = self
            .cache
            .read()
            .as_ref()
            .and_then(|cache| cache.nodes.get(&kind).cloned())
            .unwrap_or_default();
        self.ungated(ids)
    }

    /// Hooks to run for an event, gated and ordered.
    pub fn event_hooks(&self, event: Event) -> Vec<HookId> {
        self.ensure_cache();
        let ids = self
            .cache
            .read()
            .as_ref()
            .and_then(|cache| cache.events.get(&event).cloned())
            .unwrap_or_default();
        self.ungated(ids)
    }

    fn push_hook(&mut self, name: &'static str, func: HookFn) -> HookId {
        let id = self.hooks.len();
        self.hooks.push(Hook {
            name,
            func,
            priority: Priority::default(),
            requires: Vec::new(),
            handles: BTreeSet::new(),
            plugin: None,
        });
        if let Some(frame) = self.frames.last_mut() {
            frame.new_hooks.push(id);
        }
        id
    }

    fn find_by_name(&self, name: &str) -> Option<HookId> {
        self.hooks.iter().position(|hook| hook.name == name)
    }

    fn active_tables_mut(&mut self) -> &mut Tables {
        match self.frames.last_mut() {
            Some(frame) => &mut frame.tables,
            None => &mut self.tables,
        }
    }

    fn node_registered(&self, kind: NodeKind, id: HookId) -> bool {
        self.tables.contains_node(kind, id)
            || self
                .frames
                .iter()
                .any(|frame| frame.tables.contains_node(kind, id))
    }

    fn event_registered(&self, event: Event, id: HookId) -> bool {
        self.tables.contains_event(event, id)
            || self
                .frames
                .iter()
                .any(|frame| frame.tables.contains_event(event, id))
    }

    fn invalidate(&self) {
        *self.cache.write() = None;
    }

    /// Dispatch reads only the committed tables; open load scopes are
    /// invisible to it.
    fn ensure_cache(&self) {
        if self.cache.read().is_some() {
            return;
        }
        let nodes = self
            .tables
            .nodes
            .iter()
            .map(|(&kind, ids)| (kind, self.ordered(ids)))
            .collect();
        let events = self
            .tables
            .events
            .iter()
            .map(|(&event, ids)| (event, self.ordered(ids)))
            .collect();
        *self.cache.write() = Some(DispatchCache { nodes, events });
    }

    fn ordered(&self, ids: &[HookId]) -> Vec<HookId> {
        let mut ids = ids.to_vec();
        // Stable sort keeps registration order within a priority band.
        ids.sort_by_key(|&id| self.hooks[id].priority);
        ids
    }

    /// The gating filter runs on every read, never from the cache: a
    /// required plugin can flip inactive without any registry
    /// mutation.
    fn ungated(&self, ids: Vec<HookId>) -> Vec<HookId> {
        ids.into_iter()
            .filter(|&id| !self.hooks[id].gated())
            .collect()
    }
}
