//! Context inference.
//!
//! Answers "which definition does this node live in?" without carrying
//! a symbol table through the walk. One pass over the module indexes
//! every definition's line span; [`get_context`] then resolves a node
//! to the containing definition whose span endpoints are nearest, or
//! to the global context when nothing contains it. Entering and
//! leaving definitions during the walk keeps a stack of the enclosing
//! contexts for hooks that care about lexical nesting.

use std::collections::HashMap;

use ocelint_ast::{NodeId, NodeKind, Tree};

use crate::hookdb::HookDb;
use crate::plugin::PluginModule;
use crate::registry::{Event, Priority, Registry, Verdict};

/// Hook db key the context state lives under.
pub const DB_KEY: &str = "context";

pub const MODULE: PluginModule = PluginModule {
    static_name: "ocelint.plugins.context",
    min_version: None,
    register,
};

fn register(registry: &mut Registry) {
    registry.on_node("prepare_contexts", &[NodeKind::Module], prepare_contexts);
    // Context switches before any other hook sees the definition.
    let change = registry.on_node(
        "change_context",
        &[NodeKind::ClassDef, NodeKind::FunctionDef],
        change_context,
    );
    registry.set_priority(change, Priority::First);
    let finalize = registry.on_node(
        "finalize_context",
        &[NodeKind::ClassDef, NodeKind::FunctionDef],
        finalize_context,
    );
    registry.promote_to_event(finalize, &[Event::NodeFinalize]);
}

/// A definition's line span, used as its context key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KPair {
    pub start: u32,
    pub end: u32,
}

impl KPair {
    pub fn of(tree: &Tree, id: NodeId) -> KPair {
        match tree.span(id) {
            Some(span) => KPair {
                start: span.start_line,
                end: span.end_line,
            },
            None => KPair { start: 0, end: 0 },
        }
    }

    pub fn contains(self, other: KPair) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Euclidean distance between span endpoints; among containing
    /// definitions the nearest one is the innermost.
    pub fn distance(self, other: KPair) -> f64 {
        let start = f64::from(self.start) - f64::from(other.start);
        let end = f64::from(self.end) - f64::from(other.end);
        (start * start + end * end).sqrt()
    }
}

/// What kind of definition a context is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextKind {
    Anonymous,
    Class,
    Function,
    Global,
}

/// One resolved context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Context {
    pub name: String,
    pub kind: ContextKind,
    pub span: KPair,
}

impl Context {
    fn global(span: KPair) -> Context {
        Context {
            name: "__main__".to_owned(),
            kind: ContextKind::Global,
            span,
        }
    }
}

/// Shared state the context hooks keep in the hook db.
#[derive(Debug)]
pub struct ContextState {
    ready: bool,
    global: Context,
    /// Context of the definition currently being walked.
    pub current: Context,
    /// Enclosing contexts, outermost first.
    pub previous: Vec<Context>,
    index: HashMap<KPair, Context>,
}

impl Default for ContextState {
    fn default() -> Self {
        let global = Context::global(KPair { start: 0, end: 0 });
        Self {
            ready: false,
            current: global.clone(),
            global,
            previous: Vec::new(),
            index: HashMap::new(),
        }
    }
}

fn prepare_contexts(tree: &Tree, node: NodeId, db: &mut HookDb) -> Verdict {
    let mut index = HashMap::new();
    for id in tree.walk(node) {
        let kind = match tree.kind(id) {
            NodeKind::ClassDef => ContextKind::Class,
            NodeKind::FunctionDef => ContextKind::Function,
            NodeKind::Lambda => ContextKind::Anonymous,
            _ => continue,
        };
        let span = KPair::of(tree, id);
        let name = tree.name(id).unwrap_or("<lambda>").to_owned();
        index.insert(span, Context { name, kind, span });
    }

    let state = db.slot_mut::<ContextState>(DB_KEY);
    state.index = index;
    state.global = Context::global(KPair::of(tree, node));
    state.current = state.global.clone();
    state.previous.clear();
    state.ready = true;
    Verdict::Miss
}

/// The innermost definition containing `id`, or the global context.
pub fn get_context(tree: &Tree, id: NodeId, db: &mut HookDb) -> Context {
    let target = KPair::of(tree, id);
    let state = db.slot_mut::<ContextState>(DB_KEY);
    if !state.ready {
        return state.global.clone();
    }
    state
        .index
        .iter()
        .filter(|(span, _)| span.contains(target))
        .min_by(|(a, _), (b, _)| a.distance(target).total_cmp(&b.distance(target)))
        .map(|(_, context)| context.clone())
        .unwrap_or_else(|| state.global.clone())
}

fn change_context(tree: &Tree, node: NodeId, db: &mut HookDb) -> Verdict {
    let context = get_context(tree, node, db);
    let state = db.slot_mut::<ContextState>(DB_KEY);
    if state.ready {
        let enclosing = std::mem::replace(&mut state.current, context);
        state.previous.push(enclosing);
    }
    Verdict::Miss
}

fn finalize_context(_tree: &Tree, _node: NodeId, db: &mut HookDb) -> Verdict {
    let state = db.slot_mut::<ContextState>(DB_KEY);
    if state.ready {
        // Every exit pairs with an entry; an underflow here is a
        // dispatcher bug, not bad input.
        state.current = state
            .previous
            .pop()
            .expect("context exits stay balanced with entries");
    }
    Verdict::Miss
}
