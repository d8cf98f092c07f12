//! The tree arena.
//!
//! All nodes of one source unit live in a single [`Tree`], addressed
//! by [`NodeId`]. The arena supports the two operations the engine
//! and the hooks rely on: `children_of` (direct children, in order)
//! and `walk` (all descendants, pre-order).

use crate::{Field, Node, NodeKind, Span};

/// A handle to a node inside a [`Tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// An index arena holding the syntax tree of one source unit.
#[derive(Debug, Default, Clone)]
pub struct Tree {
    nodes: Vec<Node>,
    root: Option<NodeId>,
}

impl Tree {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node to the arena and returns its handle.
    pub fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Appends `child` to `parent` under the given role.
    ///
    /// Children keep insertion order, which is source order for parser
    /// built trees.
    pub fn add_child(&mut self, parent: NodeId, field: Field, child: NodeId) {
        self.nodes[parent.index()].children.push((field, child));
    }

    /// Marks the root node of this unit.
    pub fn set_root(&mut self, root: NodeId) {
        self.root = Some(root);
    }

    /// Returns the root node, if one was set.
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Number of nodes in the arena.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the arena holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the node behind a handle.
    #[inline]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    /// Returns a mutable reference to the node behind a handle.
    #[inline]
    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    /// The node's kind tag.
    #[inline]
    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.node(id).kind
    }

    /// The node's source span, if any.
    #[inline]
    pub fn span(&self, id: NodeId) -> Option<Span> {
        self.node(id).span
    }

    /// The node's identifier payload, if any.
    #[inline]
    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.node(id).name.as_deref()
    }

    /// The node's syntactic parent, if parents have been linked.
    #[inline]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// Direct children of a node, in source order.
    pub fn children_of(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.node(id).children.iter().map(|(_, child)| *child)
    }

    /// Children of a node filling the given role.
    pub fn field(&self, id: NodeId, field: Field) -> impl Iterator<Item = NodeId> + '_ {
        self.node(id)
            .children
            .iter()
            .filter(move |(f, _)| *f == field)
            .map(|(_, child)| *child)
    }

    /// The single child filling a singular role, if present.
    pub fn field_one(&self, id: NodeId, field: Field) -> Option<NodeId> {
        self.field(id, field).next()
    }

    /// All descendants of `id` including `id` itself, pre-order.
    pub fn walk(&self, id: NodeId) -> Walk<'_> {
        Walk {
            tree: self,
            stack: vec![id],
        }
    }

    /// Links every node's parent back-reference.
    ///
    /// Run once per tree, by the parentize tree transformer, before
    /// any node hook executes.
    pub fn link_parents(&mut self) {
        let edges: Vec<(NodeId, NodeId)> = self
            .nodes
            .iter()
            .enumerate()
            .flat_map(|(index, node)| {
                let parent = NodeId(index as u32);
                node.children
                    .iter()
                    .map(move |(_, child)| (*child, parent))
                    .collect::<Vec<_>>()
            })
            .collect();
        for (child, parent) in edges {
            self.nodes[child.index()].parent = Some(parent);
        }
    }
}

/// Pre-order traversal over a subtree.
pub struct Walk<'t> {
    tree: &'t Tree,
    stack: Vec<NodeId>,
}

impl Iterator for Walk<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        // Push in reverse so children come off the stack in order.
        let children = &self.tree.node(id).children;
        for (_, child) in children.iter().rev() {
            self.stack.push(*child);
        }
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> (Tree, NodeId, NodeId, NodeId, NodeId) {
        // module -> [func -> [pass], name]
        let mut tree = Tree::new();
        let module = tree.push(Node::new(NodeKind::Module));
        let func = tree.push(Node::new(NodeKind::FunctionDef).with_name("f"));
        let pass = tree.push(Node::new(NodeKind::Pass));
        let name = tree.push(Node::new(NodeKind::Name).with_name("x"));
        tree.add_child(module, Field::Body, func);
        tree.add_child(func, Field::Body, pass);
        tree.add_child(module, Field::Body, name);
        tree.set_root(module);
        (tree, module, func, pass, name)
    }

    #[test]
    fn walk_is_preorder() {
        let (tree, module, func, pass, name) = sample();
        let order: Vec<NodeId> = tree.walk(module).collect();
        assert_eq!(order, vec![module, func, pass, name]);
    }

    #[test]
    fn field_accessors_respect_roles() {
        let (tree, module, func, _, name) = sample();
        let body: Vec<NodeId> = tree.field(module, Field::Body).collect();
        assert_eq!(body, vec![func, name]);
        assert_eq!(tree.field_one(func, Field::Body).is_some(), true);
        assert_eq!(tree.field_one(func, Field::Targets), None);
    }

    #[test]
    fn link_parents_sets_every_edge() {
        let (mut tree, module, func, pass, _) = sample();
        assert_eq!(tree.parent(func), None);
        tree.link_parents();
        assert_eq!(tree.parent(func), Some(module));
        assert_eq!(tree.parent(pass), Some(func));
        assert_eq!(tree.parent(module), None);
    }
}
