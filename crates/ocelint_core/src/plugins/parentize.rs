//! Parent links.
//!
//! A tree transformer that links every node's parent back-reference
//! before traversal, so node hooks can walk upward.

use ocelint_ast::{NodeId, Tree};

use crate::hookdb::HookDb;
use crate::plugin::PluginModule;
use crate::registry::Registry;

pub const MODULE: PluginModule = PluginModule {
    static_name: "ocelint.plugins.parentize",
    min_version: None,
    register,
};

fn register(registry: &mut Registry) {
    registry.on_transformer("parentize", parentize);
}

fn parentize(tree: &mut Tree, _db: &mut HookDb) {
    tree.link_parents();
}

/// Ancestors of `child`, innermost first, up to and including
/// `ancestor`. Stops at the root if `ancestor` is not on the path.
pub fn parents_until<'t>(
    tree: &'t Tree,
    child: NodeId,
    ancestor: NodeId,
) -> impl Iterator<Item = NodeId> + 't {
    let mut current = tree.parent(child);
    let mut done = false;
    std::iter::from_fn(move || {
        if done {
            return None;
        }
        let next = current?;
        if next == ancestor {
            done = true;
        }
        current = tree.parent(next);
        Some(next)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ocelint_ast::{Field, NodeKind};
    use ocelint_parser::parse_module;
    use pretty_assertions::assert_eq;

    #[test]
    fn parents_until_walks_inclusive() {
        let mut tree = parse_module("for x in y:\n    if x:\n        break\n").unwrap();
        tree.link_parents();
        let module = tree.root().unwrap();
        let for_stmt = tree.field_one(module, Field::Body).unwrap();
        let if_stmt = tree.field_one(for_stmt, Field::Body).unwrap();
        let brk = tree.field_one(if_stmt, Field::Body).unwrap();
        assert_eq!(tree.kind(brk), NodeKind::Break);

        let path: Vec<NodeId> = parents_until(&tree, brk, for_stmt).collect();
        assert_eq!(path, vec![if_stmt, for_stmt]);

        // Unrelated ancestor: the walk runs out at the root.
        let other = parse_path_to_root(&tree, brk);
        assert_eq!(other.last(), Some(&module));
    }

    fn parse_path_to_root(tree: &Tree, from: NodeId) -> Vec<NodeId> {
        let root = tree.root().unwrap();
        parents_until(tree, from, root).collect()
    }
}
