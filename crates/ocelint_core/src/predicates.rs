//! Small syntax predicates shared by the built-in inspections.
//!
//! All of them answer a yes/no question about nodes of a tree and
//! never allocate on the hot path.

use ocelint_ast::{ConstValue, Field, NodeId, NodeKind, Tree};

/// True if the node's body holds exactly one statement of `kind`.
pub fn is_single_node(tree: &Tree, id: NodeId, kind: NodeKind) -> bool {
    let mut body = tree.field(id, Field::Body);
    match (body.next(), body.next()) {
        (Some(only), None) => tree.kind(only) == kind,
        _ => false,
    }
}

/// True if the node is a `Name` whose identifier is one of `candidates`.
pub fn name_check(tree: &Tree, id: NodeId, candidates: &[&str]) -> bool {
    tree.kind(id) == NodeKind::Name
        && tree
            .name(id)
            .is_some_and(|name| candidates.iter().any(|candidate| *candidate == name))
}

/// True if both nodes are `Name`s with the same identifier.
pub fn biname_check(tree: &Tree, left: NodeId, right: NodeId) -> bool {
    tree.kind(left) == NodeKind::Name
        && tree.kind(right) == NodeKind::Name
        && tree.name(left).is_some()
        && tree.name(left) == tree.name(right)
}

/// True if both nodes are `Tuple`s of the same length whose elements
/// pass [`biname_check`] pairwise.
pub fn tuple_check(tree: &Tree, left: NodeId, right: NodeId) -> bool {
    if tree.kind(left) != NodeKind::Tuple || tree.kind(right) != NodeKind::Tuple {
        return false;
    }
    let lhs: Vec<NodeId> = tree.field(left, Field::Elts).collect();
    let rhs: Vec<NodeId> = tree.field(right, Field::Elts).collect();
    lhs.len() == rhs.len()
        && lhs
            .iter()
            .zip(&rhs)
            .all(|(&a, &b)| biname_check(tree, a, b))
}

/// True if the nodes match as assignment/loop targets: either the
/// same name, or tuples of the same names.
pub fn target_check(tree: &Tree, left: NodeId, right: NodeId) -> bool {
    biname_check(tree, left, right) || tuple_check(tree, left, right)
}

/// True if the node is a `Constant` holding one of `candidates`.
/// Comparison is by value *and* type, so `1` never matches `True`.
pub fn constant_check(tree: &Tree, id: NodeId, candidates: &[ConstValue]) -> bool {
    tree.kind(id) == NodeKind::Constant
        && tree
            .node(id)
            .value
            .as_ref()
            .is_some_and(|value| candidates.contains(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ocelint_parser::parse_module;

    fn stmt(tree: &Tree, index: usize) -> NodeId {
        let root = tree.root().unwrap();
        tree.field(root, Field::Body).nth(index).unwrap()
    }

    #[test]
    fn single_node_bodies() {
        let tree = parse_module("while x:\n    pass\nwhile y:\n    pass\n    pass\n").unwrap();
        assert!(is_single_node(&tree, stmt(&tree, 0), NodeKind::Pass));
        assert!(!is_single_node(&tree, stmt(&tree, 1), NodeKind::Pass));
        assert!(!is_single_node(&tree, stmt(&tree, 0), NodeKind::Expr));
    }

    #[test]
    fn names_and_binames() {
        let tree = parse_module("x = x\ny = z\n").unwrap();
        let first = stmt(&tree, 0);
        let target = tree.field_one(first, Field::Targets).unwrap();
        let value = tree.field_one(first, Field::Value).unwrap();
        assert!(name_check(&tree, target, &["x", "w"]));
        assert!(!name_check(&tree, target, &["w"]));
        assert!(biname_check(&tree, target, value));

        let second = stmt(&tree, 1);
        let target = tree.field_one(second, Field::Targets).unwrap();
        let value = tree.field_one(second, Field::Value).unwrap();
        assert!(!biname_check(&tree, target, value));
    }

    #[test]
    fn tuples_match_pairwise() {
        let tree = parse_module("a, b = a, b\na, b = b, a\na, b = a, b, c\n").unwrap();
        for (index, expected) in [(0, true), (1, false), (2, false)] {
            let assign = stmt(&tree, index);
            let target = tree.field_one(assign, Field::Targets).unwrap();
            let value = tree.field_one(assign, Field::Value).unwrap();
            assert_eq!(target_check(&tree, target, value), expected, "case {index}");
        }
    }

    #[test]
    fn constants_match_by_type() {
        let tree = parse_module("x = 1\ny = True\n").unwrap();
        let int_value = tree.field_one(stmt(&tree, 0), Field::Value).unwrap();
        let bool_value = tree.field_one(stmt(&tree, 1), Field::Value).unwrap();
        assert!(constant_check(&tree, int_value, &[ConstValue::Int(1)]));
        assert!(!constant_check(&tree, int_value, &[ConstValue::Bool(true)]));
        assert!(constant_check(&tree, bool_value, &[ConstValue::Bool(true)]));
        assert!(!constant_check(&tree, bool_value, &[ConstValue::Int(1)]));
    }
}
