//! Modernization inspections: patterns with a shorter or faster
//! idiomatic equivalent.

use ocelint_ast::{ConstValue, ExprContext, Field, NodeId, NodeKind, Tree};

use crate::hookdb::HookDb;
use crate::plugin::{Plugin, PluginModule};
use crate::plugins::context::{ContextKind, ContextState, DB_KEY, get_context};
use crate::predicates::{biname_check, constant_check, is_single_node, name_check, target_check};
use crate::registry::{Registry, Verdict};

pub const MODULE: PluginModule = PluginModule {
    static_name: "ocelint.plugins.upgrade",
    min_version: None,
    register,
};

fn register(registry: &mut Registry) {
    registry.on_node("yield_from", &[NodeKind::For], yield_from);
    registry.on_node("optional", &[NodeKind::Subscript], optional);
    let super_hook = registry.on_node("super_args", &[NodeKind::Call], super_args);
    registry.declare_requirement(super_hook, Plugin::new("context", "@"));
    registry.on_node("builtin_enumerate", &[NodeKind::For], builtin_enumerate);
    registry.on_node("use_comprehension", &[NodeKind::Call], use_comprehension);
    registry.on_node(
        "map_use_comprehension",
        &[NodeKind::Call],
        map_use_comprehension,
    );
    registry.on_node("alphabet_constant", &[NodeKind::Assign], alphabet_constant);
    registry.on_node("suppress", &[NodeKind::Try], suppress);
}

/// `for x in it: yield x` is `yield from it`.
fn yield_from(tree: &Tree, node: NodeId, _db: &mut HookDb) -> Verdict {
    if !is_single_node(tree, node, NodeKind::Expr) {
        return Verdict::Miss;
    }
    let Some(stmt) = tree.field_one(node, Field::Body) else {
        return Verdict::Miss;
    };
    let Some(value) = tree.field_one(stmt, Field::Value) else {
        return Verdict::Miss;
    };
    if tree.kind(value) != NodeKind::Yield {
        return Verdict::Miss;
    }
    let (Some(yielded), Some(target)) = (
        tree.field_one(value, Field::Value),
        tree.field_one(node, Field::Target),
    ) else {
        return Verdict::Miss;
    };
    if target_check(tree, yielded, target) {
        Verdict::HitAt(value)
    } else {
        Verdict::Miss
    }
}

/// `Union[T, None]` is `Optional[T]`.
fn optional(tree: &Tree, node: NodeId, _db: &mut HookDb) -> Verdict {
    let Some(value) = tree.field_one(node, Field::Value) else {
        return Verdict::Miss;
    };
    if !name_check(tree, value, &["Union"]) {
        return Verdict::Miss;
    }
    let Some(slice) = tree.field_one(node, Field::Slice) else {
        return Verdict::Miss;
    };
    if tree.kind(slice) != NodeKind::Tuple {
        return Verdict::Miss;
    }
    let elts: Vec<NodeId> = tree.field(slice, Field::Elts).collect();
    if elts.len() == 2
        && elts
            .iter()
            .any(|&elt| constant_check(tree, elt, &[ConstValue::None]))
    {
        Verdict::HitAt(node)
    } else {
        Verdict::Miss
    }
}

/// `super(C, self)` inside a method needs no arguments.
fn super_args(tree: &Tree, node: NodeId, db: &mut HookDb) -> Verdict {
    let Some(func) = tree.field_one(node, Field::Func) else {
        return Verdict::Miss;
    };
    if !name_check(tree, func, &["super"]) {
        return Verdict::Miss;
    }
    if tree.field(node, Field::Args).next().is_none() {
        return Verdict::Miss;
    }
    let here = get_context(tree, node, db);
    let state = db.slot_mut::<ContextState>(DB_KEY);
    if here != state.current || state.current.kind != ContextKind::Function {
        return Verdict::Miss;
    }
    match state.previous.last() {
        Some(enclosing) if enclosing.kind == ContextKind::Class => Verdict::Hit,
        _ => Verdict::Miss,
    }
}

/// `for i in range(len(seq))` with `seq[i]` reads in the body is an
/// `enumerate(seq)`.
fn builtin_enumerate(tree: &Tree, node: NodeId, _db: &mut HookDb) -> Verdict {
    let (Some(target), Some(iter)) = (
        tree.field_one(node, Field::Target),
        tree.field_one(node, Field::Iter),
    ) else {
        return Verdict::Miss;
    };
    if tree.kind(target) != NodeKind::Name || tree.kind(iter) != NodeKind::Call {
        return Verdict::Miss;
    }
    let range_ok = tree
        .field_one(iter, Field::Func)
        .is_some_and(|func| name_check(tree, func, &["range"]));
    if !range_ok {
        return Verdict::Miss;
    }
    let range_args: Vec<NodeId> = tree.field(iter, Field::Args).collect();
    let [len_call] = range_args[..] else {
        return Verdict::Miss;
    };
    if tree.kind(len_call) != NodeKind::Call {
        return Verdict::Miss;
    }
    let len_ok = tree
        .field_one(len_call, Field::Func)
        .is_some_and(|func| name_check(tree, func, &["len"]));
    if !len_ok {
        return Verdict::Miss;
    }
    let len_args: Vec<NodeId> = tree.field(len_call, Field::Args).collect();
    let [sequence] = len_args[..] else {
        return Verdict::Miss;
    };
    if tree.kind(sequence) != NodeKind::Name {
        return Verdict::Miss;
    }

    for stmt in tree.field(node, Field::Body) {
        for child in tree.walk(stmt) {
            if tree.kind(child) != NodeKind::Subscript
                || tree.node(child).ctx != ExprContext::Load
            {
                continue;
            }
            let slice_ok = tree
                .field_one(child, Field::Slice)
                .is_some_and(|slice| biname_check(tree, slice, target));
            let value_ok = tree
                .field_one(child, Field::Value)
                .is_some_and(|value| biname_check(tree, value, sequence));
            if slice_ok && value_ok {
                return Verdict::HitAt(iter);
            }
        }
    }
    Verdict::Miss
}

/// `list(x for x in it)` is a comprehension. For `dict` the generator
/// must yield pairs.
fn use_comprehension(tree: &Tree, node: NodeId, _db: &mut HookDb) -> Verdict {
    let Some(func) = tree.field_one(node, Field::Func) else {
        return Verdict::Miss;
    };
    if !name_check(tree, func, &["list", "set", "dict"]) {
        return Verdict::Miss;
    }
    if tree.field(node, Field::Keywords).next().is_some() {
        return Verdict::Miss;
    }
    let args: Vec<NodeId> = tree.field(node, Field::Args).collect();
    let [generator] = args[..] else {
        return Verdict::Miss;
    };
    if tree.kind(generator) != NodeKind::GeneratorExp {
        return Verdict::Miss;
    }
    if name_check(tree, func, &["dict"]) {
        let pair = tree.field_one(generator, Field::Elt).is_some_and(|elt| {
            tree.kind(elt) == NodeKind::Tuple && tree.field(elt, Field::Elts).count() == 2
        });
        if !pair {
            return Verdict::Miss;
        }
    }
    Verdict::HitAt(node)
}

/// `list(map(f, it))` is `[f(x) for x in it]`.
fn map_use_comprehension(tree: &Tree, node: NodeId, _db: &mut HookDb) -> Verdict {
    let Some(func) = tree.field_one(node, Field::Func) else {
        return Verdict::Miss;
    };
    if !name_check(tree, func, &["list", "set"]) {
        return Verdict::Miss;
    }
    let args: Vec<NodeId> = tree.field(node, Field::Args).collect();
    let [map_call] = args[..] else {
        return Verdict::Miss;
    };
    if tree.kind(map_call) != NodeKind::Call {
        return Verdict::Miss;
    }
    let map_ok = tree
        .field_one(map_call, Field::Func)
        .is_some_and(|inner| name_check(tree, inner, &["map"]));
    if map_ok && tree.field(map_call, Field::Args).count() >= 2 {
        Verdict::HitAt(node)
    } else {
        Verdict::Miss
    }
}

const ASCII_LOWERCASE: &str = "abcdefghijklmnopqrstuvwxyz";
const ASCII_UPPERCASE: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// An upper-cased constant bound to a spelled-out alphabet already
/// lives in `string`.
fn alphabet_constant(tree: &Tree, node: NodeId, _db: &mut HookDb) -> Verdict {
    let targets: Vec<NodeId> = tree.field(node, Field::Targets).collect();
    let [target] = targets[..] else {
        return Verdict::Miss;
    };
    if tree.kind(target) != NodeKind::Name {
        return Verdict::Miss;
    }
    let constant_name = tree.name(target).is_some_and(|name| {
        name.chars().any(|c| c.is_uppercase()) && !name.chars().any(|c| c.is_lowercase())
    });
    if !constant_name {
        return Verdict::Miss;
    }
    let Some(value) = tree.field_one(node, Field::Value) else {
        return Verdict::Miss;
    };
    let alphabets = [
        ConstValue::str(ASCII_LOWERCASE),
        ConstValue::str(ASCII_UPPERCASE),
        ConstValue::str(format!("{ASCII_LOWERCASE}{ASCII_UPPERCASE}")),
    ];
    if constant_check(tree, value, &alphabets) {
        Verdict::HitAt(value)
    } else {
        Verdict::Miss
    }
}

/// `try: ... except E: pass` is `with contextlib.suppress(E)`.
fn suppress(tree: &Tree, node: NodeId, _db: &mut HookDb) -> Verdict {
    let handlers: Vec<NodeId> = tree.field(node, Field::Handlers).collect();
    let [handler] = handlers[..] else {
        return Verdict::Miss;
    };
    if is_single_node(tree, handler, NodeKind::Pass) {
        Verdict::Hit
    } else {
        Verdict::Miss
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ocelint_parser::parse_module;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn verdict_on(source: &str, hook: fn(&Tree, NodeId, &mut HookDb) -> Verdict) -> Verdict {
        let tree = parse_module(source).unwrap();
        let mut db = HookDb::new();
        let root = tree.root().unwrap();
        for node in tree.walk(root) {
            match hook(&tree, node, &mut db) {
                Verdict::Miss => {}
                verdict => return verdict,
            }
        }
        Verdict::Miss
    }

    #[rstest]
    #[case("for x in it:\n    yield x\n", true)]
    #[case("for x, y in it:\n    yield x, y\n", true)]
    #[case("for x in it:\n    yield x + 1\n", false)]
    #[case("for x in it:\n    yield x\n    note(x)\n", false)]
    fn yield_from_cases(#[case] source: &str, #[case] expected: bool) {
        let wrapped = format!("def g(it):\n{}", indent(source));
        let verdict = verdict_on(&wrapped, yield_from);
        assert_eq!(!matches!(verdict, Verdict::Miss), expected, "{source}");
    }

    #[rstest]
    #[case("x: Union[str, None]\n", true)]
    #[case("x: Union[None, int]\n", true)]
    #[case("x: Union[str, int]\n", false)]
    #[case("x: Union[str, int, None]\n", false)]
    fn optional_cases(#[case] source: &str, #[case] expected: bool) {
        let verdict = verdict_on(source, optional);
        assert_eq!(!matches!(verdict, Verdict::Miss), expected, "{source}");
    }

    #[rstest]
    #[case("for i in range(len(items)):\n    use(items[i])\n", true)]
    #[case("for i in range(len(items)):\n    items[i] = 0\n", false)]
    #[case("for i in range(len(items)):\n    use(other[i])\n", false)]
    #[case("for i in range(10):\n    use(items[i])\n", false)]
    fn enumerate_cases(#[case] source: &str, #[case] expected: bool) {
        let verdict = verdict_on(source, builtin_enumerate);
        assert_eq!(!matches!(verdict, Verdict::Miss), expected, "{source}");
    }

    #[rstest]
    #[case("xs = list(x for x in it)\n", true)]
    #[case("xs = set(x for x in it)\n", true)]
    #[case("xs = dict((k, v) for k in it)\n", true)]
    #[case("xs = dict(x for x in it)\n", false)]
    #[case("xs = list(gen)\n", false)]
    fn comprehension_cases(#[case] source: &str, #[case] expected: bool) {
        let verdict = verdict_on(source, use_comprehension);
        assert_eq!(!matches!(verdict, Verdict::Miss), expected, "{source}");
    }

    #[rstest]
    #[case("xs = list(map(f, it))\n", true)]
    #[case("xs = set(map(f, it))\n", true)]
    #[case("xs = list(map(f))\n", false)]
    #[case("xs = tuple(map(f, it))\n", false)]
    fn map_cases(#[case] source: &str, #[case] expected: bool) {
        let verdict = verdict_on(source, map_use_comprehension);
        assert_eq!(!matches!(verdict, Verdict::Miss), expected, "{source}");
    }

    #[rstest]
    #[case("LOWER = 'abcdefghijklmnopqrstuvwxyz'\n", true)]
    #[case("UPPER_2 = 'ABCDEFGHIJKLMNOPQRSTUVWXYZ'\n", true)]
    #[case("lower = 'abcdefghijklmnopqrstuvwxyz'\n", false)]
    #[case("ALPHABET = 'abc'\n", false)]
    fn alphabet_cases(#[case] source: &str, #[case] expected: bool) {
        let verdict = verdict_on(source, alphabet_constant);
        assert_eq!(!matches!(verdict, Verdict::Miss), expected, "{source}");
    }

    #[rstest]
    #[case("try:\n    work()\nexcept ValueError:\n    pass\n", true)]
    #[case("try:\n    work()\nexcept ValueError:\n    log()\n", false)]
    #[case(
        "try:\n    work()\nexcept ValueError:\n    pass\nexcept KeyError:\n    pass\n",
        false
    )]
    fn suppress_cases(#[case] source: &str, #[case] expected: bool) {
        let verdict = verdict_on(source, suppress);
        assert_eq!(!matches!(verdict, Verdict::Miss), expected, "{source}");
    }

    fn indent(source: &str) -> String {
        source
            .lines()
            .map(|line| format!("    {line}\n"))
            .collect()
    }
}
