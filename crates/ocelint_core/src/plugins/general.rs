//! General correctness inspections.

use std::collections::HashMap;
use std::sync::OnceLock;

use ocelint_ast::{Field, NodeId, NodeKind, Tree};

use crate::hookdb::HookDb;
use crate::plugin::{Plugin, PluginModule};
use crate::plugins::context::get_context;
use crate::plugins::parentize::parents_until;
use crate::registry::{Registry, Verdict};

pub const MODULE: PluginModule = PluginModule {
    static_name: "ocelint.plugins.general",
    min_version: None,
    register,
};

fn register(registry: &mut Registry) {
    registry.on_node(
        "default_mutable_arg",
        &[NodeKind::FunctionDef],
        default_mutable_arg,
    );
    let finally = registry.on_node(
        "control_flow_inside_finally",
        &[NodeKind::Try],
        control_flow_inside_finally,
    );
    registry.declare_requirement(finally, Plugin::new("context", "@"));
    registry.on_node("exception_defs", &[NodeKind::ClassDef], exception_defs);
    registry.on_node("unreachable_except", &[NodeKind::Try], unreachable_except);
}

const MUTABLE_KINDS: [NodeKind; 3] = [NodeKind::List, NodeKind::Dict, NodeKind::Set];

/// `def f(x=[])` shares the list across calls.
fn default_mutable_arg(tree: &Tree, node: NodeId, _db: &mut HookDb) -> Verdict {
    let Some(args) = tree.field_one(node, Field::Args) else {
        return Verdict::Miss;
    };
    let mutable = tree
        .field(args, Field::Defaults)
        .any(|default| MUTABLE_KINDS.contains(&tree.kind(default)));
    if mutable {
        Verdict::HitAt(args)
    } else {
        Verdict::Miss
    }
}

/// `return`/`break`/`continue` inside a `finally` block swallows any
/// in-flight exception. A `break`/`continue` bound to a loop that is
/// itself inside the `finally` is fine; so is a `return` belonging to
/// a nested function.
fn control_flow_inside_finally(tree: &Tree, node: NodeId, db: &mut HookDb) -> Verdict {
    let here = get_context(tree, node, db);
    for stmt in tree.field(node, Field::FinalBody) {
        for child in tree.walk(stmt) {
            match tree.kind(child) {
                NodeKind::Return => {
                    if get_context(tree, child, db) == here {
                        return Verdict::HitAt(child);
                    }
                }
                NodeKind::Break | NodeKind::Continue => {
                    let in_loop = parents_until(tree, child, node)
                        .any(|up| matches!(tree.kind(up), NodeKind::For | NodeKind::While));
                    if !in_loop {
                        return Verdict::HitAt(child);
                    }
                }
                _ => {}
            }
        }
    }
    Verdict::Miss
}

/// Hook db key for user-defined exception classes.
pub const EXCEPTIONS_KEY: &str = "user_exceptions";

/// Exception classes defined by the inspected module, each mapped to
/// its ancestry (itself first).
#[derive(Debug, Default)]
pub struct UserExceptions {
    pub classes: HashMap<String, Vec<String>>,
}

/// Built-in exception ancestries, each listing the exception itself
/// first and `BaseException` last.
fn builtin_exceptions() -> &'static HashMap<&'static str, Vec<&'static str>> {
    static TABLE: OnceLock<HashMap<&'static str, Vec<&'static str>>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let chains: &[&[&str]] = &[
            &["BaseException"],
            &["SystemExit", "BaseException"],
            &["KeyboardInterrupt", "BaseException"],
            &["GeneratorExit", "BaseException"],
            &["Exception", "BaseException"],
            &["StopIteration", "Exception", "BaseException"],
            &["StopAsyncIteration", "Exception", "BaseException"],
            &["ArithmeticError", "Exception", "BaseException"],
            &["FloatingPointError", "ArithmeticError", "Exception", "BaseException"],
            &["OverflowError", "ArithmeticError", "Exception", "BaseException"],
            &["ZeroDivisionError", "ArithmeticError", "Exception", "BaseException"],
            &["AssertionError", "Exception", "BaseException"],
            &["AttributeError", "Exception", "BaseException"],
            &["BufferError", "Exception", "BaseException"],
            &["EOFError", "Exception", "BaseException"],
            &["ImportError", "Exception", "BaseException"],
            &["ModuleNotFoundError", "ImportError", "Exception", "BaseException"],
            &["LookupError", "Exception", "BaseException"],
            &["IndexError", "LookupError", "Exception", "BaseException"],
            &["KeyError", "LookupError", "Exception", "BaseException"],
            &["MemoryError", "Exception", "BaseException"],
            &["NameError", "Exception", "BaseException"],
            &["UnboundLocalError", "NameError", "Exception", "BaseException"],
            &["OSError", "Exception", "BaseException"],
            &["BlockingIOError", "OSError", "Exception", "BaseException"],
            &["ChildProcessError", "OSError", "Exception", "BaseException"],
            &["ConnectionError", "OSError", "Exception", "BaseException"],
            &["BrokenPipeError", "ConnectionError", "OSError", "Exception", "BaseException"],
            &["ConnectionAbortedError", "ConnectionError", "OSError", "Exception", "BaseException"],
            &["ConnectionRefusedError", "ConnectionError", "OSError", "Exception", "BaseException"],
            &["ConnectionResetError", "ConnectionError", "OSError", "Exception", "BaseException"],
            &["FileExistsError", "OSError", "Exception", "BaseException"],
            &["FileNotFoundError", "OSError", "Exception", "BaseException"],
            &["InterruptedError", "OSError", "Exception", "BaseException"],
            &["IsADirectoryError", "OSError", "Exception", "BaseException"],
            &["NotADirectoryError", "OSError", "Exception", "BaseException"],
            &["PermissionError", "OSError", "Exception", "BaseException"],
            &["ProcessLookupError", "OSError", "Exception", "BaseException"],
            &["TimeoutError", "OSError", "Exception", "BaseException"],
            &["ReferenceError", "Exception", "BaseException"],
            &["RuntimeError", "Exception", "BaseException"],
            &["NotImplementedError", "RuntimeError", "Exception", "BaseException"],
            &["RecursionError", "RuntimeError", "Exception", "BaseException"],
            &["SyntaxError", "Exception", "BaseException"],
            &["IndentationError", "SyntaxError", "Exception", "BaseException"],
            &["TabError", "IndentationError", "SyntaxError", "Exception", "BaseException"],
            &["SystemError", "Exception", "BaseException"],
            &["TypeError", "Exception", "BaseException"],
            &["ValueError", "Exception", "BaseException"],
            &["UnicodeError", "ValueError", "Exception", "BaseException"],
            &["UnicodeDecodeError", "UnicodeError", "ValueError", "Exception", "BaseException"],
            &["UnicodeEncodeError", "UnicodeError", "ValueError", "Exception", "BaseException"],
            &["UnicodeTranslateError", "UnicodeError", "ValueError", "Exception", "BaseException"],
        ];
        chains
            .iter()
            .map(|chain| (chain[0], chain.to_vec()))
            .collect()
    })
}

/// Records classes deriving from known exceptions so later `try`
/// statements can reason about them. Reports nothing itself.
fn exception_defs(tree: &Tree, node: NodeId, db: &mut HookDb) -> Verdict {
    let Some(name) = tree.name(node) else {
        return Verdict::Miss;
    };
    let base_names: Vec<String> = tree
        .field(node, Field::Bases)
        .filter_map(|base| tree.name(base).map(str::to_owned))
        .collect();

    let defs = db.slot_mut::<UserExceptions>(EXCEPTIONS_KEY);
    let mut chain = vec![name.to_owned()];
    let mut derived = false;
    for base in &base_names {
        if let Some(ancestors) = builtin_exceptions().get(base.as_str()) {
            derived = true;
            chain.extend(ancestors.iter().map(|a| (*a).to_owned()));
        } else if let Some(ancestors) = defs.classes.get(base).cloned() {
            derived = true;
            chain.extend(ancestors);
        }
    }
    if derived {
        defs.classes.insert(name.to_owned(), chain);
    }
    Verdict::Miss
}

/// An `except` clause whose exception is already covered by an
/// earlier clause can never run.
fn unreachable_except(tree: &Tree, node: NodeId, db: &mut HookDb) -> Verdict {
    let mut seen: Vec<&str> = Vec::new();
    let user = db.slot_mut::<UserExceptions>(EXCEPTIONS_KEY);
    for handler in tree.field(node, Field::Handlers) {
        let Some(exc_type) = tree.field_one(handler, Field::Type) else {
            continue;
        };
        if tree.kind(exc_type) != NodeKind::Name {
            // Tuples and dotted names are out of scope for this check.
            return Verdict::Miss;
        }
        let Some(name) = tree.name(exc_type) else {
            return Verdict::Miss;
        };
        let covered = if let Some(chain) = builtin_exceptions().get(name) {
            chain.iter().any(|ancestor| seen.contains(ancestor))
        } else if let Some(chain) = user.classes.get(name) {
            chain.iter().any(|ancestor| seen.contains(&ancestor.as_str()))
        } else {
            // Unknown exception name: give up rather than guess.
            return Verdict::Miss;
        };
        if covered {
            return Verdict::Hit;
        }
        seen.push(name);
    }
    Verdict::Miss
}

#[cfg(test)]
mod tests {
    use super::*;
    use ocelint_parser::parse_module;

    fn first_stmt(tree: &Tree) -> NodeId {
        let root = tree.root().unwrap();
        tree.field(root, Field::Body).next().unwrap()
    }

    #[test]
    fn mutable_defaults_are_flagged() {
        let tree = parse_module("def f(x, y={}):\n    pass\n").unwrap();
        let mut db = HookDb::new();
        let verdict = default_mutable_arg(&tree, first_stmt(&tree), &mut db);
        assert!(matches!(verdict, Verdict::HitAt(_)));
    }

    #[test]
    fn immutable_defaults_pass() {
        let tree = parse_module("def f(x=1, y=()):\n    pass\n").unwrap();
        let mut db = HookDb::new();
        let verdict = default_mutable_arg(&tree, first_stmt(&tree), &mut db);
        assert_eq!(verdict, Verdict::Miss);
    }

    #[test]
    fn exception_ancestries_accumulate() {
        let source = "\
class AppError(Exception):
    pass

class TimeoutAppError(AppError):
    pass
";
        let tree = parse_module(source).unwrap();
        let mut db = HookDb::new();
        let root = tree.root().unwrap();
        for class in tree.field(root, Field::Body).collect::<Vec<_>>() {
            exception_defs(&tree, class, &mut db);
        }
        let defs = db.slot::<UserExceptions>(EXCEPTIONS_KEY).unwrap();
        let chain = &defs.classes["TimeoutAppError"];
        assert!(chain.contains(&"AppError".to_owned()));
        assert!(chain.contains(&"Exception".to_owned()));
        assert!(chain.contains(&"BaseException".to_owned()));
    }

    #[test]
    fn unknown_exception_names_abort_the_check() {
        let source = "\
try:
    pass
except SomethingCustom:
    pass
except SomethingCustom:
    pass
";
        let tree = parse_module(source).unwrap();
        let mut db = HookDb::new();
        let verdict = unreachable_except(&tree, first_stmt(&tree), &mut db);
        assert_eq!(verdict, Verdict::Miss);
    }

    #[test]
    fn shadowed_handlers_are_unreachable() {
        let source = "\
try:
    pass
except Exception:
    pass
except ValueError:
    pass
";
        let tree = parse_module(source).unwrap();
        let mut db = HookDb::new();
        let verdict = unreachable_except(&tree, first_stmt(&tree), &mut db);
        assert_eq!(verdict, Verdict::Hit);
    }

    #[test]
    fn distinct_branches_are_reachable() {
        let source = "\
try:
    pass
except ValueError:
    pass
except KeyError:
    pass
";
        let tree = parse_module(source).unwrap();
        let mut db = HookDb::new();
        let verdict = unreachable_except(&tree, first_stmt(&tree), &mut db);
        assert_eq!(verdict, Verdict::Miss);
    }
}
