//! # ocelint_parser
//!
//! Parses Python source into [`ocelint_ast::Tree`] values.
//!
//! The grammar is a deliberate subset: everything the built-in
//! inspections look at is represented faithfully (definitions, control
//! flow, try/except, assignments, calls, comprehensions, literals);
//! constructs outside that subset are either consumed opaquely
//! (imports, decorators, slice details) or rejected with a
//! [`ParseError`] carrying the offending position.
//!
//! ## Example
//!
//! ```rust
//! use ocelint_parser::parse_module;
//!
//! let tree = parse_module("def f(x=[]):\n    pass\n").unwrap();
//! assert!(tree.root().is_some());
//! ```

mod error;
mod lexer;
mod parser;

pub use error::ParseError;
pub use parser::parse_module;

#[cfg(test)]
mod tests {
    use super::*;
    use ocelint_ast::{ConstValue, ExprContext, Field, NodeKind};
    use pretty_assertions::assert_eq;

    #[test]
    fn function_with_mutable_default() {
        let tree = parse_module("def f(x=[]):\n    pass\n").unwrap();
        let module = tree.root().unwrap();
        let func = tree.field_one(module, Field::Body).unwrap();
        assert_eq!(tree.kind(func), NodeKind::FunctionDef);
        assert_eq!(tree.name(func), Some("f"));

        let args = tree.field_one(func, Field::Args).unwrap();
        let defaults: Vec<_> = tree.field(args, Field::Defaults).collect();
        assert_eq!(defaults.len(), 1);
        assert_eq!(tree.kind(defaults[0]), NodeKind::List);
    }

    #[test]
    fn for_loop_with_yield_body() {
        let tree = parse_module("def g(y):\n    for x in y:\n        yield x\n").unwrap();
        let module = tree.root().unwrap();
        let func = tree.field_one(module, Field::Body).unwrap();
        let for_stmt = tree.field_one(func, Field::Body).unwrap();
        assert_eq!(tree.kind(for_stmt), NodeKind::For);

        let target = tree.field_one(for_stmt, Field::Target).unwrap();
        assert_eq!(tree.kind(target), NodeKind::Name);
        assert_eq!(tree.node(target).ctx, ExprContext::Store);

        let stmt = tree.field_one(for_stmt, Field::Body).unwrap();
        assert_eq!(tree.kind(stmt), NodeKind::Expr);
        let yielded = tree.field_one(stmt, Field::Value).unwrap();
        assert_eq!(tree.kind(yielded), NodeKind::Yield);
    }

    #[test]
    fn try_with_handlers_and_finally() {
        let source = "\
try:
    risky()
except ValueError as exc:
    handle(exc)
except Exception:
    pass
finally:
    cleanup()
";
        let tree = parse_module(source).unwrap();
        let module = tree.root().unwrap();
        let try_stmt = tree.field_one(module, Field::Body).unwrap();
        assert_eq!(tree.kind(try_stmt), NodeKind::Try);

        let handlers: Vec<_> = tree.field(try_stmt, Field::Handlers).collect();
        assert_eq!(handlers.len(), 2);
        assert_eq!(tree.name(handlers[0]), Some("exc"));
        let first_type = tree.field_one(handlers[0], Field::Type).unwrap();
        assert_eq!(tree.name(first_type), Some("ValueError"));

        let final_body: Vec<_> = tree.field(try_stmt, Field::FinalBody).collect();
        assert_eq!(final_body.len(), 1);
    }

    #[test]
    fn class_with_bases_spans_its_body() {
        let source = "class Broken(ValueError):\n    pass\n\nx = 1\n";
        let tree = parse_module(source).unwrap();
        let module = tree.root().unwrap();
        let class = tree.field(module, Field::Body).next().unwrap();
        assert_eq!(tree.kind(class), NodeKind::ClassDef);
        let span = tree.span(class).unwrap();
        assert_eq!((span.start_line, span.end_line), (1, 2));

        let base = tree.field_one(class, Field::Bases).unwrap();
        assert_eq!(tree.name(base), Some("ValueError"));
    }

    #[test]
    fn call_with_generator_expression() {
        let tree = parse_module("ops = list(b8(token) for token in tokens)\n").unwrap();
        let module = tree.root().unwrap();
        let assign = tree.field_one(module, Field::Body).unwrap();
        assert_eq!(tree.kind(assign), NodeKind::Assign);

        let call = tree.field_one(assign, Field::Value).unwrap();
        assert_eq!(tree.kind(call), NodeKind::Call);
        let arg = tree.field(call, Field::Args).next().unwrap();
        assert_eq!(tree.kind(arg), NodeKind::GeneratorExp);
    }

    #[test]
    fn call_with_keyword_arguments() {
        let tree = parse_module("f(1, key=value)\n").unwrap();
        let module = tree.root().unwrap();
        let stmt = tree.field_one(module, Field::Body).unwrap();
        let call = tree.field_one(stmt, Field::Value).unwrap();
        assert_eq!(tree.field(call, Field::Args).count(), 1);
        let keyword = tree.field_one(call, Field::Keywords).unwrap();
        assert_eq!(tree.kind(keyword), NodeKind::Keyword);
        assert_eq!(tree.name(keyword), Some("key"));
    }

    #[test]
    fn tuple_assignment_marks_stores() {
        let tree = parse_module("a, b = b, a\n").unwrap();
        let module = tree.root().unwrap();
        let assign = tree.field_one(module, Field::Body).unwrap();
        let target = tree.field_one(assign, Field::Targets).unwrap();
        assert_eq!(tree.kind(target), NodeKind::Tuple);
        for elt in tree.field(target, Field::Elts) {
            assert_eq!(tree.node(elt).ctx, ExprContext::Store);
        }
        let value = tree.field_one(assign, Field::Value).unwrap();
        for elt in tree.field(value, Field::Elts) {
            assert_eq!(tree.node(elt).ctx, ExprContext::Load);
        }
    }

    #[test]
    fn subscript_with_union_none() {
        let tree = parse_module("def f(x: Union[str, None]):\n    pass\n").unwrap();
        let module = tree.root().unwrap();
        let func = tree.field_one(module, Field::Body).unwrap();
        let args = tree.field_one(func, Field::Args).unwrap();
        let param = tree.field(args, Field::Args).next().unwrap();
        let annotation = tree.field_one(param, Field::Annotation).unwrap();
        assert_eq!(tree.kind(annotation), NodeKind::Subscript);

        let slice = tree.field_one(annotation, Field::Slice).unwrap();
        assert_eq!(tree.kind(slice), NodeKind::Tuple);
        let elts: Vec<_> = tree.field(slice, Field::Elts).collect();
        assert_eq!(elts.len(), 2);
        assert_eq!(tree.node(elts[1]).value, Some(ConstValue::None));
    }

    #[test]
    fn constants_keep_value_and_type() {
        let tree = parse_module("a = True\nb = 1\nc = 1.0\nd = 'x'\n").unwrap();
        let module = tree.root().unwrap();
        let values: Vec<ConstValue> = tree
            .field(module, Field::Body)
            .map(|assign| {
                let value = tree.field_one(assign, Field::Value).unwrap();
                tree.node(value).value.clone().unwrap()
            })
            .collect();
        assert_eq!(
            values,
            vec![
                ConstValue::Bool(true),
                ConstValue::Int(1),
                ConstValue::Float(1.0),
                ConstValue::str("x"),
            ]
        );
    }

    #[test]
    fn syntax_error_reports_position() {
        let err = parse_module("def f(:\n    pass\n").unwrap_err();
        assert_eq!(err.line, 1);
    }

    #[test]
    fn elif_chain_nests_in_orelse() {
        let source = "if a:\n    x = 1\nelif b:\n    x = 2\nelse:\n    x = 3\n";
        let tree = parse_module(source).unwrap();
        let module = tree.root().unwrap();
        let if_stmt = tree.field_one(module, Field::Body).unwrap();
        let nested = tree.field_one(if_stmt, Field::OrElse).unwrap();
        assert_eq!(tree.kind(nested), NodeKind::If);
        assert_eq!(tree.field(nested, Field::OrElse).count(), 1);
    }

    #[test]
    fn imports_are_opaque_statements() {
        let tree = parse_module("import os\nfrom sys import path\n").unwrap();
        let module = tree.root().unwrap();
        let kinds: Vec<NodeKind> = tree
            .field(module, Field::Body)
            .map(|stmt| tree.kind(stmt))
            .collect();
        assert_eq!(kinds, vec![NodeKind::Import, NodeKind::Import]);
    }

    #[test]
    fn super_call_inside_method() {
        let source = "\
class C(Base):
    def __init__(self):
        super(C, self).__init__()
";
        let tree = parse_module(source).unwrap();
        let module = tree.root().unwrap();
        let class = tree.field_one(module, Field::Body).unwrap();
        let method = tree.field_one(class, Field::Body).unwrap();
        assert_eq!(tree.kind(method), NodeKind::FunctionDef);
        let stmt = tree.field_one(method, Field::Body).unwrap();
        let outer_call = tree.field_one(stmt, Field::Value).unwrap();
        assert_eq!(tree.kind(outer_call), NodeKind::Call);

        // func of the outer call is `super(C, self).__init__`
        let attribute = tree.field_one(outer_call, Field::Func).unwrap();
        assert_eq!(tree.kind(attribute), NodeKind::Attribute);
        let inner_call = tree.field_one(attribute, Field::Value).unwrap();
        assert_eq!(tree.kind(inner_call), NodeKind::Call);
        let super_name = tree.field_one(inner_call, Field::Func).unwrap();
        assert_eq!(tree.name(super_name), Some("super"));
        assert_eq!(tree.field(inner_call, Field::Args).count(), 2);
    }
}
