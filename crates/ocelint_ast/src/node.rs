//! Node definition.
//!
//! A [`Node`] is one element of the syntax tree: a [`NodeKind`]
//! discriminant, an optional [`Span`], and an ordered list of children
//! tagged with the syntactic role ([`Field`]) they fill on their
//! parent. Some roles are singular (a `For` has one `Target`), some
//! are sequences (a `Try` has many `Handlers`); the tree accessors
//! expose both views.

use serde::Serialize;

use crate::{Span, tree::NodeId};

/// Node type tags, mirroring the shape of a Python syntax tree.
///
/// Hook dispatch is keyed by this enum, so every kind a hook can
/// register for is listed here explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum NodeKind {
    // Top level
    Module,

    // Statements
    FunctionDef,
    ClassDef,
    For,
    While,
    If,
    Try,
    ExceptHandler,
    Return,
    Raise,
    Break,
    Continue,
    Pass,
    Import,
    Assign,
    Expr,

    // Expressions
    Call,
    Keyword,
    Attribute,
    Subscript,
    Name,
    Tuple,
    List,
    Dict,
    Set,
    Constant,
    Yield,
    YieldFrom,
    GeneratorExp,
    Comprehension,
    Lambda,
    BinOp,
    UnaryOp,
    BoolOp,
    Compare,

    // Function signature
    Arguments,
    Arg,
}

/// The syntactic role a child plays on its parent node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Field {
    Body,
    OrElse,
    FinalBody,
    Handlers,
    Type,
    Target,
    Targets,
    Iter,
    Test,
    Value,
    Func,
    Args,
    Keywords,
    Bases,
    Elts,
    Keys,
    Values,
    Slice,
    Defaults,
    Annotation,
    Elt,
    Generators,
    Left,
    Right,
    Comparators,
    Operand,
}

/// The load/store context of an expression.
///
/// Assignment and loop targets are stores; everything else loads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum ExprContext {
    #[default]
    Load,
    Store,
}

/// A literal constant value.
///
/// Value and type are carried together so that `True`, `1` and `1.0`
/// never compare equal to each other.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ConstValue {
    None,
    Ellipsis,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl ConstValue {
    /// Creates a string constant.
    pub fn str(value: impl Into<String>) -> Self {
        Self::Str(value.into())
    }
}

/// A node in the syntax tree.
#[derive(Debug, Clone)]
pub struct Node {
    /// The type of this node.
    pub kind: NodeKind,

    /// Source span, if the node corresponds to real source text.
    /// Synthetic nodes built by tests or transformers may have none.
    pub span: Option<Span>,

    /// Identifier payload: `Name` ids, `FunctionDef`/`ClassDef`/`Arg`
    /// names, `Attribute` attributes, `Keyword` argument names.
    pub name: Option<String>,

    /// Constant payload, for `Constant` nodes.
    pub value: Option<ConstValue>,

    /// Expression context.
    pub ctx: ExprContext,

    /// Back-reference to the syntactic parent. Unset until a tree
    /// transformer links parents, before any node hook runs.
    pub(crate) parent: Option<NodeId>,

    /// Ordered, role-tagged children.
    pub(crate) children: Vec<(Field, NodeId)>,
}

impl Node {
    /// Creates a bare node of the given kind.
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            span: None,
            name: None,
            value: None,
            ctx: ExprContext::Load,
            parent: None,
            children: Vec::new(),
        }
    }

    /// Sets the source span.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Sets the identifier payload.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the constant payload.
    pub fn with_value(mut self, value: ConstValue) -> Self {
        self.value = Some(value);
        self
    }

    /// Sets the expression context.
    pub fn with_ctx(mut self, ctx: ExprContext) -> Self {
        self.ctx = ctx;
        self
    }
}
