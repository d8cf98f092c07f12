//! # ocelint_ast
//!
//! Syntax tree data model for ocelint.
//!
//! This crate provides:
//! - [`NodeKind`]: the node type tag used for hook dispatch
//! - [`Node`]: a tree element with role-tagged children and an
//!   optional source [`Span`]
//! - [`Tree`]: an index arena owning every node of one source unit,
//!   with pre-order traversal and parent back-references
//!
//! Nodes are addressed through [`NodeId`] handles. Inspections never
//! hold references into the arena; they look nodes up by id, which
//! keeps the tree freely mutable by tree transformers before the walk
//! begins.

mod node;
mod source;
mod span;
mod tree;

pub use node::{ConstValue, ExprContext, Field, Node, NodeKind};
pub use source::first_annotation_line;
pub use span::Span;
pub use tree::{NodeId, Tree, Walk};
