//! Typed projections of single nodes.
//!
//! Config trees are loosely typed and most nodes are optional, so accessors
//! report a mismatch as `None` instead of failing.

use crate::node::{Atom, DataList, Node};

/// Conversion from a borrowed node into a typed value.
pub trait FromNode<'a>: Sized {
    /// Project `node`, or `None` when it holds another type.
    fn from_node(node: &'a Node) -> Option<Self>;
}

impl<'a> FromNode<'a> for i32 {
    fn from_node(node: &'a Node) -> Option<Self> {
        match node {
            Node::Atom(Atom::Int(value)) => Some(*value),
            _ => None,
        }
    }
}

impl<'a> FromNode<'a> for i64 {
    fn from_node(node: &'a Node) -> Option<Self> {
        i32::from_node(node).map(i64::from)
    }
}

impl<'a> FromNode<'a> for f32 {
    fn from_node(node: &'a Node) -> Option<Self> {
        match node {
            Node::Atom(Atom::Float(value)) => Some(*value),
            #[allow(clippy::cast_precision_loss)]
            Node::Atom(Atom::Int(value)) => Some(*value as f32),
            _ => None,
        }
    }
}

impl<'a> FromNode<'a> for f64 {
    fn from_node(node: &'a Node) -> Option<Self> {
        match node {
            Node::Atom(Atom::Float(value)) => Some(f64::from(*value)),
            Node::Atom(Atom::Int(value)) => Some(f64::from(*value)),
            _ => None,
        }
    }
}

impl<'a> FromNode<'a> for bool {
    fn from_node(node: &'a Node) -> Option<Self> {
        match node {
            Node::Symbol(name) if name.eq_ignore_ascii_case("true") => Some(true),
            Node::Symbol(name) if name.eq_ignore_ascii_case("false") => Some(false),
            Node::Atom(Atom::Int(value)) => Some(*value != 0),
            _ => None,
        }
    }
}

/// Symbols and strings by reference.
impl<'a> FromNode<'a> for &'a str {
    fn from_node(node: &'a Node) -> Option<Self> {
        match node {
            Node::Symbol(name) => Some(name),
            Node::Atom(Atom::String(value)) => Some(value),
            _ => None,
        }
    }
}

/// String content for string atoms; the textual form for every other leaf.
impl<'a> FromNode<'a> for String {
    fn from_node(node: &'a Node) -> Option<Self> {
        match node {
            Node::List(_) => None,
            other => Some(other.text().into_owned()),
        }
    }
}

impl<'a> FromNode<'a> for &'a DataList {
    fn from_node(node: &'a Node) -> Option<Self> {
        node.as_list()
    }
}
