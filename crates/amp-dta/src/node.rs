//! In-memory data tree.
//!
//! A tree is a [`DataList`] of [`Node`]s. Lists whose first child is a symbol
//! act as named records; lookups compare the textual form of a chosen child
//! and return the first (or every) matching sibling in document order.

use std::borrow::Cow;

use crate::access::FromNode;

/// Bracket style of a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListKind {
    /// `( ... )`
    #[default]
    Array,
    /// `{ ... }`
    Command,
    /// `[ ... ]`
    Property,
}

impl ListKind {
    /// Opening and closing bracket characters.
    #[must_use]
    pub const fn brackets(self) -> (char, char) {
        match self {
            Self::Array => ('(', ')'),
            Self::Command => ('{', '}'),
            Self::Property => ('[', ']'),
        }
    }
}

/// Leaf values other than bare symbols.
#[derive(Debug, Clone, PartialEq)]
pub enum Atom {
    /// 32-bit signed integer.
    Int(i32),
    /// 32-bit float.
    Float(f32),
    /// Quoted string.
    String(String),
    /// `$name` variable reference.
    Variable(String),
    /// `#include path`
    Include(String),
    /// `#merge path`
    Merge(String),
    /// `#define NAME`
    Define(String),
    /// `#ifdef NAME`
    IfDef(String),
    /// `#ifndef NAME`
    IfNDef(String),
    /// `#undef NAME`
    Undef(String),
    /// `#else`
    Else,
    /// `#endif`
    EndIf,
    /// `#autorun`
    Autorun,
    /// `kDataUnhandled`
    Unhandled,
}

/// One element of a data tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Nested list.
    List(DataList),
    /// Bare identifier.
    Symbol(String),
    /// Any other leaf.
    Atom(Atom),
}

impl Node {
    /// Symbol node.
    pub fn symbol(name: impl Into<String>) -> Self {
        Self::Symbol(name.into())
    }

    /// Quoted string node.
    pub fn string(value: impl Into<String>) -> Self {
        Self::Atom(Atom::String(value.into()))
    }

    /// Integer node.
    #[must_use]
    pub const fn int(value: i32) -> Self {
        Self::Atom(Atom::Int(value))
    }

    /// Float node.
    #[must_use]
    pub const fn float(value: f32) -> Self {
        Self::Atom(Atom::Float(value))
    }

    /// `#include` node.
    pub fn include(path: impl Into<String>) -> Self {
        Self::Atom(Atom::Include(path.into()))
    }

    /// Borrow the list, if this node is one.
    #[must_use]
    pub fn as_list(&self) -> Option<&DataList> {
        match self {
            Self::List(list) => Some(list),
            _ => None,
        }
    }

    /// Mutably borrow the list, if this node is one.
    pub fn as_list_mut(&mut self) -> Option<&mut DataList> {
        match self {
            Self::List(list) => Some(list),
            _ => None,
        }
    }

    /// Textual form used for name matching.
    ///
    /// Symbols yield their name and strings their unquoted content; every
    /// other node yields its single-line text serialization.
    #[must_use]
    pub fn text(&self) -> Cow<'_, str> {
        match self {
            Self::Symbol(name) => Cow::Borrowed(name),
            Self::Atom(Atom::String(value)) => Cow::Borrowed(value),
            other => Cow::Owned(other.to_string()),
        }
    }
}

impl From<DataList> for Node {
    fn from(list: DataList) -> Self {
        Self::List(list)
    }
}

impl From<Atom> for Node {
    fn from(atom: Atom) -> Self {
        Self::Atom(atom)
    }
}

/// Ordered list of nodes.
///
/// `line` and `id` mirror the binary list header. They are carried through
/// binary reads and writes unchanged and ignored by equality.
#[derive(Debug, Clone, Default)]
pub struct DataList {
    pub kind: ListKind,
    pub children: Vec<Node>,
    pub line: u32,
    pub id: u16,
}

impl PartialEq for DataList {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.children == other.children
    }
}

impl DataList {
    /// Empty array.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty list of the given kind.
    #[must_use]
    pub fn with_kind(kind: ListKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    /// Array with the given children.
    #[must_use]
    pub fn from_children(children: Vec<Node>) -> Self {
        Self {
            children,
            ..Self::default()
        }
    }

    /// Array whose first child is the symbol `name`.
    pub fn named(name: impl Into<String>) -> Self {
        Self::from_children(vec![Node::symbol(name)])
    }

    /// Append a child and return `self` (builder style).
    #[must_use]
    pub fn with(mut self, node: impl Into<Node>) -> Self {
        self.children.push(node.into());
        self
    }

    /// Append a child.
    pub fn push(&mut self, node: impl Into<Node>) {
        self.children.push(node.into());
    }

    /// Number of children.
    #[must_use]
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Whether the list has no children.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Child at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Node> {
        self.children.get(index)
    }

    /// Textual form of the child at `index`.
    #[must_use]
    pub fn child_text(&self, index: usize) -> Option<Cow<'_, str>> {
        self.children.get(index).map(Node::text)
    }

    /// Name of a named record (textual form of child 0).
    #[must_use]
    pub fn name(&self) -> Option<Cow<'_, str>> {
        self.child_text(0)
    }

    /// Typed view of the child at `index`.
    ///
    /// Returns `None` when the child is missing or of another type.
    #[must_use]
    pub fn child<'a, T: FromNode<'a>>(&'a self, index: usize) -> Option<T> {
        self.children.get(index).and_then(T::from_node)
    }

    /// Typed view of the child at `index`, or the type's default.
    #[must_use]
    pub fn child_or_default<'a, T: FromNode<'a> + Default>(&'a self, index: usize) -> T {
        self.child(index).unwrap_or_default()
    }

    /// Child lists whose child at `index` has the textual form `value`.
    pub fn find_by_child<'s, 'v>(
        &'s self,
        value: &'v str,
        index: usize,
    ) -> impl Iterator<Item = &'s DataList> {
        self.children
            .iter()
            .filter_map(Node::as_list)
            .filter(move |list| list.child_text(index).is_some_and(|text| text == value))
    }

    /// Mutable variant of [`find_by_child`](Self::find_by_child).
    pub fn find_by_child_mut<'s, 'v>(
        &'s mut self,
        value: &'v str,
        index: usize,
    ) -> impl Iterator<Item = &'s mut DataList> {
        self.children
            .iter_mut()
            .filter_map(Node::as_list_mut)
            .filter(move |list| list.child_text(index).is_some_and(|text| text == value))
    }

    /// Child lists whose first child has the textual form `value`.
    pub fn find_by_first_child<'s, 'v>(
        &'s self,
        value: &'v str,
    ) -> impl Iterator<Item = &'s DataList> {
        self.find_by_child(value, 0)
    }

    /// First child record named `name`.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&DataList> {
        self.find_by_child(name, 0).next()
    }

    /// First child record named `name`, mutably.
    pub fn find_mut(&mut self, name: &str) -> Option<&mut DataList> {
        self.find_by_child_mut(name, 0).next()
    }

    /// Follow a chain of record names, taking the first match at each level.
    #[must_use]
    pub fn find_path(&self, path: &[&str]) -> Option<&DataList> {
        path.iter().try_fold(self, |list, name| list.find(name))
    }

    /// Mutable variant of [`find_path`](Self::find_path).
    pub fn find_path_mut(&mut self, path: &[&str]) -> Option<&mut DataList> {
        let mut current = self;
        for name in path {
            current = current.find_mut(name)?;
        }
        Some(current)
    }

    /// Remove child lists whose child at `index` has a textual form listed in
    /// `values`. Returns how many were removed.
    pub fn delete_matching(&mut self, index: usize, values: &[&str]) -> usize {
        let before = self.children.len();
        self.children.retain(|node| match node {
            Node::List(list) => !list
                .child_text(index)
                .is_some_and(|text| values.iter().any(|value| *value == text)),
            _ => true,
        });
        before - self.children.len()
    }

    /// Keep children `0..=index` and drop the rest.
    pub fn truncate_after(&mut self, index: usize) {
        self.children.truncate(index.saturating_add(1));
    }

    /// Replace the first child record named like `record`, or append it.
    pub fn upsert(&mut self, record: DataList) {
        let Some(name) = record.name().map(Cow::into_owned) else {
            self.children.push(Node::List(record));
            return;
        };
        match self.find_mut(&name) {
            Some(existing) => *existing = record,
            None => self.children.push(Node::List(record)),
        }
    }

    /// Remove every child record named `name`.
    pub fn remove_named(&mut self, name: &str) -> usize {
        self.delete_matching(0, &[name])
    }
}
