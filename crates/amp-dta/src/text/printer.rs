//! Text serialization.

use std::fmt::{self, Write};

use super::lexer::is_delimiter;
use super::{UNHANDLED_KEYWORD, lexes_as_non_symbol};
use crate::node::{Atom, DataList, Node};

/// Serialize a root list to text.
///
/// Each root child goes on its own line. Lists holding only leaves print on
/// one line; lists with nested lists put every nested child on its own
/// tab-indented line.
#[must_use]
pub fn serialize_text(root: &DataList) -> String {
    let mut out = String::new();
    for child in &root.children {
        write_block(&mut out, child, 0);
        out.push('\n');
    }
    out
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push('\t');
    }
}

fn write_block(out: &mut String, node: &Node, depth: usize) {
    let Node::List(list) = node else {
        // Writing into a String cannot fail.
        let _ = write_leaf(out, node);
        return;
    };
    let (open, close) = list.kind.brackets();
    out.push(open);
    let split = list
        .children
        .iter()
        .position(|child| matches!(child, Node::List(_)))
        .unwrap_or(list.children.len());
    for (index, leaf) in list.children[..split].iter().enumerate() {
        if index > 0 {
            out.push(' ');
        }
        let _ = write_leaf(out, leaf);
    }
    if split < list.children.len() {
        for child in &list.children[split..] {
            out.push('\n');
            indent(out, depth + 1);
            write_block(out, child, depth + 1);
        }
        out.push('\n');
        indent(out, depth);
    }
    out.push(close);
}

/// Write any node on a single line.
fn write_inline<W: Write>(out: &mut W, node: &Node) -> fmt::Result {
    match node {
        Node::List(list) => {
            let (open, close) = list.kind.brackets();
            out.write_char(open)?;
            for (index, child) in list.children.iter().enumerate() {
                if index > 0 {
                    out.write_char(' ')?;
                }
                write_inline(out, child)?;
            }
            out.write_char(close)
        }
        leaf => write_leaf(out, leaf),
    }
}

fn write_leaf<W: Write>(out: &mut W, node: &Node) -> fmt::Result {
    match node {
        Node::List(_) => write_inline(out, node),
        Node::Symbol(name) => write_symbol(out, name),
        Node::Atom(atom) => match atom {
            Atom::Int(value) => write!(out, "{value}"),
            Atom::Float(value) => out.write_str(&format_float(*value)),
            Atom::String(value) => write_string(out, value),
            Atom::Variable(name) => write!(out, "${name}"),
            Atom::Include(arg) => write_directive(out, "include", arg),
            Atom::Merge(arg) => write_directive(out, "merge", arg),
            Atom::Define(arg) => write_directive(out, "define", arg),
            Atom::IfDef(arg) => write_directive(out, "ifdef", arg),
            Atom::IfNDef(arg) => write_directive(out, "ifndef", arg),
            Atom::Undef(arg) => write_directive(out, "undef", arg),
            Atom::Else => out.write_str("#else"),
            Atom::EndIf => out.write_str("#endif"),
            Atom::Autorun => out.write_str("#autorun"),
            Atom::Unhandled => out.write_str(UNHANDLED_KEYWORD),
        },
    }
}

/// Float text that always reads back as a float.
///
/// Non-finite values print as `nan`, `inf` or `-inf`, which read back as
/// symbols.
fn format_float(value: f32) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let text = value.to_string();
    if text.contains('.') {
        text
    } else {
        format!("{text}.0")
    }
}

fn needs_quotes(name: &str) -> bool {
    name.is_empty()
        || name.starts_with('#')
        || name.starts_with("/*")
        || name.chars().any(is_delimiter)
        || lexes_as_non_symbol(name)
}

fn write_symbol<W: Write>(out: &mut W, name: &str) -> fmt::Result {
    if !needs_quotes(name) {
        return out.write_str(name);
    }
    out.write_char('\'')?;
    for c in name.chars() {
        match c {
            '\'' => out.write_str("\\'")?,
            '\\' => out.write_str("\\\\")?,
            c => out.write_char(c)?,
        }
    }
    out.write_char('\'')
}

fn write_string<W: Write>(out: &mut W, value: &str) -> fmt::Result {
    out.write_char('"')?;
    for c in value.chars() {
        match c {
            '"' => out.write_str("\\q")?,
            '\\' => out.write_str("\\\\")?,
            '\n' => out.write_str("\\n")?,
            c => out.write_char(c)?,
        }
    }
    out.write_char('"')
}

fn write_directive<W: Write>(out: &mut W, name: &str, arg: &str) -> fmt::Result {
    write!(out, "#{name} ")?;
    // Arguments are read as raw words, so only delimiters force quoting.
    if arg.is_empty() || arg.chars().any(is_delimiter) {
        write_symbol(out, arg)
    } else {
        out.write_str(arg)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_inline(f, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::parse_text;

    #[test]
    fn floats_keep_a_decimal_point() {
        assert_eq!(format_float(1.0), "1.0");
        assert_eq!(format_float(-0.25), "-0.25");
        assert_eq!(format_float(1e20), "100000000000000000000.0");
        assert_eq!(format_float(f32::NAN), "nan");
    }

    #[test]
    fn quotes_symbols_that_would_not_reparse() {
        let root = DataList::new()
            .with(Node::symbol("plain"))
            .with(Node::symbol("has space"))
            .with(Node::symbol("42"))
            .with(Node::symbol("it's"))
            .with(Node::symbol(""))
            .with(Node::symbol("$x"));
        let text = serialize_text(&root);
        assert_eq!(text, "plain\n'has space'\n'42'\n'it\\'s'\n''\n'$x'\n");
        assert_eq!(parse_text(&text).expect("reparse"), root);
    }

    #[test]
    fn escapes_strings() {
        let node = Node::string("a \"b\"\nc\\");
        assert_eq!(node.to_string(), r#""a \qb\q\nc\\""#);
    }

    #[test]
    fn inline_display() {
        let node = Node::List(
            DataList::named("tracks").with(DataList::named("drum").with(Node::int(0))),
        );
        assert_eq!(node.to_string(), "(tracks (drum 0))");
    }
}
