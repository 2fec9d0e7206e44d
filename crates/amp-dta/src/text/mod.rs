//! Text (`.dta`) form of data trees.
//!
//! The grammar is S-expression like: `( )`, `{ }` and `[ ]` lists, bare or
//! `'quoted'` symbols, integers, floats, `"strings"`, `$variables`,
//! preprocessor directives and `kDataUnhandled`. `;` line comments and
//! `/* */` block comments are skipped and not preserved.

mod lexer;
mod printer;

use crate::error::{DtaError, Result};
use crate::node::{Atom, DataList, Node};

use lexer::{Directive, Lexer, TokenKind};

pub use printer::serialize_text;

/// Keyword for the unhandled marker atom.
pub(crate) const UNHANDLED_KEYWORD: &str = "kDataUnhandled";

/// Parse the text form into a root list.
///
/// # Errors
///
/// Returns [`DtaError::Syntax`] with the 1-based line and column of the
/// offending token.
pub fn parse_text(source: &str) -> Result<DataList> {
    let mut lexer = Lexer::new(source);
    let mut root = DataList::new();
    // Open lists with the position of their opening bracket.
    let mut stack: Vec<(DataList, usize, usize)> = Vec::new();

    while let Some(token) = lexer.next_token()? {
        let node = match token.kind {
            TokenKind::Open(kind) => {
                stack.push((DataList::with_kind(kind), token.line, token.column));
                continue;
            }
            TokenKind::Close(kind) => {
                let Some((list, _, _)) = stack.pop() else {
                    return Err(DtaError::syntax(
                        token.line,
                        token.column,
                        format!("unexpected '{}'", kind.brackets().1),
                    ));
                };
                if list.kind != kind {
                    return Err(DtaError::syntax(
                        token.line,
                        token.column,
                        format!(
                            "expected '{}' but found '{}'",
                            list.kind.brackets().1,
                            kind.brackets().1
                        ),
                    ));
                }
                Node::List(list)
            }
            TokenKind::Word(word) => classify_word(&word, token.line, token.column)?,
            TokenKind::Quoted(name) => Node::Symbol(name),
            TokenKind::Str(value) => Node::string(value),
            TokenKind::Directive(directive) => Node::Atom(match directive {
                Directive::Include(path) => Atom::Include(path),
                Directive::Merge(path) => Atom::Merge(path),
                Directive::Define(name) => Atom::Define(name),
                Directive::IfDef(name) => Atom::IfDef(name),
                Directive::IfNDef(name) => Atom::IfNDef(name),
                Directive::Undef(name) => Atom::Undef(name),
                Directive::Else => Atom::Else,
                Directive::EndIf => Atom::EndIf,
                Directive::Autorun => Atom::Autorun,
            }),
        };
        match stack.last_mut() {
            Some((parent, _, _)) => parent.children.push(node),
            None => root.children.push(node),
        }
    }

    if let Some((list, line, column)) = stack.pop() {
        return Err(DtaError::syntax(
            line,
            column,
            format!("unclosed '{}'", list.kind.brackets().0),
        ));
    }
    Ok(root)
}

/// Parse UTF-8 text bytes.
pub fn parse_text_bytes(bytes: &[u8]) -> Result<DataList> {
    let source = std::str::from_utf8(bytes).map_err(|err| {
        let prefix = &bytes[..err.valid_up_to()];
        let line = prefix.iter().filter(|b| **b == b'\n').count() + 1;
        let column = prefix.iter().rev().take_while(|b| **b != b'\n').count() + 1;
        DtaError::syntax(line, column, "invalid UTF-8")
    })?;
    parse_text(source)
}

/// Numeric shape of an unquoted word.
enum Number {
    Int,
    Float,
}

/// Decide whether `word` has the shape of a number.
///
/// Shape: optional `-`, digits with at most one `.`, optional exponent.
fn number_shape(word: &str) -> Option<Number> {
    let body = word.strip_prefix('-').unwrap_or(word);
    let (mantissa, exponent) = match body.find(['e', 'E']) {
        Some(at) => (&body[..at], Some(&body[at + 1..])),
        None => (body, None),
    };
    let mut digits = 0usize;
    let mut dots = 0usize;
    for c in mantissa.chars() {
        match c {
            '0'..='9' => digits += 1,
            '.' => dots += 1,
            _ => return None,
        }
    }
    if digits == 0 || dots > 1 {
        return None;
    }
    if let Some(exponent) = exponent {
        let exponent = exponent
            .strip_prefix(['-', '+'])
            .unwrap_or(exponent);
        if exponent.is_empty() || !exponent.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        return Some(Number::Float);
    }
    Some(if dots == 1 { Number::Float } else { Number::Int })
}

/// Whether a bare word would be read back as something other than a symbol.
pub(crate) fn lexes_as_non_symbol(word: &str) -> bool {
    word == UNHANDLED_KEYWORD || word.starts_with('$') || number_shape(word).is_some()
}

fn classify_word(word: &str, line: usize, column: usize) -> Result<Node> {
    if word == UNHANDLED_KEYWORD {
        return Ok(Node::Atom(Atom::Unhandled));
    }
    if let Some(name) = word.strip_prefix('$') {
        return Ok(Node::Atom(Atom::Variable(name.to_string())));
    }
    match number_shape(word) {
        Some(Number::Int) => word
            .parse::<i32>()
            .map(Node::int)
            .map_err(|_| DtaError::syntax(line, column, format!("integer out of range: {word}"))),
        Some(Number::Float) => word
            .parse::<f32>()
            .map(Node::float)
            .map_err(|_| DtaError::syntax(line, column, format!("invalid float: {word}"))),
        None => Ok(Node::symbol(word)),
    }
}
