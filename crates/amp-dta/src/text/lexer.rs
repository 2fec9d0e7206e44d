//! Tokenizer for the text form.

use std::iter::Peekable;
use std::str::Chars;

use crate::error::{DtaError, Result};
use crate::node::ListKind;

/// Preprocessor directive as it appears after `#`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Directive {
    Include(String),
    Merge(String),
    Define(String),
    IfDef(String),
    IfNDef(String),
    Undef(String),
    Else,
    EndIf,
    Autorun,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    Open(ListKind),
    Close(ListKind),
    /// Unquoted word; classified by the parser.
    Word(String),
    /// `'quoted symbol'`
    Quoted(String),
    /// `"string"`
    Str(String),
    Directive(Directive),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub column: usize,
}

/// Characters that end an unquoted word.
pub(crate) fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || matches!(c, '(' | ')' | '[' | ']' | '{' | '}' | '"' | '\'' | ';')
}

pub(crate) struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        let source = source.strip_prefix('\u{feff}').unwrap_or(source);
        Self {
            chars: source.chars().peekable(),
            line: 1,
            column: 1,
        }
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    /// Second character ahead, without consuming anything.
    fn peek_second(&self) -> Option<char> {
        let mut ahead = self.chars.clone();
        ahead.next();
        ahead.next()
    }

    /// Skip whitespace and comments.
    fn skip_trivia(&mut self) -> Result<()> {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some(';') => {
                    while let Some(c) = self.bump() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                Some('/') if self.peek_second() == Some('*') => {
                    let (line, column) = (self.line, self.column);
                    self.bump();
                    self.bump();
                    let mut closed = false;
                    while let Some(c) = self.bump() {
                        if c == '*' && self.peek() == Some('/') {
                            self.bump();
                            closed = true;
                            break;
                        }
                    }
                    if !closed {
                        return Err(DtaError::syntax(line, column, "unterminated comment"));
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn read_word(&mut self) -> String {
        let mut word = String::new();
        while let Some(c) = self.peek() {
            if is_delimiter(c) {
                break;
            }
            word.push(c);
            self.bump();
        }
        word
    }

    /// Read a delimited literal after its opening quote has been consumed.
    fn read_quoted(&mut self, quote: char, line: usize, column: usize) -> Result<String> {
        let mut value = String::new();
        loop {
            let Some(c) = self.bump() else {
                let what = if quote == '"' { "string" } else { "quoted symbol" };
                return Err(DtaError::syntax(line, column, format!("unterminated {what}")));
            };
            match c {
                c if c == quote => return Ok(value),
                '\\' => match (quote, self.peek()) {
                    ('"', Some('q' | '"')) | ('\'', Some('\'')) => {
                        self.bump();
                        value.push(quote);
                    }
                    ('"', Some('n')) => {
                        self.bump();
                        value.push('\n');
                    }
                    (_, Some('\\')) => {
                        self.bump();
                        value.push('\\');
                    }
                    _ => value.push('\\'),
                },
                c => value.push(c),
            }
        }
    }

    /// Argument of a directive: the next word or quoted symbol.
    fn read_directive_argument(
        &mut self,
        name: &str,
        line: usize,
        column: usize,
    ) -> Result<String> {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
        match self.peek() {
            Some('\'') => {
                let (arg_line, arg_column) = (self.line, self.column);
                self.bump();
                self.read_quoted('\'', arg_line, arg_column)
            }
            Some(c) if !is_delimiter(c) => Ok(self.read_word()),
            _ => Err(DtaError::syntax(
                line,
                column,
                format!("#{name} requires an argument"),
            )),
        }
    }

    fn read_directive(&mut self, line: usize, column: usize) -> Result<Directive> {
        let name = self.read_word();
        let directive = match name.as_str() {
            "include" => Directive::Include(self.read_directive_argument(&name, line, column)?),
            "merge" => Directive::Merge(self.read_directive_argument(&name, line, column)?),
            "define" => Directive::Define(self.read_directive_argument(&name, line, column)?),
            "ifdef" => Directive::IfDef(self.read_directive_argument(&name, line, column)?),
            "ifndef" => Directive::IfNDef(self.read_directive_argument(&name, line, column)?),
            "undef" => Directive::Undef(self.read_directive_argument(&name, line, column)?),
            "else" => Directive::Else,
            "endif" => Directive::EndIf,
            "autorun" => Directive::Autorun,
            other => {
                return Err(DtaError::syntax(
                    line,
                    column,
                    format!("unknown directive '#{other}'"),
                ));
            }
        };
        Ok(directive)
    }

    /// Next token, or `None` at end of input.
    pub fn next_token(&mut self) -> Result<Option<Token>> {
        self.skip_trivia()?;
        let (line, column) = (self.line, self.column);
        let Some(c) = self.peek() else {
            return Ok(None);
        };
        let kind = match c {
            '(' | '[' | '{' | ')' | ']' | '}' => {
                self.bump();
                match c {
                    '(' => TokenKind::Open(ListKind::Array),
                    '{' => TokenKind::Open(ListKind::Command),
                    '[' => TokenKind::Open(ListKind::Property),
                    ')' => TokenKind::Close(ListKind::Array),
                    '}' => TokenKind::Close(ListKind::Command),
                    _ => TokenKind::Close(ListKind::Property),
                }
            }
            '"' => {
                self.bump();
                TokenKind::Str(self.read_quoted('"', line, column)?)
            }
            '\'' => {
                self.bump();
                TokenKind::Quoted(self.read_quoted('\'', line, column)?)
            }
            '#' => {
                self.bump();
                TokenKind::Directive(self.read_directive(line, column)?)
            }
            _ => TokenKind::Word(self.read_word()),
        };
        Ok(Some(Token { kind, line, column }))
    }
}
