//! libconfig-style configuration documents.
//!
//! A document is a group of named settings:
//!
//! ```text
//! # comment
//! shadow = true;
//! shadow-radius = 7;
//! shadow-exclude = [ "name = 'Notification'", "class_g = 'Conky'" ];
//! wintypes: {
//!   tooltip = { fade = true; opacity = 0.75; };
//! };
//! @include "extra.conf"
//! ```
//!
//! Values are booleans, integers, floats, strings, arrays `[..]` of one
//! scalar type, heterogeneous lists `(..)` and groups `{..}`. Lookups take a
//! path whose segments are separated by `.`, `:` or `/`, and convert between
//! integers and floats where that is lossless enough to be useful.

use std::fmt;
use std::ops::Range;
use std::path::{Path, PathBuf};

use logos::{FilterResult, Logos};
use thiserror::Error;
use tracing::debug;

/// Nesting limit for `@include`
pub const MAX_INCLUDE_DEPTH: usize = 10;

/// Error reading a document, with the file and line it occurred at
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{}line {line}: {message}", location_prefix(.file))]
pub struct ParseError {
    pub file: Option<PathBuf>,
    pub line: usize,
    pub message: String,
}

fn location_prefix(file: &Option<PathBuf>) -> String {
    match file {
        Some(path) => format!("{}, ", path.display()),
        None => String::new(),
    }
}

#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(skip r"([ \t\r\n\f]+|#[^\n]*|//[^\n]*)")]
enum Token {
    #[token("/*", skip_block_comment)]
    BlockComment,

    #[token("@include")]
    Include,

    #[regex(r"[A-Za-z*][-A-Za-z0-9_*]*")]
    Name,

    #[regex(r"[-+]?[0-9]+(L|LL)?")]
    Int,

    #[regex(r"0[xX][0-9A-Fa-f]+(L|LL)?")]
    Hex,

    #[regex(r"[-+]?([0-9]+\.[0-9]*|\.[0-9]+)([eE][-+]?[0-9]+)?")]
    #[regex(r"[-+]?[0-9]+[eE][-+]?[0-9]+")]
    Float,

    #[regex(r#""([^"\\]|\\.)*""#)]
    Str,

    #[token("=")]
    Equals,
    #[token(":")]
    Colon,
    #[token(";")]
    Semicolon,
    #[token(",")]
    Comma,
    #[token("{")]
    OpenBrace,
    #[token("}")]
    CloseBrace,
    #[token("[")]
    OpenBracket,
    #[token("]")]
    CloseBracket,
    #[token("(")]
    OpenParen,
    #[token(")")]
    CloseParen,
}

/// Skip a `/* .. */` comment; an unterminated one is a lexing error
fn skip_block_comment(lex: &mut logos::Lexer<Token>) -> FilterResult<(), ()> {
    match lex.remainder().find("*/") {
        Some(end) => {
            lex.bump(end + 2);
            FilterResult::Skip
        }
        None => {
            lex.bump(lex.remainder().len());
            FilterResult::Error(())
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Token::BlockComment => "comment",
            Token::Include => "@include",
            Token::Name => "setting name",
            Token::Int | Token::Hex => "integer",
            Token::Float => "float",
            Token::Str => "string",
            Token::Equals => "`=`",
            Token::Colon => "`:`",
            Token::Semicolon => "`;`",
            Token::Comma => "`,`",
            Token::OpenBrace => "`{`",
            Token::CloseBrace => "`}`",
            Token::OpenBracket => "`[`",
            Token::CloseBracket => "`]`",
            Token::OpenParen => "`(`",
            Token::CloseParen => "`)`",
        };
        f.write_str(s)
    }
}

/// A setting value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// `[a, b]`, scalars of one type
    Array(Vec<Value>),
    /// `(a, b)`, any values
    List(Vec<Value>),
    Group(Group),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Array(_) => "array",
            Value::List(_) => "list",
            Value::Group(_) => "group",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// 32-bit integer; floats are truncated, out-of-range values are `None`
    pub fn as_int(&self) -> Option<i32> {
        self.as_int64().and_then(|v| i32::try_from(v).ok())
    }

    /// 64-bit integer; floats are truncated
    pub fn as_int64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Float(v) if v.is_finite() && *v >= i64::MIN as f64 && *v <= i64::MAX as f64 => {
                Some(v.trunc() as i64)
            }
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_group(&self) -> Option<&Group> {
        match self {
            Value::Group(g) => Some(g),
            _ => None,
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    /// Elements of an array or list
    pub fn elements(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) | Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Number of elements of an aggregate, 0 for scalars
    pub fn len(&self) -> usize {
        match self {
            Value::Array(items) | Value::List(items) => items.len(),
            Value::Group(group) => group.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element `index` of an array or list
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.elements().and_then(|items| items.get(index))
    }

    fn is_scalar(&self) -> bool {
        matches!(
            self,
            Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::Str(_)
        )
    }
}

/// Named settings in file order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Group {
    settings: Vec<(String, Value)>,
}

impl Group {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.settings
            .iter()
            .find(|(setting, _)| setting == name)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.settings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.settings.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Look up a setting by path relative to this group
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split(['.', ':', '/']).filter(|s| !s.is_empty());
        let mut value = self.get(segments.next()?)?;
        for segment in segments {
            value = value.as_group()?.get(segment)?;
        }
        Some(value)
    }

    pub fn lookup_bool(&self, path: &str) -> Option<bool> {
        self.lookup(path).and_then(Value::as_bool)
    }

    pub fn lookup_int(&self, path: &str) -> Option<i32> {
        self.lookup(path).and_then(Value::as_int)
    }

    pub fn lookup_int64(&self, path: &str) -> Option<i64> {
        self.lookup(path).and_then(Value::as_int64)
    }

    pub fn lookup_float(&self, path: &str) -> Option<f64> {
        self.lookup(path).and_then(Value::as_float)
    }

    pub fn lookup_str(&self, path: &str) -> Option<&str> {
        self.lookup(path).and_then(Value::as_str)
    }

    pub fn lookup_group(&self, path: &str) -> Option<&Group> {
        self.lookup(path).and_then(Value::as_group)
    }

    fn insert(&mut self, name: String, value: Value) -> Result<(), String> {
        if self.get(&name).is_some() {
            return Err(format!("Duplicate setting name `{}`", name));
        }
        self.settings.push((name, value));
        Ok(())
    }
}

/// A parsed configuration document
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    root: Group,
    origin: Option<PathBuf>,
}

impl Document {
    /// Parse `source`. `origin` names the file in errors; relative
    /// `@include` paths are resolved against `include_dir`.
    pub fn parse(
        source: &str,
        origin: Option<&Path>,
        include_dir: Option<&Path>,
    ) -> Result<Self, ParseError> {
        let mut parser = Parser::new(source, origin, include_dir, 0)?;
        let mut root = Group::default();
        parser.parse_settings(&mut root, None)?;
        Ok(Self {
            root,
            origin: origin.map(Path::to_path_buf),
        })
    }

    pub fn root(&self) -> &Group {
        &self.root
    }

    pub fn origin(&self) -> Option<&Path> {
        self.origin.as_deref()
    }

    pub fn lookup(&self, path: &str) -> Option<&Value> {
        self.root.lookup(path)
    }

    pub fn lookup_bool(&self, path: &str) -> Option<bool> {
        self.root.lookup_bool(path)
    }

    pub fn lookup_int(&self, path: &str) -> Option<i32> {
        self.root.lookup_int(path)
    }

    pub fn lookup_int64(&self, path: &str) -> Option<i64> {
        self.root.lookup_int64(path)
    }

    pub fn lookup_float(&self, path: &str) -> Option<f64> {
        self.root.lookup_float(path)
    }

    pub fn lookup_str(&self, path: &str) -> Option<&str> {
        self.root.lookup_str(path)
    }

    pub fn lookup_group(&self, path: &str) -> Option<&Group> {
        self.root.lookup_group(path)
    }
}

#[derive(Debug, Clone)]
struct Spanned {
    token: Token,
    span: Range<usize>,
    line: usize,
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Spanned>,
    pos: usize,
    file: Option<&'a Path>,
    include_dir: Option<&'a Path>,
    depth: usize,
    last_line: usize,
}

impl<'a> Parser<'a> {
    fn new(
        source: &'a str,
        file: Option<&'a Path>,
        include_dir: Option<&'a Path>,
        depth: usize,
    ) -> Result<Self, ParseError> {
        let mut tokens = Vec::new();
        let mut line = 1;
        let mut counted = 0;
        for (result, span) in Token::lexer(source).spanned() {
            line += source[counted..span.start].matches('\n').count();
            counted = span.start;
            match result {
                Ok(token) => tokens.push(Spanned { token, span, line }),
                Err(()) => {
                    let text = &source[span];
                    let message = if text.starts_with("/*") {
                        "Unterminated `/*` comment".to_string()
                    } else {
                        format!("Unexpected `{}`", text)
                    };
                    return Err(ParseError {
                        file: file.map(Path::to_path_buf),
                        line,
                        message,
                    });
                }
            }
        }
        let last_line = line + source[counted..].matches('\n').count();

        Ok(Self {
            source,
            tokens,
            pos: 0,
            file,
            include_dir,
            depth,
            last_line,
        })
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        let line = self
            .tokens
            .get(self.pos)
            .map(|t| t.line)
            .unwrap_or(self.last_line);
        ParseError {
            file: self.file.map(Path::to_path_buf),
            line,
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).map(|t| t.token)
    }

    fn slice(&self) -> &'a str {
        let source = self.source;
        self.tokens
            .get(self.pos)
            .map(|t| &source[t.span.clone()])
            .unwrap_or("")
    }

    fn bump(&mut self) {
        self.pos += 1;
    }

    fn expect(&mut self, expected: Token) -> Result<(), ParseError> {
        match self.peek() {
            Some(token) if token == expected => {
                self.bump();
                Ok(())
            }
            Some(token) => Err(self.error(format!("Expected {}, found {}", expected, token))),
            None => Err(self.error(format!("Expected {}, found end of file", expected))),
        }
    }

    /// Parse settings into `group` until `close` (or end of input at top level)
    fn parse_settings(
        &mut self,
        group: &mut Group,
        close: Option<Token>,
    ) -> Result<(), ParseError> {
        loop {
            match self.peek() {
                None => {
                    return match close {
                        None => Ok(()),
                        Some(token) => {
                            Err(self.error(format!("Expected {}, found end of file", token)))
                        }
                    }
                }
                Some(token) if Some(token) == close => {
                    self.bump();
                    return Ok(());
                }
                Some(Token::Include) => {
                    self.bump();
                    self.parse_include(group)?;
                }
                Some(Token::Name) => {
                    let name = self.slice().to_string();
                    let line = self.tokens[self.pos].line;
                    self.bump();
                    match self.peek() {
                        Some(Token::Equals | Token::Colon) => self.bump(),
                        _ => {
                            return Err(
                                self.error(format!("Expected `=` or `:` after `{}`", name))
                            )
                        }
                    }
                    let value = self.parse_value()?;
                    if matches!(self.peek(), Some(Token::Semicolon | Token::Comma)) {
                        self.bump();
                    }
                    group.insert(name, value).map_err(|message| ParseError {
                        file: self.file.map(Path::to_path_buf),
                        line,
                        message,
                    })?;
                }
                Some(token) => return Err(self.error(format!("Unexpected {}", token))),
            }
        }
    }

    fn parse_include(&mut self, group: &mut Group) -> Result<(), ParseError> {
        if self.peek() != Some(Token::Str) {
            return Err(self.error("Expected file name after @include"));
        }
        let name = self.parse_string()?;

        if self.depth + 1 > MAX_INCLUDE_DEPTH {
            return Err(self.error(format!(
                "Include depth exceeds {} at \"{}\"",
                MAX_INCLUDE_DEPTH, name
            )));
        }

        let target = Path::new(&name);
        let path = match self.include_dir {
            Some(dir) if target.is_relative() => dir.join(target),
            _ => target.to_path_buf(),
        };
        debug!("Including {}", path.display());

        let source = std::fs::read_to_string(&path).map_err(|e| {
            self.error(format!(
                "Cannot open include file \"{}\": {}",
                path.display(),
                e
            ))
        })?;

        let mut nested = Parser::new(&source, Some(&path), self.include_dir, self.depth + 1)?;
        nested.parse_settings(group, None)
    }

    fn parse_value(&mut self) -> Result<Value, ParseError> {
        match self.peek() {
            Some(Token::Name) => {
                let word = self.slice();
                let value = if word.eq_ignore_ascii_case("true") {
                    Value::Bool(true)
                } else if word.eq_ignore_ascii_case("false") {
                    Value::Bool(false)
                } else {
                    return Err(self.error(format!("Unexpected `{}`, expected a value", word)));
                };
                self.bump();
                Ok(value)
            }
            Some(Token::Int) => {
                let text = strip_int_suffix(self.slice());
                let value = text
                    .parse::<i64>()
                    .map_err(|_| self.error(format!("Integer `{}` out of range", text)))?;
                self.bump();
                Ok(Value::Int(value))
            }
            Some(Token::Hex) => {
                let text = strip_int_suffix(self.slice());
                let value = u64::from_str_radix(&text[2..], 16)
                    .map_err(|_| self.error(format!("Integer `{}` out of range", text)))?;
                self.bump();
                Ok(Value::Int(value as i64))
            }
            Some(Token::Float) => {
                let text = self.slice();
                let value = text
                    .parse::<f64>()
                    .map_err(|_| self.error(format!("Invalid float `{}`", text)))?;
                self.bump();
                Ok(Value::Float(value))
            }
            Some(Token::Str) => {
                let mut s = self.parse_string()?;
                while self.peek() == Some(Token::Str) {
                    s.push_str(&self.parse_string()?);
                }
                Ok(Value::Str(s))
            }
            Some(Token::OpenBracket) => {
                self.bump();
                let items = self.parse_elements(Token::CloseBracket)?;
                if let Some(bad) = items.iter().find(|v| !v.is_scalar()) {
                    return Err(self.error(format!(
                        "Array elements must be scalars, found {}",
                        bad.type_name()
                    )));
                }
                if let Some(first) = items.first() {
                    let kind = std::mem::discriminant(first);
                    if items.iter().any(|v| std::mem::discriminant(v) != kind) {
                        return Err(self.error("Mismatched element type in array"));
                    }
                }
                Ok(Value::Array(items))
            }
            Some(Token::OpenParen) => {
                self.bump();
                Ok(Value::List(self.parse_elements(Token::CloseParen)?))
            }
            Some(Token::OpenBrace) => {
                self.bump();
                let mut group = Group::default();
                self.parse_settings(&mut group, Some(Token::CloseBrace))?;
                Ok(Value::Group(group))
            }
            Some(token) => Err(self.error(format!("Unexpected {}, expected a value", token))),
            None => Err(self.error("Unexpected end of file, expected a value")),
        }
    }

    /// Comma separated values up to `close`; a trailing comma is allowed
    fn parse_elements(&mut self, close: Token) -> Result<Vec<Value>, ParseError> {
        let mut items = Vec::new();
        loop {
            if self.peek() == Some(close) {
                self.bump();
                return Ok(items);
            }
            items.push(self.parse_value()?);
            match self.peek() {
                Some(Token::Comma) => self.bump(),
                _ => {
                    self.expect(close)?;
                    return Ok(items);
                }
            }
        }
    }

    fn parse_string(&mut self) -> Result<String, ParseError> {
        let raw = self.slice();
        let inner = &raw[1..raw.len() - 1];
        let value = unescape(inner).map_err(|message| self.error(message))?;
        self.bump();
        Ok(value)
    }
}

fn strip_int_suffix(text: &str) -> &str {
    text.trim_end_matches('L')
}

fn unescape(s: &str) -> Result<String, String> {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('f') => out.push('\u{0c}'),
            Some('x') => {
                let hex: String = chars.by_ref().take(2).collect();
                let byte = u8::from_str_radix(&hex, 16)
                    .ok()
                    .filter(|_| hex.len() == 2)
                    .ok_or_else(|| format!("Invalid escape `\\x{}`", hex))?;
                out.push(char::from(byte));
            }
            // Unknown escapes are kept as written
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => return Err("Unterminated escape sequence".to_string()),
        }
    }
    Ok(out)
}
