//! Window conditions
//!
//! A condition is a boolean expression over window properties, used by the
//! exclude/include lists and opacity rules:
//!
//! ```text
//! class_g = "Firefox" && !focused
//! name *= "vim" || _NET_WM_STATE@:32a *= "_NET_WM_STATE_HIDDEN"
//! window_type = "dock" || (role ?~= "^pop" && width < 300)
//! ```
//!
//! A leaf is `target[@][[index]][:format]` optionally followed by
//! `[!][?]operator pattern`. Without an operator the leaf tests that the
//! property is set (non-zero or non-empty).

use regex::{Regex, RegexBuilder};
use std::fmt;
use std::str::FromStr;

use crate::models::wintype::WinType;

/// Value type of a condition target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetType {
    Int,
    String,
}

/// Targets the compositor knows without reading an X property
const PREDEFINED_TARGETS: &[(&str, TargetType)] = &[
    ("id", TargetType::Int),
    ("x", TargetType::Int),
    ("y", TargetType::Int),
    ("x2", TargetType::Int),
    ("y2", TargetType::Int),
    ("width", TargetType::Int),
    ("height", TargetType::Int),
    ("widthb", TargetType::Int),
    ("heightb", TargetType::Int),
    ("border_width", TargetType::Int),
    ("fullscreen", TargetType::Int),
    ("override_redirect", TargetType::Int),
    ("argb", TargetType::Int),
    ("focused", TargetType::Int),
    ("wmwin", TargetType::Int),
    ("bounding_shaped", TargetType::Int),
    ("rounded_corners", TargetType::Int),
    ("client", TargetType::Int),
    ("leader", TargetType::Int),
    ("window_type", TargetType::String),
    ("name", TargetType::String),
    ("class_g", TargetType::String),
    ("class_i", TargetType::String),
    ("role", TargetType::String),
];

/// Type of a predefined target, if `name` is one
pub fn predefined_target(name: &str) -> Option<TargetType> {
    PREDEFINED_TARGETS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, t)| *t)
}

/// Format of a raw X property target, e.g. `:32c`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyFormat {
    /// Bits per item: 8, 16 or 32
    pub bits: u8,
    /// `c` cardinal, `s` string, `a` atom, `d` drawable, `w` window
    pub kind: char,
}

impl PropertyFormat {
    fn target_type(&self) -> TargetType {
        match self.kind {
            's' | 'a' => TargetType::String,
            _ => TargetType::Int,
        }
    }
}

/// Comparison operator of a leaf
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOp {
    Eq,
    Gt,
    Lt,
    Ge,
    Le,
    /// `*=` substring
    Contains,
    /// `^=` prefix
    StartsWith,
    /// `%=` shell-style wildcard
    Wildcard,
    /// `~=` regular expression
    Regex,
}

impl MatchOp {
    fn symbol(self) -> &'static str {
        match self {
            MatchOp::Eq => "=",
            MatchOp::Gt => ">",
            MatchOp::Lt => "<",
            MatchOp::Ge => ">=",
            MatchOp::Le => "<=",
            MatchOp::Contains => "*=",
            MatchOp::StartsWith => "^=",
            MatchOp::Wildcard => "%=",
            MatchOp::Regex => "~=",
        }
    }

    fn is_string_only(self) -> bool {
        matches!(
            self,
            MatchOp::Contains | MatchOp::StartsWith | MatchOp::Wildcard | MatchOp::Regex
        )
    }

    fn is_ordering(self) -> bool {
        matches!(self, MatchOp::Gt | MatchOp::Lt | MatchOp::Ge | MatchOp::Le)
    }
}

/// Right-hand side of a comparison
#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    Int(i64),
    Str(String),
}

/// Comparison part of a leaf
#[derive(Debug, Clone)]
pub struct Test {
    pub op: MatchOp,
    /// `!` before the operator
    pub negate: bool,
    /// `?` before the operator
    pub ignore_case: bool,
    pub pattern: Pattern,
    /// Compiled form of `%=` and `~=` patterns
    matcher: Option<Regex>,
}

/// A single property test
#[derive(Debug, Clone)]
pub struct Leaf {
    pub target: String,
    pub target_type: TargetType,
    pub predefined: bool,
    /// `@`: read the property from the frame window instead of the client
    pub on_frame: bool,
    pub index: usize,
    pub format: Option<PropertyFormat>,
    pub test: Option<Test>,
}

/// Compiled window condition
#[derive(Debug, Clone)]
pub enum Condition {
    Leaf(Leaf),
    Not(Box<Condition>),
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
}

/// Property source a condition is evaluated against
pub trait WindowProperties {
    /// Integer view of `target` (booleans are 0/1); `None` when unset
    fn int_property(&self, target: &str, index: usize, on_frame: bool) -> Option<i64>;

    /// String view of `target`; `None` when unset
    fn string_property(&self, target: &str, index: usize, on_frame: bool) -> Option<String>;
}

/// Error compiling a condition
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message} at position {position} in \"{source_text}\"")]
pub struct ConditionError {
    pub source_text: String,
    pub position: usize,
    pub message: String,
}

impl Condition {
    /// Compile a condition string
    pub fn parse(src: &str) -> Result<Self, ConditionError> {
        let mut parser = Parser::new(src);
        let condition = parser.parse_or()?;
        parser.skip_ws();
        if !parser.at_end() {
            return Err(parser.error(format!("Unexpected character `{}`", parser.peek_char())));
        }
        Ok(condition)
    }

    /// Evaluate against a window. A leaf whose property is unset never
    /// matches, whatever its operator.
    pub fn matches<W: WindowProperties + ?Sized>(&self, window: &W) -> bool {
        match self {
            Condition::Leaf(leaf) => leaf.matches(window),
            Condition::Not(inner) => !inner.matches(window),
            Condition::And(a, b) => a.matches(window) && b.matches(window),
            Condition::Or(a, b) => a.matches(window) || b.matches(window),
        }
    }
}

impl FromStr for Condition {
    type Err = ConditionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Condition::parse(s)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Leaf(leaf) => write!(f, "{}", leaf),
            Condition::Not(inner) => write!(f, "!({})", inner),
            Condition::And(a, b) => write!(f, "({} && {})", a, b),
            Condition::Or(a, b) => write!(f, "({} || {})", a, b),
        }
    }
}

impl fmt::Display for Leaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.target)?;
        if self.on_frame {
            f.write_str("@")?;
        }
        if self.index != 0 {
            write!(f, "[{}]", self.index)?;
        }
        if let Some(format) = self.format {
            write!(f, ":{}{}", format.bits, format.kind)?;
        }
        if let Some(test) = &self.test {
            f.write_str(" ")?;
            if test.negate {
                f.write_str("!")?;
            }
            if test.ignore_case {
                f.write_str("?")?;
            }
            f.write_str(test.op.symbol())?;
            match &test.pattern {
                Pattern::Int(v) => write!(f, " {}", v)?,
                Pattern::Str(s) => write!(f, " {:?}", s)?,
            }
        }
        Ok(())
    }
}

impl Leaf {
    fn matches<W: WindowProperties + ?Sized>(&self, window: &W) -> bool {
        let Some(test) = &self.test else {
            return match self.target_type {
                TargetType::Int => window
                    .int_property(&self.target, self.index, self.on_frame)
                    .is_some_and(|v| v != 0),
                TargetType::String => window
                    .string_property(&self.target, self.index, self.on_frame)
                    .is_some_and(|s| !s.is_empty()),
            };
        };

        let result = match (&test.pattern, self.target_type) {
            (Pattern::Int(expected), TargetType::Int) => {
                let Some(value) = window.int_property(&self.target, self.index, self.on_frame)
                else {
                    return false;
                };
                match test.op {
                    MatchOp::Eq => value == *expected,
                    MatchOp::Gt => value > *expected,
                    MatchOp::Lt => value < *expected,
                    MatchOp::Ge => value >= *expected,
                    MatchOp::Le => value <= *expected,
                    _ => false,
                }
            }
            (Pattern::Str(expected), TargetType::String) => {
                let Some(value) = window.string_property(&self.target, self.index, self.on_frame)
                else {
                    return false;
                };
                test.match_str(&value, expected)
            }
            _ => false,
        };

        result != test.negate
    }
}

impl Test {
    fn match_str(&self, value: &str, expected: &str) -> bool {
        if let Some(regex) = &self.matcher {
            return regex.is_match(value);
        }

        let (value, expected) = if self.ignore_case {
            (value.to_lowercase(), expected.to_lowercase())
        } else {
            (value.to_string(), expected.to_string())
        };
        match self.op {
            MatchOp::Eq => value == expected,
            MatchOp::Contains => value.contains(&expected),
            MatchOp::StartsWith => value.starts_with(&expected),
            _ => false,
        }
    }
}

/// Translate a shell-style wildcard into an anchored regex
fn wildcard_to_regex(pattern: &str) -> String {
    let mut regex = String::with_capacity(pattern.len() + 2);
    regex.push('^');
    for c in pattern.chars() {
        match c {
            '*' => regex.push_str(".*"),
            '?' => regex.push('.'),
            _ => regex.push_str(&regex::escape(&c.to_string())),
        }
    }
    regex.push('$');
    regex
}

struct Parser<'a> {
    src: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            chars: src.chars().collect(),
            pos: 0,
        }
    }

    fn error(&self, message: impl Into<String>) -> ConditionError {
        ConditionError {
            source_text: self.src.to_string(),
            position: self.pos,
            message: message.into(),
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_char(&self) -> char {
        self.peek().unwrap_or('\0')
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn eat(&mut self, token: &str) -> bool {
        let len = token.chars().count();
        let matches = self
            .chars
            .get(self.pos..self.pos + len)
            .is_some_and(|slice| slice.iter().copied().eq(token.chars()));
        if matches {
            self.pos += len;
        }
        matches
    }

    fn parse_or(&mut self) -> Result<Condition, ConditionError> {
        let mut left = self.parse_and()?;
        loop {
            self.skip_ws();
            if !self.eat("||") {
                return Ok(left);
            }
            let right = self.parse_and()?;
            left = Condition::Or(Box::new(left), Box::new(right));
        }
    }

    fn parse_and(&mut self) -> Result<Condition, ConditionError> {
        let mut left = self.parse_unary()?;
        loop {
            self.skip_ws();
            if !self.eat("&&") {
                return Ok(left);
            }
            let right = self.parse_unary()?;
            left = Condition::And(Box::new(left), Box::new(right));
        }
    }

    fn parse_unary(&mut self) -> Result<Condition, ConditionError> {
        self.skip_ws();
        if self.eat("!") {
            let inner = self.parse_unary()?;
            return Ok(Condition::Not(Box::new(inner)));
        }
        if self.eat("(") {
            let inner = self.parse_or()?;
            self.skip_ws();
            if !self.eat(")") {
                return Err(self.error("Expected `)`"));
            }
            return Ok(inner);
        }
        self.parse_leaf().map(Condition::Leaf)
    }

    fn read_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn parse_leaf(&mut self) -> Result<Leaf, ConditionError> {
        let target_pos = self.pos;
        let target = self.read_while(|c| c.is_ascii_alphanumeric() || c == '_');
        if target.is_empty() {
            return Err(self.error("Expected a target"));
        }

        self.skip_ws();
        let on_frame = self.eat("@");

        self.skip_ws();
        let mut index = 0;
        if self.eat("[") {
            self.skip_ws();
            let digits = self.read_while(|c| c.is_ascii_digit());
            index = digits
                .parse::<usize>()
                .map_err(|_| self.error("Expected an index"))?;
            self.skip_ws();
            if !self.eat("]") {
                return Err(self.error("Expected `]`"));
            }
        }

        self.skip_ws();
        let format = if self.eat(":") {
            Some(self.parse_format()?)
        } else {
            None
        };

        let predefined = predefined_target(&target);
        let target_type = match (predefined, format) {
            (Some(kind), None) => kind,
            (Some(_), Some(_)) => {
                return Err(ConditionError {
                    source_text: self.src.to_string(),
                    position: target_pos,
                    message: format!("Predefined target `{}` cannot take a format", target),
                })
            }
            (None, Some(format)) => format.target_type(),
            (None, None) => {
                return Err(ConditionError {
                    source_text: self.src.to_string(),
                    position: target_pos,
                    message: format!("Target `{}` needs a format such as `:32c`", target),
                })
            }
        };

        let test = self.parse_test(&target, target_type)?;

        Ok(Leaf {
            target,
            target_type,
            predefined: predefined.is_some(),
            on_frame,
            index,
            format,
            test,
        })
    }

    fn parse_format(&mut self) -> Result<PropertyFormat, ConditionError> {
        let digits = self.read_while(|c| c.is_ascii_digit());
        let kind = match self.peek() {
            Some(c @ ('c' | 's' | 'a' | 'd' | 'w')) => {
                self.pos += 1;
                c
            }
            _ => return Err(self.error("Expected a property type (c, s, a, d or w)")),
        };
        let bits = if digits.is_empty() {
            if kind == 's' {
                8
            } else {
                32
            }
        } else {
            match digits.as_str() {
                "8" => 8,
                "16" => 16,
                "32" => 32,
                _ => return Err(self.error(format!("Invalid property format `{}`", digits))),
            }
        };
        Ok(PropertyFormat { bits, kind })
    }

    fn parse_op(&mut self) -> Option<MatchOp> {
        const OPS: [(&str, MatchOp); 9] = [
            ("*=", MatchOp::Contains),
            ("^=", MatchOp::StartsWith),
            ("%=", MatchOp::Wildcard),
            ("~=", MatchOp::Regex),
            (">=", MatchOp::Ge),
            ("<=", MatchOp::Le),
            ("=", MatchOp::Eq),
            (">", MatchOp::Gt),
            ("<", MatchOp::Lt),
        ];
        OPS.iter()
            .find(|(token, _)| self.eat(token))
            .map(|(_, op)| *op)
    }

    fn parse_test(
        &mut self,
        target: &str,
        target_type: TargetType,
    ) -> Result<Option<Test>, ConditionError> {
        self.skip_ws();
        let start = self.pos;

        let mut negate = false;
        let mut ignore_case = false;
        loop {
            match self.peek() {
                Some('!') => negate = !negate,
                Some('?') => ignore_case = true,
                _ => break,
            }
            self.pos += 1;
        }

        let Some(op) = self.parse_op() else {
            if self.pos != start {
                return Err(self.error("Expected an operator"));
            }
            return Ok(None);
        };

        self.skip_ws();
        let pattern_pos = self.pos;
        let pattern = self.parse_pattern()?;
        let type_error = |message: String| ConditionError {
            source_text: self.src.to_string(),
            position: pattern_pos,
            message,
        };

        match (&pattern, target_type) {
            (Pattern::Int(_), TargetType::String) => {
                return Err(type_error(format!("Target `{}` expects a string", target)))
            }
            (Pattern::Str(_), TargetType::Int) => {
                return Err(type_error(format!("Target `{}` expects an integer", target)))
            }
            _ => {}
        }
        if op.is_string_only() && target_type != TargetType::String {
            return Err(type_error(format!(
                "Operator `{}` only applies to strings",
                op.symbol()
            )));
        }
        if op.is_ordering() && target_type != TargetType::Int {
            return Err(type_error(format!(
                "Operator `{}` only applies to integers",
                op.symbol()
            )));
        }
        if ignore_case && target_type != TargetType::String {
            return Err(type_error("Case-insensitive matching only applies to strings".into()));
        }

        let matcher = match (&pattern, op) {
            (Pattern::Str(p), MatchOp::Regex) => Some(
                RegexBuilder::new(p)
                    .case_insensitive(ignore_case)
                    .build()
                    .map_err(|e| type_error(format!("Invalid regex pattern '{}': {}", p, e)))?,
            ),
            (Pattern::Str(p), MatchOp::Wildcard) => Some(
                RegexBuilder::new(&wildcard_to_regex(p))
                    .case_insensitive(ignore_case)
                    .build()
                    .map_err(|e| type_error(format!("Invalid wildcard '{}': {}", p, e)))?,
            ),
            _ => None,
        };

        if target == "window_type" && op == MatchOp::Eq {
            if let Pattern::Str(name) = &pattern {
                let valid = if ignore_case {
                    WinType::ALL
                        .iter()
                        .any(|t| t.name().eq_ignore_ascii_case(name))
                } else {
                    name.parse::<WinType>().is_ok()
                };
                if !valid {
                    return Err(type_error(format!("Unknown window type `{}`", name)));
                }
            }
        }

        Ok(Some(Test {
            op,
            negate,
            ignore_case,
            pattern,
            matcher,
        }))
    }

    fn parse_pattern(&mut self) -> Result<Pattern, ConditionError> {
        match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.pos += 1;
                self.parse_string(quote).map(Pattern::Str)
            }
            Some(c) if c.is_ascii_digit() || c == '-' || c == '+' => {
                let text = self.read_while(|c| {
                    c.is_ascii_hexdigit() || matches!(c, 'x' | 'X' | '-' | '+')
                });
                crate::models::render::parse_c_integer(&text)
                    .map(Pattern::Int)
                    .ok_or_else(|| self.error(format!("Invalid integer `{}`", text)))
            }
            Some(c) if c.is_ascii_alphabetic() => {
                let word = self.read_while(|c| c.is_ascii_alphanumeric());
                match word.as_str() {
                    "true" => Ok(Pattern::Int(1)),
                    "false" => Ok(Pattern::Int(0)),
                    _ => Err(self.error(format!("Unexpected pattern `{}`", word))),
                }
            }
            _ => Err(self.error("Expected a pattern")),
        }
    }

    fn parse_string(&mut self, quote: char) -> Result<String, ConditionError> {
        let mut out = String::new();
        loop {
            let Some(c) = self.peek() else {
                return Err(self.error("Unterminated string"));
            };
            self.pos += 1;
            if c == quote {
                return Ok(out);
            }
            if c != '\\' {
                out.push(c);
                continue;
            }
            let Some(escaped) = self.peek() else {
                return Err(self.error("Unterminated string"));
            };
            self.pos += 1;
            match escaped {
                'n' => out.push('\n'),
                't' => out.push('\t'),
                'r' => out.push('\r'),
                'a' => out.push('\x07'),
                'b' => out.push('\x08'),
                'f' => out.push('\x0c'),
                'v' => out.push('\x0b'),
                'x' => {
                    let start = self.pos;
                    while self.pos - start < 2
                        && self.peek().is_some_and(|c| c.is_ascii_hexdigit())
                    {
                        self.pos += 1;
                    }
                    let hex: String = self.chars[start..self.pos].iter().collect();
                    let value = u8::from_str_radix(&hex, 16)
                        .map_err(|_| self.error("Invalid hex escape"))?;
                    out.push(char::from(value));
                }
                other => out.push(other),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeWindow {
        ints: HashMap<&'static str, i64>,
        strings: HashMap<&'static str, &'static str>,
    }

    impl WindowProperties for FakeWindow {
        fn int_property(&self, target: &str, _index: usize, _on_frame: bool) -> Option<i64> {
            self.ints.get(target).copied()
        }

        fn string_property(&self, target: &str, _index: usize, _on_frame: bool) -> Option<String> {
            self.strings.get(target).map(|s| s.to_string())
        }
    }

    fn firefox() -> FakeWindow {
        let mut window = FakeWindow::default();
        window.strings.insert("class_g", "Firefox");
        window.strings.insert("name", "Mozilla Firefox - vim tips");
        window.strings.insert("window_type", "normal");
        window.ints.insert("focused", 1);
        window.ints.insert("width", 1280);
        window
    }

    #[test]
    fn test_equality_and_negation() {
        let window = firefox();
        assert!(Condition::parse("class_g = \"Firefox\"").unwrap().matches(&window));
        assert!(!Condition::parse("class_g != 'Firefox'").unwrap().matches(&window));
        assert!(Condition::parse("class_g ?= \"firefox\"").unwrap().matches(&window));
        assert!(!Condition::parse("!focused").unwrap().matches(&window));
    }

    #[test]
    fn test_string_operators() {
        let window = firefox();
        assert!(Condition::parse("name *= \"vim\"").unwrap().matches(&window));
        assert!(Condition::parse("name ^= \"Mozilla\"").unwrap().matches(&window));
        assert!(Condition::parse("name %= \"*Firefox*\"").unwrap().matches(&window));
        assert!(!Condition::parse("name %= \"Firefox*\"").unwrap().matches(&window));
        assert!(Condition::parse("name ~= \"tips$\"").unwrap().matches(&window));
        assert!(Condition::parse("name ?~= \"^MOZILLA\"").unwrap().matches(&window));
    }

    #[test]
    fn test_integer_operators_and_precedence() {
        let window = firefox();
        assert!(Condition::parse("width >= 1280 && focused").unwrap().matches(&window));
        assert!(Condition::parse("width < 10 || class_g = \"Firefox\" && focused")
            .unwrap()
            .matches(&window));
        assert!(!Condition::parse("(width < 10 || class_g = \"Firefox\") && !focused")
            .unwrap()
            .matches(&window));
        assert!(Condition::parse("focused = true").unwrap().matches(&window));
    }

    #[test]
    fn test_missing_property_never_matches() {
        let window = firefox();
        assert!(!Condition::parse("role = \"popup\"").unwrap().matches(&window));
        assert!(!Condition::parse("role != \"popup\"").unwrap().matches(&window));
        assert!(Condition::parse("!role").unwrap().matches(&window));
    }

    #[test]
    fn test_property_targets() {
        let condition = Condition::parse("_NET_WM_STATE@[1]:32a *= \"_NET_WM_STATE_HIDDEN\"")
            .unwrap();
        let Condition::Leaf(leaf) = condition else {
            panic!("expected a leaf");
        };
        assert!(leaf.on_frame);
        assert_eq!(leaf.index, 1);
        assert_eq!(leaf.format, Some(PropertyFormat { bits: 32, kind: 'a' }));
        assert_eq!(leaf.target_type, TargetType::String);
        assert!(!leaf.predefined);
    }

    #[test]
    fn test_compile_errors() {
        assert!(Condition::parse("").is_err());
        assert!(Condition::parse("name = ").is_err());
        assert!(Condition::parse("name = \"unterminated").is_err());
        assert!(Condition::parse("width *= \"1\"").is_err());
        assert!(Condition::parse("name > 3").is_err());
        assert!(Condition::parse("name ~= \"[invalid\"").is_err());
        assert!(Condition::parse("_NET_WM_PID = 3").is_err());
        assert!(Condition::parse("window_type = \"spaceship\"").is_err());
        assert!(Condition::parse("(focused").is_err());
        assert!(Condition::parse("focused ) ").is_err());
    }

    #[test]
    fn test_display_is_parseable() {
        let condition = Condition::parse("!focused && (name ?*= \"a\\\"b\" || width > 3)").unwrap();
        let reparsed = Condition::parse(&condition.to_string()).unwrap();
        assert_eq!(condition.to_string(), reparsed.to_string());
    }

    #[test]
    fn test_wildcard_translation() {
        assert_eq!(wildcard_to_regex("a*b?.c"), "^a.*b.\\.c$");
    }
}
