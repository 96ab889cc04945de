//! Codec for PHP "return array" settings files.
//!
//! These are the `<?php return [...];` files many PHP applications read their
//! deployment configuration from (`app/etc/env.php` and friends). Decoding
//! accepts the literal subset such files are made of: short and long array
//! syntax, quoted strings, numbers, booleans and `null`, with comments
//! between tokens. Anything that would need a PHP interpreter (constants,
//! function calls, string interpolation) is a parse error.
//!
//! Encoding always produces the same canonical layout, four-space indented
//! short arrays with list-like mappings written positionally:
//!
//! ```text
//! <?php
//! return [
//!     'db' => [
//!         'host' => 'localhost'
//!     ],
//!     'modules' => [
//!         'Core',
//!         'Cache'
//!     ]
//! ];
//! ```

use std::fmt;
use std::fmt::Write as _;
use std::path::Path;

use crate::error::EnvapplyError;
use crate::value::{Key, Mapping, Value};

const INDENT: &str = "    ";

/// Wrap a document in the file preamble and terminator.
pub fn to_file_contents(doc: &Mapping) -> String {
    format!("<?php\nreturn {};\n", encode(doc))
}

/// Encode a document as its canonical array literal (no preamble).
pub fn encode(doc: &Mapping) -> String {
    let mut out = String::new();
    write_mapping(&mut out, doc, 1);
    out
}

/// A mapping is list-like when its keys are exactly `0..n` in order.
pub fn is_list_like(mapping: &Mapping) -> bool {
    !mapping.is_empty()
        && mapping
            .keys()
            .enumerate()
            .all(|(i, key)| *key == Key::Int(i as i64))
}

fn write_mapping(out: &mut String, mapping: &Mapping, depth: usize) {
    if mapping.is_empty() {
        out.push_str("[]");
        return;
    }
    let list = is_list_like(mapping);
    out.push_str("[\n");
    for (i, (key, value)) in mapping.iter().enumerate() {
        if i > 0 {
            out.push_str(",\n");
        }
        push_indent(out, depth);
        if !list {
            write_key(out, key);
            out.push_str(" => ");
        }
        write_value(out, value, depth + 1);
    }
    out.push('\n');
    push_indent(out, depth - 1);
    out.push(']');
}

fn push_indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
}

fn write_key(out: &mut String, key: &Key) {
    match key {
        Key::Int(i) => {
            let _ = write!(out, "{i}");
        }
        Key::Str(s) => write_string(out, s),
    }
}

fn write_value(out: &mut String, value: &Value, depth: usize) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(true) => out.push_str("true"),
        Value::Bool(false) => out.push_str("false"),
        Value::Int(i) => {
            let _ = write!(out, "{i}");
        }
        Value::Float(f) => out.push_str(&format_float(*f)),
        Value::String(s) => write_string(out, s),
        Value::Mapping(m) => write_mapping(out, m, depth),
    }
}

fn write_string(out: &mut String, s: &str) {
    out.push('\'');
    for c in s.chars() {
        if matches!(c, '\\' | '\'') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('\'');
}

/// Shortest round-trip form that still reads back as a float: `1.0`, `0.25`,
/// `1.0E+25`, `5.0E-7`.
fn format_float(f: f64) -> String {
    if f.is_nan() {
        return "NAN".into();
    }
    if f.is_infinite() {
        return if f > 0.0 { "INF".into() } else { "-INF".into() };
    }
    let repr = format!("{f:?}");
    match repr.split_once('e') {
        Some((mantissa, exp)) => {
            let mantissa = if mantissa.contains('.') {
                mantissa.to_string()
            } else {
                format!("{mantissa}.0")
            };
            match exp.strip_prefix('-') {
                Some(abs) => format!("{mantissa}E-{abs}"),
                None => format!("{mantissa}E+{exp}"),
            }
        }
        None => repr,
    }
}

/// Syntax error with its position in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeError {
    pub line: usize,
    pub column: usize,
    pub reason: String,
}

impl DecodeError {
    /// Attach the file the source came from.
    pub fn in_file(self, path: &Path) -> EnvapplyError {
        EnvapplyError::ParseError {
            path: path.to_path_buf(),
            line: self.line,
            column: self.column,
            reason: self.reason,
        }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}: {}", self.line, self.column, self.reason)
    }
}

impl std::error::Error for DecodeError {}

/// Decode a full settings file (`<?php return <array>;`) into its document.
pub fn decode(source: &str) -> Result<Mapping, DecodeError> {
    let mut parser = Parser::new(source.strip_prefix('\u{feff}').unwrap_or(source));
    parser.skip_whitespace();
    parser.expect_keyword("<?php")?;
    parser.skip_trivia();
    parser.expect_keyword("return")?;
    parser.skip_trivia();
    let value = parser.parse_value()?;
    parser.skip_trivia();
    parser.expect_char(';')?;
    parser.skip_trivia();
    if parser.rest().starts_with("?>") {
        parser.pos += 2;
        parser.skip_whitespace();
    }
    if !parser.at_end() {
        return Err(parser.error("unexpected content after return statement"));
    }
    match value {
        Value::Mapping(m) => Ok(m),
        _ => Err(DecodeError {
            line: 1,
            column: 1,
            reason: "expected the file to return an array".into(),
        }),
    }
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.rest().chars().nth(1)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn error(&self, reason: impl Into<String>) -> DecodeError {
        let consumed = &self.src[..self.pos];
        let line = consumed.matches('\n').count() + 1;
        let column = consumed
            .rsplit('\n')
            .next()
            .map_or(0, |l| l.chars().count())
            + 1;
        DecodeError {
            line,
            column,
            reason: reason.into(),
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    /// Whitespace and comments.
    fn skip_trivia(&mut self) {
        loop {
            self.skip_whitespace();
            let rest = self.rest();
            if rest.starts_with("//") || rest.starts_with('#') {
                let end = rest.find('\n').unwrap_or(rest.len());
                self.pos += end;
            } else if rest.starts_with("/*") {
                match rest[2..].find("*/") {
                    Some(end) => self.pos += end + 4,
                    None => self.pos = self.src.len(),
                }
            } else {
                return;
            }
        }
    }

    fn expect_char(&mut self, expected: char) -> Result<(), DecodeError> {
        if self.peek() == Some(expected) {
            self.bump();
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{expected}'")))
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<(), DecodeError> {
        let rest = self.rest();
        let matched = rest
            .get(..keyword.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(keyword));
        let boundary = rest[keyword.len().min(rest.len())..]
            .chars()
            .next()
            .is_none_or(|c| !is_ident_char(c));
        if matched && boundary {
            self.pos += keyword.len();
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{keyword}'")))
        }
    }

    fn unexpected(&self, expected: &str) -> DecodeError {
        match self.peek() {
            Some(c) => self.error(format!("expected {expected}, found '{c}'")),
            None => self.error(format!("expected {expected}, found end of file")),
        }
    }

    fn parse_value(&mut self) -> Result<Value, DecodeError> {
        match self.peek() {
            Some('[') => {
                self.bump();
                self.parse_array_body(']')
            }
            Some('\'') => self.parse_single_quoted().map(Value::String),
            Some('"') => self.parse_double_quoted().map(Value::String),
            Some(c) if c == '-' || c == '+' => {
                if self.peek_second().is_some_and(|n| n.is_ascii_alphabetic()) {
                    self.bump();
                    let ident = self.read_ident();
                    if ident.eq_ignore_ascii_case("inf") {
                        Ok(Value::Float(if c == '-' {
                            f64::NEG_INFINITY
                        } else {
                            f64::INFINITY
                        }))
                    } else {
                        Err(self.error(format!("unsupported constant '{ident}'")))
                    }
                } else {
                    self.parse_number()
                }
            }
            Some(c) if c.is_ascii_digit() || c == '.' => self.parse_number(),
            Some(c) if is_ident_start(c) => self.parse_ident_value(),
            _ => Err(self.unexpected("a value")),
        }
    }

    fn read_ident(&mut self) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_char) {
            self.bump();
        }
        &self.src[start..self.pos]
    }

    fn parse_ident_value(&mut self) -> Result<Value, DecodeError> {
        let start = self.pos;
        let ident = self.read_ident().to_ascii_lowercase();
        match ident.as_str() {
            "array" => {
                self.skip_trivia();
                self.expect_char('(')?;
                self.parse_array_body(')')
            }
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            "null" => Ok(Value::Null),
            "inf" => Ok(Value::Float(f64::INFINITY)),
            "nan" => Ok(Value::Float(f64::NAN)),
            _ => {
                self.pos = start;
                Err(self.error(format!("unsupported expression '{}'", self.peek_ident())))
            }
        }
    }

    fn peek_ident(&self) -> &'a str {
        let rest = self.rest();
        let end = rest.find(|c: char| !is_ident_char(c)).unwrap_or(rest.len());
        &rest[..end]
    }

    /// Entries up to `close`; the opening bracket is already consumed.
    fn parse_array_body(&mut self, close: char) -> Result<Value, DecodeError> {
        let mut mapping = Mapping::new();
        let mut next_index: i64 = 0;
        loop {
            self.skip_trivia();
            if self.peek() == Some(close) {
                self.bump();
                break;
            }
            let entry_start = self.pos;
            let first = self.parse_value()?;
            self.skip_trivia();
            let (key, value) = if self.rest().starts_with("=>") {
                self.pos += 2;
                self.skip_trivia();
                let key = self.key_from(first, entry_start)?;
                (key, self.parse_value()?)
            } else {
                (Key::Int(next_index), first)
            };
            if let Key::Int(i) = key
                && i >= next_index
            {
                next_index = i.saturating_add(1);
            }
            mapping.insert(key, value);

            self.skip_trivia();
            match self.peek() {
                Some(',') => {
                    self.bump();
                }
                Some(c) if c == close => {
                    self.bump();
                    break;
                }
                _ => return Err(self.unexpected(&format!("',' or '{close}'"))),
            }
        }
        Ok(Value::Mapping(mapping))
    }

    fn key_from(&mut self, value: Value, at: usize) -> Result<Key, DecodeError> {
        match value {
            Value::String(s) => Ok(Key::from_segment(&s)),
            Value::Int(i) => Ok(Key::Int(i)),
            Value::Bool(b) => Ok(Key::Int(i64::from(b))),
            Value::Null => Ok(Key::Str(String::new())),
            Value::Float(f) if f.is_finite() => Ok(Key::Int(f.trunc() as i64)),
            Value::Float(_) | Value::Mapping(_) => {
                self.pos = at;
                Err(self.error("illegal array key"))
            }
        }
    }

    fn parse_single_quoted(&mut self) -> Result<String, DecodeError> {
        self.bump();
        let mut out = String::new();
        loop {
            match self.bump() {
                Some('\'') => return Ok(out),
                Some('\\') => match self.peek() {
                    Some(c @ ('\\' | '\'')) => {
                        self.bump();
                        out.push(c);
                    }
                    _ => out.push('\\'),
                },
                Some(c) => out.push(c),
                None => return Err(self.error("unterminated string")),
            }
        }
    }

    fn parse_double_quoted(&mut self) -> Result<String, DecodeError> {
        self.bump();
        let mut bytes = Vec::new();
        loop {
            let Some(c) = self.bump() else {
                return Err(self.error("unterminated string"));
            };
            match c {
                '"' => break,
                '$' if self.peek().is_some_and(|n| is_ident_start(n) || n == '{') => {
                    return Err(self.error("variable interpolation is not supported"));
                }
                '{' if self.peek() == Some('$') => {
                    return Err(self.error("variable interpolation is not supported"));
                }
                '\\' => self.parse_escape(&mut bytes)?,
                other => {
                    let mut buf = [0u8; 4];
                    bytes.extend_from_slice(other.encode_utf8(&mut buf).as_bytes());
                }
            }
        }
        String::from_utf8(bytes).map_err(|_| self.error("string is not valid UTF-8"))
    }

    fn parse_escape(&mut self, bytes: &mut Vec<u8>) -> Result<(), DecodeError> {
        let simple = match self.peek() {
            Some('n') => Some(b'\n'),
            Some('t') => Some(b'\t'),
            Some('r') => Some(b'\r'),
            Some('v') => Some(0x0b),
            Some('f') => Some(0x0c),
            Some('e') => Some(0x1b),
            Some('\\') => Some(b'\\'),
            Some('"') => Some(b'"'),
            Some('$') => Some(b'$'),
            _ => None,
        };
        if let Some(b) = simple {
            self.bump();
            bytes.push(b);
            return Ok(());
        }
        match self.peek() {
            Some(c) if c.is_digit(8) => {
                let digits = self.take_while_max(3, |c| c.is_digit(8));
                let code = u32::from_str_radix(digits, 8).unwrap_or(0);
                bytes.push((code & 0xff) as u8);
            }
            Some('x') if self.peek_second().is_some_and(|c| c.is_ascii_hexdigit()) => {
                self.bump();
                let digits = self.take_while_max(2, |c| c.is_ascii_hexdigit());
                bytes.push(u8::from_str_radix(digits, 16).unwrap_or(0));
            }
            Some('u') if self.peek_second() == Some('{') => {
                self.pos += 2;
                let digits = self.take_while_max(6, |c| c.is_ascii_hexdigit());
                let ch = u32::from_str_radix(digits, 16)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| self.error("invalid unicode escape"))?;
                self.expect_char('}')?;
                let mut buf = [0u8; 4];
                bytes.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
            }
            _ => bytes.push(b'\\'),
        }
        Ok(())
    }

    fn take_while_max(&mut self, max: usize, pred: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        let mut taken = 0;
        while taken < max && self.peek().is_some_and(&pred) {
            self.bump();
            taken += 1;
        }
        &self.src[start..self.pos]
    }

    fn parse_number(&mut self) -> Result<Value, DecodeError> {
        let start = self.pos;
        let negative = match self.peek() {
            Some('-') => {
                self.bump();
                true
            }
            Some('+') => {
                self.bump();
                false
            }
            _ => false,
        };

        let rest = self.rest();
        let radix = if rest.starts_with("0x") || rest.starts_with("0X") {
            Some(16)
        } else if rest.starts_with("0b") || rest.starts_with("0B") {
            Some(2)
        } else if rest.starts_with("0o") || rest.starts_with("0O") {
            Some(8)
        } else {
            None
        };
        if let Some(radix) = radix {
            self.pos += 2;
            let digits = self.take_while_max(usize::MAX, |c| c.is_digit(radix));
            return self.integer_from_radix(digits, radix, negative, start);
        }

        let int_digits = self.take_while_max(usize::MAX, |c| c.is_ascii_digit());
        let mut is_float = false;
        if self.peek() == Some('.') && self.peek_second().is_none_or(|c| c != '.') {
            self.bump();
            self.take_while_max(usize::MAX, |c| c.is_ascii_digit());
            is_float = true;
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let save = self.pos;
            self.bump();
            if matches!(self.peek(), Some('+' | '-')) {
                self.bump();
            }
            if self.take_while_max(usize::MAX, |c| c.is_ascii_digit()).is_empty() {
                self.pos = save;
            } else {
                is_float = true;
            }
        }

        let text = &self.src[start..self.pos];
        if is_float {
            return text.parse().map(Value::Float).map_err(|_| {
                self.pos = start;
                self.error(format!("invalid number '{text}'"))
            });
        }
        if int_digits.is_empty() {
            self.pos = start;
            return Err(self.error("expected a number"));
        }
        if int_digits.len() > 1 && int_digits.starts_with('0') {
            return self.integer_from_radix(&int_digits[1..], 8, negative, start);
        }
        Ok(text
            .parse::<i64>()
            .map(Value::Int)
            .unwrap_or_else(|_| Value::Float(text.parse().unwrap_or(f64::INFINITY))))
    }

    fn integer_from_radix(
        &mut self,
        digits: &str,
        radix: u32,
        negative: bool,
        start: usize,
    ) -> Result<Value, DecodeError> {
        match i64::from_str_radix(digits, radix) {
            Ok(i) => Ok(Value::Int(if negative { -i } else { i })),
            Err(_) => {
                self.pos = start;
                Err(self.error(format!("invalid base-{radix} integer")))
            }
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn mapping(entries: Vec<(Key, Value)>) -> Mapping {
        entries.into_iter().collect()
    }

    fn s(key: &str) -> Key {
        Key::from_segment(key)
    }

    #[test]
    fn encode_nested_document() {
        let doc = mapping(vec![(
            s("db"),
            Value::Mapping(mapping(vec![
                (s("host"), Value::from("localhost")),
                (s("port"), Value::Int(3306)),
            ])),
        )]);
        let expected = "<?php\nreturn [\n    'db' => [\n        'host' => 'localhost',\n        'port' => 3306\n    ]\n];\n";
        assert_eq!(to_file_contents(&doc), expected);
    }

    #[test]
    fn contiguous_integer_keys_render_positionally() {
        let list = mapping(vec![
            (Key::Int(0), Value::from("a")),
            (Key::Int(1), Value::from("b")),
            (Key::Int(2), Value::from("c")),
        ]);
        assert!(is_list_like(&list));
        assert_eq!(encode(&list), "[\n    'a',\n    'b',\n    'c'\n]");
    }

    #[test]
    fn sparse_integer_keys_render_with_keys() {
        let sparse = mapping(vec![
            (Key::Int(0), Value::from("a")),
            (Key::Int(2), Value::from("c")),
        ]);
        assert!(!is_list_like(&sparse));
        assert_eq!(encode(&sparse), "[\n    0 => 'a',\n    2 => 'c'\n]");
    }

    #[test]
    fn out_of_order_integer_keys_are_not_list_like() {
        let swapped = mapping(vec![
            (Key::Int(1), Value::from("b")),
            (Key::Int(0), Value::from("a")),
        ]);
        assert!(!is_list_like(&swapped));
    }

    #[test]
    fn scalars_use_literal_forms() {
        let doc = mapping(vec![
            (s("n"), Value::Null),
            (s("t"), Value::Bool(true)),
            (s("f"), Value::Bool(false)),
            (s("x"), Value::Float(1.0)),
            (s("big"), Value::Float(1e25)),
            (s("q"), Value::from("it's a \\ path")),
            (s("e"), Value::Mapping(Mapping::new())),
        ]);
        let text = encode(&doc);
        assert!(text.contains("'n' => null"));
        assert!(text.contains("'t' => true"));
        assert!(text.contains("'f' => false"));
        assert!(text.contains("'x' => 1.0"));
        assert!(text.contains("'big' => 1.0E+25"));
        assert!(text.contains(r"'q' => 'it\'s a \\ path'"));
        assert!(text.contains("'e' => []"));
    }

    #[test]
    fn decode_canonical_file() {
        let src = "<?php\nreturn [\n    'db' => [\n        'host' => 'old'\n    ],\n    'modules' => [\n        'Core',\n        'Cache'\n    ]\n];\n";
        let doc = decode(src).unwrap();
        let db = doc[&s("db")].as_mapping().unwrap();
        assert_eq!(db[&s("host")], Value::from("old"));
        let modules = doc[&s("modules")].as_mapping().unwrap();
        assert_eq!(modules[&Key::Int(1)], Value::from("Cache"));
        assert_eq!(to_file_contents(&doc), src);
    }

    #[test]
    fn decode_long_array_syntax_with_comments() {
        let src = r#"<?php
// generated by the installer
return array (
  'backend' => array ( 'frontName' => "admin\n" ), # trailing
  /* block */ 'x-frame-options' => 'SAMEORIGIN',
  'install' => array ('date' => 'Mon, 01 Jan 2024',),
);
?>
"#;
        let doc = decode(src).unwrap();
        let backend = doc[&s("backend")].as_mapping().unwrap();
        assert_eq!(backend[&s("frontName")], Value::from("admin\n"));
        assert_eq!(doc[&s("x-frame-options")], Value::from("SAMEORIGIN"));
        assert_eq!(doc.len(), 3);
    }

    #[test]
    fn decode_normalizes_keys_and_auto_indexes() {
        let doc = decode("<?php return ['5' => 'a', 'b', true => 'c', null => 'd'];").unwrap();
        let keys: Vec<Key> = doc.keys().cloned().collect();
        assert_eq!(keys, [Key::Int(5), Key::Int(6), Key::Int(1), Key::Str(String::new())]);
    }

    #[test]
    fn decode_numbers() {
        let doc =
            decode("<?php return [-3, 0x1F, 0755, 1.5, -2e3, 9223372036854775808, -INF];").unwrap();
        assert_eq!(doc[&Key::Int(0)], Value::Int(-3));
        assert_eq!(doc[&Key::Int(1)], Value::Int(31));
        assert_eq!(doc[&Key::Int(2)], Value::Int(493));
        assert_eq!(doc[&Key::Int(3)], Value::Float(1.5));
        assert_eq!(doc[&Key::Int(4)], Value::Float(-2000.0));
        assert_eq!(doc[&Key::Int(5)], Value::Float(9223372036854775808.0));
        assert_eq!(doc[&Key::Int(6)], Value::Float(f64::NEG_INFINITY));
    }

    #[test]
    fn decode_rejects_non_array_root() {
        let err = decode("<?php return 'x';").unwrap_err();
        assert!(err.reason.contains("array"));
    }

    #[test]
    fn decode_rejects_missing_open_tag() {
        assert!(decode("return [];").is_err());
    }

    #[test]
    fn decode_rejects_function_calls() {
        let err = decode("<?php\nreturn [\n    'k' => getenv('X')\n];").unwrap_err();
        assert_eq!(err.line, 3);
        assert!(err.reason.contains("getenv"));
    }

    #[test]
    fn decode_rejects_interpolation() {
        assert!(decode(r#"<?php return ["$home/x"];"#).is_err());
    }

    #[test]
    fn decode_error_reports_position() {
        let err = decode("<?php\nreturn [\n    'a' => 1\n    'b' => 2\n];").unwrap_err();
        assert_eq!(err.line, 4);
        assert_eq!(err.column, 5);
        assert!(err.reason.contains("','"));
    }

    #[test]
    fn decode_error_converts_with_path() {
        let err = decode("<?php return").unwrap_err().in_file(Path::new("env.php"));
        assert!(matches!(err, EnvapplyError::ParseError { .. }));
        assert!(err.to_string().contains("env.php"));
    }

    fn arb_key() -> impl Strategy<Value = Key> {
        prop_oneof![
            (0i64..6).prop_map(Key::Int),
            "[a-z_'\\\\]{1,6}".prop_map(|s| Key::from_segment(&s)),
        ]
    }

    fn arb_value() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::Int),
            (-1.0e30f64..1.0e30).prop_map(Value::Float),
            ".{0,12}".prop_map(Value::String),
        ];
        leaf.prop_recursive(4, 32, 6, |inner| {
            prop::collection::vec((arb_key(), inner), 0..6)
                .prop_map(|entries| Value::Mapping(entries.into_iter().collect()))
        })
    }

    proptest! {
        #[test]
        fn encoded_documents_decode_to_themselves(
            entries in prop::collection::vec((arb_key(), arb_value()), 0..6)
        ) {
            let doc: Mapping = entries.into_iter().collect();
            let decoded = decode(&to_file_contents(&doc)).unwrap();
            prop_assert_eq!(decoded, doc);
        }
    }
}
