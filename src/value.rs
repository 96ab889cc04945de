//! In-memory model of a settings document: ordered mappings with scalar leaves.
//!
//! Keys follow PHP array-key rules so that a document decoded from a
//! `return [...]` file addresses the same slots the application would:
//! integer keys and string keys are distinct, and a string that spells a
//! canonical integer (`"0"`, `"42"`, `"-7"`) *is* that integer.

use std::fmt;

use indexmap::IndexMap;

/// Insertion-ordered mapping. The only container type in a document.
pub type Mapping = IndexMap<Key, Value>;

/// A mapping key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    Int(i64),
    Str(String),
}

impl Key {
    /// Build a key from a path segment or string literal, normalizing
    /// canonical decimal integers to [`Key::Int`].
    pub fn from_segment(segment: &str) -> Key {
        match canonical_int(segment) {
            Some(i) => Key::Int(i),
            None => Key::Str(segment.to_string()),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Int(i) => write!(f, "{i}"),
            Key::Str(s) => write!(f, "{s}"),
        }
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::from_segment(s)
    }
}

impl From<i64> for Key {
    fn from(i: i64) -> Self {
        Key::Int(i)
    }
}

/// `"0"`, `"17"`, `"-3"` are canonical; `"01"`, `"+1"`, `"-0"`, `" 1"` are not.
fn canonical_int(s: &str) -> Option<i64> {
    let digits = s.strip_prefix('-').unwrap_or(s);
    let canonical = match digits.as_bytes() {
        [] => false,
        [b'0'] => !s.starts_with('-'),
        [first, rest @ ..] => {
            (b'1'..=b'9').contains(first) && rest.iter().all(u8::is_ascii_digit)
        }
    };
    if canonical { s.parse().ok() } else { None }
}

/// A node of a settings document.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Mapping(Mapping),
}

impl Value {
    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Value::Mapping(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_mapping_mut(&mut self) -> Option<&mut Mapping> {
        match self {
            Value::Mapping(m) => Some(m),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::String(s) => !(s.is_empty() || s == "0"),
            Value::Mapping(m) => !m.is_empty(),
        }
    }

    fn as_number(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::String(s) => numeric_string(s),
            _ => None,
        }
    }

    /// Loose comparison with the semantics settings files were written
    /// against: `"8080"` equals `8080`, `null` equals `""`, and so on.
    ///
    /// Used to decide whether a desired value is already in place.
    pub fn loosely_equals(&self, other: &Value) -> bool {
        use Value::*;
        match (self, other) {
            (Null, Null) => true,
            (Null, String(s)) | (String(s), Null) => s.is_empty(),
            (Null, v) | (v, Null) => !v.is_truthy(),
            (Bool(b), v) | (v, Bool(b)) => *b == v.is_truthy(),
            (Int(a), Int(b)) => a == b,
            (Mapping(a), Mapping(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .all(|(k, v)| b.get(k).is_some_and(|w| v.loosely_equals(w)))
            }
            (Mapping(_), _) | (_, Mapping(_)) => false,
            (String(a), String(b)) => match (numeric_string(a), numeric_string(b)) {
                (Some(x), Some(y)) => x == y,
                _ => a == b,
            },
            (String(s), n) | (n, String(s)) => match numeric_string(s) {
                Some(x) => n.as_number() == Some(x),
                None => n.to_string() == *s,
            },
            (a, b) => a.as_number() == b.as_number(),
        }
    }
}

/// Numeric-string check: optional surrounding whitespace, sign, digits,
/// fraction and exponent. `inf`, `nan` and hex are not numeric.
fn numeric_string(s: &str) -> Option<f64> {
    let t = s.trim();
    if t.is_empty()
        || !t.bytes().any(|b| b.is_ascii_digit())
        || !t
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-'))
    {
        return None;
    }
    t.parse().ok()
}

/// Plain-text rendering used in handler messages.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::String(s) => write!(f, "{s}"),
            Value::Mapping(m) => {
                write!(f, "[")?;
                for (i, (k, v)) in m.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k} => {v}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<Mapping> for Value {
    fn from(m: Mapping) -> Self {
        Value::Mapping(m)
    }
}
