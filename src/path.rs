//! Dotted key paths and the resolver that walks them into a document.
//!
//! [`resolve`] is deliberately *creating*: missing intermediate mappings and
//! a missing terminal key are inserted as it walks, and it hands back a
//! [`Slot`] addressing `(parent mapping, final key)` so callers can read,
//! compare, overwrite or remove without walking again. Because of that,
//! never resolve against a document you do not intend to write back.

use std::fmt;

use crate::error::EnvapplyError;
use crate::value::{Key, Mapping, Value};

/// A non-empty sequence of key segments, parsed from `"foo.bar"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPath {
    raw: String,
    segments: Vec<String>,
}

impl KeyPath {
    /// Split a dotted path. Empty input and empty segments are rejected.
    pub fn parse(raw: &str) -> Result<Self, EnvapplyError> {
        if raw.is_empty() {
            return Err(EnvapplyError::InvalidPath {
                path: raw.into(),
                reason: "no path defined, use \"foo.bar\" for [\"foo\"][\"bar\"]".into(),
            });
        }
        let segments: Vec<String> = raw.split('.').map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            return Err(EnvapplyError::InvalidPath {
                path: raw.into(),
                reason: "path contains an empty segment".into(),
            });
        }
        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Writable handle to the terminal slot of a resolved path.
#[derive(Debug)]
pub struct Slot<'a> {
    parent: &'a mut Mapping,
    key: Key,
}

impl Slot<'_> {
    pub fn key(&self) -> &Key {
        &self.key
    }

    /// Current value; `Null` when the key is absent (e.g. after [`Slot::remove`]).
    pub fn get(&self) -> &Value {
        self.parent.get(&self.key).unwrap_or(&Value::Null)
    }

    pub fn set(&mut self, value: Value) -> Value {
        self.parent
            .insert(self.key.clone(), value)
            .unwrap_or(Value::Null)
    }

    /// Remove the key from its parent, keeping the order of its siblings.
    pub fn remove(&mut self) -> Option<Value> {
        self.parent.shift_remove(&self.key)
    }
}

/// Walk `path` into `root`, creating what is missing, and return the terminal slot.
///
/// A non-terminal segment that is absent or `null` becomes an empty mapping.
/// A non-terminal segment holding any other non-mapping value cannot be
/// descended into and yields [`EnvapplyError::InvalidPath`].
pub fn resolve<'a>(root: &'a mut Mapping, path: &KeyPath) -> Result<Slot<'a>, EnvapplyError> {
    let (leaf, parents) = path
        .segments()
        .split_last()
        .ok_or_else(|| EnvapplyError::InvalidPath {
            path: path.to_string(),
            reason: "empty path".into(),
        })?;

    let mut current = root;
    for segment in parents {
        let entry = current
            .entry(Key::from_segment(segment))
            .or_insert(Value::Null);
        if entry.is_null() {
            *entry = Value::Mapping(Mapping::new());
        }
        current = match entry {
            Value::Mapping(m) => m,
            other => {
                return Err(EnvapplyError::InvalidPath {
                    path: path.to_string(),
                    reason: format!(
                        "'{segment}' holds {}, not a mapping",
                        describe(other)
                    ),
                });
            }
        };
    }

    let key = Key::from_segment(leaf);
    current.entry(key.clone()).or_insert(Value::Null);
    Ok(Slot {
        parent: current,
        key,
    })
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Int(_) => "an integer",
        Value::Float(_) => "a float",
        Value::String(_) => "a string",
        Value::Mapping(_) => "a mapping",
    }
}
