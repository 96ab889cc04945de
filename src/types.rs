use std::fmt;

use crate::value::Value;

/// Desired-value token meaning "remove this key" instead of "set this key".
pub const DELETE_SENTINEL: &str = "--delete--";

/// Settings-file token for an explicitly empty value. An empty cell means
/// "no value here" and falls back to the default column instead.
pub const EMPTY_SENTINEL: &str = "--empty--";

/// Outcome of a handler. Starts at `NotExecuted`; `apply()` moves it once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Status {
    #[default]
    NotExecuted,
    /// A write occurred.
    Done,
    /// The desired state already held; nothing was written.
    AlreadyInPlace,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::NotExecuted => "not_executed",
            Status::Done => "done",
            Status::AlreadyInPlace => "already_in_place",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Info,
    Skipped,
    Error,
}

/// A log line attached to a handler during `apply()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub text: String,
    pub kind: MessageKind,
}

impl Message {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: MessageKind::Info,
        }
    }

    pub fn skipped(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: MessageKind::Skipped,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: MessageKind::Error,
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// What a handler should make true at its target.
#[derive(Debug, Clone, PartialEq)]
pub enum DesiredValue {
    Set(Value),
    Delete,
}

impl DesiredValue {
    /// Interpret a raw settings-file value; [`DELETE_SENTINEL`] becomes `Delete`.
    pub fn from_raw(raw: &str) -> Self {
        if raw == DELETE_SENTINEL {
            DesiredValue::Delete
        } else {
            DesiredValue::Set(Value::String(raw.to_string()))
        }
    }
}

impl fmt::Display for DesiredValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DesiredValue::Set(v) => write!(f, "{v}"),
            DesiredValue::Delete => f.write_str(DELETE_SENTINEL),
        }
    }
}

/// One resolved row of the settings file: which handler, its three
/// parameters, and the value for the selected environment.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HandlerSpec {
    pub handler: String,
    pub param1: String,
    pub param2: String,
    pub param3: String,
    pub value: String,
}

/// A run operation, independent of any CLI framework.
/// The CLI layer converts parsed clap args into this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunAction {
    /// Validate every handler without touching targets.
    Check,
    /// List the handlers that would run.
    DryRun,
    /// Apply every handler, commit store writes, print results.
    Apply,
}
