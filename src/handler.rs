//! The handler abstraction: one declarative change against one target.
//!
//! A handler is built from a [`HandlerSpec`] row, may be `check()`ed any
//! number of times (read-only), and is `apply()`ed at most once by the
//! processor. Applying sets its [`Status`] and appends [`Message`]s.
//!
//! Handler types, by the name used in the settings file:
//!
//! | Name | Target | `param1` | `param2` | `param3` |
//! |------|--------|----------|----------|----------|
//! | `PhpReturnFile` | PHP `return [...]` file | file | dotted key path | must be empty |
//! | `TomlFile` | TOML file | file | dotted key path | must be empty |
//! | `StoreSetting` | settings store row | scope | scope id | setting path |

use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::path::Path;

use crate::error::EnvapplyError;
use crate::path::KeyPath;
use crate::php_file::PhpReturnFile;
use crate::store::{SettingsStore, StoreKey, Transaction, Write};
use crate::store_setting::StoreSetting;
use crate::toml_file::TomlFile;
use crate::types::{HandlerSpec, Message, Status};

pub trait Handler {
    /// Handler type name as written in the settings file.
    fn kind(&self) -> &'static str;

    fn params(&self) -> [&str; 3];

    fn state(&self) -> &HandlerState;

    /// Validate parameters and target preconditions. Never mutates anything.
    fn check(&self) -> Result<(), EnvapplyError>;

    /// Make the target match the desired value.
    fn apply(&mut self, ctx: &mut ApplyContext<'_>) -> Result<(), EnvapplyError>;

    fn label(&self) -> String {
        let [p1, p2, p3] = self.params();
        format!("{}: {p1} / {p2} / {p3}", self.kind())
    }

    fn status(&self) -> Status {
        self.state().status()
    }

    fn messages(&self) -> &[Message] {
        self.state().messages()
    }
}

/// Status and message log shared by every handler type.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct HandlerState {
    status: Status,
    messages: Vec<Message>,
}

impl HandlerState {
    pub fn status(&self) -> Status {
        self.status
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn add_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Record the terminal status of an `apply()`.
    pub fn finish(&mut self, status: Status) {
        debug_assert_ne!(status, Status::NotExecuted);
        self.status = status;
    }

    /// Pass `result` through, logging an error message if it failed.
    pub fn record<T>(&mut self, result: Result<T, EnvapplyError>) -> Result<T, EnvapplyError> {
        if let Err(e) = &result {
            self.add_message(Message::error(e.to_string()));
        }
        result
    }
}

/// What a handler can reach while applying: the run's transaction and,
/// when configured, the store it will be committed to.
pub struct ApplyContext<'a> {
    store: Option<&'a dyn SettingsStore>,
    transaction: &'a mut Transaction,
}

impl<'a> ApplyContext<'a> {
    pub fn new(store: Option<&'a dyn SettingsStore>, transaction: &'a mut Transaction) -> Self {
        Self { store, transaction }
    }

    pub fn has_store(&self) -> bool {
        self.store.is_some()
    }

    /// Current value of a row as this run sees it: staged writes first,
    /// then the committed store.
    pub fn current(&self, key: &StoreKey) -> Result<Option<String>, EnvapplyError> {
        if let Some(pending) = self.transaction.pending(key) {
            return Ok(pending.map(str::to_string));
        }
        self.store
            .ok_or(EnvapplyError::StoreUnavailable)?
            .get(key)
    }

    pub fn stage(&mut self, write: Write) {
        self.transaction.stage(write);
    }
}

/// Build the handler a settings row names. `None` for unknown handler types.
pub fn build(spec: &HandlerSpec) -> Option<Box<dyn Handler>> {
    let handler: Box<dyn Handler> = match spec.handler.as_str() {
        PhpReturnFile::NAME => Box::new(PhpReturnFile::from_spec(spec)),
        TomlFile::NAME => Box::new(TomlFile::from_spec(spec)),
        StoreSetting::NAME => Box::new(StoreSetting::from_spec(spec)),
        _ => return None,
    };
    Some(handler)
}

/// Preconditions shared by the file handlers. Returns the parsed key path.
pub(crate) fn check_file_target(
    file: &Path,
    path: &str,
    param3: &str,
) -> Result<KeyPath, EnvapplyError> {
    if !file.is_file() {
        return Err(EnvapplyError::TargetMissing(file.to_path_buf()));
    }
    // Ask the OS whether this process may write. Append mode never truncates.
    if let Err(e) = OpenOptions::new().append(true).open(file) {
        return Err(match e.kind() {
            ErrorKind::PermissionDenied | ErrorKind::ReadOnlyFilesystem => {
                EnvapplyError::TargetNotWritable(file.to_path_buf())
            }
            _ => EnvapplyError::IoError {
                path: file.to_path_buf(),
                source: e,
            },
        });
    }
    if path.is_empty() {
        return Err(EnvapplyError::InvalidSpec(
            "No path defined, use \"foo.bar\" for [\"foo\"][\"bar\"]".into(),
        ));
    }
    if !param3.is_empty() {
        return Err(EnvapplyError::InvalidSpec(
            "Param3 is not used in this handler and must be empty".into(),
        ));
    }
    KeyPath::parse(path)
}
