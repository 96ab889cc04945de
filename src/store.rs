//! Transactional settings store: the database side of a run.
//!
//! Store-backed handlers never write directly. They stage [`Write`]s into
//! the run's [`Transaction`], which the processor commits exactly once after
//! every handler succeeded. If any handler fails the transaction is dropped,
//! so nothing staged during that run reaches the store.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::EnvapplyError;

/// Address of a settings row.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StoreKey {
    pub scope: String,
    pub scope_id: i64,
    pub path: String,
}

impl StoreKey {
    pub fn new(scope: impl Into<String>, scope_id: i64, path: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            scope_id,
            path: path.into(),
        }
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.scope, self.scope_id, self.path)
    }
}

/// A staged change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Write {
    Set { key: StoreKey, value: String },
    Delete { key: StoreKey },
}

impl Write {
    pub fn key(&self) -> &StoreKey {
        match self {
            Write::Set { key, .. } | Write::Delete { key } => key,
        }
    }
}

/// Ordered writes pending for one run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Transaction {
    writes: Vec<Write>,
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&mut self, write: Write) {
        self.writes.push(write);
    }

    /// Last staged state of `key`: `Some(Some(v))` set, `Some(None)` deleted,
    /// `None` untouched by this transaction.
    pub fn pending(&self, key: &StoreKey) -> Option<Option<&str>> {
        self.writes
            .iter()
            .rev()
            .find(|w| w.key() == key)
            .map(|w| match w {
                Write::Set { value, .. } => Some(value.as_str()),
                Write::Delete { .. } => None,
            })
    }

    pub fn writes(&self) -> &[Write] {
        &self.writes
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    fn apply_to(self, rows: &mut BTreeMap<StoreKey, String>) {
        for write in self.writes {
            match write {
                Write::Set { key, value } => {
                    rows.insert(key, value);
                }
                Write::Delete { key } => {
                    rows.remove(&key);
                }
            }
        }
    }
}

/// A store that can be read row by row and committed to in one step.
pub trait SettingsStore {
    fn get(&self, key: &StoreKey) -> Result<Option<String>, EnvapplyError>;

    /// Make every staged write durable. Committing an empty transaction is a no-op.
    fn commit(&mut self, transaction: Transaction) -> Result<(), EnvapplyError>;
}

/// In-process store, mainly for tests and embedding.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    rows: BTreeMap<StoreKey, String>,
    commits: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_row(mut self, key: StoreKey, value: impl Into<String>) -> Self {
        self.rows.insert(key, value.into());
        self
    }

    pub fn row(&self, key: &StoreKey) -> Option<&str> {
        self.rows.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of `commit` calls that reached this store.
    pub fn commit_count(&self) -> usize {
        self.commits
    }
}

impl SettingsStore for MemoryStore {
    fn get(&self, key: &StoreKey) -> Result<Option<String>, EnvapplyError> {
        Ok(self.rows.get(key).cloned())
    }

    fn commit(&mut self, transaction: Transaction) -> Result<(), EnvapplyError> {
        self.commits += 1;
        transaction.apply_to(&mut self.rows);
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Row {
    scope: String,
    scope_id: i64,
    path: String,
    value: String,
}

/// Store persisted as a JSON array of `{scope, scope_id, path, value}` rows.
///
/// The whole file is read on open and rewritten on commit.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    rows: BTreeMap<StoreKey, String>,
}

impl JsonFileStore {
    /// Open a store file. A missing file is an empty store; it is created on
    /// the first commit.
    pub fn open(path: &Path) -> Result<Self, EnvapplyError> {
        let rows = match std::fs::read_to_string(path) {
            Ok(content) => {
                let rows: Vec<Row> =
                    serde_json::from_str(&content).map_err(|e| EnvapplyError::ParseError {
                        path: path.to_path_buf(),
                        line: e.line(),
                        column: e.column(),
                        reason: e.to_string(),
                    })?;
                rows.into_iter()
                    .map(|r| (StoreKey::new(r.scope, r.scope_id, r.path), r.value))
                    .collect()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(EnvapplyError::IoError {
                    path: path.to_path_buf(),
                    source: e,
                });
            }
        };
        Ok(Self {
            path: path.to_path_buf(),
            rows,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_error(&self, source: std::io::Error) -> EnvapplyError {
        EnvapplyError::WriteError {
            path: self.path.clone(),
            source,
        }
    }
}

fn rows_to_json(rows: &BTreeMap<StoreKey, String>) -> Result<String, serde_json::Error> {
    let rows: Vec<Row> = rows
        .iter()
        .map(|(key, value)| Row {
            scope: key.scope.clone(),
            scope_id: key.scope_id,
            path: key.path.clone(),
            value: value.clone(),
        })
        .collect();
    let mut json = serde_json::to_string_pretty(&rows)?;
    json.push('\n');
    Ok(json)
}

impl SettingsStore for JsonFileStore {
    fn get(&self, key: &StoreKey) -> Result<Option<String>, EnvapplyError> {
        Ok(self.rows.get(key).cloned())
    }

    fn commit(&mut self, transaction: Transaction) -> Result<(), EnvapplyError> {
        if transaction.is_empty() {
            return Ok(());
        }
        let mut rows = self.rows.clone();
        transaction.apply_to(&mut rows);

        // Rows are only replaced once the file holds them.
        let json = rows_to_json(&rows).map_err(|e| self.write_error(std::io::Error::other(e)))?;
        std::fs::write(&self.path, json).map_err(|e| self.write_error(e))?;
        self.rows = rows;
        Ok(())
    }
}
