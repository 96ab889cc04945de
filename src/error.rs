use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnvapplyError {
    #[error("Invalid handler specification: {0}")]
    InvalidSpec(String),

    #[error("File \"{}\" does not exist", .0.display())]
    TargetMissing(PathBuf),

    #[error("File \"{}\" is not writeable", .0.display())]
    TargetNotWritable(PathBuf),

    #[error("Failed to parse {path} (line {line}, column {column}): {reason}")]
    ParseError {
        path: PathBuf,
        line: usize,
        column: usize,
        reason: String,
    },

    #[error("Cannot resolve path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Error while writing {path}: {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to read {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("No settings store configured (pass --store or set `store` in the run config)")]
    StoreUnavailable,

    #[error("Error in handler: {label}: {source}")]
    HandlerFailed {
        label: String,
        source: Box<EnvapplyError>,
    },

    #[error("No handler found with given specification: {0}")]
    HandlerNotFound(String),

    #[error("Unknown handler '{name}' on line {line}")]
    UnknownHandler { name: String, line: u64 },

    #[error("Environment '{0}' is not a column of the settings file")]
    UnknownEnvironment(String),

    #[error("Settings file is missing the '{0}' header column")]
    MissingHeaderColumn(&'static str),

    #[error("Failed to read settings file: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration error: {0}")]
    ConfigError(#[from] confique::Error),

    #[error("Unknown key '{key}' in {path} (line {line})")]
    UnknownKey {
        key: String,
        path: PathBuf,
        line: usize,
    },

    #[error("Invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("No {0} configured")]
    MissingSetting(&'static str),
}

impl EnvapplyError {
    /// Wrap an error raised by a handler so the caller sees which one failed.
    pub(crate) fn in_handler(self, label: impl Into<String>) -> Self {
        EnvapplyError::HandlerFailed {
            label: label.into(),
            source: Box::new(self),
        }
    }
}

/// 1-based line and column of a byte offset, for parser spans.
pub(crate) fn line_column(content: &str, offset: usize) -> (usize, usize) {
    let before = &content[..offset.min(content.len())];
    let line = before.matches('\n').count() + 1;
    let column = before.rsplit('\n').next().map_or(0, |l| l.chars().count()) + 1;
    (line, column)
}
