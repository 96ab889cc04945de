//! The settings file: which handlers exist for an environment.
//!
//! A CSV with one header row. `Handler`, `Param1`, `Param2` and `Param3` are
//! required columns, `Groups` is optional, and every other column holds the
//! values of one environment. A row's value is its environment cell, or the
//! default-environment cell when that is empty. Rows left without a value
//! produce no handler.

use std::collections::BTreeSet;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};

use crate::error::EnvapplyError;
use crate::handler::{self, Handler};
use crate::types::{EMPTY_SENTINEL, HandlerSpec};

pub const DEFAULT_ENVIRONMENT: &str = "DEFAULT";

/// How a settings file is read into handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryOptions {
    pub environment: String,
    pub default_environment: String,
    /// Keep only rows sharing one of these groups. Empty keeps every row.
    pub groups: Vec<String>,
    /// Drop rows sharing one of these groups.
    pub exclude_groups: Vec<String>,
    /// Use only the default column when `environment` is not in the file.
    pub skip_missing_environment: bool,
}

impl RegistryOptions {
    pub fn new(environment: impl Into<String>) -> Self {
        Self {
            environment: environment.into(),
            default_environment: DEFAULT_ENVIRONMENT.to_string(),
            groups: Vec::new(),
            exclude_groups: Vec::new(),
            skip_missing_environment: false,
        }
    }
}

/// Ordered handlers of one run, plus the group filters that selected them.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: Vec<Box<dyn Handler>>,
    groups: Vec<String>,
    exclude_groups: Vec<String>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, handler: Box<dyn Handler>) {
        self.handlers.push(handler);
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Handler> {
        self.handlers.iter().map(|h| h.as_ref())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn Handler>> {
        self.handlers.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Included groups; empty when no include filter is active.
    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    pub fn exclude_groups(&self) -> &[String] {
        &self.exclude_groups
    }

    pub fn from_csv_path(path: &Path, options: &RegistryOptions) -> Result<Self, EnvapplyError> {
        let file = std::fs::File::open(path).map_err(|e| EnvapplyError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;
        let registry = Self::from_csv_reader(file, options)?;
        tracing::debug!(
            file = %path.display(),
            handlers = registry.len(),
            environment = %options.environment,
            "settings file loaded"
        );
        Ok(registry)
    }

    pub fn from_csv_reader<R: Read>(
        reader: R,
        options: &RegistryOptions,
    ) -> Result<Self, EnvapplyError> {
        let mut registry = Self {
            handlers: Vec::new(),
            groups: options.groups.clone(),
            exclude_groups: options.exclude_groups.clone(),
        };
        for (line, spec) in read_specs(reader, options)? {
            let handler = handler::build(&spec).ok_or_else(|| EnvapplyError::UnknownHandler {
                name: spec.handler.clone(),
                line,
            })?;
            registry.push(handler);
        }
        Ok(registry)
    }
}

/// Column positions resolved from the header row.
struct Columns {
    handler: usize,
    params: [usize; 3],
    groups: Option<usize>,
    environment: Option<usize>,
    default: Option<usize>,
}

impl Columns {
    fn from_header(
        header: &StringRecord,
        options: &RegistryOptions,
    ) -> Result<Self, EnvapplyError> {
        let find = |name: &str| header.iter().position(|h| h.eq_ignore_ascii_case(name));
        let require =
            |name: &'static str| find(name).ok_or(EnvapplyError::MissingHeaderColumn(name));

        let environment = find(options.environment.as_str());
        if environment.is_none() && !options.skip_missing_environment {
            return Err(EnvapplyError::UnknownEnvironment(options.environment.clone()));
        }
        Ok(Self {
            handler: require("Handler")?,
            params: [require("Param1")?, require("Param2")?, require("Param3")?],
            groups: find("Groups"),
            environment,
            default: find(options.default_environment.as_str()),
        })
    }

    fn value(&self, record: &StringRecord) -> Option<String> {
        let cell = |idx: Option<usize>| idx.and_then(|i| record.get(i)).filter(|v| !v.is_empty());
        let raw = cell(self.environment).or_else(|| cell(self.default))?;
        Some(if raw == EMPTY_SENTINEL {
            String::new()
        } else {
            raw.to_string()
        })
    }
}

/// Resolve every row of a settings file to a [`HandlerSpec`], paired with
/// its line number, without building handlers.
pub fn read_specs<R: Read>(
    reader: R,
    options: &RegistryOptions,
) -> Result<Vec<(u64, HandlerSpec)>, EnvapplyError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .trim(Trim::All)
        .from_reader(reader);

    let mut records = reader.records();
    let header = match records.next() {
        Some(header) => header?,
        None => return Ok(Vec::new()),
    };
    let columns = Columns::from_header(&header, options)?;
    let include: BTreeSet<&str> = options.groups.iter().map(String::as_str).collect();
    let exclude: BTreeSet<&str> = options.exclude_groups.iter().map(String::as_str).collect();

    let mut specs = Vec::new();
    for record in records {
        let record = record?;
        let line = record.position().map_or(0, |p| p.line());
        let handler = record.get(columns.handler).unwrap_or_default();
        if handler.is_empty() || handler.starts_with('#') {
            continue;
        }

        let row_groups: BTreeSet<&str> = columns
            .groups
            .and_then(|i| record.get(i))
            .map(split_groups)
            .unwrap_or_default();
        if !include.is_empty() && row_groups.is_disjoint(&include) {
            continue;
        }
        if !row_groups.is_disjoint(&exclude) {
            continue;
        }

        let Some(value) = columns.value(&record) else {
            tracing::debug!(line, handler, "no value for environment, row skipped");
            continue;
        };
        let [param1, param2, param3] = columns
            .params
            .map(|i| record.get(i).unwrap_or_default().to_string());
        specs.push((
            line,
            HandlerSpec {
                handler: handler.to_string(),
                param1,
                param2,
                param3,
                value,
            },
        ));
    }
    Ok(specs)
}

fn split_groups(cell: &str) -> BTreeSet<&str> {
    cell.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|g| !g.is_empty())
        .collect()
}
