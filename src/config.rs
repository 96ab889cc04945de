//! Run configuration: which settings file, which environment, which store.
//!
//! [`RunConfig`] is a `confique` struct filled from three sparse layers,
//! highest priority first:
//!
//! ```text
//! Overrides         --environment, --settings, ... (dotted key/value pairs)
//! Environment vars  ENVAPPLY_ENVIRONMENT, ENVAPPLY_GROUPS=db,web, ...
//! Config file       ./envapply.toml or --config <file>
//! ```
//!
//! Defaults from `#[config(default)]` fill whatever no layer sets.
//! [`resolve`] does no I/O; [`load_run_config`] gathers the inputs.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use confique::Config;
use confique::meta::{FieldKind, Meta};
use toml::{Table, Value};

use crate::error::{EnvapplyError, line_column};
use crate::registry::RegistryOptions;

pub const DEFAULT_CONFIG_FILE: &str = "envapply.toml";
pub const ENV_PREFIX: &str = "ENVAPPLY_";

#[derive(Config, Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// The CSV settings file.
    pub settings_file: Option<PathBuf>,

    /// Environment column to apply.
    pub environment: Option<String>,

    /// Column used when the environment cell is empty.
    #[config(default = "DEFAULT")]
    pub default_environment: String,

    /// Only apply rows in one of these groups.
    #[config(default = [])]
    pub groups: Vec<String>,

    /// Skip rows in any of these groups.
    #[config(default = [])]
    pub exclude_groups: Vec<String>,

    /// Fall back to the default column when the environment is not in the
    /// settings file.
    #[config(default = false)]
    pub skip_missing_environment: bool,

    /// JSON settings store for `StoreSetting` rows.
    pub store: Option<PathBuf>,
}

impl RunConfig {
    pub fn settings_file(&self) -> Result<&Path, EnvapplyError> {
        self.settings_file
            .as_deref()
            .ok_or(EnvapplyError::MissingSetting("settings file"))
    }

    pub fn registry_options(&self) -> Result<RegistryOptions, EnvapplyError> {
        let environment = self
            .environment
            .as_deref()
            .filter(|e| !e.is_empty())
            .ok_or(EnvapplyError::MissingSetting("environment"))?;
        Ok(RegistryOptions {
            environment: environment.to_string(),
            default_environment: self.default_environment.clone(),
            groups: split_list(&self.groups),
            exclude_groups: split_list(&self.exclude_groups),
            skip_missing_environment: self.skip_missing_environment,
        })
    }
}

/// Entries may themselves be comma-separated (`groups = ["db,web"]`).
fn split_list(entries: &[String]) -> Vec<String> {
    entries
        .iter()
        .flat_map(|e| e.split(','))
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(str::to_string)
        .collect()
}

/// Pre-loaded inputs for [`resolve`].
#[derive(Debug, Default)]
pub struct ConfigInput {
    /// Config file path and contents.
    pub file: Option<(PathBuf, String)>,
    /// Raw environment (pass `std::env::vars().collect()` or synthetic pairs).
    pub env_vars: Vec<(String, String)>,
    /// `(dotted_key, value)` pairs, later entries win.
    pub overrides: Vec<(String, Value)>,
}

/// Merge the layers of `input` into a [`RunConfig`]. No I/O happens here.
pub fn resolve(input: ConfigInput) -> Result<RunConfig, EnvapplyError> {
    let known = valid_keys(&RunConfig::META);
    let mut merged = Table::new();

    if let Some((path, content)) = &input.file {
        let table: Table = toml::from_str(content).map_err(|e| {
            let (line, column) = e
                .span()
                .map(|span| line_column(content, span.start))
                .unwrap_or((1, 1));
            EnvapplyError::ParseError {
                path: path.clone(),
                line,
                column,
                reason: e.message().to_string(),
            }
        })?;
        if let Some(key) = table.keys().find(|k| !known.contains(k.as_str())) {
            return Err(EnvapplyError::UnknownKey {
                key: key.clone(),
                path: path.clone(),
                line: find_key_line(content, key),
            });
        }
        merged.extend(table);
    }

    merged.extend(env_to_table(input.env_vars, &known));
    merged.extend(overrides_to_table(&input.overrides)?);

    let layer: <RunConfig as Config>::Layer =
        Value::Table(merged)
            .try_into()
            .map_err(|e: toml::de::Error| EnvapplyError::InvalidValue {
                key: "<merged>".into(),
                reason: e.to_string(),
            })?;

    RunConfig::builder()
        .preloaded(layer)
        .load()
        .map_err(EnvapplyError::from)
}

/// Read the config file and process environment, then [`resolve`].
///
/// An explicit `config_file` must exist; the default `envapply.toml` in the
/// working directory is optional.
pub fn load_run_config(
    config_file: Option<&Path>,
    overrides: Vec<(String, Value)>,
) -> Result<RunConfig, EnvapplyError> {
    let file = match config_file {
        Some(path) => Some((path.to_path_buf(), read_config(path)?)),
        None => {
            let path = PathBuf::from(DEFAULT_CONFIG_FILE);
            if path.is_file() {
                let content = read_config(&path)?;
                Some((path, content))
            } else {
                None
            }
        }
    };
    if let Some((path, _)) = &file {
        tracing::debug!(file = %path.display(), "run config file loaded");
    }
    resolve(ConfigInput {
        file,
        env_vars: std::env::vars().collect(),
        overrides,
    })
}

fn read_config(path: &Path) -> Result<String, EnvapplyError> {
    std::fs::read_to_string(path).map_err(|e| EnvapplyError::IoError {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Top-level keys of a confique `Meta`, i.e. the names a layer may set.
fn valid_keys(meta: &Meta) -> HashSet<&'static str> {
    meta.fields
        .iter()
        .filter(|f| matches!(f.kind, FieldKind::Leaf { .. }))
        .map(|f| f.name)
        .collect()
}

/// Build a table from `ENVAPPLY_*` variables whose lowercased remainder
/// names a config key. List keys take comma-separated values.
fn env_to_table(
    vars: impl IntoIterator<Item = (String, String)>,
    known: &HashSet<&str>,
) -> Table {
    let mut table = Table::new();
    for (key, value) in vars {
        let Some(rest) = key.strip_prefix(ENV_PREFIX) else {
            continue;
        };
        let name = rest.to_lowercase();
        if !known.contains(name.as_str()) {
            continue;
        }
        let value = match name.as_str() {
            "groups" | "exclude_groups" => Value::Array(
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|g| !g.is_empty())
                    .map(|g| Value::String(g.to_string()))
                    .collect(),
            ),
            "skip_missing_environment" => parse_env_bool(value),
            _ => Value::String(value),
        };
        table.insert(name, value);
    }
    table
}

/// `true`/`false` in any case; anything else stays a string and fails
/// deserialization with the key named.
fn parse_env_bool(s: String) -> Value {
    if s.eq_ignore_ascii_case("true") {
        Value::Boolean(true)
    } else if s.eq_ignore_ascii_case("false") {
        Value::Boolean(false)
    } else {
        Value::String(s)
    }
}

/// Expand `("a.b", v)` pairs into nested tables. Last entry wins.
pub fn overrides_to_table(entries: &[(String, Value)]) -> Result<Table, EnvapplyError> {
    let mut table = Table::new();
    for (dotted_key, value) in entries {
        let mut segments: Vec<&str> = dotted_key.split('.').collect();
        let Some(leaf) = segments.pop() else {
            continue;
        };
        let mut current = &mut table;
        for segment in segments {
            current = current
                .entry(segment)
                .or_insert_with(|| Value::Table(Table::new()))
                .as_table_mut()
                .ok_or_else(|| EnvapplyError::InvalidValue {
                    key: dotted_key.clone(),
                    reason: format!("'{segment}' is already set to a non-table value"),
                })?;
        }
        current.insert(leaf.to_string(), value.clone());
    }
    Ok(table)
}

/// 1-indexed line of a top-level `key = ...` assignment, 0 if not found.
fn find_key_line(content: &str, key: &str) -> usize {
    content
        .lines()
        .position(|line| {
            line.trim()
                .strip_prefix(key)
                .is_some_and(|rest| rest.trim_start().starts_with('='))
        })
        .map_or(0, |i| i + 1)
}
