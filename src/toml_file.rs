//! `TomlFile`: set or delete one value in a TOML file, preserving formatting.
//!
//! Uses `toml_edit` for comment-preserving edits: only the touched value
//! changes, and a value that is replaced keeps its surrounding decor (an
//! inline `# comment` after it survives). Missing intermediate tables are
//! created. The file is rewritten only when the document changed.

use std::path::{Path, PathBuf};

use toml_edit::{DocumentMut, InlineTable, Item, Table};

use crate::error::{EnvapplyError, line_column};
use crate::handler::{ApplyContext, Handler, HandlerState, check_file_target};
use crate::path::KeyPath;
use crate::types::{DesiredValue, HandlerSpec, Message, Status};
use crate::value::Value;

/// What [`edit_document`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Updated { from: String, to: String },
    AlreadyInPlace(String),
    Removed,
}

/// Pure function: apply `desired` at `key_path` inside a TOML document string.
///
/// Returns the outcome and, when the document changed, its new text.
pub fn edit_document(
    content: &str,
    key_path: &KeyPath,
    desired: &DesiredValue,
) -> Result<(Outcome, Option<String>), EnvapplyError> {
    let mut doc: DocumentMut = content.parse().map_err(|e: toml_edit::TomlError| {
        let (line, column) = e
            .span()
            .map(|span| line_column(content, span.start))
            .unwrap_or((1, 1));
        EnvapplyError::ParseError {
            path: PathBuf::new(),
            line,
            column,
            reason: e.message().to_string(),
        }
    })?;

    let segments = key_path.segments();
    let (leaf, parents) = segments
        .split_last()
        .ok_or_else(|| EnvapplyError::InvalidPath {
            path: key_path.to_string(),
            reason: "empty path".into(),
        })?;

    let desired = match desired {
        DesiredValue::Delete => {
            remove_item(doc.as_item_mut(), parents, leaf, key_path)?;
            return Ok((Outcome::Removed, Some(doc.to_string())));
        }
        DesiredValue::Set(value) => value,
    };
    let new_value = to_toml_value(desired, key_path)?;

    // Navigate to the key, creating intermediate tables as needed. Inside an
    // inline table only inline tables render, so new intermediates match.
    let mut current: &mut Item = doc.as_item_mut();
    for segment in parents {
        if current.get(segment.as_str()).is_none_or(Item::is_none) {
            let table = if current.is_inline_table() {
                Item::Value(toml_edit::Value::InlineTable(InlineTable::new()))
            } else {
                Item::Table(Table::new())
            };
            current[segment.as_str()] = table;
        }
        if !current[segment.as_str()].is_table_like() {
            return Err(not_a_table(key_path, segment));
        }
        current = &mut current[segment.as_str()];
    }

    let existing = current.get(leaf.as_str()).and_then(Item::as_value);
    if let Some(old) = existing
        && from_toml_value(old) == from_toml_value(&new_value)
    {
        return Ok((Outcome::AlreadyInPlace(display(&new_value)), None));
    }

    let from = existing.map(display).unwrap_or_default();
    let to = display(&new_value);
    let mut new_value = new_value;
    if let Some(old) = existing {
        *new_value.decor_mut() = old.decor().clone();
    }
    current[leaf.as_str()] = Item::Value(new_value);

    Ok((Outcome::Updated { from, to }, Some(doc.to_string())))
}

/// Remove `leaf` under `parents` without creating anything on the way.
fn remove_item(
    root: &mut Item,
    parents: &[String],
    leaf: &str,
    key_path: &KeyPath,
) -> Result<(), EnvapplyError> {
    let mut current = root;
    for segment in parents {
        current = match current.get_mut(segment.as_str()) {
            Some(item) if item.is_table_like() => item,
            None => return Ok(()),
            Some(_) => return Err(not_a_table(key_path, segment)),
        };
    }
    if let Some(table) = current.as_table_like_mut() {
        table.remove(leaf);
    }
    Ok(())
}

fn not_a_table(key_path: &KeyPath, segment: &str) -> EnvapplyError {
    EnvapplyError::InvalidPath {
        path: key_path.to_string(),
        reason: format!("'{segment}' does not hold a table"),
    }
}

/// Type a desired value for TOML. Strings from the settings file get the
/// same heuristics as everywhere else: bool, then integer, then float, then string.
fn to_toml_value(value: &Value, key_path: &KeyPath) -> Result<toml_edit::Value, EnvapplyError> {
    Ok(match value {
        Value::String(s) => parse_toml_edit_value(s),
        Value::Bool(b) => (*b).into(),
        Value::Int(i) => (*i).into(),
        Value::Float(f) => (*f).into(),
        Value::Null | Value::Mapping(_) => {
            return Err(EnvapplyError::InvalidSpec(format!(
                "TOML cannot hold a null or table value at '{key_path}'"
            )));
        }
    })
}

/// Parse a raw string value into a `toml_edit::Value` with type heuristics.
fn parse_toml_edit_value(s: &str) -> toml_edit::Value {
    if s.eq_ignore_ascii_case("true") {
        return true.into();
    }
    if s.eq_ignore_ascii_case("false") {
        return false.into();
    }
    if let Ok(i) = s.parse::<i64>() {
        return i.into();
    }
    if s.contains('.')
        && let Ok(f) = s.parse::<f64>()
    {
        return f.into();
    }
    s.into()
}

/// Typed view of a TOML value for comparison. Arrays, inline tables and
/// datetimes compare by their rendered text.
fn from_toml_value(value: &toml_edit::Value) -> Value {
    match value {
        toml_edit::Value::String(s) => Value::String(s.value().clone()),
        toml_edit::Value::Integer(i) => Value::Int(*i.value()),
        toml_edit::Value::Float(f) => Value::Float(*f.value()),
        toml_edit::Value::Boolean(b) => Value::Bool(*b.value()),
        other => Value::String(display(other)),
    }
}

/// Render a value without its surrounding whitespace and comments.
fn display(value: &toml_edit::Value) -> String {
    match value {
        toml_edit::Value::String(s) => s.value().clone(),
        other => {
            let mut bare = other.clone();
            bare.decor_mut().clear();
            bare.to_string()
        }
    }
}

#[derive(Debug, Clone)]
pub struct TomlFile {
    param1: String,
    file: PathBuf,
    path: String,
    param3: String,
    desired: DesiredValue,
    state: HandlerState,
}

impl TomlFile {
    pub const NAME: &'static str = "TomlFile";

    pub fn new(file: impl Into<PathBuf>, path: impl Into<String>, desired: DesiredValue) -> Self {
        let file = file.into();
        Self {
            param1: file.to_string_lossy().into_owned(),
            file,
            path: path.into(),
            param3: String::new(),
            desired,
            state: HandlerState::default(),
        }
    }

    pub fn from_spec(spec: &HandlerSpec) -> Self {
        Self {
            param1: spec.param1.clone(),
            file: PathBuf::from(&spec.param1),
            path: spec.param2.clone(),
            param3: spec.param3.clone(),
            desired: DesiredValue::from_raw(&spec.value),
            state: HandlerState::default(),
        }
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    fn run(&mut self) -> Result<(), EnvapplyError> {
        let key_path = check_file_target(&self.file, &self.path, &self.param3)?;
        let content = std::fs::read_to_string(&self.file).map_err(|e| EnvapplyError::IoError {
            path: self.file.clone(),
            source: e,
        })?;

        let (outcome, new_content) =
            edit_document(&content, &key_path, &self.desired).map_err(|e| match e {
                EnvapplyError::ParseError {
                    line,
                    column,
                    reason,
                    ..
                } => EnvapplyError::ParseError {
                    path: self.file.clone(),
                    line,
                    column,
                    reason,
                },
                other => other,
            })?;

        self.state.add_message(match &outcome {
            Outcome::Updated { from, to } => {
                Message::info(format!("Updated value from \"{from}\" to \"{to}\""))
            }
            Outcome::AlreadyInPlace(v) => {
                Message::skipped(format!("Value \"{v}\" is already in place. Skipping."))
            }
            Outcome::Removed => Message::info("Path removed"),
        });

        match new_content {
            Some(new_content) => {
                std::fs::write(&self.file, new_content).map_err(|source| {
                    EnvapplyError::WriteError {
                        path: self.file.clone(),
                        source,
                    }
                })?;
                tracing::info!(file = %self.file.display(), path = %key_path, "toml file updated");
                self.state.finish(Status::Done);
            }
            None => self.state.finish(Status::AlreadyInPlace),
        }
        Ok(())
    }
}

impl Handler for TomlFile {
    fn kind(&self) -> &'static str {
        Self::NAME
    }

    fn params(&self) -> [&str; 3] {
        [self.param1.as_str(), &self.path, &self.param3]
    }

    fn state(&self) -> &HandlerState {
        &self.state
    }

    fn check(&self) -> Result<(), EnvapplyError> {
        check_file_target(&self.file, &self.path, &self.param3).map(drop)
    }

    fn apply(&mut self, _ctx: &mut ApplyContext<'_>) -> Result<(), EnvapplyError> {
        let result = self.run();
        self.state.record(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::{apply_without_store, spec, write_file};
    use std::fs;
    use tempfile::TempDir;

    fn edit(content: &str, path: &str, value: &str) -> (Outcome, Option<String>) {
        edit_document(
            content,
            &KeyPath::parse(path).unwrap(),
            &DesiredValue::from_raw(value),
        )
        .unwrap()
    }

    #[test]
    fn set_existing_key() {
        let content = "port = 8080\nhost = \"localhost\"\n";
        let (outcome, result) = edit(content, "port", "3000");
        let result = result.unwrap();
        assert!(result.contains("port = 3000"));
        assert!(result.contains("host = \"localhost\""));
        assert_eq!(
            outcome,
            Outcome::Updated {
                from: "8080".into(),
                to: "3000".into()
            }
        );
    }

    #[test]
    fn set_nested_key() {
        let content = "[database]\npool_size = 5\n";
        let (_, result) = edit(content, "database.pool_size", "20");
        assert!(result.unwrap().contains("pool_size = 20"));
    }

    #[test]
    fn set_new_key_creates_tables() {
        let content = "port = 8080\n";
        let (_, result) = edit(content, "cache.redis.host", "127.0.0.1");
        let parsed: toml::Table = result.unwrap().parse().unwrap();
        assert_eq!(parsed["cache"]["redis"]["host"].as_str(), Some("127.0.0.1"));
        assert_eq!(parsed["port"].as_integer(), Some(8080));
    }

    #[test]
    fn preserves_comments() {
        let content = "# This is my config\nport = 8080 # the port\n# end\n";
        let (_, result) = edit(content, "port", "3000");
        let result = result.unwrap();
        assert!(result.contains("# This is my config"));
        assert!(result.contains("port = 3000 # the port"));
        assert!(result.contains("# end"));
    }

    #[test]
    fn equal_typed_value_is_already_in_place() {
        let (outcome, result) = edit("debug = true\n", "debug", "true");
        assert_eq!(outcome, Outcome::AlreadyInPlace("true".into()));
        assert!(result.is_none());
    }

    #[test]
    fn string_and_integer_are_not_equal() {
        let (outcome, _) = edit("port = \"8080\"\n", "port", "8080");
        assert!(matches!(outcome, Outcome::Updated { .. }));
    }

    #[test]
    fn delete_removes_key() {
        let (outcome, result) = edit("[db]\nhost = \"x\"\nport = 1\n", "db.host", "--delete--");
        assert_eq!(outcome, Outcome::Removed);
        let result = result.unwrap();
        assert!(!result.contains("host"));
        assert!(result.contains("port = 1"));
    }

    #[test]
    fn scalar_intermediate_is_invalid_path() {
        let err = edit_document(
            "db = \"sqlite\"\n",
            &KeyPath::parse("db.host").unwrap(),
            &DesiredValue::from_raw("x"),
        )
        .unwrap_err();
        assert!(matches!(err, EnvapplyError::InvalidPath { .. }));
    }

    #[test]
    fn set_through_inline_table_creates_inline_tables() {
        let (outcome, result) = edit("db = { host = \"x\" }\n", "db.pool.size", "5");
        assert!(matches!(outcome, Outcome::Updated { .. }));
        let result = result.unwrap();
        let parsed: toml::Table = result.parse().unwrap();
        assert_eq!(parsed["db"]["pool"]["size"].as_integer(), Some(5));
        assert_eq!(parsed["db"]["host"].as_str(), Some("x"));

        let (again, unchanged) = edit(&result, "db.pool.size", "5");
        assert_eq!(again, Outcome::AlreadyInPlace("5".into()));
        assert!(unchanged.is_none());
    }

    #[test]
    fn set_existing_key_in_inline_table() {
        let (outcome, result) = edit("db = { host = \"x\", port = 1 }\n", "db.port", "2");
        assert_eq!(
            outcome,
            Outcome::Updated {
                from: "1".into(),
                to: "2".into()
            }
        );
        let parsed: toml::Table = result.unwrap().parse().unwrap();
        assert_eq!(parsed["db"]["port"].as_integer(), Some(2));
        assert_eq!(parsed["db"]["host"].as_str(), Some("x"));
    }

    #[test]
    fn array_of_tables_intermediate_is_invalid_path() {
        let content = "[[servers]]\nname = \"a\"\n";
        for value in ["b", "--delete--"] {
            let err = edit_document(
                content,
                &KeyPath::parse("servers.name").unwrap(),
                &DesiredValue::from_raw(value),
            )
            .unwrap_err();
            assert!(matches!(err, EnvapplyError::InvalidPath { .. }));
        }
    }

    #[test]
    fn delete_through_inline_table() {
        let (outcome, result) = edit("db = { host = \"x\", port = 1 }\n", "db.host", "--delete--");
        assert_eq!(outcome, Outcome::Removed);
        let parsed: toml::Table = result.unwrap().parse().unwrap();
        assert!(parsed["db"].get("host").is_none());
        assert_eq!(parsed["db"]["port"].as_integer(), Some(1));
    }

    #[test]
    fn display_drops_decor() {
        let (outcome, _) = edit("enabled = [1, 2] # list\n", "enabled", "x");
        assert_eq!(
            outcome,
            Outcome::Updated {
                from: "[1, 2]".into(),
                to: "x".into()
            }
        );
    }

    #[test]
    fn value_parsing_heuristics() {
        assert!(parse_toml_edit_value("42").is_integer());
        assert!(parse_toml_edit_value("TRUE").is_bool());
        assert!(parse_toml_edit_value("1.5").is_float());
        assert!(parse_toml_edit_value("hello").is_str());
    }

    #[test]
    fn handler_applies_once_then_reports_in_place() {
        let dir = TempDir::new().unwrap();
        let file = write_file(dir.path(), "app.toml", "[server]\nport = 80\n");
        let row = spec("TomlFile", &file.to_string_lossy(), "server.port", "", "8080");

        let mut first = TomlFile::from_spec(&row);
        apply_without_store(&mut first).unwrap();
        assert_eq!(first.status(), Status::Done);
        assert_eq!(fs::read_to_string(&file).unwrap(), "[server]\nport = 8080\n");

        let mut second = TomlFile::from_spec(&row);
        apply_without_store(&mut second).unwrap();
        assert_eq!(second.status(), Status::AlreadyInPlace);
    }

    #[test]
    fn handler_inline_table_write_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let file = write_file(dir.path(), "app.toml", "db = { host = \"x\" }\n");
        let row = spec("TomlFile", &file.to_string_lossy(), "db.pool.size", "", "5");

        let mut first = TomlFile::from_spec(&row);
        apply_without_store(&mut first).unwrap();
        assert_eq!(first.status(), Status::Done);
        let parsed: toml::Table = fs::read_to_string(&file).unwrap().parse().unwrap();
        assert_eq!(parsed["db"]["pool"]["size"].as_integer(), Some(5));

        let mut second = TomlFile::from_spec(&row);
        apply_without_store(&mut second).unwrap();
        assert_eq!(second.status(), Status::AlreadyInPlace);
    }

    #[test]
    fn label_uses_file_as_written() {
        let row = spec("TomlFile", "./config/../config/app.toml", "server.port", "", "1");
        assert_eq!(
            TomlFile::from_spec(&row).label(),
            "TomlFile: ./config/../config/app.toml / server.port / "
        );
    }

    #[test]
    fn handler_reports_parse_error_with_file() {
        let dir = TempDir::new().unwrap();
        let file = write_file(dir.path(), "app.toml", "port = = 1\n");
        let mut h = TomlFile::new(&file, "port", DesiredValue::from_raw("1"));
        match apply_without_store(&mut h) {
            Err(EnvapplyError::ParseError { path, line, .. }) => {
                assert_eq!(path, file);
                assert_eq!(line, 1);
            }
            other => panic!("Expected ParseError, got {other:?}"),
        }
    }
}
