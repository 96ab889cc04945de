//! `PhpReturnFile`: set or delete one value inside a PHP `return [...]` file.
//!
//! The file is decoded with [`codec`](crate::codec), the value is located
//! with [`path::resolve`], and, only if something changed, the whole
//! document is written back in canonical form. Applying the same set
//! handler again is a no-op reporting `already_in_place`; a delete always
//! counts as a change.

use std::path::{Path, PathBuf};

use crate::codec;
use crate::error::EnvapplyError;
use crate::handler::{ApplyContext, Handler, HandlerState, check_file_target};
use crate::path::{self, KeyPath};
use crate::types::{DesiredValue, HandlerSpec, Message, Status};
use crate::value::{Mapping, Value};

#[derive(Debug, Clone)]
pub struct PhpReturnFile {
    param1: String,
    file: PathBuf,
    path: String,
    param3: String,
    desired: DesiredValue,
    state: HandlerState,
}

impl PhpReturnFile {
    pub const NAME: &'static str = "PhpReturnFile";

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
        let mut doc = read_document(&self.file)?;

        let changed = match &self.desired {
            DesiredValue::Delete => {
                remove_path(&mut doc, &key_path)?;
                self.state.add_message(Message::info("Path removed"));
                true
            }
            DesiredValue::Set(desired) => {
                let mut slot = path::resolve(&mut doc, &key_path)?;
                if slot.get().loosely_equals(desired) {
                    self.state.add_message(Message::skipped(format!(
                        "Value \"{desired}\" is already in place. Skipping."
                    )));
                    false
                } else {
                    let previous = slot.set(desired.clone());
                    self.state.add_message(Message::info(format!(
                        "Updated value from \"{previous}\" to \"{desired}\""
                    )));
                    true
                }
            }
        };

        if changed {
            std::fs::write(&self.file, codec::to_file_contents(&doc)).map_err(|source| {
                EnvapplyError::WriteError {
                    path: self.file.clone(),
                    source,
                }
            })?;
            tracing::info!(file = %self.file.display(), path = %key_path, "php file updated");
            self.state.finish(Status::Done);
        } else {
            tracing::debug!(file = %self.file.display(), path = %key_path, "value already in place");
            self.state.finish(Status::AlreadyInPlace);
        }
        Ok(())
    }
}

impl Handler for PhpReturnFile {
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

fn read_document(file: &Path) -> Result<Mapping, EnvapplyError> {
    let content = std::fs::read_to_string(file).map_err(|e| EnvapplyError::IoError {
        path: file.to_path_buf(),
        source: e,
    })?;
    codec::decode(&content).map_err(|e| e.in_file(file))
}

/// Remove the terminal key of `key_path` without creating anything on the
/// way. A path whose parents do not exist has nothing to remove.
fn remove_path(doc: &mut Mapping, key_path: &KeyPath) -> Result<Option<Value>, EnvapplyError> {
    let Some((leaf, parents)) = key_path.segments().split_last() else {
        return Ok(None);
    };
    let mut current = doc;
    for segment in parents {
        current = match current.get_mut(&crate::value::Key::from_segment(segment)) {
            Some(Value::Mapping(m)) => m,
            None | Some(Value::Null) => return Ok(None),
            Some(_) => {
                return Err(EnvapplyError::InvalidPath {
                    path: key_path.to_string(),
                    reason: format!("'{segment}' does not hold a mapping"),
                });
            }
        };
    }
    Ok(current.shift_remove(&crate::value::Key::from_segment(leaf)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::{ENV_PHP, apply_without_store, php_spec, write_file};
    use crate::types::MessageKind;
    use crate::value::Key;
    use std::fs;
    use tempfile::TempDir;

    fn handler(file: &Path, path: &str, value: &str) -> PhpReturnFile {
        PhpReturnFile::from_spec(&php_spec(file, path, value))
    }

    fn doc_at(file: &Path) -> Mapping {
        codec::decode(&fs::read_to_string(file).unwrap()).unwrap()
    }

    fn get<'a>(doc: &'a Mapping, path: &[&str]) -> Option<&'a Value> {
        let (leaf, parents) = path.split_last()?;
        let mut current = doc;
        for p in parents {
            current = current.get(&Key::from_segment(p))?.as_mapping()?;
        }
        current.get(&Key::from_segment(leaf))
    }

    #[test]
    fn updates_existing_value() {
        let dir = TempDir::new().unwrap();
        let file = write_file(dir.path(), "env.php", ENV_PHP);

        let mut h = handler(&file, "db.host", "new");
        apply_without_store(&mut h).unwrap();

        assert_eq!(h.status(), Status::Done);
        assert_eq!(h.messages()[0].kind, MessageKind::Info);
        assert_eq!(h.messages()[0].text, "Updated value from \"old\" to \"new\"");
        let doc = doc_at(&file);
        assert_eq!(get(&doc, &["db", "host"]), Some(&Value::from("new")));
        assert_eq!(get(&doc, &["db", "port"]), Some(&Value::Int(3306)));
    }

    #[test]
    fn value_already_in_place_skips_write() {
        let dir = TempDir::new().unwrap();
        let original = "<?php\n// keep me\nreturn array('db' => array('host' => 'old'));\n";
        let file = write_file(dir.path(), "env.php", original);

        let mut h = handler(&file, "db.host", "old");
        apply_without_store(&mut h).unwrap();

        assert_eq!(h.status(), Status::AlreadyInPlace);
        assert_eq!(h.messages()[0].kind, MessageKind::Skipped);
        assert_eq!(
            h.messages()[0].text,
            "Value \"old\" is already in place. Skipping."
        );
        assert_eq!(fs::read_to_string(&file).unwrap(), original);
    }

    #[test]
    fn loose_comparison_against_typed_values() {
        let dir = TempDir::new().unwrap();
        let file = write_file(dir.path(), "env.php", ENV_PHP);

        let mut h = handler(&file, "db.port", "3306");
        apply_without_store(&mut h).unwrap();
        assert_eq!(h.status(), Status::AlreadyInPlace);
    }

    #[test]
    fn second_apply_is_a_no_op() {
        let dir = TempDir::new().unwrap();
        let file = write_file(dir.path(), "env.php", ENV_PHP);

        let mut first = handler(&file, "db.host", "new");
        apply_without_store(&mut first).unwrap();
        let after_first = fs::read(&file).unwrap();

        let mut second = handler(&file, "db.host", "new");
        apply_without_store(&mut second).unwrap();

        assert_eq!(first.status(), Status::Done);
        assert_eq!(second.status(), Status::AlreadyInPlace);
        assert_eq!(fs::read(&file).unwrap(), after_first);
    }

    #[test]
    fn creates_missing_key_with_typed_value() {
        let dir = TempDir::new().unwrap();
        let file = write_file(dir.path(), "env.php", ENV_PHP);

        let mut h = PhpReturnFile::new(&file, "db.flags", DesiredValue::Set(Value::Bool(true)));
        apply_without_store(&mut h).unwrap();

        assert_eq!(h.status(), Status::Done);
        let doc = doc_at(&file);
        assert_eq!(get(&doc, &["db", "flags"]), Some(&Value::Bool(true)));
        assert!(fs::read_to_string(&file).unwrap().contains("'flags' => true"));
    }

    #[test]
    fn creates_missing_intermediates_only() {
        let dir = TempDir::new().unwrap();
        let file = write_file(dir.path(), "env.php", ENV_PHP);
        let before = doc_at(&file);

        let mut h = handler(&file, "cache.frontend.default.backend", "redis");
        apply_without_store(&mut h).unwrap();

        let after = doc_at(&file);
        assert_eq!(after.len(), before.len() + 1);
        assert_eq!(after[&Key::from("db")], before[&Key::from("db")]);
        assert_eq!(after[&Key::from("modules")], before[&Key::from("modules")]);
        let cache = after[&Key::from("cache")].as_mapping().unwrap();
        let frontend = cache[&Key::from("frontend")].as_mapping().unwrap();
        let default = frontend[&Key::from("default")].as_mapping().unwrap();
        assert_eq!((cache.len(), frontend.len(), default.len()), (1, 1, 1));
        assert_eq!(default[&Key::from("backend")], Value::from("redis"));
    }

    #[test]
    fn delete_removes_present_key() {
        let dir = TempDir::new().unwrap();
        let file = write_file(dir.path(), "env.php", ENV_PHP);

        let mut h = handler(&file, "db.port", "--delete--");
        apply_without_store(&mut h).unwrap();

        assert_eq!(h.status(), Status::Done);
        assert_eq!(h.messages()[0].text, "Path removed");
        let doc = doc_at(&file);
        assert_eq!(get(&doc, &["db", "port"]), None);
        assert_eq!(get(&doc, &["db", "host"]), Some(&Value::from("old")));
    }

    #[test]
    fn delete_of_absent_key_still_counts_as_change() {
        let dir = TempDir::new().unwrap();
        let file = write_file(dir.path(), "env.php", ENV_PHP);

        let mut h = handler(&file, "nothing.here", "--delete--");
        apply_without_store(&mut h).unwrap();

        assert_eq!(h.status(), Status::Done);
        assert_eq!(h.messages()[0].text, "Path removed");
        assert_eq!(fs::read_to_string(&file).unwrap(), ENV_PHP);
    }

    #[test]
    fn path_through_scalar_fails() {
        let dir = TempDir::new().unwrap();
        let file = write_file(dir.path(), "env.php", ENV_PHP);

        let mut h = handler(&file, "db.host.name", "x");
        let err = apply_without_store(&mut h).unwrap_err();

        assert!(matches!(err, EnvapplyError::InvalidPath { .. }));
        assert_eq!(h.status(), Status::NotExecuted);
        assert_eq!(h.messages()[0].kind, MessageKind::Error);
        assert_eq!(fs::read_to_string(&file).unwrap(), ENV_PHP);
    }

    #[test]
    fn unparseable_file_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let file = write_file(dir.path(), "env.php", "<?php return 'nope';\n");
        let mut h = handler(&file, "db.host", "x");
        assert!(matches!(
            apply_without_store(&mut h),
            Err(EnvapplyError::ParseError { .. })
        ));
    }

    #[test]
    fn check_does_not_touch_the_file() {
        let dir = TempDir::new().unwrap();
        let file = write_file(dir.path(), "env.php", ENV_PHP);
        let h = handler(&file, "brand.new.path", "x");
        h.check().unwrap();
        assert_eq!(fs::read_to_string(&file).unwrap(), ENV_PHP);
    }

    #[test]
    fn check_rejects_param3() {
        let dir = TempDir::new().unwrap();
        let file = write_file(dir.path(), "env.php", ENV_PHP);
        let mut spec = php_spec(&file, "db.host", "x");
        spec.param3 = "unused".into();
        assert!(matches!(
            PhpReturnFile::from_spec(&spec).check(),
            Err(EnvapplyError::InvalidSpec(_))
        ));
    }

    #[test]
    fn label_uses_file_as_written() {
        let spec = php_spec(Path::new("app/etc/../etc/env.php"), "db.host", "x");
        assert_eq!(
            PhpReturnFile::from_spec(&spec).label(),
            "PhpReturnFile: app/etc/../etc/env.php / db.host / "
        );
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_file_keeps_its_label() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let file = Path::new(OsStr::from_bytes(b"env-\xff.php"));
        let h = PhpReturnFile::new(file, "db.host", DesiredValue::from_raw("x"));
        assert_eq!(h.label(), "PhpReturnFile: env-\u{fffd}.php / db.host / ");
    }
}
