#[cfg(test)]
pub mod test {
    use std::fs;
    use std::path::{Path, PathBuf};

    use crate::handler::{ApplyContext, Handler};
    use crate::store::Transaction;
    use crate::types::HandlerSpec;

    /// Write `content` to `dir/name` and return the path.
    pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    /// A small `env.php` in canonical layout.
    pub const ENV_PHP: &str = "<?php
return [
    'db' => [
        'host' => 'old',
        'port' => 3306
    ],
    'modules' => [
        'Core',
        'Cache'
    ]
];
";

    pub fn spec(handler: &str, p1: &str, p2: &str, p3: &str, value: &str) -> HandlerSpec {
        HandlerSpec {
            handler: handler.into(),
            param1: p1.into(),
            param2: p2.into(),
            param3: p3.into(),
            value: value.into(),
        }
    }

    pub fn php_spec(file: &Path, path: &str, value: &str) -> HandlerSpec {
        spec("PhpReturnFile", &file.to_string_lossy(), path, "", value)
    }

    /// Apply a handler that needs no settings store.
    pub fn apply_without_store(handler: &mut dyn Handler) -> Result<(), crate::EnvapplyError> {
        let mut tx = Transaction::new();
        let mut ctx = ApplyContext::new(None, &mut tx);
        handler.apply(&mut ctx)
    }

    /// A settings file with two environments and a group column.
    pub fn settings_csv(php_file: &Path) -> String {
        let f = php_file.to_string_lossy();
        format!(
            "Handler,Param1,Param2,Param3,Groups,DEFAULT,dev,production
# database,,,,,,,
PhpReturnFile,{f},db.host,,db,localhost,,db.prod.internal
PhpReturnFile,{f},db.port,,db,3306,,
PhpReturnFile,{f},cache.enabled,,\"cache, perf\",,1,--empty--
StoreSetting,default,0,web/secure/base_url,web,,https://dev.test,https://shop.example
PhpReturnFile,{f},debug,,,--delete--,true,
"
        )
    }
}
