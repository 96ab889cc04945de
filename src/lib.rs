//! Apply per-environment settings to configuration files and settings
//! stores from one CSV source of truth.
//!
//! A settings file lists, row by row, a handler type, three parameters and
//! one value column per environment:
//!
//! ```text
//! Handler,Param1,Param2,Param3,Groups,DEFAULT,dev,production
//! PhpReturnFile,app/etc/env.php,db.host,,db,localhost,,db.prod.internal
//! TomlFile,config/app.toml,server.port,,,8080,,
//! StoreSetting,default,0,web/secure/base_url,web,,https://dev.test,https://shop.example
//! ```
//!
//! ```ignore
//! let registry = HandlerRegistry::from_csv_path(path, &RegistryOptions::new("production"))?;
//! let mut processor = Processor::new(registry).with_output(WriterSink::stdout());
//! processor.check()?;
//! processor.apply(Some(&mut store))?;
//! processor.print_results();
//! ```
//!
//! # Handlers
//!
//! Every row becomes one [`Handler`]: a single declarative change against a
//! single target. `check()` validates without touching anything; `apply()`
//! makes the target match and records a [`Status`]:
//!
//! - `done`: something was written.
//! - `already_in_place`: the target already held the value.
//! - `not_executed`: the handler never ran (or failed).
//!
//! Applying the same settings twice is a no-op the second time. A value of
//! `--delete--` removes the key instead of setting it.
//!
//! # Documents and paths
//!
//! File handlers address values with dotted key paths (`db.connection.host`)
//! into nested mappings. Missing intermediate mappings are created on write;
//! walking through a scalar is an error. `PhpReturnFile` decodes PHP
//! `return [...]` files with the [`codec`] module and writes them back in one
//! canonical layout, so the output is deterministic. `TomlFile` edits TOML
//! in place and keeps comments.
//!
//! # Transactions
//!
//! Store-backed handlers stage writes into one [`Transaction`] per run. The
//! [`Processor`] commits it once, after the last handler succeeded; a failing
//! handler leaves the store untouched.
//!
//! # Error handling
//!
//! All fallible operations return [`EnvapplyError`]. Handler failures
//! surfaced by the processor are wrapped in
//! [`HandlerFailed`](EnvapplyError::HandlerFailed) with the handler's label.

pub mod codec;
pub mod config;
pub mod error;
pub mod handler;
pub mod path;
pub mod php_file;
pub mod processor;
pub mod registry;
pub mod report;
pub mod store;
pub mod store_setting;
pub mod toml_file;
pub mod types;
pub mod value;

#[cfg(feature = "clap")]
mod cli;

#[cfg(test)]
mod fixtures;

#[cfg(feature = "clap")]
pub use cli::{RunArgs, RunSubcommand};
pub use config::{RunConfig, load_run_config};
pub use error::EnvapplyError;
pub use handler::{ApplyContext, Handler, HandlerState};
pub use path::{KeyPath, Slot, resolve};
pub use php_file::PhpReturnFile;
pub use processor::{Processor, RunSummary};
pub use registry::{HandlerRegistry, RegistryOptions};
pub use report::{MemorySink, ReportSink, WriterSink};
pub use store::{JsonFileStore, MemoryStore, SettingsStore, StoreKey, Transaction, Write};
pub use store_setting::StoreSetting;
pub use toml_file::TomlFile;
pub use types::{DesiredValue, HandlerSpec, Message, MessageKind, RunAction, Status};
pub use value::{Key, Mapping, Value};
