//! Clap adapter for envapply.
//!
//! Compiled only with the `clap` Cargo feature (on by default). The library
//! itself never sees clap types: [`RunArgs::into_action()`] turns the parsed
//! subcommand into a [`RunAction`](crate::RunAction), and
//! [`RunArgs::overrides()`] turns the flags into the highest-priority layer
//! of the [run config](crate::config).

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use toml::Value;

use crate::types::RunAction;

/// Apply per-environment settings from a CSV file.
#[derive(Debug, Parser)]
#[command(name = "envapply", version)]
pub struct RunArgs {
    /// Run config file [default: ./envapply.toml when present].
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Environment column to apply (e.g. "production").
    #[arg(short, long, global = true)]
    pub environment: Option<String>,

    /// CSV settings file.
    #[arg(short, long = "settings", global = true)]
    pub settings: Option<PathBuf>,

    /// Only apply rows in these groups (comma-separated).
    #[arg(short, long, global = true, value_delimiter = ',')]
    pub groups: Vec<String>,

    /// Skip rows in these groups (comma-separated).
    #[arg(short = 'x', long, global = true, value_delimiter = ',')]
    pub exclude_groups: Vec<String>,

    /// Use the DEFAULT column when the environment is missing from the settings file.
    #[arg(long, global = true)]
    pub skip_missing_environment: bool,

    /// JSON settings store for StoreSetting rows.
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// More log output on stderr (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub action: RunSubcommand,
}

#[derive(Debug, Subcommand)]
pub enum RunSubcommand {
    /// Validate every handler without changing anything.
    Check,
    /// List the handlers that would run.
    DryRun,
    /// Apply every handler, then commit the settings store.
    Apply,
}

impl RunArgs {
    pub fn into_action(self) -> RunAction {
        match self.action {
            RunSubcommand::Check => RunAction::Check,
            RunSubcommand::DryRun => RunAction::DryRun,
            RunSubcommand::Apply => RunAction::Apply,
        }
    }

    /// Flags that were actually given, as run-config overrides.
    pub fn overrides(&self) -> Vec<(String, Value)> {
        let mut overrides = Vec::new();
        let path = |p: &PathBuf| Value::String(p.to_string_lossy().into_owned());
        let list = |l: &[String]| Value::Array(l.iter().cloned().map(Value::String).collect());

        if let Some(settings) = &self.settings {
            overrides.push(("settings_file".to_string(), path(settings)));
        }
        if let Some(environment) = &self.environment {
            overrides.push(("environment".to_string(), Value::String(environment.clone())));
        }
        if !self.groups.is_empty() {
            overrides.push(("groups".to_string(), list(&self.groups)));
        }
        if !self.exclude_groups.is_empty() {
            overrides.push(("exclude_groups".to_string(), list(&self.exclude_groups)));
        }
        if self.skip_missing_environment {
            overrides.push(("skip_missing_environment".to_string(), Value::Boolean(true)));
        }
        if let Some(store) = &self.store {
            overrides.push(("store".to_string(), path(store)));
        }
        overrides
    }

    /// Log filter directive for the `-v` count.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> RunArgs {
        RunArgs::try_parse_from(args).unwrap()
    }

    #[test]
    fn parse_subcommands() {
        assert_eq!(parse(&["envapply", "check"]).into_action(), RunAction::Check);
        assert_eq!(parse(&["envapply", "dry-run"]).into_action(), RunAction::DryRun);
        assert_eq!(parse(&["envapply", "apply"]).into_action(), RunAction::Apply);
    }

    #[test]
    fn missing_subcommand_errors() {
        assert!(RunArgs::try_parse_from(["envapply"]).is_err());
    }

    #[test]
    fn invalid_subcommand_errors() {
        assert!(RunArgs::try_parse_from(["envapply", "nope"]).is_err());
    }

    #[test]
    fn no_flags_no_overrides() {
        assert!(parse(&["envapply", "apply"]).overrides().is_empty());
    }

    #[test]
    fn flags_become_overrides() {
        let args = parse(&[
            "envapply",
            "apply",
            "-e",
            "production",
            "--settings",
            "settings.csv",
            "--store",
            "store.json",
            "--skip-missing-environment",
        ]);
        let overrides = args.overrides();
        assert!(overrides.contains(&("environment".into(), Value::String("production".into()))));
        assert!(overrides.contains(&("settings_file".into(), Value::String("settings.csv".into()))));
        assert!(overrides.contains(&("store".into(), Value::String("store.json".into()))));
        assert!(overrides.contains(&("skip_missing_environment".into(), Value::Boolean(true))));
    }

    #[test]
    fn groups_are_comma_delimited() {
        let args = parse(&["envapply", "-g", "db,web", "-x", "cache", "apply"]);
        assert_eq!(args.groups, ["db", "web"]);
        assert_eq!(args.exclude_groups, ["cache"]);
        let overrides = args.overrides();
        assert!(overrides.contains(&(
            "groups".into(),
            Value::Array(vec![
                Value::String("db".into()),
                Value::String("web".into())
            ])
        )));
    }

    #[test]
    fn global_flags_after_subcommand() {
        let args = parse(&["envapply", "check", "--config", "run.toml", "-vv"]);
        assert_eq!(args.config, Some(PathBuf::from("run.toml")));
        assert_eq!(args.log_level(), "debug");
    }

    #[test]
    fn default_log_level_is_warn() {
        assert_eq!(parse(&["envapply", "check"]).log_level(), "warn");
    }
}
