//! Runs a registry of handlers and reports on them.
//!
//! The processor is the only place that touches the settings store's
//! commit: it owns one [`Transaction`] per `apply()` pass, hands it to every
//! handler through an [`ApplyContext`], and commits it after the last handler
//! succeeded. A failing handler aborts the run before the commit, so store
//! writes staged earlier in that run are dropped. File writes made by earlier
//! handlers stay on disk.

use std::fmt;

use crate::config::RunConfig;
use crate::error::EnvapplyError;
use crate::handler::{ApplyContext, Handler};
use crate::registry::HandlerRegistry;
use crate::report::ReportSink;
use crate::store::{SettingsStore, Transaction};
use crate::types::{RunAction, Status};

const SUMMARY_TITLE: &str = "Status summary:";

pub struct Processor {
    registry: HandlerRegistry,
    output: Option<Box<dyn ReportSink>>,
}

impl Processor {
    pub fn new(registry: HandlerRegistry) -> Self {
        Self {
            registry,
            output: None,
        }
    }

    /// Load the settings file named by `config` for its environment.
    pub fn from_config(config: &RunConfig) -> Result<Self, EnvapplyError> {
        let options = config.registry_options()?;
        let registry = HandlerRegistry::from_csv_path(config.settings_file()?, &options)?;
        Ok(Self::new(registry))
    }

    pub fn with_output(mut self, output: impl ReportSink + 'static) -> Self {
        self.set_output(output);
        self
    }

    pub fn set_output(&mut self, output: impl ReportSink + 'static) {
        self.output = Some(Box::new(output));
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Validate every handler in order, stopping at the first failure.
    pub fn check(&self) -> Result<(), EnvapplyError> {
        for handler in self.registry.iter() {
            tracing::debug!(handler = %handler.label(), "checking");
            handler.check().map_err(|e| e.in_handler(handler.label()))?;
        }
        Ok(())
    }

    /// List what `apply` would run, without running it.
    pub fn dry_run(&mut self) {
        let labels: Vec<String> = self.registry.iter().map(|h| h.label()).collect();
        for label in labels {
            self.output(&label);
        }
    }

    /// Apply every handler in order, then commit store writes once.
    ///
    /// The first failure stops the run and is returned as
    /// [`EnvapplyError::HandlerFailed`]; later handlers stay `not_executed`
    /// and nothing is committed.
    pub fn apply(
        &mut self,
        mut store: Option<&mut dyn SettingsStore>,
    ) -> Result<RunSummary, EnvapplyError> {
        let mut transaction = Transaction::new();
        {
            let mut ctx = ApplyContext::new(store.as_deref(), &mut transaction);
            for handler in self.registry.iter_mut() {
                let label = handler.label();
                tracing::debug!(handler = %label, "applying");
                handler.apply(&mut ctx).map_err(|e| e.in_handler(label))?;
            }
        }

        if let Some(store) = store.as_deref_mut() {
            let writes = transaction.len();
            store.commit(transaction)?;
            tracing::info!(writes, "settings store committed");
        }
        Ok(self.summary())
    }

    /// Dispatch a framework-independent [`RunAction`].
    pub fn run(
        &mut self,
        action: RunAction,
        store: Option<&mut dyn SettingsStore>,
    ) -> Result<(), EnvapplyError> {
        match action {
            RunAction::Check => self.check(),
            RunAction::DryRun => {
                self.dry_run();
                Ok(())
            }
            RunAction::Apply => {
                let result = self.apply(store).map(drop);
                self.print_results();
                result
            }
        }
    }

    /// Find a handler by its type name and parameters.
    pub fn handler(
        &self,
        kind: &str,
        param1: &str,
        param2: &str,
        param3: &str,
    ) -> Result<&dyn Handler, EnvapplyError> {
        self.registry
            .iter()
            .find(|h| h.kind() == kind && h.params() == [param1, param2, param3])
            .ok_or_else(|| {
                EnvapplyError::HandlerNotFound(format!("{kind}, {param1}, {param2}, {param3}"))
            })
    }

    pub fn summary(&self) -> RunSummary {
        let mut by_status: Vec<(Status, Vec<String>)> = Vec::new();
        for handler in self.registry.iter() {
            let status = handler.status();
            match by_status.iter_mut().find(|(s, _)| *s == status) {
                Some((_, labels)) => labels.push(handler.label()),
                None => by_status.push((status, vec![handler.label()])),
            }
        }
        RunSummary {
            by_status,
            groups: self.registry.groups().to_vec(),
            exclude_groups: self.registry.exclude_groups().to_vec(),
        }
    }

    /// Write each executed handler's messages, then the status summary.
    pub fn print_results(&mut self) {
        if self.output.is_none() {
            return;
        }
        let mut lines = Vec::new();
        for handler in self.registry.iter() {
            if handler.status() == Status::NotExecuted {
                continue;
            }
            let label = handler.label();
            let underline = "-".repeat(label.chars().count());
            lines.push(String::new());
            lines.push(label);
            lines.push(underline);
            lines.extend(handler.messages().iter().map(|m| m.text.clone()));
        }
        lines.push(String::new());
        lines.extend(self.summary().to_string().lines().map(str::to_string));

        for line in lines {
            self.output(&line);
        }
    }

    fn output(&mut self, line: &str) {
        if let Some(out) = self.output.as_mut() {
            out.writeln(line);
        }
    }
}

/// Handler labels grouped by status, in first-seen order, plus the group
/// filters of the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub by_status: Vec<(Status, Vec<String>)>,
    pub groups: Vec<String>,
    pub exclude_groups: Vec<String>,
}

impl RunSummary {
    pub fn count(&self, status: Status) -> usize {
        self.by_status
            .iter()
            .find(|(s, _)| *s == status)
            .map_or(0, |(_, labels)| labels.len())
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{SUMMARY_TITLE}")?;
        writeln!(f, "{}", "=".repeat(SUMMARY_TITLE.len()))?;
        for (status, labels) in &self.by_status {
            writeln!(f, "{status}: {} handler(s)", labels.len())?;
        }
        writeln!(f)?;
        if !self.groups.is_empty() {
            writeln!(f, "Groups: {}", self.groups.join(", "))?;
        }
        if !self.exclude_groups.is_empty() {
            writeln!(f, "Excluded groups: {}", self.exclude_groups.join(", "))?;
        }
        Ok(())
    }
}
