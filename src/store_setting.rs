//! `StoreSetting`: one `(scope, scope_id, path) -> value` row in the
//! settings store.
//!
//! The handler never writes to the store itself. It stages a [`Write`] into
//! the run's transaction and the processor commits once at the end.

use crate::error::EnvapplyError;
use crate::handler::{ApplyContext, Handler, HandlerState};
use crate::store::{StoreKey, Write};
use crate::types::{DesiredValue, HandlerSpec, Message, Status};
use crate::value::Value;

const DEFAULT_SCOPE: &str = "default";

#[derive(Debug, Clone)]
pub struct StoreSetting {
    scope: String,
    scope_id: String,
    path: String,
    desired: DesiredValue,
    state: HandlerState,
}

impl StoreSetting {
    pub const NAME: &'static str = "StoreSetting";

    pub fn new(key: StoreKey, desired: DesiredValue) -> Self {
        Self {
            scope: key.scope,
            scope_id: key.scope_id.to_string(),
            path: key.path,
            desired,
            state: HandlerState::default(),
        }
    }

    pub fn from_spec(spec: &HandlerSpec) -> Self {
        Self {
            scope: spec.param1.clone(),
            scope_id: spec.param2.clone(),
            path: spec.param3.clone(),
            desired: DesiredValue::from_raw(&spec.value),
            state: HandlerState::default(),
        }
    }

    /// The row this handler targets. Empty scope means `default`, empty
    /// scope id means `0`.
    pub fn key(&self) -> Result<StoreKey, EnvapplyError> {
        if self.path.is_empty() {
            return Err(EnvapplyError::InvalidSpec(
                "No setting path defined in Param3".into(),
            ));
        }
        let scope_id = match self.scope_id.trim() {
            "" => 0,
            id => id.parse::<i64>().map_err(|_| {
                EnvapplyError::InvalidSpec(format!("Scope id \"{id}\" is not an integer"))
            })?,
        };
        let scope = if self.scope.is_empty() {
            DEFAULT_SCOPE
        } else {
            &self.scope
        };
        Ok(StoreKey::new(scope, scope_id, &self.path))
    }

    fn run(&mut self, ctx: &mut ApplyContext<'_>) -> Result<(), EnvapplyError> {
        let key = self.key()?;
        let current = ctx.current(&key)?;

        let status = match (&self.desired, current) {
            (DesiredValue::Set(desired), Some(current))
                if Value::String(current.clone()).loosely_equals(desired) =>
            {
                self.state.add_message(Message::skipped(format!(
                    "Value \"{desired}\" is already in place. Skipping."
                )));
                Status::AlreadyInPlace
            }
            (DesiredValue::Set(desired), current) => {
                self.state.add_message(Message::info(format!(
                    "Updated value from \"{}\" to \"{desired}\"",
                    current.unwrap_or_default()
                )));
                tracing::info!(row = %key, "store setting staged");
                ctx.stage(Write::Set {
                    key,
                    value: desired.to_string(),
                });
                Status::Done
            }
            (DesiredValue::Delete, Some(_)) => {
                self.state.add_message(Message::info("Row deleted"));
                tracing::info!(row = %key, "store row delete staged");
                ctx.stage(Write::Delete { key });
                Status::Done
            }
            (DesiredValue::Delete, None) => {
                self.state
                    .add_message(Message::skipped("Row not present. Skipping."));
                Status::AlreadyInPlace
            }
        };
        self.state.finish(status);
        Ok(())
    }
}

impl Handler for StoreSetting {
    fn kind(&self) -> &'static str {
        Self::NAME
    }

    fn params(&self) -> [&str; 3] {
        [&self.scope, &self.scope_id, &self.path]
    }

    fn state(&self) -> &HandlerState {
        &self.state
    }

    fn check(&self) -> Result<(), EnvapplyError> {
        self.key().map(drop)
    }

    fn apply(&mut self, ctx: &mut ApplyContext<'_>) -> Result<(), EnvapplyError> {
        let result = self.run(ctx);
        self.state.record(result)
    }
}
