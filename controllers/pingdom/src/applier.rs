//! Applies computed changes to a Pingdom check.

use crate::cache::CheckCache;
use crate::differ::{FieldChange, FieldLocation};
use crate::observed::ObservedCheck;
use pingdom_client::{CheckType, PingdomError};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info};

/// The update call for a check failed
#[derive(Debug, Error)]
#[error("failed to update check {check_id}: {source}")]
pub struct RemoteUpdateError {
    /// Check the update was sent for
    pub check_id: u64,
    #[source]
    pub source: PingdomError,
}

/// What `apply` did
#[derive(Debug, Clone, PartialEq)]
pub enum ApplyResult {
    /// Nothing to change, no request sent
    Noop,
    /// Dry run: the payload that would have been sent
    Simulated { payload: Value },
    /// Update sent; `check` is the state Pingdom confirmed
    Updated { payload: Value, check: ObservedCheck },
}

impl ApplyResult {
    #[cfg(test)]
    pub fn is_noop(&self) -> bool {
        matches!(self, ApplyResult::Noop)
    }

    /// Get whether the update was only reported
    pub fn is_simulated(&self) -> bool {
        matches!(self, ApplyResult::Simulated { .. })
    }
}

/// Build one partial-update payload.
///
/// Top-level changes go to the root, type-specific ones under
/// `type.<check_type>`, mirroring the shape Pingdom describes checks in.
pub fn build_payload(check_type: CheckType, changes: &[FieldChange]) -> Value {
    let mut root = Map::new();
    let mut type_settings = Map::new();

    for change in changes {
        let target = match change.location {
            FieldLocation::TopLevel => &mut root,
            FieldLocation::TypeSpecific => &mut type_settings,
        };
        target.insert(change.key.clone(), change.new_value.clone());
    }

    if !type_settings.is_empty() {
        let mut types = Map::new();
        types.insert(check_type.as_str().to_string(), Value::Object(type_settings));
        root.insert("type".to_string(), Value::Object(types));
    }

    Value::Object(root)
}

/// Sends check updates, or only reports them in dry-run mode
#[derive(Debug, Clone, Copy)]
pub struct Applier {
    dry_run: bool,
}

impl Applier {
    /// Create an applier; `dry_run` suppresses every update call
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    /// Send `changes` as one partial update of `check_id`.
    ///
    /// Empty changes are a no-op and dry-run mode only builds the payload;
    /// neither touches the network.
    pub async fn apply(
        &self,
        checks: &CheckCache,
        check_id: u64,
        check_type: CheckType,
        changes: &[FieldChange],
    ) -> Result<ApplyResult, RemoteUpdateError> {
        if changes.is_empty() {
            debug!("Check {} already up-to-date in Pingdom", check_id);
            return Ok(ApplyResult::Noop);
        }

        let payload = build_payload(check_type, changes);

        if self.dry_run {
            info!("[dry-run] Would update check {} with: {}", check_id, payload);
            return Ok(ApplyResult::Simulated { payload });
        }

        info!("Updating check {} with: {}", check_id, payload);
        let check = checks
            .update(check_id, &payload)
            .await
            .map_err(|source| RemoteUpdateError { check_id, source })?;
        info!("Updated check {} in Pingdom", check_id);

        Ok(ApplyResult::Updated { payload, check })
    }
}
