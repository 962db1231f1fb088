//! Field-level comparison of desired and observed check state.

use crate::mapper::{DesiredCheck, FieldValue};
use crate::observed::ObservedCheck;
use pingdom_client::CheckType;
use serde_json::Value;
use std::fmt;

/// Where a field lives in a Pingdom check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldLocation {
    /// Root of the check object
    TopLevel,
    /// Nested under `type.<check_type>`
    TypeSpecific,
}

/// One field that has to change
#[derive(Debug, Clone, PartialEq)]
pub struct FieldChange {
    /// Setting name as Pingdom spells it
    pub key: String,
    /// `Value::Null` when Pingdom did not report the field
    pub old_value: Value,
    /// Value to send
    pub new_value: Value,
    pub location: FieldLocation,
}

impl fmt::Display for FieldChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} -> {}", self.key, self.old_value, self.new_value)
    }
}

/// Outcome of comparing one desired check with its observed counterpart
#[derive(Debug, Clone, PartialEq)]
pub enum DiffResult {
    /// Differing fields, empty when the check is up-to-date
    Changes(Vec<FieldChange>),
    /// Only `http` checks are managed; nothing was compared
    UnsupportedType(CheckType),
}

#[cfg(test)]
impl DiffResult {
    pub fn changes(&self) -> &[FieldChange] {
        match self {
            DiffResult::Changes(changes) => changes,
            DiffResult::UnsupportedType(_) => &[],
        }
    }
}

/// Compare desired and observed state.
///
/// Each annotation field is looked up in both namespaces independently, so a
/// key that exists at the root and under the type may yield two changes.
/// Keys Pingdom does not report in either place are left alone.
pub fn diff(desired: &DesiredCheck, observed: &ObservedCheck) -> DiffResult {
    if observed.check_type != CheckType::Http {
        return DiffResult::UnsupportedType(observed.check_type);
    }

    let mut changes = Vec::new();

    let encryption = FieldValue::Bool(desired.encryption);
    let observed_encryption = observed.type_fields.get("encryption").unwrap_or(&Value::Null);
    if !encryption.matches(observed_encryption) {
        changes.push(FieldChange {
            key: "encryption".to_string(),
            old_value: observed_encryption.clone(),
            new_value: encryption.to_json(),
            location: FieldLocation::TypeSpecific,
        });
    }

    if let Some(hostname) = desired.primary_hostname() {
        if hostname != observed.hostname {
            changes.push(FieldChange {
                key: "hostname".to_string(),
                old_value: Value::String(observed.hostname.clone()),
                new_value: Value::String(hostname.to_string()),
                location: FieldLocation::TopLevel,
            });
        }
    }

    for (key, value) in &desired.fields {
        if let Some(current) = observed.top_level_fields.get(key) {
            if !value.matches(current) {
                changes.push(FieldChange {
                    key: key.clone(),
                    old_value: current.clone(),
                    new_value: value.to_json(),
                    location: FieldLocation::TopLevel,
                });
            }
        }
        if let Some(current) = observed.type_fields.get(key) {
            if !value.matches(current) {
                changes.push(FieldChange {
                    key: key.clone(),
                    old_value: current.clone(),
                    new_value: value.to_json(),
                    location: FieldLocation::TypeSpecific,
                });
            }
        }
    }

    DiffResult::Changes(changes)
}
