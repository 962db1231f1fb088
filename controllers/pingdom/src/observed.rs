//! Observed state of a remote check.

use pingdom_client::{CheckDetails, CheckType, PingdomError};
use serde_json::{Map, Value};

/// A check as last described by Pingdom, split into the two namespaces the
/// differ compares against.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservedCheck {
    pub id: u64,
    pub name: String,
    pub hostname: String,
    pub check_type: CheckType,
    /// Settings nested under `type.<check_type>`
    pub type_fields: Map<String, Value>,
    /// Everything else at the root of the check
    pub top_level_fields: Map<String, Value>,
}

impl TryFrom<CheckDetails> for ObservedCheck {
    type Error = PingdomError;

    fn try_from(details: CheckDetails) -> Result<Self, Self::Error> {
        let (check_type, type_fields) = details.check_type()?;
        let type_fields = type_fields.clone();

        Ok(Self {
            id: details.id,
            name: details.name,
            hostname: details.hostname,
            check_type,
            type_fields,
            top_level_fields: details.fields,
        })
    }
}
