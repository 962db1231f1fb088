//! Canonical mapping from annotated Ingress resources to desired check state.
//!
//! Every `pingdom-operator.io/<key>` annotation becomes one typed field. The
//! coercion table is fixed: a handful of keys are booleans or integers, a few
//! keys are translated into the list-shaped settings Pingdom expects, and every
//! other key passes through as a string.

use crate::ingress::RawResource;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Prefix shared by all annotations the operator reads
pub const ANNOTATION_PREFIX: &str = "pingdom-operator.io/";

const BOOL_KEYS: &[&str] = &["ipv6", "encryption", "notifywhenbackup", "paused", "verify_certificate"];

const INT_KEYS: &[&str] = &[
    "port",
    "notifyagainevery",
    "resolution",
    "responsetime_threshold",
    "sendnotificationwhendown",
    "ssl_down_days_before",
];

/// Check intervals Pingdom accepts, in minutes, largest first
const SUPPORTED_RESOLUTIONS: [i64; 5] = [60, 30, 15, 5, 1];

const PROBE_REGIONS: &[&str] = &["EU", "NA", "APAC", "LATAM"];

/// Annotation value that cannot be coerced to its declared type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid value {value:?} for annotation pingdom-operator.io/{key}: {reason}")]
pub struct ValidationError {
    /// Annotation key without the prefix
    pub key: String,
    /// Raw annotation value as declared
    pub value: String,
    pub reason: String,
}

impl ValidationError {
    fn new(key: &str, value: &str, reason: impl Into<String>) -> Self {
        Self {
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Typed annotation value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// One of the fixed boolean keys
    Bool(bool),
    /// One of the fixed integer keys
    Int(i64),
    /// Any other key, passed through verbatim
    Str(String),
    /// Comma-separated ids, e.g. `integrationids`
    IntList(Vec<i64>),
    /// String list, e.g. `probe_filters`
    StrList(Vec<String>),
}

impl FieldValue {
    /// JSON form used in update payloads
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Bool(b) => Value::Bool(*b),
            FieldValue::Int(i) => Value::from(*i),
            FieldValue::Str(s) => Value::String(s.clone()),
            FieldValue::IntList(l) => Value::from(l.clone()),
            FieldValue::StrList(l) => Value::from(l.clone()),
        }
    }

    /// Type-aware comparison against a value reported by Pingdom.
    ///
    /// Pingdom is not consistent about scalar encodings, so a bool or integer
    /// sent back as a string still compares equal, and a passthrough string
    /// matches the textual form of a number or bool.
    pub fn matches(&self, observed: &Value) -> bool {
        match (self, observed) {
            (FieldValue::Bool(b), Value::Bool(o)) => b == o,
            (FieldValue::Bool(b), Value::String(s)) => parse_bool(s) == Some(*b),
            (FieldValue::Int(i), Value::Number(n)) => n.as_i64() == Some(*i),
            (FieldValue::Int(i), Value::String(s)) => s.trim().parse::<i64>().ok() == Some(*i),
            (FieldValue::Str(s), Value::String(o)) => s == o,
            (FieldValue::Str(s), Value::Number(n)) => s.trim() == n.to_string(),
            (FieldValue::Str(s), Value::Bool(b)) => s.trim() == b.to_string(),
            (FieldValue::IntList(l), Value::Array(a)) => {
                l.len() == a.len() && l.iter().zip(a).all(|(i, v)| v.as_i64() == Some(*i))
            }
            (FieldValue::StrList(l), Value::Array(a)) => {
                l.len() == a.len() && l.iter().zip(a).all(|(s, v)| v.as_str() == Some(s.as_str()))
            }
            _ => false,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

/// Intended state of one check, derived from one Ingress
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredCheck {
    /// Check name to match on, from `pingdom-operator.io/name`
    pub match_name: Option<String>,
    /// Distinct hosts in declaration order. Only the first one is ever
    /// matched or written.
    pub hostnames: Vec<String>,
    /// TLS declared on the Ingress, unless overridden by annotation
    pub encryption: bool,
    /// Coerced annotations, keyed as Pingdom names the setting
    pub fields: BTreeMap<String, FieldValue>,
}

impl DesiredCheck {
    /// Get the host used for matching and for the `hostname` setting
    pub fn primary_hostname(&self) -> Option<&str> {
        self.hostnames.first().map(String::as_str)
    }
}

/// Map one resource to its desired check.
///
/// `encryption` starts from the resource's TLS configuration and is then
/// overridden by an explicit `encryption` annotation.
pub fn map_resource(resource: &RawResource) -> Result<DesiredCheck, ValidationError> {
    let mut hostnames: Vec<String> = Vec::with_capacity(resource.hostnames.len());
    for host in &resource.hostnames {
        if !host.is_empty() && !hostnames.contains(host) {
            hostnames.push(host.clone());
        }
    }

    let mut desired = DesiredCheck {
        match_name: None,
        hostnames,
        encryption: resource.tls,
        fields: BTreeMap::new(),
    };

    for (annotation, raw) in &resource.annotations {
        let Some(key) = annotation.strip_prefix(ANNOTATION_PREFIX) else {
            continue;
        };

        match key {
            "" => continue,
            "name" => {
                let name = raw.trim();
                if !name.is_empty() {
                    desired.match_name = Some(name.to_string());
                }
            }
            "encryption" => {
                desired.encryption = coerce_bool(key, raw)?;
            }
            "integrations" => {
                desired.fields.insert("integrationids".to_string(), coerce_integrations(key, raw)?);
            }
            "region" => {
                desired.fields.insert("probe_filters".to_string(), coerce_region(key, raw)?);
            }
            _ => {
                desired.fields.insert(key.to_string(), coerce(key, raw)?);
            }
        }
    }

    Ok(desired)
}

/// Apply the fixed coercion table to one annotation value
pub fn coerce(key: &str, raw: &str) -> Result<FieldValue, ValidationError> {
    if BOOL_KEYS.contains(&key) {
        return coerce_bool(key, raw).map(FieldValue::Bool);
    }
    if INT_KEYS.contains(&key) {
        let value = raw
            .trim()
            .parse::<i64>()
            .map_err(|e| ValidationError::new(key, raw, format!("expected an integer ({})", e)))?;
        if key == "resolution" {
            return normalize_resolution(value)
                .map(FieldValue::Int)
                .ok_or_else(|| ValidationError::new(key, raw, "check interval must be at least 1 minute"));
        }
        return Ok(FieldValue::Int(value));
    }
    Ok(FieldValue::Str(raw.to_string()))
}

fn parse_bool(raw: &str) -> Option<bool> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("true") {
        Some(true)
    } else if raw.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn coerce_bool(key: &str, raw: &str) -> Result<bool, ValidationError> {
    parse_bool(raw).ok_or_else(|| ValidationError::new(key, raw, "expected \"true\" or \"false\""))
}

/// Round a requested interval down to one Pingdom supports
fn normalize_resolution(minutes: i64) -> Option<i64> {
    SUPPORTED_RESOLUTIONS.iter().copied().find(|supported| minutes >= *supported)
}

fn coerce_integrations(key: &str, raw: &str) -> Result<FieldValue, ValidationError> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| {
            id.parse::<i64>()
                .map_err(|_| ValidationError::new(key, raw, format!("integration id {:?} is not an integer", id)))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(FieldValue::IntList)
}

fn coerce_region(key: &str, raw: &str) -> Result<FieldValue, ValidationError> {
    let region = raw.trim();
    if !PROBE_REGIONS.contains(&region) {
        return Err(ValidationError::new(
            key,
            raw,
            format!("region must be one of {}", PROBE_REGIONS.join(", ")),
        ));
    }
    Ok(FieldValue::StrList(vec![format!("region: {}", region)]))
}
