//! Pingdom API models
//!
//! These models match the Pingdom 3.1 `/checks` resources.
//! See: https://docs.pingdom.com/api/#tag/Checks

use crate::error::PingdomError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Check protocol type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckType {
    Http,
    HttpCustom,
    Tcp,
    Ping,
    Dns,
    Udp,
    Smtp,
    Pop3,
    Imap,
}

impl CheckType {
    /// Key used for this type in the nested `type` object
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckType::Http => "http",
            CheckType::HttpCustom => "httpcustom",
            CheckType::Tcp => "tcp",
            CheckType::Ping => "ping",
            CheckType::Dns => "dns",
            CheckType::Udp => "udp",
            CheckType::Smtp => "smtp",
            CheckType::Pop3 => "pop3",
            CheckType::Imap => "imap",
        }
    }
}

impl fmt::Display for CheckType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CheckType {
    type Err = PingdomError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "http" => Ok(CheckType::Http),
            "httpcustom" => Ok(CheckType::HttpCustom),
            "tcp" => Ok(CheckType::Tcp),
            "ping" => Ok(CheckType::Ping),
            "dns" => Ok(CheckType::Dns),
            "udp" => Ok(CheckType::Udp),
            "smtp" => Ok(CheckType::Smtp),
            "pop3" => Ok(CheckType::Pop3),
            "imap" => Ok(CheckType::Imap),
            other => Err(PingdomError::InvalidResponse(format!(
                "unknown check type: {}",
                other
            ))),
        }
    }
}

/// Check entry as returned by `GET /checks`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckSummary {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub hostname: String,
    /// Plain type name, e.g. "http" or "ping"
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub check_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Detailed check as returned by `GET /checks/{id}`
///
/// Everything outside `id`, `name`, `hostname` and `type` is kept as raw JSON
/// in `fields`, since the set of settings differs per check type and the
/// operator only compares values it has been asked to manage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckDetails {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub hostname: String,
    /// Single-key object: `{"http": {"port": 443, "encryption": true, ...}}`
    #[serde(rename = "type")]
    pub type_config: serde_json::Map<String, serde_json::Value>,
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl CheckDetails {
    /// Resolve the check type and its type-specific settings
    pub fn check_type(&self) -> Result<(CheckType, &serde_json::Map<String, serde_json::Value>), PingdomError> {
        let (key, value) = self.type_config.iter().next().ok_or_else(|| {
            PingdomError::InvalidResponse(format!("check {} has an empty type object", self.id))
        })?;
        let check_type = key.parse::<CheckType>()?;
        let settings = value.as_object().ok_or_else(|| {
            PingdomError::InvalidResponse(format!(
                "check {} type settings for {} are not an object",
                self.id, key
            ))
        })?;
        Ok((check_type, settings))
    }
}

/// Envelope of `GET /checks`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecksResponse {
    pub checks: Vec<CheckSummary>,
}

/// Envelope of `GET /checks/{id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResponse {
    pub check: CheckDetails,
}

/// Headers of one API response, names lower-cased
///
/// Only carried so quota counters can be read by the caller; the client does
/// not interpret them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseMetadata {
    headers: BTreeMap<String, String>,
}

impl ResponseMetadata {
    /// Build metadata from a reqwest header map, skipping non-UTF-8 values
    pub fn from_headers(headers: &reqwest::header::HeaderMap) -> Self {
        let headers = headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_lowercase(), v.to_string()))
            })
            .collect();
        Self { headers }
    }

    /// Add a header (builder style, used by mocks and tests)
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_lowercase(), value.into());
        self
    }

    /// Look up a header by case-insensitive name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }

    /// Combine with the metadata of an earlier response; headers of `self` win
    pub fn merged_over(mut self, earlier: ResponseMetadata) -> Self {
        for (name, value) in earlier.headers {
            self.headers.entry(name).or_insert(value);
        }
        self
    }
}
