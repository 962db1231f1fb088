//! Process configuration from environment variables.

use crate::error::ControllerError;
use pingdom_client::client::DEFAULT_BASE_URL;
use std::env;
use std::fmt;
use std::time::Duration;

/// Tag every managed check carries, combined with the cluster name
pub const OPERATOR_TAG: &str = "pingdom-operator";

const DEFAULT_CLUSTER_NAME: &str = "default-cluster";
const DEFAULT_PASS_TIMEOUT_SECS: u64 = 300;
const DEFAULT_QUOTA_WARN_THRESHOLD: u64 = 100;

/// Runtime configuration
#[derive(Clone)]
pub struct Config {
    pub bearer_token: String,
    pub cluster_name: String,
    pub dry_run: bool,
    pub pingdom_url: String,
    /// Restrict the Ingress listing to one namespace
    pub namespace: Option<String>,
    pub pass_timeout: Duration,
    /// Warn once the short-window quota drops below this many requests
    pub quota_warn_threshold: u64,
}

impl Config {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ControllerError> {
        let bearer_token = lookup("BEARER_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ControllerError::InvalidConfig(
                "BEARER_TOKEN environment variable is required".to_string()
            ))?;

        let cluster_name = lookup("CLUSTER_NAME")
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CLUSTER_NAME.to_string());

        let dry_run = match lookup("DRY_RUN") {
            Some(raw) => parse_flag("DRY_RUN", &raw)?,
            None => false,
        };

        let pingdom_url = lookup("PINGDOM_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let namespace = lookup("WATCH_NAMESPACE").filter(|ns| !ns.is_empty());

        let pass_timeout = Duration::from_secs(parse_number(
            "PASS_TIMEOUT_SECS",
            lookup("PASS_TIMEOUT_SECS"),
            DEFAULT_PASS_TIMEOUT_SECS,
        )?);
        let quota_warn_threshold = parse_number(
            "QUOTA_WARN_THRESHOLD",
            lookup("QUOTA_WARN_THRESHOLD"),
            DEFAULT_QUOTA_WARN_THRESHOLD,
        )?;

        Ok(Self {
            bearer_token,
            cluster_name,
            dry_run,
            pingdom_url,
            namespace,
            pass_timeout,
            quota_warn_threshold,
        })
    }

    /// Tags used to scope the check listing to this cluster
    pub fn tag_filter(&self) -> Vec<String> {
        vec![OPERATOR_TAG.to_string(), self.cluster_name.clone()]
    }
}

// Leaves out the bearer token.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("cluster_name", &self.cluster_name)
            .field("dry_run", &self.dry_run)
            .field("pingdom_url", &self.pingdom_url)
            .field("namespace", &self.namespace)
            .field("pass_timeout", &self.pass_timeout)
            .field("quota_warn_threshold", &self.quota_warn_threshold)
            .finish_non_exhaustive()
    }
}

fn parse_flag(name: &str, raw: &str) -> Result<bool, ControllerError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" | "" => Ok(false),
        other => Err(ControllerError::InvalidConfig(format!(
            "{} must be true or false, got {:?}",
            name, other
        ))),
    }
}

fn parse_number(name: &str, raw: Option<String>, default: u64) -> Result<u64, ControllerError> {
    match raw {
        Some(raw) => raw.trim().parse::<u64>().map_err(|e| {
            ControllerError::InvalidConfig(format!("{} must be a non-negative integer: {}", name, e))
        }),
        None => Ok(default),
    }
}
