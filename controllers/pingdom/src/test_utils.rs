//! Test utilities for unit testing the reconciliation core
//!
//! This module provides helpers for creating test data and setting up test scenarios.

use crate::cache::{CacheSettings, CheckCache, Clock};
use crate::error::ControllerError;
use crate::ingress::{RawResource, ResourceLister};
use crate::mapper::ANNOTATION_PREFIX;
use crate::observed::ObservedCheck;
use crate::rate_limit::RateLimitTracker;
use pingdom_client::mock::make_check;
use pingdom_client::{CheckDetails, CheckType, MockPingdomClient};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Helper to create a test resource
///
/// Annotation keys are given without the `pingdom-operator.io/` prefix.
pub fn create_test_resource(
    name: &str,
    namespace: &str,
    hostnames: &[&str],
    tls: bool,
    annotations: &[(&str, &str)],
) -> RawResource {
    RawResource {
        name: name.to_string(),
        namespace: namespace.to_string(),
        annotations: annotations
            .iter()
            .map(|(k, v)| (format!("{}{}", ANNOTATION_PREFIX, k), v.to_string()))
            .collect(),
        tls,
        hostnames: hostnames.iter().map(|h| h.to_string()).collect(),
    }
}

/// Helper to create an `http` check with no settings
pub fn http_check(id: u64, name: &str, hostname: &str) -> CheckDetails {
    make_check(id, name, hostname, CheckType::Http, json!({}), json!({}))
}

/// Helper to build observed state directly
pub fn observed(
    id: u64,
    check_type: CheckType,
    hostname: &str,
    type_fields: Value,
    top_level_fields: Value,
) -> ObservedCheck {
    ObservedCheck {
        id,
        name: format!("check-{}", id),
        hostname: hostname.to_string(),
        check_type,
        type_fields: type_fields.as_object().cloned().unwrap_or_default(),
        top_level_fields: top_level_fields.as_object().cloned().unwrap_or_default(),
    }
}

/// Check cache over a mock client with default sizes and a frozen clock
pub fn check_cache(mock: &MockPingdomClient) -> CheckCache {
    CheckCache::with_settings(
        mock.clone(),
        vec!["pingdom-operator".to_string(), "test-cluster".to_string()],
        Arc::new(RateLimitTracker::new()),
        CacheSettings::default(),
        Arc::new(FakeClock::new()),
    )
}

/// Manually advanced clock; clones share the same time
#[derive(Clone)]
pub struct FakeClock {
    now: Arc<Mutex<Instant>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            now: Arc::new(Mutex::new(Instant::now())),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap()
    }
}

/// Lister returning a fixed set of resources
pub struct StaticLister {
    resources: Vec<RawResource>,
}

impl StaticLister {
    pub fn new(resources: Vec<RawResource>) -> Self {
        Self { resources }
    }
}

#[async_trait::async_trait]
impl ResourceLister for StaticLister {
    async fn list(&self) -> Result<Vec<RawResource>, ControllerError> {
        Ok(self.resources.clone())
    }
}
