//! Mock PingdomClient for unit testing
//!
//! This module provides a mock implementation of PingdomClientTrait that can be used
//! in unit tests without network access. Checks live in memory, every call is
//! counted, and failures can be injected per operation.

use crate::common::ApiResponse;
use crate::error::PingdomError;
use crate::models::*;
use crate::pingdom_trait::PingdomClientTrait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Mock PingdomClient for testing
///
/// Clones share state, so a test can keep a handle while the code under test
/// owns another.
#[derive(Clone)]
pub struct MockPingdomClient {
    pub(crate) checks: Arc<Mutex<BTreeMap<u64, CheckDetails>>>,
    pub(crate) metadata: Arc<Mutex<ResponseMetadata>>,
    pub(crate) list_failure: Arc<Mutex<Option<(u16, String)>>>,
    pub(crate) get_failures: Arc<Mutex<HashMap<u64, (u16, String)>>>,
    pub(crate) update_failures: Arc<Mutex<HashMap<u64, (u16, String)>>>,
    pub(crate) last_list_tags: Arc<Mutex<Vec<String>>>,
    list_calls: Arc<AtomicUsize>,
    get_calls: Arc<AtomicUsize>,
    update_calls: Arc<AtomicUsize>,
}

impl MockPingdomClient {
    /// Create a new mock client
    pub fn new() -> Self {
        Self {
            checks: Arc::new(Mutex::new(BTreeMap::new())),
            metadata: Arc::new(Mutex::new(ResponseMetadata::default())),
            list_failure: Arc::new(Mutex::new(None)),
            get_failures: Arc::new(Mutex::new(HashMap::new())),
            update_failures: Arc::new(Mutex::new(HashMap::new())),
            last_list_tags: Arc::new(Mutex::new(Vec::new())),
            list_calls: Arc::new(AtomicUsize::new(0)),
            get_calls: Arc::new(AtomicUsize::new(0)),
            update_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Add a check to the mock store (for test setup)
    pub fn add_check(&self, check: CheckDetails) {
        self.checks.lock().unwrap().insert(check.id, check);
    }

    /// Current stored state of a check
    pub fn stored_check(&self, id: u64) -> Option<CheckDetails> {
        self.checks.lock().unwrap().get(&id).cloned()
    }

    /// Headers returned with every successful response
    pub fn set_metadata(&self, metadata: ResponseMetadata) {
        *self.metadata.lock().unwrap() = metadata;
    }

    /// Make `list_checks` fail with the given status until cleared
    pub fn fail_list(&self, status: u16, body: impl Into<String>) {
        *self.list_failure.lock().unwrap() = Some((status, body.into()));
    }

    pub fn clear_list_failure(&self) {
        *self.list_failure.lock().unwrap() = None;
    }

    /// Make `get_check` fail for one id
    pub fn fail_get(&self, id: u64, status: u16, body: impl Into<String>) {
        self.get_failures.lock().unwrap().insert(id, (status, body.into()));
    }

    /// Make `update_check` fail for one id
    pub fn fail_update(&self, id: u64, status: u16, body: impl Into<String>) {
        self.update_failures.lock().unwrap().insert(id, (status, body.into()));
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    /// Tags passed to the most recent `list_checks` call
    pub fn last_list_tags(&self) -> Vec<String> {
        self.last_list_tags.lock().unwrap().clone()
    }

    fn respond<T>(&self, body: T) -> ApiResponse<T> {
        ApiResponse::new(body, self.metadata.lock().unwrap().clone())
    }

    fn summary(check: &CheckDetails) -> CheckSummary {
        CheckSummary {
            id: check.id,
            name: check.name.clone(),
            hostname: check.hostname.clone(),
            check_type: check.type_config.keys().next().cloned(),
            status: Some("up".to_string()),
        }
    }

    /// Merge a partial update into a stored check the way Pingdom applies it
    fn merge_payload(check: &mut CheckDetails, payload: &serde_json::Value) -> Result<(), PingdomError> {
        let payload = payload.as_object().ok_or_else(|| {
            PingdomError::Api {
                status: 400,
                body: "payload must be a JSON object".to_string(),
            }
        })?;

        for (key, value) in payload {
            match key.as_str() {
                "type" => {
                    let types = value.as_object().ok_or_else(|| PingdomError::Api {
                        status: 400,
                        body: "type must be a JSON object".to_string(),
                    })?;
                    for (type_key, settings) in types {
                        let target = check
                            .type_config
                            .entry(type_key.clone())
                            .or_insert_with(|| serde_json::json!({}));
                        if let (Some(target), Some(settings)) = (target.as_object_mut(), settings.as_object()) {
                            for (k, v) in settings {
                                target.insert(k.clone(), v.clone());
                            }
                        }
                    }
                }
                "hostname" => {
                    check.hostname = value.as_str().unwrap_or_default().to_string();
                }
                "name" => {
                    check.name = value.as_str().unwrap_or_default().to_string();
                }
                _ => {
                    check.fields.insert(key.clone(), value.clone());
                }
            }
        }
        Ok(())
    }
}

impl Default for MockPingdomClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl PingdomClientTrait for MockPingdomClient {
    async fn list_checks(&self, tags: &[String]) -> Result<ApiResponse<Vec<CheckSummary>>, PingdomError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_list_tags.lock().unwrap() = tags.to_vec();

        if let Some((status, body)) = self.list_failure.lock().unwrap().clone() {
            return Err(PingdomError::Api { status, body });
        }

        let summaries = self
            .checks
            .lock()
            .unwrap()
            .values()
            .map(Self::summary)
            .collect();
        Ok(self.respond(summaries))
    }

    async fn get_check(&self, id: u64) -> Result<ApiResponse<CheckDetails>, PingdomError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);

        if let Some((status, body)) = self.get_failures.lock().unwrap().get(&id).cloned() {
            return Err(PingdomError::Api { status, body });
        }

        let check = self
            .checks
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or_else(|| PingdomError::NotFound(format!("Check {} not found", id)))?;
        Ok(self.respond(check))
    }

    async fn update_check(&self, id: u64, payload: &serde_json::Value) -> Result<ApiResponse<CheckDetails>, PingdomError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);

        if let Some((status, body)) = self.update_failures.lock().unwrap().get(&id).cloned() {
            return Err(PingdomError::Api { status, body });
        }

        let mut checks = self.checks.lock().unwrap();
        let check = checks
            .get_mut(&id)
            .ok_or_else(|| PingdomError::NotFound(format!("Check {} not found", id)))?;
        Self::merge_payload(check, payload)?;
        let updated = check.clone();
        drop(checks);

        Ok(self.respond(updated))
    }
}

/// Build a check for test setup
///
/// `type_settings` and `fields` must be JSON objects; anything else is stored empty.
pub fn make_check(
    id: u64,
    name: &str,
    hostname: &str,
    check_type: CheckType,
    type_settings: serde_json::Value,
    fields: serde_json::Value,
) -> CheckDetails {
    let mut type_config = serde_json::Map::new();
    type_config.insert(
        check_type.as_str().to_string(),
        serde_json::Value::Object(type_settings.as_object().cloned().unwrap_or_default()),
    );
    CheckDetails {
        id,
        name: name.to_string(),
        hostname: hostname.to_string(),
        type_config,
        fields: fields.as_object().cloned().unwrap_or_default(),
    }
}
