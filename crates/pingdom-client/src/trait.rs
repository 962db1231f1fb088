//! PingdomClient trait for mocking
//!
//! This trait abstracts the PingdomClient to enable mocking in unit tests.
//! The concrete PingdomClient implements this trait, and tests can use mock implementations.

use crate::common::ApiResponse;
use crate::error::PingdomError;
use crate::models::*;

/// Trait for Pingdom API client operations
///
/// Every call returns the response metadata next to the body so callers can
/// track quota headers. All async methods must be `Send` to work with Tokio's
/// work-stealing runtime.
#[async_trait::async_trait]
pub trait PingdomClientTrait: Send + Sync {
    /// List checks carrying all of the given tags (no filtering when empty)
    async fn list_checks(&self, tags: &[String]) -> Result<ApiResponse<Vec<CheckSummary>>, PingdomError>;

    /// Fetch the full description of one check
    async fn get_check(&self, id: u64) -> Result<ApiResponse<CheckDetails>, PingdomError>;

    /// Apply a partial update and return the check as stored remotely afterwards
    async fn update_check(&self, id: u64, payload: &serde_json::Value) -> Result<ApiResponse<CheckDetails>, PingdomError>;
}
