//! Pingdom API client
//!
//! Implements the Pingdom REST API client for check operations.
//! Based on Pingdom API 3.1 structure: /checks and /checks/{checkid}

use crate::common::{ApiResponse, HttpClient};
use crate::error::PingdomError;
use crate::models::*;
use crate::pingdom_trait::PingdomClientTrait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Default Pingdom API endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.pingdom.com/api/3.1";

/// Pingdom API client
pub struct PingdomClient {
    http: HttpClient,
}

impl PingdomClient {
    /// Create a new Pingdom client
    ///
    /// # Arguments
    /// * `base_url` - Pingdom API base URL (e.g., "https://api.pingdom.com/api/3.1")
    /// * `token` - Bearer token for authentication
    ///
    /// The token is not validated here; an invalid token surfaces as an
    /// API error on the first request.
    pub fn new(base_url: String, token: String) -> Result<Self, PingdomError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(PingdomError::Http)?;

        Ok(Self {
            http: HttpClient::new(client, base_url, token),
        })
    }

    /// Path of the check list, with the tag filter applied
    fn checks_path(&self, tags: &[String]) -> String {
        if tags.is_empty() {
            return "/checks".to_string();
        }
        let joined = tags.join(",");
        format!("/checks?{}", self.http.build_query_string(&[("tags", joined.as_str())]))
    }
}

#[async_trait::async_trait]
impl PingdomClientTrait for PingdomClient {
    /// List checks
    ///
    /// # Arguments
    /// * `tags` - Only checks carrying these tags are returned
    ///
    /// # Returns
    /// * `Ok(ApiResponse<Vec<CheckSummary>>)` - Matching checks
    /// * `Err(PingdomError)` - If the request fails
    async fn list_checks(&self, tags: &[String]) -> Result<ApiResponse<Vec<CheckSummary>>, PingdomError> {
        debug!("Listing Pingdom checks with tags {:?}", tags);
        let response: ApiResponse<ChecksResponse> = self.http.get(&self.checks_path(tags)).await?;
        Ok(response.map(|r| r.checks))
    }

    /// Get a check by ID
    ///
    /// # Returns
    /// * `Ok(ApiResponse<CheckDetails>)` - The check
    /// * `Err(PingdomError::NotFound)` - If no check has this ID
    async fn get_check(&self, id: u64) -> Result<ApiResponse<CheckDetails>, PingdomError> {
        debug!("Fetching check {} from Pingdom", id);
        let response: ApiResponse<CheckResponse> = self.http.get(&format!("/checks/{}", id)).await?;
        Ok(response.map(|r| r.check))
    }

    /// Modify a check
    ///
    /// Pingdom answers a modification with a status message only, so the
    /// stored check is fetched again to return the confirmed representation.
    /// The returned metadata is the follow-up GET's headers laid over the
    /// PUT's, so quota counters of both responses reach the caller.
    ///
    /// If the PUT succeeds but the follow-up GET fails, the GET error is
    /// returned even though the change was already applied remotely.
    async fn update_check(&self, id: u64, payload: &serde_json::Value) -> Result<ApiResponse<CheckDetails>, PingdomError> {
        debug!("Updating check {} in Pingdom", id);
        let update: ApiResponse<serde_json::Value> = self.http.put(&format!("/checks/{}", id), payload).await?;
        debug!("Pingdom update response for check {}: {}", id, update.body);

        let confirmed = self.get_check(id).await?;
        Ok(ApiResponse::new(confirmed.body, confirmed.metadata.merged_over(update.metadata)))
    }
}
