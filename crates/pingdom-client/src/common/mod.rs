//! Common utilities for Pingdom API client
//!
//! Provides the authenticated HTTP wrapper shared by all API calls.

use crate::error::PingdomError;
use crate::models::ResponseMetadata;
use reqwest::{Client, Response};
use serde::Deserialize;
use tracing::debug;

/// Decoded body of an API call together with its response metadata
#[derive(Debug, Clone)]
pub struct ApiResponse<T> {
    pub body: T,
    pub metadata: ResponseMetadata,
}

impl<T> ApiResponse<T> {
    pub fn new(body: T, metadata: ResponseMetadata) -> Self {
        Self { body, metadata }
    }

    /// Transform the body, keeping the metadata
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ApiResponse<U> {
        ApiResponse {
            body: f(self.body),
            metadata: self.metadata,
        }
    }
}

/// HTTP client wrapper with bearer authentication
pub struct HttpClient {
    client: Client,
    base_url: String,
    token: String,
}

impl HttpClient {
    /// Create a new HTTP client wrapper
    pub fn new(client: Client, base_url: String, token: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    /// Build a full URL from a path
    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Get authorization header value
    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.token)
    }

    /// Make a GET request
    pub async fn get<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
    ) -> Result<ApiResponse<T>, PingdomError> {
        let url = self.build_url(path);
        debug!("GET {}", url);

        let response = self.client
            .get(&url)
            .header("Authorization", self.auth_header())
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(PingdomError::Http)?;

        Self::decode(path, "GET", response).await
    }

    /// Make a PUT request
    pub async fn put<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<ApiResponse<T>, PingdomError> {
        let url = self.build_url(path);
        debug!("PUT {} with body: {}", url, serde_json::to_string_pretty(body).unwrap_or_default());

        let response = self.client
            .put(&url)
            .header("Authorization", self.auth_header())
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(PingdomError::Http)?;

        Self::decode(path, "PUT", response).await
    }

    async fn decode<T: for<'de> Deserialize<'de>>(
        path: &str,
        method: &str,
        response: Response,
    ) -> Result<ApiResponse<T>, PingdomError> {
        let status = response.status();
        let metadata = ResponseMetadata::from_headers(response.headers());

        if status == 404 {
            let body = response.text().await.unwrap_or_default();
            return Err(PingdomError::NotFound(format!(
                "Resource not found: {} - {}",
                path, body
            )));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!("{} {} failed: {} - {}", method, path, status, body);
            return Err(PingdomError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let response_text = response.text().await?;
        let body: T = serde_json::from_str(&response_text).map_err(|e| {
            PingdomError::InvalidResponse(format!(
                "error decoding response body: {} - Response (first 500 chars): {}",
                e,
                response_text.chars().take(500).collect::<String>()
            ))
        })?;

        Ok(ApiResponse::new(body, metadata))
    }

    /// Build query string from filters
    pub fn build_query_string(&self, filters: &[(&str, &str)]) -> String {
        if filters.is_empty() {
            String::new()
        } else {
            filters
                .iter()
                .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
                .collect::<Vec<_>>()
                .join("&")
        }
    }
}
