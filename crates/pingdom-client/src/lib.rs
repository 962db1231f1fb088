//! Pingdom REST API Client
//!
//! A Rust client library for the Pingdom 3.1 uptime-check API, scoped to the
//! operations the pingdom-operator needs: listing checks, describing one check
//! and modifying an existing check.
//!
//! Every call returns the decoded body together with the [`ResponseMetadata`]
//! of the HTTP response, so callers can follow the `req-limit-short` and
//! `req-limit-long` quota headers without the client keeping global state.
//!
//! # Example
//!
//! ```no_run
//! use pingdom_client::{PingdomClient, PingdomClientTrait};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = PingdomClient::new(
//!     "https://api.pingdom.com/api/3.1".to_string(),
//!     "your-api-token".to_string(),
//! )?;
//!
//! let tags = vec!["pingdom-operator".to_string(), "prod-eu".to_string()];
//! let checks = client.list_checks(&tags).await?;
//! for check in &checks.body {
//!     println!("{} -> {}", check.id, check.hostname);
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod common;
pub mod error;
pub mod models;
#[path = "trait.rs"]
pub mod pingdom_trait;
#[cfg(feature = "test-util")]
pub mod mock;

pub use client::PingdomClient;
pub use common::{ApiResponse, HttpClient};
pub use error::PingdomError;
pub use models::*;
pub use pingdom_trait::PingdomClientTrait;
#[cfg(feature = "test-util")]
pub use mock::MockPingdomClient;
