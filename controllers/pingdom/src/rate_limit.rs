//! Pingdom request quota tracking.
//!
//! Pingdom reports two quota windows on every response:
//!
//! ```text
//! req-limit-short: Remaining: 33994 Time until reset: 3519
//! req-limit-long: Remaining: 6119845 Time until reset: 2544257
//! ```
//!
//! The tracker keeps the latest value of each so it can be logged and
//! inspected. Nothing is throttled on these numbers yet; `low_on_quota` is
//! where a backoff policy would hook in.

use chrono::{DateTime, Utc};
use pingdom_client::ResponseMetadata;
use std::sync::Mutex;
use tracing::{debug, warn};

pub const SHORT_WINDOW_HEADER: &str = "req-limit-short";
pub const LONG_WINDOW_HEADER: &str = "req-limit-long";

/// Remaining requests in one quota window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaWindow {
    pub remaining: u64,
    pub reset_in_secs: u64,
}

impl QuotaWindow {
    /// Parse `Remaining: <n> Time until reset: <secs>`
    pub fn parse(value: &str) -> Option<Self> {
        let mut remaining = None;
        let mut reset_in_secs = None;

        let mut tokens = value.split_whitespace();
        while let Some(token) = tokens.next() {
            match token {
                "Remaining:" => remaining = tokens.next().and_then(|n| n.parse().ok()),
                "reset:" => reset_in_secs = tokens.next().and_then(|n| n.parse().ok()),
                _ => {}
            }
        }

        Some(Self {
            remaining: remaining?,
            reset_in_secs: reset_in_secs?,
        })
    }
}

/// Latest counters seen across all responses
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateLimitSnapshot {
    pub short: Option<QuotaWindow>,
    pub long: Option<QuotaWindow>,
    pub observed_at: Option<DateTime<Utc>>,
}

/// Single-writer holder of the latest quota counters
#[derive(Debug, Default)]
pub struct RateLimitTracker {
    latest: Mutex<RateLimitSnapshot>,
}

impl RateLimitTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold the counters of one response into the tracker.
    ///
    /// A window whose header is missing or malformed keeps its previous value.
    pub fn observe(&self, metadata: &ResponseMetadata) {
        let short = metadata.header(SHORT_WINDOW_HEADER).and_then(QuotaWindow::parse);
        let long = metadata.header(LONG_WINDOW_HEADER).and_then(QuotaWindow::parse);

        if short.is_none() && long.is_none() {
            debug!("Response carried no quota headers");
            return;
        }

        match self.latest.lock() {
            Ok(mut latest) => {
                if short.is_some() {
                    latest.short = short;
                }
                if long.is_some() {
                    latest.long = long;
                }
                latest.observed_at = Some(Utc::now());
            }
            Err(e) => {
                warn!("Failed to lock rate limit state: {}, dropping observation", e);
            }
        }
    }

    pub fn snapshot(&self) -> RateLimitSnapshot {
        match self.latest.lock() {
            Ok(latest) => latest.clone(),
            Err(e) => e.into_inner().clone(),
        }
    }

    /// Short-window remaining count is known and below `threshold`
    pub fn low_on_quota(&self, threshold: u64) -> bool {
        self.snapshot()
            .short
            .is_some_and(|window| window.remaining < threshold)
    }
}
