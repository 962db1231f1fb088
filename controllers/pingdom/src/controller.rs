//! Main controller implementation.
//!
//! This module contains the `Controller` struct that wires the Kubernetes
//! lister and the Pingdom client into a `Reconciler` and runs one bounded
//! reconciliation pass.

use crate::applier::Applier;
use crate::cache::CheckCache;
use crate::config::Config;
use crate::error::ControllerError;
use crate::ingress::IngressLister;
use crate::rate_limit::RateLimitTracker;
use crate::reconciler::{PassReport, Reconciler};
use kube::Client;
use pingdom_client::PingdomClient;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, error};

/// Main controller for Pingdom check reconciliation.
pub struct Controller {
    reconciler: Reconciler,
    pass_timeout: Duration,
}

impl Controller {
    /// Creates a new controller instance.
    pub async fn new(config: &Config) -> Result<Self, ControllerError> {
        info!("Initializing Pingdom Operator");

        // Create Kubernetes client
        let kube_client = Client::try_default().await?;
        let lister = IngressLister::new(kube_client, config.namespace.as_deref());

        // Create Pingdom client
        let pingdom_client = PingdomClient::new(config.pingdom_url.clone(), config.bearer_token.clone())
            .map_err(|e| {
                error!("Failed to create Pingdom client for {}: {}", config.pingdom_url, e);
                ControllerError::Pingdom(e)
            })?;

        let checks = CheckCache::new(pingdom_client, config.tag_filter(), Arc::new(RateLimitTracker::new()))
            .with_quota_warn_threshold(config.quota_warn_threshold);

        let reconciler = Reconciler::new(lister, Arc::new(checks), Applier::new(config.dry_run));

        Ok(Self {
            reconciler,
            pass_timeout: config.pass_timeout,
        })
    }

    /// Runs one reconciliation pass within the configured deadline.
    pub async fn run(&self) -> Result<PassReport, ControllerError> {
        info!("Starting reconciliation pass (timeout {}s)", self.pass_timeout.as_secs());

        let report = tokio::time::timeout(self.pass_timeout, self.reconciler.run_pass())
            .await
            .map_err(|_| {
                error!("Reconciliation pass did not finish within {}s", self.pass_timeout.as_secs());
                ControllerError::Timeout(self.pass_timeout.as_secs())
            })??;

        info!(
            "Reconciliation pass complete: {} resources, {} applied, {} skipped, {} failed",
            report.total(),
            report.applied(),
            report.skipped(),
            report.failed()
        );
        for resource in report.failed_resources() {
            error!("  failed: {}", resource);
        }

        let quota = self.reconciler.checks().rate_limits().snapshot();
        match (quota.short, quota.long) {
            (Some(short), Some(long)) => info!(
                "Pingdom quota: {} requests left (resets in {}s), {} long-window (resets in {}s)",
                short.remaining, short.reset_in_secs, long.remaining, long.reset_in_secs
            ),
            (Some(short), None) => info!(
                "Pingdom quota: {} requests left (resets in {}s)",
                short.remaining, short.reset_in_secs
            ),
            _ => info!("Pingdom quota: not reported"),
        }

        Ok(report)
    }
}
