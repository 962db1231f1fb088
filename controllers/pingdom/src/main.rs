//! Pingdom Operator
//!
//! Batch reconciler that keeps Pingdom uptime checks in line with the
//! `pingdom-operator.io/` annotations on Kubernetes Ingresses:
//! - Lists annotated Ingresses and maps their annotations to desired check settings
//! - Finds the matching Pingdom check by declared name or first hostname
//! - Sends one partial update per check when settings drift (or reports it in dry-run mode)
//!
//! Checks are never created or deleted, only modified. The process runs a
//! single pass and exits non-zero if any Ingress failed to reconcile.

mod applier;
mod cache;
mod config;
mod controller;
mod differ;
mod error;
mod ingress;
mod mapper;
mod observed;
mod rate_limit;
mod reconciler;
#[cfg(test)]
mod test_utils;

use crate::config::Config;
use crate::controller::Controller;
use crate::error::ControllerError;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt::init();

    // kube and reqwest both negotiate TLS through rustls
    let _ = rustls::crypto::ring::default_provider().install_default();

    info!("Starting Pingdom Operator");

    let config = Config::from_env()?;

    info!("Configuration:");
    info!("  Pingdom URL: {}", config.pingdom_url);
    info!("  Cluster: {}", config.cluster_name);
    info!("  Namespace: {}", config.namespace.as_deref().unwrap_or("all namespaces"));
    info!("  Dry run: {}", config.dry_run);

    let controller = Controller::new(&config).await?;
    let report = controller.run().await?;

    if !report.is_success() {
        return Err(ControllerError::PassFailed {
            failed: report.failed(),
            total: report.total(),
        });
    }

    Ok(())
}
