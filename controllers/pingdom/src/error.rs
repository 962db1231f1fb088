//! Controller-specific error types.
//!
//! Pass-level errors live in `ControllerError`; failures scoped to a single
//! Ingress are collected in `ResourceError` and reported, never propagated.

use crate::applier::RemoteUpdateError;
use crate::mapper::ValidationError;
use kube::Error as KubeError;
use pingdom_client::PingdomError;
use thiserror::Error;

/// Errors that abort a reconciliation pass.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Pingdom API error
    #[error("Pingdom error: {0}")]
    Pingdom(#[from] PingdomError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The pass did not finish before its deadline
    #[error("Reconciliation pass timed out after {0}s")]
    Timeout(u64),

    /// The pass finished but some resources could not be reconciled
    #[error("{failed} of {total} resources failed to reconcile")]
    PassFailed { failed: usize, total: usize },
}

/// Why a single resource ended in the `Failed` state.
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Describing the matching check failed
    #[error("failed to describe check: {0}")]
    Describe(#[from] PingdomError),

    #[error(transparent)]
    Update(#[from] RemoteUpdateError),
}
