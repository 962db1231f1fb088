//! Reconciliation logic for annotated Ingresses.
//!
//! One pass lists every annotated resource and walks each through
//! `mapped -> resolved -> diffed -> applied | skipped | failed`. Resources are
//! independent: a failure is recorded in the pass report and the pass moves
//! on. Only a failure to list resources or checks aborts the pass.

use crate::applier::{Applier, ApplyResult};
use crate::cache::{CheckCache, CheckSelector};
use crate::differ::{DiffResult, FieldChange, diff};
use crate::error::{ControllerError, ResourceError};
use crate::ingress::{RawResource, ResourceLister};
use crate::mapper::{DesiredCheck, map_resource};
use crate::observed::ObservedCheck;
use pingdom_client::{CheckType, PingdomError};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Why a resource was left alone
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// No tagged check carries the declared name or the first hostname
    NoMatchFound { tried: Vec<CheckSelector> },
    /// The matching check is not an `http` check
    UnsupportedCheckType { check_id: u64, check_type: CheckType },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoMatchFound { tried } if tried.is_empty() => {
                write!(f, "no name or hostname to match a check by")
            }
            SkipReason::NoMatchFound { tried } => {
                let tried: Vec<String> = tried.iter().map(ToString::to_string).collect();
                write!(f, "no check matches {}", tried.join(" or "))
            }
            SkipReason::UnsupportedCheckType { check_id, check_type } => {
                write!(f, "check {} has unsupported type {}", check_id, check_type)
            }
        }
    }
}

/// Terminal state of one resource
#[derive(Debug)]
pub enum ResourceOutcome {
    /// Changes (possibly none) were applied, simulated or found unnecessary
    Applied {
        check_id: u64,
        changes: Vec<FieldChange>,
        result: ApplyResult,
    },
    Skipped(SkipReason),
    Failed(ResourceError),
}

/// Outcome of one resource, keyed by `namespace/name`
#[derive(Debug)]
pub struct ResourceReport {
    pub resource: String,
    pub outcome: ResourceOutcome,
}

/// Every resource's outcome for one pass
#[derive(Debug, Default)]
pub struct PassReport {
    pub resources: Vec<ResourceReport>,
}

impl PassReport {
    /// Get the number of resources visited
    pub fn total(&self) -> usize {
        self.resources.len()
    }

    pub fn applied(&self) -> usize {
        self.count(|o| matches!(o, ResourceOutcome::Applied { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, ResourceOutcome::Skipped(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, ResourceOutcome::Failed(_)))
    }

    /// No resource ended in `Failed`
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    /// Keys of the resources that ended in `Failed`, in pass order
    pub fn failed_resources(&self) -> Vec<&str> {
        self.resources
            .iter()
            .filter(|r| matches!(r.outcome, ResourceOutcome::Failed(_)))
            .map(|r| r.resource.as_str())
            .collect()
    }

    /// Outcome recorded for `namespace/name`
    #[cfg(test)]
    pub fn outcome(&self, resource: &str) -> Option<&ResourceOutcome> {
        self.resources
            .iter()
            .find(|r| r.resource == resource)
            .map(|r| &r.outcome)
    }

    fn count(&self, predicate: impl Fn(&ResourceOutcome) -> bool) -> usize {
        self.resources.iter().filter(|r| predicate(&r.outcome)).count()
    }
}

/// Drives reconciliation passes
pub struct Reconciler {
    lister: Box<dyn ResourceLister>,
    checks: Arc<CheckCache>,
    applier: Applier,
}

impl Reconciler {
    /// Create a reconciler over one lister and one check cache
    pub fn new(lister: impl ResourceLister + 'static, checks: Arc<CheckCache>, applier: Applier) -> Self {
        Self {
            lister: Box::new(lister),
            checks,
            applier,
        }
    }

    /// Get the check cache, e.g. to read the quota tracker after a pass
    pub fn checks(&self) -> &CheckCache {
        &self.checks
    }

    /// Run one full pass over all annotated resources
    pub async fn run_pass(&self) -> Result<PassReport, ControllerError> {
        let resources = self.lister.list().await?;
        info!("Found {} annotated Ingresses", resources.len());

        let checks = self.checks.list_all().await.map_err(|e| {
            error!("Failed to list Pingdom checks: {}", e);
            ControllerError::Pingdom(e)
        })?;
        info!("Found {} Pingdom checks for this cluster", checks.len());

        let mut report = PassReport::default();
        for resource in &resources {
            let key = resource.key();
            let outcome = self.reconcile(resource).await;
            match &outcome {
                ResourceOutcome::Applied { result: ApplyResult::Noop, check_id, .. } => {
                    info!("{}: check {} is up-to-date", key, check_id);
                }
                ResourceOutcome::Applied { check_id, changes, result } => {
                    let verb = if result.is_simulated() { "would change" } else { "changed" };
                    info!("{}: {} {} field(s) of check {}", key, verb, changes.len(), check_id);
                }
                ResourceOutcome::Skipped(reason) => {
                    warn!("{}: skipped, {}", key, reason);
                }
                ResourceOutcome::Failed(e) => {
                    error!("{}: failed, {}", key, e);
                }
            }
            report.resources.push(ResourceReport { resource: key, outcome });
        }

        Ok(report)
    }

    async fn reconcile(&self, resource: &RawResource) -> ResourceOutcome {
        let desired = match map_resource(resource) {
            Ok(desired) => desired,
            Err(e) => return ResourceOutcome::Failed(e.into()),
        };

        let mut tried = Vec::new();
        let observed = match self.resolve(&desired, &mut tried).await {
            Ok(Some(observed)) => observed,
            Ok(None) => return ResourceOutcome::Skipped(SkipReason::NoMatchFound { tried }),
            Err(e) => return ResourceOutcome::Failed(e.into()),
        };
        debug!("{} matched check {} ({})", resource.key(), observed.id, observed.name);

        let changes = match diff(&desired, &observed) {
            DiffResult::Changes(changes) => changes,
            DiffResult::UnsupportedType(check_type) => {
                return ResourceOutcome::Skipped(SkipReason::UnsupportedCheckType {
                    check_id: observed.id,
                    check_type,
                });
            }
        };
        for change in &changes {
            info!("  {}", change);
        }

        match self.applier.apply(&self.checks, observed.id, observed.check_type, &changes).await {
            Ok(result) => ResourceOutcome::Applied {
                check_id: observed.id,
                changes,
                result,
            },
            Err(e) => ResourceOutcome::Failed(e.into()),
        }
    }

    /// Find the check for a resource: by declared name first, then by the
    /// first hostname. Every selector attempted is appended to `tried`.
    async fn resolve(
        &self,
        desired: &DesiredCheck,
        tried: &mut Vec<CheckSelector>,
    ) -> Result<Option<ObservedCheck>, PingdomError> {
        let mut selectors = Vec::with_capacity(2);
        if let Some(name) = &desired.match_name {
            selectors.push(CheckSelector::Name(name.clone()));
        }
        if let Some(hostname) = desired.primary_hostname() {
            selectors.push(CheckSelector::Hostname(hostname.to_string()));
        }

        for selector in selectors {
            tried.push(selector.clone());
            if let Some(check) = self.checks.describe(&selector).await? {
                return Ok(Some(check));
            }
            debug!("No check found by {}", selector);
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheSettings;
    use crate::rate_limit::RateLimitTracker;
    use crate::test_utils::{FakeClock, StaticLister, create_test_resource};
    use pingdom_client::MockPingdomClient;
    use pingdom_client::mock::make_check;
    use serde_json::json;
    use std::time::Duration;

    fn reconciler(mock: &MockPingdomClient, resources: Vec<RawResource>, dry_run: bool, clock: &FakeClock) -> Reconciler {
        let checks = CheckCache::with_settings(
            mock.clone(),
            vec!["pingdom-operator".to_string(), "test-cluster".to_string()],
            Arc::new(RateLimitTracker::new()),
            CacheSettings::default(),
            Arc::new(clock.clone()),
        );
        Reconciler::new(StaticLister::new(resources), Arc::new(checks), Applier::new(dry_run))
    }

    fn shop_check(check_type: CheckType) -> pingdom_client::CheckDetails {
        make_check(
            1,
            "shop",
            "old.example.com",
            check_type,
            json!({"encryption": false, "port": 80}),
            json!({"resolution": 5}),
        )
    }

    #[tokio::test]
    async fn test_pass_applies_changes_to_named_check() {
        let mock = MockPingdomClient::new();
        mock.add_check(shop_check(CheckType::Http));
        let resource = create_test_resource("web", "default", &["a.example.com"], false, &[("name", "shop"), ("port", "8080")]);
        let reconciler = reconciler(&mock, vec![resource], false, &FakeClock::new());

        let report = reconciler.run_pass().await.unwrap();

        assert!(report.is_success());
        assert_eq!(report.applied(), 1);
        let Some(ResourceOutcome::Applied { check_id, changes, result }) = report.outcome("default/web") else {
            panic!("expected default/web to be applied");
        };
        assert_eq!(*check_id, 1);
        let keys: Vec<&str> = changes.iter().map(|c| c.key.as_str()).collect();
        assert!(keys.contains(&"hostname"));
        assert!(keys.contains(&"port"));
        assert!(matches!(result, ApplyResult::Updated { .. }));

        let stored = mock.stored_check(1).unwrap();
        assert_eq!(stored.hostname, "a.example.com");
        assert_eq!(stored.check_type().unwrap().1.get("port"), Some(&json!(8080)));
    }

    #[tokio::test]
    async fn test_unknown_name_falls_back_to_hostname() {
        let mock = MockPingdomClient::new();
        mock.add_check(make_check(3, "blog", "a.example.com", CheckType::Http, json!({"encryption": false}), json!({})));
        let resource = create_test_resource("web", "default", &["a.example.com"], false, &[("name", "renamed")]);
        let reconciler = reconciler(&mock, vec![resource], false, &FakeClock::new());

        let report = reconciler.run_pass().await.unwrap();

        let Some(ResourceOutcome::Applied { check_id, result, .. }) = report.outcome("default/web") else {
            panic!("expected default/web to be applied");
        };
        assert_eq!(*check_id, 3);
        assert!(result.is_noop());
        assert_eq!(mock.update_calls(), 0);
    }

    #[tokio::test]
    async fn test_no_match_is_skipped() {
        let mock = MockPingdomClient::new();
        mock.add_check(shop_check(CheckType::Http));
        let resource = create_test_resource("web", "default", &["a.example.com"], false, &[("name", "missing")]);
        let reconciler = reconciler(&mock, vec![resource], false, &FakeClock::new());

        let report = reconciler.run_pass().await.unwrap();

        assert!(report.is_success());
        let Some(ResourceOutcome::Skipped(SkipReason::NoMatchFound { tried })) = report.outcome("default/web") else {
            panic!("expected default/web to be skipped");
        };
        assert_eq!(
            tried,
            &vec![
                CheckSelector::Name("missing".to_string()),
                CheckSelector::Hostname("a.example.com".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_tcp_check_is_skipped() {
        let mock = MockPingdomClient::new();
        mock.add_check(shop_check(CheckType::Tcp));
        let resource = create_test_resource("web", "default", &["a.example.com"], false, &[("name", "shop"), ("port", "8080")]);
        let reconciler = reconciler(&mock, vec![resource], false, &FakeClock::new());

        let report = reconciler.run_pass().await.unwrap();

        assert_eq!(report.skipped(), 1);
        assert!(matches!(
            report.outcome("default/web"),
            Some(ResourceOutcome::Skipped(SkipReason::UnsupportedCheckType { check_id: 1, check_type: CheckType::Tcp }))
        ));
        assert_eq!(mock.update_calls(), 0);
    }

    #[tokio::test]
    async fn test_dry_run_simulates_without_mutation() {
        let mock = MockPingdomClient::new();
        mock.add_check(shop_check(CheckType::Http));
        let resource = create_test_resource("web", "default", &["a.example.com"], false, &[("name", "shop"), ("port", "8080")]);
        let reconciler = reconciler(&mock, vec![resource], true, &FakeClock::new());

        let report = reconciler.run_pass().await.unwrap();

        assert!(matches!(
            report.outcome("default/web"),
            Some(ResourceOutcome::Applied { result: ApplyResult::Simulated { .. }, .. })
        ));
        assert_eq!(mock.update_calls(), 0);
        assert_eq!(mock.stored_check(1).unwrap().hostname, "old.example.com");
    }

    #[tokio::test]
    async fn test_failures_are_isolated_per_resource() {
        let mock = MockPingdomClient::new();
        mock.add_check(shop_check(CheckType::Http));
        mock.add_check(make_check(2, "blog", "blog.example.com", CheckType::Http, json!({"encryption": false}), json!({"paused": false})));
        mock.fail_update(2, 500, "internal error");

        let resources = vec![
            create_test_resource("bad", "default", &["bad.example.com"], false, &[("port", "eighty")]),
            create_test_resource("blog", "default", &["blog.example.com"], false, &[("paused", "true")]),
            create_test_resource("web", "default", &["a.example.com"], false, &[("name", "shop"), ("port", "8080")]),
        ];
        let reconciler = reconciler(&mock, resources, false, &FakeClock::new());

        let report = reconciler.run_pass().await.unwrap();

        assert_eq!(report.total(), 3);
        assert_eq!(report.failed(), 2);
        assert_eq!(report.applied(), 1);
        assert!(!report.is_success());
        assert_eq!(report.failed_resources(), vec!["default/bad", "default/blog"]);
        assert!(matches!(
            report.outcome("default/bad"),
            Some(ResourceOutcome::Failed(ResourceError::Validation(_)))
        ));
        assert!(matches!(
            report.outcome("default/blog"),
            Some(ResourceOutcome::Failed(ResourceError::Update(_)))
        ));
        assert!(matches!(report.outcome("default/web"), Some(ResourceOutcome::Applied { .. })));
    }

    #[tokio::test]
    async fn test_describe_failure_fails_resource() {
        let mock = MockPingdomClient::new();
        mock.add_check(shop_check(CheckType::Http));
        mock.fail_get(1, 502, "bad gateway");
        let resource = create_test_resource("web", "default", &["a.example.com"], false, &[("name", "shop")]);
        let reconciler = reconciler(&mock, vec![resource], false, &FakeClock::new());

        let report = reconciler.run_pass().await.unwrap();

        assert!(matches!(
            report.outcome("default/web"),
            Some(ResourceOutcome::Failed(ResourceError::Describe(_)))
        ));
    }

    #[tokio::test]
    async fn test_list_failure_aborts_pass() {
        let mock = MockPingdomClient::new();
        mock.fail_list(401, "invalid token");
        let resource = create_test_resource("web", "default", &["a.example.com"], false, &[("port", "8080")]);
        let reconciler = reconciler(&mock, vec![resource], false, &FakeClock::new());

        let err = reconciler.run_pass().await.unwrap_err();
        assert!(matches!(err, ControllerError::Pingdom(PingdomError::Api { status: 401, .. })));
    }

    #[tokio::test]
    async fn test_second_pass_reuses_list_and_is_idempotent() {
        let mock = MockPingdomClient::new();
        mock.add_check(shop_check(CheckType::Http));
        let clock = FakeClock::new();
        let resource = create_test_resource("web", "default", &["a.example.com"], true, &[("name", "shop"), ("port", "443")]);
        let reconciler = reconciler(&mock, vec![resource], false, &clock);

        reconciler.run_pass().await.unwrap();
        clock.advance(Duration::from_secs(60));
        let second = reconciler.run_pass().await.unwrap();

        assert_eq!(mock.list_calls(), 1);
        assert_eq!(mock.update_calls(), 1);
        assert!(matches!(
            second.outcome("default/web"),
            Some(ResourceOutcome::Applied { result: ApplyResult::Noop, .. })
        ));
    }

    #[test]
    fn test_skip_reason_display() {
        let reason = SkipReason::NoMatchFound {
            tried: vec![
                CheckSelector::Name("shop".to_string()),
                CheckSelector::Hostname("a.example.com".to_string()),
            ],
        };
        assert_eq!(reason.to_string(), "no check matches name \"shop\" or hostname \"a.example.com\"");
        assert_eq!(
            SkipReason::NoMatchFound { tried: vec![] }.to_string(),
            "no name or hostname to match a check by"
        );
    }
}
