//! Memoization of Pingdom reads.
//!
//! Pingdom enforces a hard request quota, so the two read paths are cached:
//!
//! - the tag-scoped check list: one entry, fresh for 90 seconds
//! - check descriptions by id: up to 1024 entries, fresh for 10 minutes,
//!   least-recently-used eviction once full
//!
//! Name and hostname lookups are not cached themselves. They scan the cached
//! list and then go through the id cache, so the expensive describe call is
//! the only thing memoized. Errors are never cached.

use crate::observed::ObservedCheck;
use crate::rate_limit::RateLimitTracker;
use pingdom_client::{CheckSummary, PingdomClientTrait, PingdomError, ResponseMetadata};
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub const LIST_CACHE_CAPACITY: usize = 1;
pub const LIST_CACHE_TTL: Duration = Duration::from_secs(90);
pub const CHECK_CACHE_CAPACITY: usize = 1024;
pub const CHECK_CACHE_TTL: Duration = Duration::from_secs(600);

/// Time source for cache expiry
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall-clock time
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
    last_used: u64,
}

/// Size- and time-bounded cache with LRU eviction
pub struct TtlCache<K, V> {
    capacity: usize,
    ttl: Duration,
    entries: HashMap<K, CacheEntry<V>>,
    tick: u64,
}

impl<K: Eq + Hash + Clone, V: Clone> TtlCache<K, V> {
    /// A zero capacity cache stores nothing
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            capacity,
            ttl,
            entries: HashMap::new(),
            tick: 0,
        }
    }

    /// Fresh value for `key`; expired entries are dropped on access
    pub fn get(&mut self, key: &K, now: Instant) -> Option<V> {
        let expired = match self.entries.get(key) {
            Some(entry) => now >= entry.expires_at,
            None => return None,
        };
        if expired {
            self.entries.remove(key);
            return None;
        }

        self.tick += 1;
        let tick = self.tick;
        self.entries.get_mut(key).map(|entry| {
            entry.last_used = tick;
            entry.value.clone()
        })
    }

    pub fn insert(&mut self, key: K, value: V, now: Instant) {
        if self.capacity == 0 {
            return;
        }

        self.entries.retain(|_, entry| now < entry.expires_at);
        if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            self.evict_least_recently_used();
        }

        self.tick += 1;
        self.entries.insert(
            key,
            CacheEntry {
                value,
                expires_at: now + self.ttl,
                last_used: self.tick,
            },
        );
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn evict_least_recently_used(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_used)
            .map(|(key, _)| key.clone());
        if let Some(key) = oldest {
            self.entries.remove(&key);
        }
    }
}

/// Capacity and freshness of both caches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    pub list_capacity: usize,
    pub list_ttl: Duration,
    pub check_capacity: usize,
    pub check_ttl: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            list_capacity: LIST_CACHE_CAPACITY,
            list_ttl: LIST_CACHE_TTL,
            check_capacity: CHECK_CACHE_CAPACITY,
            check_ttl: CHECK_CACHE_TTL,
        }
    }
}

impl CacheSettings {
    /// Settings that memoize nothing
    #[cfg(test)]
    pub fn disabled() -> Self {
        Self {
            list_capacity: 0,
            check_capacity: 0,
            ..Self::default()
        }
    }
}

/// How a check is looked up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckSelector {
    Id(u64),
    Name(String),
    Hostname(String),
}

impl fmt::Display for CheckSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckSelector::Id(id) => write!(f, "id {}", id),
            CheckSelector::Name(name) => write!(f, "name {:?}", name),
            CheckSelector::Hostname(host) => write!(f, "hostname {:?}", host),
        }
    }
}

/// Caching front of the Pingdom client
///
/// All remote calls go through here so every response feeds the rate limit
/// tracker.
pub struct CheckCache {
    client: Box<dyn PingdomClientTrait + Send + Sync>,
    tags: Vec<String>,
    clock: Arc<dyn Clock>,
    rate_limits: Arc<RateLimitTracker>,
    quota_warn_threshold: u64,
    list_cache: Mutex<TtlCache<(), Arc<Vec<CheckSummary>>>>,
    check_cache: Mutex<TtlCache<u64, ObservedCheck>>,
}

impl CheckCache {
    /// Cache with the default sizes and wall-clock expiry
    pub fn new(
        client: impl PingdomClientTrait + Send + Sync + 'static,
        tags: Vec<String>,
        rate_limits: Arc<RateLimitTracker>,
    ) -> Self {
        Self::with_settings(client, tags, rate_limits, CacheSettings::default(), Arc::new(SystemClock))
    }

    pub fn with_settings(
        client: impl PingdomClientTrait + Send + Sync + 'static,
        tags: Vec<String>,
        rate_limits: Arc<RateLimitTracker>,
        settings: CacheSettings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            client: Box::new(client),
            tags,
            clock,
            rate_limits,
            quota_warn_threshold: 0,
            list_cache: Mutex::new(TtlCache::new(settings.list_capacity, settings.list_ttl)),
            check_cache: Mutex::new(TtlCache::new(settings.check_capacity, settings.check_ttl)),
        }
    }

    /// Log a warning whenever the short-window quota falls below `threshold`
    pub fn with_quota_warn_threshold(mut self, threshold: u64) -> Self {
        self.quota_warn_threshold = threshold;
        self
    }

    /// Get the tracker fed by every response
    pub fn rate_limits(&self) -> &RateLimitTracker {
        &self.rate_limits
    }

    /// All checks carrying the configured tags
    pub async fn list_all(&self) -> Result<Arc<Vec<CheckSummary>>, PingdomError> {
        let now = self.clock.now();
        let cached = match self.list_cache.lock() {
            Ok(mut cache) => cache.get(&(), now),
            Err(e) => {
                warn!("Failed to lock check list cache: {}, fetching", e);
                None
            }
        };
        if let Some(checks) = cached {
            debug!("Using cached check list ({} checks)", checks.len());
            return Ok(checks);
        }

        let response = self.client.list_checks(&self.tags).await?;
        self.record(&response.metadata);
        let checks = Arc::new(response.body);
        debug!("Fetched {} checks tagged {:?}", checks.len(), self.tags);

        if let Ok(mut cache) = self.list_cache.lock() {
            cache.insert((), Arc::clone(&checks), self.clock.now());
        }
        Ok(checks)
    }

    /// Describe one check; `Ok(None)` when nothing matches
    pub async fn describe(&self, selector: &CheckSelector) -> Result<Option<ObservedCheck>, PingdomError> {
        let id = match selector {
            CheckSelector::Id(id) => *id,
            CheckSelector::Name(name) => {
                match self.list_all().await?.iter().find(|c| &c.name == name) {
                    Some(summary) => summary.id,
                    None => return Ok(None),
                }
            }
            CheckSelector::Hostname(hostname) => {
                match self.list_all().await?.iter().find(|c| &c.hostname == hostname) {
                    Some(summary) => summary.id,
                    None => return Ok(None),
                }
            }
        };
        self.describe_by_id(id).await
    }

    async fn describe_by_id(&self, id: u64) -> Result<Option<ObservedCheck>, PingdomError> {
        let now = self.clock.now();
        let cached = match self.check_cache.lock() {
            Ok(mut cache) => cache.get(&id, now),
            Err(e) => {
                warn!("Failed to lock check cache: {}, fetching", e);
                None
            }
        };
        if let Some(check) = cached {
            debug!("Using cached description of check {}", id);
            return Ok(Some(check));
        }

        let response = match self.client.get_check(id).await {
            Ok(response) => response,
            Err(PingdomError::NotFound(_)) => {
                debug!("Check {} not found in Pingdom", id);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        self.record(&response.metadata);

        let check = ObservedCheck::try_from(response.body)?;
        self.store(check.clone());
        Ok(Some(check))
    }

    /// Send a partial update and cache the confirmed result
    ///
    /// On error nothing is cached, so the next describe reads the check again
    /// even when the update itself reached Pingdom.
    pub async fn update(&self, id: u64, payload: &serde_json::Value) -> Result<ObservedCheck, PingdomError> {
        let response = self.client.update_check(id, payload).await?;
        self.record(&response.metadata);

        let check = ObservedCheck::try_from(response.body)?;
        self.store(check.clone());
        Ok(check)
    }

    fn store(&self, check: ObservedCheck) {
        if let Ok(mut cache) = self.check_cache.lock() {
            cache.insert(check.id, check, self.clock.now());
        }
    }

    fn record(&self, metadata: &ResponseMetadata) {
        self.rate_limits.observe(metadata);
        if self.quota_warn_threshold > 0 && self.rate_limits.low_on_quota(self.quota_warn_threshold) {
            if let Some(short) = self.rate_limits.snapshot().short {
                warn!(
                    "Pingdom short-window quota low: {} requests left, resets in {}s",
                    short.remaining, short.reset_in_secs
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{FakeClock, http_check};
    use pingdom_client::mock::make_check;
    use pingdom_client::{CheckType, MockPingdomClient};
    use serde_json::json;

    fn cache_with(mock: &MockPingdomClient, settings: CacheSettings, clock: &FakeClock) -> CheckCache {
        CheckCache::with_settings(
            mock.clone(),
            vec!["pingdom-operator".to_string(), "test-cluster".to_string()],
            Arc::new(RateLimitTracker::new()),
            settings,
            Arc::new(clock.clone()),
        )
    }

    #[test]
    fn test_ttl_cache_expiry() {
        let start = Instant::now();
        let mut cache: TtlCache<u64, &str> = TtlCache::new(4, Duration::from_secs(90));
        cache.insert(1, "one", start);

        assert_eq!(cache.get(&1, start + Duration::from_secs(89)), Some("one"));
        assert_eq!(cache.get(&1, start + Duration::from_secs(90)), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_ttl_cache_evicts_least_recently_used() {
        let now = Instant::now();
        let mut cache: TtlCache<u64, u64> = TtlCache::new(2, Duration::from_secs(600));
        cache.insert(1, 10, now);
        cache.insert(2, 20, now);
        // Touch 1 so 2 becomes the eviction candidate
        assert_eq!(cache.get(&1, now), Some(10));
        cache.insert(3, 30, now);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&1, now), Some(10));
        assert_eq!(cache.get(&2, now), None);
        assert_eq!(cache.get(&3, now), Some(30));
    }

    #[test]
    fn test_ttl_cache_zero_capacity_stores_nothing() {
        let now = Instant::now();
        let mut cache: TtlCache<(), u64> = TtlCache::new(0, Duration::from_secs(600));
        cache.insert((), 1, now);
        assert_eq!(cache.get(&(), now), None);
    }

    #[tokio::test]
    async fn test_list_all_is_fresh_for_ttl() {
        let mock = MockPingdomClient::new();
        mock.add_check(http_check(1, "shop", "shop.example.com"));
        let clock = FakeClock::new();
        let cache = cache_with(&mock, CacheSettings::default(), &clock);

        let first = cache.list_all().await.unwrap();
        clock.advance(Duration::from_secs(89));
        let second = cache.list_all().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(mock.list_calls(), 1);
        assert_eq!(mock.last_list_tags(), vec!["pingdom-operator".to_string(), "test-cluster".to_string()]);

        clock.advance(Duration::from_secs(1));
        cache.list_all().await.unwrap();
        assert_eq!(mock.list_calls(), 2);
    }

    #[tokio::test]
    async fn test_list_errors_are_not_cached() {
        let mock = MockPingdomClient::new();
        let clock = FakeClock::new();
        let cache = cache_with(&mock, CacheSettings::default(), &clock);

        mock.fail_list(503, "maintenance");
        assert!(cache.list_all().await.is_err());

        mock.clear_list_failure();
        assert!(cache.list_all().await.is_ok());
        assert_eq!(mock.list_calls(), 2);
    }

    #[tokio::test]
    async fn test_describe_by_name_scans_cached_list() {
        let mock = MockPingdomClient::new();
        mock.add_check(http_check(1, "shop", "shop.example.com"));
        mock.add_check(http_check(2, "blog", "blog.example.com"));
        let clock = FakeClock::new();
        let cache = cache_with(&mock, CacheSettings::default(), &clock);

        let by_name = cache.describe(&CheckSelector::Name("blog".to_string())).await.unwrap().unwrap();
        assert_eq!(by_name.id, 2);
        let by_host = cache.describe(&CheckSelector::Hostname("blog.example.com".to_string())).await.unwrap().unwrap();
        assert_eq!(by_host.id, 2);

        // One list fetch, one describe; the second lookup hit both caches
        assert_eq!(mock.list_calls(), 1);
        assert_eq!(mock.get_calls(), 1);

        let missing = cache.describe(&CheckSelector::Name("nope".to_string())).await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_describe_by_id_cache_expires() {
        let mock = MockPingdomClient::new();
        mock.add_check(http_check(1, "shop", "shop.example.com"));
        let clock = FakeClock::new();
        let cache = cache_with(&mock, CacheSettings::default(), &clock);

        cache.describe(&CheckSelector::Id(1)).await.unwrap();
        clock.advance(Duration::from_secs(599));
        cache.describe(&CheckSelector::Id(1)).await.unwrap();
        assert_eq!(mock.get_calls(), 1);

        clock.advance(Duration::from_secs(1));
        cache.describe(&CheckSelector::Id(1)).await.unwrap();
        assert_eq!(mock.get_calls(), 2);
    }

    #[tokio::test]
    async fn test_describe_missing_id_is_none() {
        let mock = MockPingdomClient::new();
        let clock = FakeClock::new();
        let cache = cache_with(&mock, CacheSettings::default(), &clock);

        assert!(cache.describe(&CheckSelector::Id(42)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_describe_transport_error_propagates() {
        let mock = MockPingdomClient::new();
        mock.add_check(http_check(1, "shop", "shop.example.com"));
        mock.fail_get(1, 500, "boom");
        let clock = FakeClock::new();
        let cache = cache_with(&mock, CacheSettings::default(), &clock);

        let err = cache.describe(&CheckSelector::Id(1)).await.unwrap_err();
        assert_eq!(err.status_code(), Some(500));
    }

    #[tokio::test]
    async fn test_disabled_cache_does_not_memoize() {
        let mock = MockPingdomClient::new();
        mock.add_check(http_check(1, "shop", "shop.example.com"));
        let clock = FakeClock::new();
        let cache = cache_with(&mock, CacheSettings::disabled(), &clock);

        cache.describe(&CheckSelector::Name("shop".to_string())).await.unwrap();
        cache.describe(&CheckSelector::Name("shop".to_string())).await.unwrap();

        assert_eq!(mock.list_calls(), 2);
        assert_eq!(mock.get_calls(), 2);
    }

    #[tokio::test]
    async fn test_update_writes_through() {
        let mock = MockPingdomClient::new();
        mock.add_check(make_check(
            1,
            "shop",
            "shop.example.com",
            CheckType::Http,
            json!({"port": 80}),
            json!({}),
        ));
        let clock = FakeClock::new();
        let cache = cache_with(&mock, CacheSettings::default(), &clock);

        cache.describe(&CheckSelector::Id(1)).await.unwrap();
        cache.update(1, &json!({"type": {"http": {"port": 8080}}})).await.unwrap();
        let described = cache.describe(&CheckSelector::Id(1)).await.unwrap().unwrap();

        assert_eq!(described.type_fields.get("port"), Some(&json!(8080)));
        assert_eq!(mock.get_calls(), 1);
    }

    #[tokio::test]
    async fn test_responses_feed_rate_limit_tracker() {
        let mock = MockPingdomClient::new();
        mock.set_metadata(
            ResponseMetadata::default()
                .with_header("req-limit-short", "Remaining: 12 Time until reset: 30")
                .with_header("req-limit-long", "Remaining: 900 Time until reset: 3600"),
        );
        let clock = FakeClock::new();
        let cache = cache_with(&mock, CacheSettings::default(), &clock).with_quota_warn_threshold(50);

        cache.list_all().await.unwrap();

        let snapshot = cache.rate_limits().snapshot();
        assert_eq!(snapshot.short.map(|w| w.remaining), Some(12));
        assert_eq!(snapshot.long.map(|w| w.remaining), Some(900));
        assert!(cache.rate_limits().low_on_quota(50));
    }

    #[tokio::test]
    async fn test_update_response_feeds_rate_limit_tracker() {
        let mock = MockPingdomClient::new();
        mock.add_check(http_check(1, "shop", "shop.example.com"));
        let clock = FakeClock::new();
        let cache = cache_with(&mock, CacheSettings::default(), &clock);

        mock.set_metadata(
            ResponseMetadata::default().with_header("req-limit-short", "Remaining: 7 Time until reset: 12"),
        );
        cache.update(1, &json!({"paused": true})).await.unwrap();

        let snapshot = cache.rate_limits().snapshot();
        assert_eq!(snapshot.short.map(|w| w.remaining), Some(7));
        assert_eq!(mock.list_calls(), 0);
        assert_eq!(mock.get_calls(), 0);
    }
}
