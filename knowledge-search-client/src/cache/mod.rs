pub mod clock;
pub mod entry;
pub mod key;
pub mod tier;

pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::CachedResult;
pub use key::{CacheKey, KeyParams};
pub use tier::{Tier, TierConfig};

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use strum::IntoEnumIterator;

#[cfg(feature = "graphql")]
use async_graphql::SimpleObject;

/// Configuration for the cache system
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Whether caching is enabled at all
    pub enabled: bool,
    /// Per-tier capacity and TTL; tiers missing here use their defaults
    pub tiers: HashMap<Tier, TierConfig>,
    /// How often the background sweeper purges expired entries, in seconds
    pub cleanup_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tiers: Tier::iter().map(|tier| (tier, TierConfig::for_tier(tier))).collect(),
            cleanup_interval_secs: 300,
        }
    }
}

impl CacheConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    pub fn with_tier(mut self, tier: Tier, config: TierConfig) -> Self {
        self.tiers.insert(tier, config);
        self
    }

    pub fn tier(&self, tier: Tier) -> TierConfig {
        self.tiers
            .get(&tier)
            .cloned()
            .unwrap_or_else(|| TierConfig::for_tier(tier))
    }

    pub fn cleanup_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.cleanup_interval_secs)
    }

    /// Reject configurations no tier could honour.
    pub fn validate(&self) -> Result<(), CacheError> {
        for tier in Tier::iter() {
            let config = self.tier(tier);
            if config.capacity == 0 {
                return Err(CacheError::ZeroCapacity(tier));
            }
            if config.ttl_secs <= 0 {
                return Err(CacheError::NonPositiveTtl(tier, config.ttl_secs));
            }
            let representable = Duration::try_seconds(config.ttl_secs)
                .and_then(|ttl| Utc::now().checked_add_signed(ttl))
                .is_some();
            if !representable {
                return Err(CacheError::TtlOutOfRange(tier, config.ttl_secs));
            }
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Tier {0} must have a capacity of at least one entry")]
    ZeroCapacity(Tier),
    #[error("Tier {0} has a non-positive TTL of {1} seconds")]
    NonPositiveTtl(Tier, i64),
    #[error("Tier {0} has a TTL of {1} seconds, too far in the future to represent")]
    TtlOutOfRange(Tier, i64),
}

/// One partition of the cache: bounded, LRU-evicted, with its own TTL.
struct TierStore<V> {
    entries: DashMap<String, CachedResult<V>>,
    config: TierConfig,
    tick: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    insertions: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
}

impl<V> TierStore<V> {
    fn new(config: TierConfig) -> Self {
        Self {
            entries: DashMap::with_capacity(config.capacity.min(1024)),
            config,
            tick: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            insertions: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            expirations: AtomicU64::new(0),
        }
    }

    fn next_tick(&self) -> u64 {
        self.tick.fetch_add(1, Ordering::Relaxed)
    }

    fn evict_expired(&self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_valid(now));
        let removed = before.saturating_sub(self.entries.len());
        self.expirations.fetch_add(removed as u64, Ordering::Relaxed);
        removed
    }

    /// Remove the least recently used entry. Returns false when the tier is empty.
    fn evict_lru(&self) -> bool {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|entry| entry.value().last_used)
            .map(|entry| (entry.key().clone(), entry.value().last_used));

        let Some((key, last_used)) = oldest else {
            return false;
        };

        // Skip if a concurrent hit promoted it in the meantime
        if self
            .entries
            .remove_if(&key, |_, entry| entry.last_used == last_used)
            .is_some()
        {
            self.evictions.fetch_add(1, Ordering::Relaxed);
            log::debug!("Evicted least recently used cache entry: {}", key);
        }
        true
    }
}

/// Process-wide response cache partitioned into independently configured tiers.
///
/// The cache performs no I/O: callers look up, fetch on a miss, and store only
/// successful results. Expired entries are never returned and are purged the
/// next time they are read; `evict_expired` or the background sweeper reclaim
/// the ones nobody reads again.
pub struct TieredCache<V = Value> {
    tiers: HashMap<Tier, TierStore<V>>,
    config: CacheConfig,
    clock: Arc<dyn Clock>,
}

impl<V: Clone> TieredCache<V> {
    pub fn new(config: CacheConfig) -> Result<Self, CacheError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: CacheConfig, clock: Arc<dyn Clock>) -> Result<Self, CacheError> {
        config.validate()?;
        let tiers = Tier::iter()
            .map(|tier| (tier, TierStore::new(config.tier(tier))))
            .collect();

        Ok(Self {
            tiers,
            config,
            clock,
        })
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Deterministic key for `params` in `tier`.
    pub fn key_for(tier: Tier, params: &KeyParams) -> CacheKey {
        CacheKey::new(tier, params)
    }

    fn store(&self, tier: Tier) -> Option<&TierStore<V>> {
        if !self.config.enabled {
            return None;
        }
        self.tiers.get(&tier).filter(|store| store.config.enabled)
    }

    /// Get cached value if present and not expired. A hit refreshes its recency.
    pub fn get(&self, key: &CacheKey) -> Option<V> {
        let store = self.store(key.tier())?;
        let now = self.clock.now();

        let (value, expired) = match store.entries.get_mut(key.canonical()) {
            Some(mut entry) if entry.is_valid(now) => {
                entry.last_used = store.next_tick();
                (Some(entry.data.clone()), false)
            }
            Some(_) => (None, true),
            None => (None, false),
        };

        if expired
            && store
                .entries
                .remove_if(key.canonical(), |_, entry| !entry.is_valid(now))
                .is_some()
        {
            store.expirations.fetch_add(1, Ordering::Relaxed);
            log::debug!("Cache expired for key: {}", key);
        }

        match value {
            Some(value) => {
                store.hits.fetch_add(1, Ordering::Relaxed);
                log::debug!("Cache hit for key: {}", key);
                Some(value)
            }
            None => {
                store.misses.fetch_add(1, Ordering::Relaxed);
                log::debug!("Cache miss for key: {}", key);
                None
            }
        }
    }

    /// Store a value, overwriting any previous entry for the key.
    ///
    /// Without `ttl` the tier's default applies. Inserting a new key into a
    /// full tier first drops expired entries, then the least recently used one.
    pub fn set(&self, key: CacheKey, value: V, ttl: Option<Duration>) {
        let Some(store) = self.store(key.tier()) else {
            return;
        };

        let ttl = ttl.unwrap_or_else(|| store.config.ttl());
        if ttl <= Duration::zero() {
            log::debug!("Not caching {} with non-positive TTL", key);
            return;
        }

        let now = self.clock.now();
        if !store.entries.contains_key(key.canonical()) && store.entries.len() >= store.config.capacity {
            store.evict_expired(now);
            while store.entries.len() >= store.config.capacity {
                if !store.evict_lru() {
                    break;
                }
            }
        }

        let entry = CachedResult::new(value, now, ttl, store.next_tick());
        store.entries.insert(key.canonical().to_string(), entry);
        store.insertions.fetch_add(1, Ordering::Relaxed);
        log::debug!("Stored in cache with key: {} (ttl {}s)", key, ttl.num_seconds());
    }

    /// Drop a single entry. Returns whether it was present.
    pub fn invalidate(&self, key: &CacheKey) -> bool {
        self.tiers
            .get(&key.tier())
            .and_then(|store| store.entries.remove(key.canonical()))
            .is_some()
    }

    /// Remove expired entries from every tier
    pub fn evict_expired(&self) -> usize {
        let now = self.clock.now();
        let removed: usize = self.tiers.values().map(|store| store.evict_expired(now)).sum();
        log::debug!("Evicted {} expired cache entries", removed);
        removed
    }

    pub fn clear_tier(&self, tier: Tier) {
        if let Some(store) = self.tiers.get(&tier) {
            store.entries.clear();
            log::info!("Cache tier {} cleared", tier);
        }
    }

    /// Clear all cache entries
    pub fn clear(&self) {
        for store in self.tiers.values() {
            store.entries.clear();
        }
        log::info!("Cache cleared");
    }

    /// Number of stored entries in a tier, expired ones included.
    pub fn len(&self, tier: Tier) -> usize {
        self.tiers.get(&tier).map_or(0, |store| store.entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.values().all(|store| store.entries.is_empty())
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let now = self.clock.now();
        let mut tiers: Vec<TierStats> = self
            .tiers
            .iter()
            .map(|(tier, store)| {
                let mut expired_entries = 0;
                let mut expiring_soon = 0;
                for entry in store.entries.iter() {
                    if !entry.is_valid(now) {
                        expired_entries += 1;
                    } else if entry.expires_soon(now) {
                        expiring_soon += 1;
                    }
                }
                let total_entries = store.entries.len();

                TierStats {
                    tier: *tier,
                    total_entries,
                    valid_entries: total_entries.saturating_sub(expired_entries),
                    expired_entries,
                    expiring_soon,
                    capacity: store.config.capacity,
                    ttl_secs: store.config.ttl_secs,
                    enabled: self.config.enabled && store.config.enabled,
                    hits: store.hits.load(Ordering::Relaxed),
                    misses: store.misses.load(Ordering::Relaxed),
                    insertions: store.insertions.load(Ordering::Relaxed),
                    evictions: store.evictions.load(Ordering::Relaxed),
                    expirations: store.expirations.load(Ordering::Relaxed),
                }
            })
            .collect();
        tiers.sort_by_key(|stats| stats.tier);

        CacheStats {
            enabled: self.config.enabled,
            total_entries: tiers.iter().map(|stats| stats.total_entries).sum(),
            tiers,
        }
    }
}

impl<V: Clone + Send + Sync + 'static> TieredCache<V> {
    /// Periodically purge expired entries. Stops once the cache is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let cache: Weak<Self> = Arc::downgrade(self);
        let period = self.config.cleanup_interval().max(std::time::Duration::from_secs(1));

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // The first tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                match cache.upgrade() {
                    Some(cache) => {
                        cache.evict_expired();
                    }
                    None => break,
                }
            }
        })
    }
}

/// Statistics for a single tier
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "graphql", derive(SimpleObject))]
pub struct TierStats {
    pub tier: Tier,
    pub total_entries: usize,
    pub valid_entries: usize,
    pub expired_entries: usize,
    /// Valid entries within the last 10% of their TTL
    pub expiring_soon: usize,
    pub capacity: usize,
    pub ttl_secs: i64,
    pub enabled: bool,
    pub hits: u64,
    pub misses: u64,
    pub insertions: u64,
    pub evictions: u64,
    pub expirations: u64,
}

/// Cache statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "graphql", derive(SimpleObject))]
pub struct CacheStats {
    pub enabled: bool,
    pub total_entries: usize,
    pub tiers: Vec<TierStats>,
}

impl CacheStats {
    pub fn tier(&self, tier: Tier) -> Option<&TierStats> {
        self.tiers.iter().find(|stats| stats.tier == tier)
    }
}

/// Thread-safe wrapper for the cache
pub type SharedTieredCache = Arc<TieredCache>;
