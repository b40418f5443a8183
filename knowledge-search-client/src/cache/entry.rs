use chrono::{DateTime, Duration, Utc};

/// Cached value with the metadata needed for expiry and recency.
#[derive(Clone, Debug)]
pub struct CachedResult<V> {
    pub data: V,
    pub created_at: DateTime<Utc>,
    pub ttl: Duration,
    /// Logical access tick, bumped on every hit
    pub last_used: u64,
}

impl<V> CachedResult<V> {
    pub fn new(data: V, created_at: DateTime<Utc>, ttl: Duration, tick: u64) -> Self {
        Self {
            data,
            created_at,
            ttl,
            last_used: tick,
        }
    }

    /// `None` when the TTL reaches past the last representable instant.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.created_at.checked_add_signed(self.ttl)
    }

    /// Check if the cached result is still valid at `now`
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().map_or(true, |expires_at| now < expires_at)
    }

    /// Check if the cached result will expire soon (within 10% of TTL)
    pub fn expires_soon(&self, now: DateTime<Utc>) -> bool {
        let Some(expires_at) = self.expires_at() else {
            return false;
        };
        let expiry_threshold = self.ttl.num_milliseconds() / 10;
        (expires_at - now).num_milliseconds() < expiry_threshold
    }
}
