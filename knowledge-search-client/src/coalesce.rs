use crate::cache::CacheKey;
use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::Future;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;

#[cfg(feature = "graphql")]
use async_graphql::SimpleObject;

/// Configuration for request coalescing
#[derive(Clone, Debug)]
pub struct CoalesceConfig {
    /// How long a follower waits for the leading request
    pub request_timeout: Duration,
    /// Whether coalescing is enabled
    pub enabled: bool,
}

impl Default for CoalesceConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::seconds(30),
            enabled: true,
        }
    }
}

type Waiters<V> = Vec<oneshot::Sender<V>>;

/// One leader's registration. The id tells it apart from a later leader
/// that took over the key after this one expired.
struct Pending<V> {
    id: u64,
    started: DateTime<Utc>,
    waiters: Waiters<V>,
}

/// Collapses concurrent misses on the same cache key into one upstream call.
///
/// The first caller for a key runs the fetch; callers arriving while it is in
/// flight wait for a clone of its result.
pub struct RequestCoalescer<V> {
    pending: DashMap<CacheKey, Pending<V>>,
    next_id: AtomicU64,
    config: CoalesceConfig,
}

/// Releases followers if the leading request is dropped before finishing.
struct PendingGuard<'a, V> {
    pending: &'a DashMap<CacheKey, Pending<V>>,
    key: &'a CacheKey,
    id: u64,
    armed: bool,
}

impl<V> Drop for PendingGuard<'_, V> {
    fn drop(&mut self) {
        if self.armed {
            // Dropping the senders wakes every follower with an error
            self.pending.remove_if(self.key, |_, pending| pending.id == self.id);
        }
    }
}

impl<V: Clone> RequestCoalescer<V> {
    pub fn new(config: CoalesceConfig) -> Self {
        Self {
            pending: DashMap::new(),
            next_id: AtomicU64::new(0),
            config,
        }
    }

    /// Run `fetch` for `key`, or wait for an identical request already in flight.
    pub async fn execute<F, Fut>(&self, key: CacheKey, fetch: F) -> Result<V, CoalesceError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        if !self.config.enabled {
            return Ok(fetch().await);
        }

        self.cleanup_expired();

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let follower = match self.pending.entry(key.clone()) {
            Entry::Occupied(mut entry) => {
                let (tx, rx) = oneshot::channel();
                entry.get_mut().waiters.push(tx);
                Some(rx)
            }
            Entry::Vacant(entry) => {
                entry.insert(Pending {
                    id,
                    started: Utc::now(),
                    waiters: Vec::new(),
                });
                None
            }
        };

        if let Some(rx) = follower {
            log::debug!("Request already pending for key: {}", key);
            let timeout = self
                .config
                .request_timeout
                .to_std()
                .unwrap_or(std::time::Duration::ZERO);

            return match tokio::time::timeout(timeout, rx).await {
                Ok(Ok(result)) => {
                    log::debug!("Received coalesced result for key: {}", key);
                    Ok(result)
                }
                Ok(Err(_)) => {
                    log::warn!("Leading request dropped for key: {}", key);
                    Err(CoalesceError::SenderDropped)
                }
                Err(_) => {
                    log::warn!("Request timeout for key: {}", key);
                    Err(CoalesceError::Timeout)
                }
            };
        }

        log::debug!("Executing new request for key: {}", key);
        let mut guard = PendingGuard {
            pending: &self.pending,
            key: &key,
            id,
            armed: true,
        };

        let result = fetch().await;

        guard.armed = false;
        match self.pending.remove_if(&key, |_, pending| pending.id == id) {
            Some((_, pending)) => {
                log::debug!("Notifying {} waiters for key: {}", pending.waiters.len(), key);
                for waiter in pending.waiters {
                    let _ = waiter.send(result.clone());
                }
            }
            None => log::debug!("Request for key {} outlived its registration", key),
        }

        Ok(result)
    }

    /// Forget requests that have been pending longer than the timeout
    fn cleanup_expired(&self) {
        let now = Utc::now();
        let timeout = self.config.request_timeout;
        self.pending.retain(|key, pending| {
            let alive = now - pending.started <= timeout;
            if !alive {
                log::debug!(
                    "Cleaning up expired request for key: {} with {} waiters",
                    key,
                    pending.waiters.len()
                );
            }
            alive
        });
    }

    /// Get statistics about pending requests
    pub fn stats(&self) -> CoalesceStats {
        CoalesceStats {
            pending_requests: self.pending.len(),
            total_waiters: self.pending.iter().map(|entry| entry.value().waiters.len()).sum(),
        }
    }

    /// Clear all pending requests
    pub fn clear(&self) {
        self.pending.clear();
        log::info!("Request coalescer cleared");
    }
}

/// Statistics for request coalescing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "graphql", derive(SimpleObject))]
pub struct CoalesceStats {
    pub pending_requests: usize,
    pub total_waiters: usize,
}

/// Errors that can occur while waiting on a coalesced request
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum CoalesceError {
    #[error("Request timed out")]
    Timeout,
    #[error("Sender was dropped")]
    SenderDropped,
}

/// Thread-safe wrapper for the coalescer
pub type SharedRequestCoalescer<V> = Arc<RequestCoalescer<V>>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration as StdDuration;

    #[tokio::test]
    async fn test_request_coalescing() {
        let coalescer: SharedRequestCoalescer<usize> = Arc::new(RequestCoalescer::new(CoalesceConfig::default()));
        let execution_count = Arc::new(AtomicUsize::new(0));
        let key = CacheKey::page("en", "Tokyo");

        // Execute multiple identical requests concurrently
        let mut handles = vec![];
        for _ in 0..5 {
            let coalescer = coalescer.clone();
            let key = key.clone();
            let execution_count = execution_count.clone();

            handles.push(tokio::spawn(async move {
                coalescer
                    .execute(key, || async move {
                        tokio::time::sleep(StdDuration::from_millis(100)).await;
                        execution_count.fetch_add(1, Ordering::SeqCst)
                    })
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), 0);
        }

        // Should have executed only once
        assert_eq!(execution_count.load(Ordering::SeqCst), 1);
        assert_eq!(coalescer.stats().pending_requests, 0);
    }

    #[tokio::test]
    async fn test_different_keys_not_coalesced() {
        let coalescer = Arc::new(RequestCoalescer::new(CoalesceConfig::default()));
        let execution_count = Arc::new(AtomicUsize::new(0));

        let run = |key: CacheKey| {
            let coalescer = coalescer.clone();
            let execution_count = execution_count.clone();
            tokio::spawn(async move {
                coalescer
                    .execute(key, || async move {
                        execution_count.fetch_add(1, Ordering::SeqCst);
                    })
                    .await
            })
        };

        let handle1 = run(CacheKey::page("en", "Tokyo"));
        let handle2 = run(CacheKey::page("en", "Kyoto"));
        handle1.await.unwrap().unwrap();
        handle2.await.unwrap().unwrap();

        assert_eq!(execution_count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_disabled_runs_every_request() {
        let coalescer = RequestCoalescer::new(CoalesceConfig {
            enabled: false,
            ..Default::default()
        });
        let count = AtomicUsize::new(0);
        for _ in 0..3 {
            coalescer
                .execute(CacheKey::page("en", "Tokyo"), || async {
                    count.fetch_add(1, Ordering::SeqCst);
                })
                .await
                .unwrap();
        }
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_cancelled_leader_releases_followers() {
        let coalescer: SharedRequestCoalescer<()> = Arc::new(RequestCoalescer::new(CoalesceConfig::default()));
        let key = CacheKey::page("en", "Tokyo");

        let leader = {
            let coalescer = coalescer.clone();
            let key = key.clone();
            tokio::spawn(async move {
                coalescer
                    .execute(key, || tokio::time::sleep(StdDuration::from_secs(60)))
                    .await
            })
        };
        tokio::time::sleep(StdDuration::from_millis(20)).await;

        let follower = {
            let coalescer = coalescer.clone();
            tokio::spawn(async move { coalescer.execute(key, || async {}).await })
        };
        tokio::time::sleep(StdDuration::from_millis(20)).await;
        assert_eq!(coalescer.stats().total_waiters, 1);

        leader.abort();
        assert_eq!(follower.await.unwrap(), Err(CoalesceError::SenderDropped));
        assert_eq!(coalescer.stats().pending_requests, 0);
    }

    #[tokio::test]
    async fn test_expired_leader_leaves_successor_registered() {
        let coalescer: SharedRequestCoalescer<usize> = Arc::new(RequestCoalescer::new(CoalesceConfig {
            request_timeout: Duration::milliseconds(30),
            enabled: true,
        }));
        let key = CacheKey::page("en", "Tokyo");
        let (release_first, first_gate) = oneshot::channel::<()>();
        let (release_second, second_gate) = oneshot::channel::<()>();

        let first = {
            let coalescer = coalescer.clone();
            let key = key.clone();
            tokio::spawn(async move {
                coalescer
                    .execute(key, || async move {
                        let _ = first_gate.await;
                        1
                    })
                    .await
            })
        };
        tokio::time::sleep(StdDuration::from_millis(60)).await;

        // The first registration is stale now, so this caller leads anew
        let second = {
            let coalescer = coalescer.clone();
            let key = key.clone();
            tokio::spawn(async move {
                coalescer
                    .execute(key, || async move {
                        let _ = second_gate.await;
                        2
                    })
                    .await
            })
        };
        tokio::time::sleep(StdDuration::from_millis(20)).await;
        assert_eq!(coalescer.stats().pending_requests, 1);

        release_first.send(()).unwrap();
        assert_eq!(first.await.unwrap(), Ok(1));
        assert_eq!(coalescer.stats().pending_requests, 1);

        release_second.send(()).unwrap();
        assert_eq!(second.await.unwrap(), Ok(2));
        assert_eq!(coalescer.stats().pending_requests, 0);
    }

    #[tokio::test]
    async fn test_cancelled_expired_leader_leaves_successor_registered() {
        let coalescer: SharedRequestCoalescer<()> = Arc::new(RequestCoalescer::new(CoalesceConfig {
            request_timeout: Duration::milliseconds(30),
            enabled: true,
        }));
        let key = CacheKey::page("en", "Tokyo");

        let first = {
            let coalescer = coalescer.clone();
            let key = key.clone();
            tokio::spawn(async move {
                coalescer
                    .execute(key, || tokio::time::sleep(StdDuration::from_secs(60)))
                    .await
            })
        };
        tokio::time::sleep(StdDuration::from_millis(60)).await;

        let second = {
            let coalescer = coalescer.clone();
            let key = key.clone();
            tokio::spawn(async move {
                coalescer
                    .execute(key, || tokio::time::sleep(StdDuration::from_secs(60)))
                    .await
            })
        };
        tokio::time::sleep(StdDuration::from_millis(20)).await;

        first.abort();
        let _ = first.await;
        assert_eq!(coalescer.stats().pending_requests, 1);

        second.abort();
        let _ = second.await;
        assert_eq!(coalescer.stats().pending_requests, 0);
    }
}
