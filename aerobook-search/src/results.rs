use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::{sleep, Instant};
use tracing::debug;
use aerobook_catalog::Flight;

use crate::SearchError;

/// Where a submitted search stands, as seen by pollers.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchStatus {
    Pending,
    Ready(Vec<Flight>),
    Failed(String),
}

/// How long a caller is willing to wait for a result
#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    pub attempts: u32,
    pub interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            interval: Duration::from_secs(1),
        }
    }
}

struct Entry {
    status: SearchStatus,
    written_at: Instant,
}

struct Inner {
    entries: HashMap<String, Entry>,
    // First-insertion order, may hold keys that were already dropped
    order: VecDeque<String>,
}

/// Handle-keyed search outcomes with a size cap and a time-to-live.
///
/// Readers share the lock; every write is exclusive. Past `capacity` the
/// oldest handles are evicted first, and entries older than `ttl` (measured
/// from their last write) are invisible to readers.
pub struct ResultStore {
    inner: RwLock<Inner>,
    capacity: usize,
    ttl: Duration,
}

impl ResultStore {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            inner: RwLock::new(Inner {
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
            capacity: capacity.max(1),
            ttl,
        }
    }

    pub async fn get(&self, handle: &str) -> Option<SearchStatus> {
        let inner = self.inner.read().await;
        inner
            .entries
            .get(handle)
            .filter(|entry| entry.written_at.elapsed() < self.ttl)
            .map(|entry| entry.status.clone())
    }

    pub async fn mark_pending(&self, handle: &str) {
        self.put(handle, SearchStatus::Pending).await;
    }

    pub async fn put(&self, handle: &str, status: SearchStatus) {
        let mut inner = self.inner.write().await;
        let now = Instant::now();

        if let Some(entry) = inner.entries.get_mut(handle) {
            entry.status = status;
            entry.written_at = now;
            return;
        }

        if inner.entries.len() >= self.capacity {
            self.evict(&mut inner, now);
        }

        inner.entries.insert(handle.to_string(), Entry { status, written_at: now });
        inner.order.push_back(handle.to_string());
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.entries.is_empty()
    }

    fn evict(&self, inner: &mut Inner, now: Instant) {
        let ttl = self.ttl;
        let before = inner.entries.len();
        inner.entries.retain(|_, entry| now.duration_since(entry.written_at) < ttl);

        let Inner { entries, order } = inner;
        order.retain(|key| entries.contains_key(key));

        while entries.len() >= self.capacity {
            match order.pop_front() {
                Some(oldest) => {
                    entries.remove(&oldest);
                }
                None => break,
            }
        }
        debug!("Result store evicted {} entries", before - entries.len());
    }

    /// Bounded wait for a handle to resolve.
    ///
    /// Performs exactly `policy.attempts` lookups, pausing `policy.interval`
    /// after every miss, so an unresolved handle costs `attempts * interval`.
    pub async fn poll(&self, handle: &str, policy: &PollPolicy) -> Result<Vec<Flight>, SearchError> {
        for attempt in 1..=policy.attempts {
            match self.get(handle).await {
                Some(SearchStatus::Ready(flights)) => return Ok(flights),
                Some(SearchStatus::Failed(reason)) => {
                    return Err(SearchError::Failed {
                        handle: handle.to_string(),
                        reason,
                    })
                }
                _ => debug!("Results for {} not ready (attempt {}/{})", handle, attempt, policy.attempts),
            }
            sleep(policy.interval).await;
        }

        Err(SearchError::NotReady {
            handle: handle.to_string(),
            attempts: policy.attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn store() -> ResultStore {
        ResultStore::new(3, Duration::from_secs(60))
    }

    #[tokio::test]
    async fn test_pending_then_ready() {
        let store = store();
        assert_eq!(store.get("h1").await, None);

        store.mark_pending("h1").await;
        assert_eq!(store.get("h1").await, Some(SearchStatus::Pending));

        store.put("h1", SearchStatus::Ready(vec![])).await;
        assert_eq!(store.get("h1").await, Some(SearchStatus::Ready(vec![])));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_evicts_oldest_past_capacity() {
        let store = store();
        for handle in ["a", "b", "c"] {
            store.mark_pending(handle).await;
        }
        // Rewriting "a" does not make it younger for eviction purposes
        store.put("a", SearchStatus::Ready(vec![])).await;
        store.mark_pending("d").await;

        assert_eq!(store.len().await, 3);
        assert_eq!(store.get("a").await, None);
        assert!(store.get("b").await.is_some());
        assert!(store.get("d").await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entries_are_hidden_and_reclaimed() {
        let store = ResultStore::new(2, Duration::from_secs(10));
        store.mark_pending("old").await;
        tokio::time::advance(Duration::from_secs(11)).await;

        assert_eq!(store.get("old").await, None);

        store.mark_pending("x").await;
        store.mark_pending("y").await;
        // "old" was reclaimed as expired, so both fresh entries fit
        assert!(store.get("x").await.is_some());
        assert!(store.get("y").await.is_some());
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_exhausts_after_all_attempts() {
        let store = store();
        store.mark_pending("never").await;

        let started = Instant::now();
        let result = store.poll("never", &PollPolicy::default()).await;

        assert!(matches!(result, Err(SearchError::NotReady { attempts: 5, .. })));
        assert_eq!(started.elapsed(), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_returns_on_first_hit() {
        let store = Arc::new(store());
        store.mark_pending("h").await;

        let writer = store.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(2500)).await;
            writer.put("h", SearchStatus::Ready(vec![])).await;
        });

        let started = Instant::now();
        let flights = store.poll("h", &PollPolicy::default()).await.unwrap();
        assert!(flights.is_empty());
        // Lookups at t=0,1,2 miss; t=3 hits
        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_reports_failure_immediately() {
        let store = store();
        store.put("bad", SearchStatus::Failed("catalog offline".to_string())).await;

        let started = Instant::now();
        let result = store.poll("bad", &PollPolicy::default()).await;

        match result {
            Err(SearchError::Failed { reason, .. }) => assert_eq!(reason, "catalog offline"),
            other => panic!("unexpected poll outcome: {:?}", other),
        }
        assert_eq!(started.elapsed(), Duration::ZERO);
    }
}
