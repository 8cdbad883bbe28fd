use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{info, warn, Span};
use aerobook_core::search::SearchRequest;

use crate::results::{ResultStore, SearchStatus};
use crate::SearchError;

/// A request waiting in the dispatch queue, tagged with the handle its
/// submitter was given.
#[derive(Debug, Clone)]
pub struct SearchJob {
    pub handle: String,
    pub request: SearchRequest,
    pub enqueued_at: Instant,
}

/// Strictly increasing nanosecond stamps, even when the wall clock stalls
/// or two submissions land in the same instant.
#[derive(Debug, Default)]
pub struct HandleClock {
    last: AtomicU64,
}

impl HandleClock {
    pub fn next(&self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);

        let mut last = self.last.load(Ordering::SeqCst);
        loop {
            let candidate = now.max(last + 1);
            match self.last.compare_exchange(last, candidate, Ordering::SeqCst, Ordering::SeqCst) {
                Ok(_) => return candidate,
                Err(actual) => last = actual,
            }
        }
    }
}

/// Entry point of the search pipeline: mint a handle, enqueue, return.
#[derive(Clone)]
pub struct IntakeGateway {
    sender: mpsc::Sender<SearchJob>,
    results: Arc<ResultStore>,
    clock: Arc<HandleClock>,
    span: Span,
}

impl IntakeGateway {
    pub fn new(sender: mpsc::Sender<SearchJob>, results: Arc<ResultStore>, span: Span) -> Self {
        Self {
            sender,
            results,
            clock: Arc::new(HandleClock::default()),
            span,
        }
    }

    pub fn mint_handle(&self, request: &SearchRequest) -> String {
        format!(
            "{}-{}-{}-{}",
            request.origin,
            request.destination,
            request.date.format("%Y-%m-%d"),
            self.clock.next()
        )
    }

    /// Queue a search and hand back its handle without waiting for results.
    ///
    /// Blocks while the dispatch queue is full.
    pub async fn submit(&self, request: SearchRequest) -> Result<String, SearchError> {
        request.validate().map_err(SearchError::Invalid)?;

        let handle = self.mint_handle(&request);

        // Nothing is recorded until a queue slot is held, so a submitter
        // dropped while waiting leaves no entry behind.
        let permit = match self.sender.reserve().await {
            Ok(permit) => permit,
            Err(_) => {
                self.span
                    .in_scope(|| warn!("Dispatch queue closed, dropping search {}", handle));
                self.results
                    .put(&handle, SearchStatus::Failed("search worker is not running".to_string()))
                    .await;
                return Err(SearchError::QueueClosed);
            }
        };
        self.results.mark_pending(&handle).await;
        permit.send(SearchJob {
            handle: handle.clone(),
            request,
            enqueued_at: Instant::now(),
        });

        self.span
            .in_scope(|| info!(request_id = %handle, "Search request queued"));
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::HashSet;
    use std::time::Duration;

    fn request() -> SearchRequest {
        SearchRequest {
            origin: "New York".to_string(),
            destination: "London".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 12, 25).unwrap(),
            page: 1,
            page_size: 10,
        }
    }

    fn gateway(capacity: usize) -> (IntakeGateway, mpsc::Receiver<SearchJob>, Arc<ResultStore>) {
        let (tx, rx) = mpsc::channel(capacity);
        let results = Arc::new(ResultStore::new(100, Duration::from_secs(60)));
        (IntakeGateway::new(tx, results.clone(), Span::none()), rx, results)
    }

    #[test]
    fn test_clock_is_strictly_increasing() {
        let clock = HandleClock::default();
        let mut last = 0;
        for _ in 0..1000 {
            let next = clock.next();
            assert!(next > last);
            last = next;
        }
    }

    #[tokio::test]
    async fn test_submit_enqueues_and_returns_handle() {
        let (gateway, mut rx, results) = gateway(10);

        let handle = gateway.submit(request()).await.unwrap();

        let (prefix, stamp) = handle.rsplit_once('-').unwrap();
        assert_eq!(prefix, "New York-London-2024-12-25");
        assert!(stamp.parse::<u64>().is_ok());
        assert_eq!(results.get(&handle).await, Some(SearchStatus::Pending));

        let job = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("request was not queued")
            .unwrap();
        assert_eq!(job.handle, handle);
        assert_eq!(job.request, request());
    }

    #[tokio::test]
    async fn test_identical_requests_get_distinct_handles() {
        let (gateway, _rx, _results) = gateway(100);
        let mut handles = HashSet::new();
        for _ in 0..50 {
            handles.insert(gateway.submit(request()).await.unwrap());
        }
        assert_eq!(handles.len(), 50);
    }

    #[tokio::test]
    async fn test_invalid_request_is_rejected_before_queueing() {
        let (gateway, mut rx, results) = gateway(10);
        let mut bad = request();
        bad.page = 0;

        assert!(matches!(gateway.submit(bad).await, Err(SearchError::Invalid(_))));
        assert!(rx.try_recv().is_err());
        assert!(results.is_empty().await);
    }

    #[tokio::test]
    async fn test_full_queue_blocks_producer() {
        let (gateway, mut rx, _results) = gateway(1);
        gateway.submit(request()).await.unwrap();
        assert_eq!(gateway.sender.capacity(), 0);

        let blocked = tokio::time::timeout(Duration::from_millis(100), gateway.submit(request())).await;
        assert!(blocked.is_err(), "submit should wait while the queue is full");

        let producer = gateway.clone();
        let pending = tokio::spawn(async move { producer.submit(request()).await });
        rx.recv().await.unwrap();

        let handle = pending.await.unwrap().unwrap();
        assert!(handle.starts_with("New York-London-"));
    }

    #[tokio::test]
    async fn test_abandoned_submit_leaves_no_pending_entry() {
        let (gateway, mut rx, results) = gateway(1);
        let queued = gateway.submit(request()).await.unwrap();

        let abandoned = tokio::time::timeout(Duration::from_millis(50), gateway.submit(request())).await;
        assert!(abandoned.is_err());
        assert_eq!(results.len().await, 1);
        assert_eq!(results.get(&queued).await, Some(SearchStatus::Pending));

        assert_eq!(rx.recv().await.unwrap().handle, queued);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_closed_queue_is_reported() {
        let (gateway, rx, results) = gateway(1);
        drop(rx);

        assert!(matches!(gateway.submit(request()).await, Err(SearchError::QueueClosed)));
        assert_eq!(results.len().await, 1);
    }
}
