use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, Instrument, Span};

use crate::gateway::SearchJob;
use crate::resolver::CacheAsideResolver;
use crate::results::{ResultStore, SearchStatus};

/// Single consumer of the dispatch queue. Jobs are resolved one at a time in
/// the order they were enqueued.
pub struct SearchWorker {
    receiver: mpsc::Receiver<SearchJob>,
    resolver: CacheAsideResolver,
    results: Arc<ResultStore>,
    span: Span,
}

impl SearchWorker {
    pub fn new(
        receiver: mpsc::Receiver<SearchJob>,
        resolver: CacheAsideResolver,
        results: Arc<ResultStore>,
        span: Span,
    ) -> Self {
        Self { receiver, resolver, results, span }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        let span = self.span.clone();
        tokio::spawn(self.run().instrument(span))
    }

    /// Runs until every gateway has been dropped.
    pub async fn run(mut self) {
        info!("Search worker started, waiting for requests...");

        while let Some(job) = self.receiver.recv().await {
            self.process(job).await;
        }

        info!("Dispatch queue closed, search worker stopping");
    }

    async fn process(&self, job: SearchJob) {
        let queued_for = job.enqueued_at.elapsed();

        match self.resolver.resolve(&job.request).await {
            Ok(flights) => {
                info!(
                    request_id = %job.handle,
                    results = flights.len(),
                    queued_ms = queued_for.as_millis() as u64,
                    "Search resolved"
                );
                self.results.put(&job.handle, SearchStatus::Ready(flights)).await;
            }
            Err(e) => {
                error!(
                    request_id = %job.handle,
                    origin = %job.request.origin,
                    destination = %job.request.destination,
                    "Failed to process search request: {}",
                    e
                );
                self.results.put(&job.handle, SearchStatus::Failed(e.to_string())).await;
            }
        }
    }
}
