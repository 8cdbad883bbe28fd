//! Asynchronous flight search: intake, dispatch queue, a single worker,
//! cache-aside resolution and a pollable result store.

pub mod gateway;
pub mod resolver;
pub mod results;
pub mod worker;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{info_span, Span};
use aerobook_core::repository::{FlightCatalog, SearchCache};
use aerobook_core::CoreError;

pub use gateway::{IntakeGateway, SearchJob};
pub use resolver::CacheAsideResolver;
pub use results::{PollPolicy, ResultStore, SearchStatus};
pub use worker::SearchWorker;

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Invalid search request: {0}")]
    Invalid(CoreError),
    #[error("Search queue is closed")]
    QueueClosed,
    #[error("Results for {handle} not ready after {attempts} attempts")]
    NotReady { handle: String, attempts: u32 },
    #[error("Search {handle} failed: {reason}")]
    Failed { handle: String, reason: String },
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub queue_capacity: usize,
    pub cache_ttl: Duration,
    pub result_capacity: usize,
    pub result_ttl: Duration,
    pub poll: PollPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 100,
            cache_ttl: resolver::DEFAULT_CACHE_TTL,
            result_capacity: 10_000,
            result_ttl: Duration::from_secs(600),
            poll: PollPolicy::default(),
        }
    }
}

/// The wired-up pipeline. The worker is returned unstarted so the caller
/// decides where it runs.
pub struct SearchPipeline {
    pub gateway: IntakeGateway,
    pub worker: SearchWorker,
    pub results: Arc<ResultStore>,
}

impl SearchPipeline {
    pub fn build(
        catalog: Arc<dyn FlightCatalog>,
        cache: Arc<dyn SearchCache>,
        config: &PipelineConfig,
        parent: &Span,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let results = Arc::new(ResultStore::new(config.result_capacity, config.result_ttl));

        let resolver = CacheAsideResolver::new(
            catalog,
            cache,
            config.cache_ttl,
            info_span!(parent: parent, "cache_aside"),
        );
        let gateway = IntakeGateway::new(sender, results.clone(), info_span!(parent: parent, "search_intake"));
        let worker = SearchWorker::new(receiver, resolver, results.clone(), info_span!(parent: parent, "search_worker"));

        Self { gateway, worker, results }
    }
}
