use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, warn, Span};
use aerobook_catalog::Flight;
use aerobook_core::repository::{FlightCatalog, SearchCache};
use aerobook_core::search::SearchRequest;
use aerobook_core::CoreResult;

/// Default lifetime of a cached result page.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(15 * 60);

/// Resolves one search against the external cache, falling back to the catalog.
pub struct CacheAsideResolver {
    catalog: Arc<dyn FlightCatalog>,
    cache: Arc<dyn SearchCache>,
    ttl: Duration,
    span: Span,
}

impl CacheAsideResolver {
    pub fn new(catalog: Arc<dyn FlightCatalog>, cache: Arc<dyn SearchCache>, ttl: Duration, span: Span) -> Self {
        Self { catalog, cache, ttl, span }
    }

    pub async fn resolve(&self, request: &SearchRequest) -> CoreResult<Vec<Flight>> {
        let key = request.cache_key();

        if let Some(flights) = self.read_cache(&key).await {
            return Ok(flights);
        }

        let flights = self.catalog.search_flights(request).await?;
        self.write_cache(&key, &flights).await;
        Ok(flights)
    }

    /// A read error or an undecodable payload counts as a miss.
    async fn read_cache(&self, key: &str) -> Option<Vec<Flight>> {
        match self.cache.get(key).await {
            Ok(Some(payload)) => match serde_json::from_slice::<Vec<Flight>>(&payload) {
                Ok(flights) => {
                    self.span.in_scope(|| debug!(cache_key = key, "Cache hit"));
                    Some(flights)
                }
                Err(e) => {
                    self.span
                        .in_scope(|| warn!(cache_key = key, "Discarding undecodable cache entry: {}", e));
                    None
                }
            },
            Ok(None) => {
                self.span.in_scope(|| debug!(cache_key = key, "Cache miss"));
                None
            }
            Err(e) => {
                self.span
                    .in_scope(|| warn!(cache_key = key, "Cache read failed, using catalog: {}", e));
                None
            }
        }
    }

    async fn write_cache(&self, key: &str, flights: &[Flight]) {
        let payload = match serde_json::to_vec(flights) {
            Ok(payload) => payload,
            Err(e) => {
                self.span.in_scope(|| error!(cache_key = key, "Failed to encode results: {}", e));
                return;
            }
        };

        if let Err(e) = self.cache.set(key, &payload, self.ttl).await {
            self.span.in_scope(|| error!(cache_key = key, "Failed to set cache: {}", e));
        }
    }
}
