use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;
use aerobook_core::CoreResult;

/// Fixed-attempt retry for idempotent saga steps.
///
/// Only transient errors (storage, cache, unavailable collaborator) are
/// retried; anything else is returned on the first failure.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_millis(50),
        }
    }
}

impl RetryPolicy {
    pub fn new(attempts: u32, backoff: Duration) -> Self {
        Self { attempts: attempts.max(1), backoff }
    }

    pub async fn run<T, F, Fut>(&self, step: &str, mut op: F) -> CoreResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = CoreResult<T>>,
    {
        let attempts = self.attempts.max(1);
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < attempts => {
                    warn!(step, attempt, "Saga step failed, retrying: {}", e);
                    sleep(self.backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
