use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};

/// Serializes seat-pool and booking read-modify-write within this process.
///
/// Every component that loads a `Flight` or `Booking` and writes it back
/// holds a clone of the same lock for the whole cycle.
#[derive(Clone, Default)]
pub struct InventoryLock {
    inner: Arc<Mutex<()>>,
}

impl InventoryLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self) -> MutexGuard<'_, ()> {
        self.inner.lock().await
    }
}
