use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use tracing::debug;

use aerobook_core::repository::SearchCache;
use aerobook_core::{CoreError, CoreResult};

#[derive(Clone)]
pub struct RedisClient {
    client: redis::Client,
}

impl RedisClient {
    pub async fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client })
    }

    pub async fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>, redis::RedisError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let value: Option<Vec<u8>> = conn.get(key).await?;
        Ok(value)
    }

    pub async fn set_bytes_ex(&self, key: &str, value: &[u8], ttl_seconds: u64) -> Result<(), redis::RedisError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.set_ex::<_, _, ()>(key, value, ttl_seconds).await?;
        debug!("Cached {} bytes under {} for {}s", value.len(), key, ttl_seconds);
        Ok(())
    }
}

#[async_trait]
impl SearchCache for RedisClient {
    async fn get(&self, key: &str) -> CoreResult<Option<Vec<u8>>> {
        self.get_bytes(key)
            .await
            .map_err(|e| CoreError::CacheError(e.to_string()))
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> CoreResult<()> {
        // SET EX rejects a zero expiry
        let ttl_seconds = ttl.as_secs().max(1);
        self.set_bytes_ex(key, value, ttl_seconds)
            .await
            .map_err(|e| CoreError::CacheError(e.to_string()))
    }
}
