use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

use crate::backend::FastCache;
use crate::error::CacheError;

/// In-process cache for single-node runs and tests.
///
/// Expiry is measured on the tokio clock, so paused-time tests can step
/// over TTLs with `tokio::time::advance`.
#[derive(Default)]
pub struct MemoryCache {
    store: DashMap<String, (String, Instant)>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn live(&self, key: &str) -> Option<String> {
        let entry = self.store.get(key)?;
        let (value, expires_at) = entry.value();
        if Instant::now() >= *expires_at {
            drop(entry);
            self.store.remove(key);
            return None;
        }
        Some(value.clone())
    }
}

#[async_trait::async_trait]
impl FastCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.live(key))
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        self.store
            .insert(key.to_string(), (value.to_string(), Instant::now() + ttl));
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.live(key).is_some())
    }

    async fn incr(&self, key: &str, ttl: Duration) -> Result<i64, CacheError> {
        let now = Instant::now();
        let mut entry = self
            .store
            .entry(key.to_string())
            .or_insert_with(|| ("0".to_string(), now + ttl));

        let (value, expires_at) = entry.value_mut();
        let current: i64 = if now >= *expires_at {
            0
        } else {
            value.parse().map_err(|_| CacheError::NotAnInteger {
                key: key.to_string(),
            })?
        };

        let next = current + 1;
        *value = next.to_string();
        *expires_at = now + ttl;
        Ok(next)
    }

    async fn del(&self, keys: &[&str]) -> Result<u64, CacheError> {
        let mut count = 0;
        for key in keys {
            if self.live(key).is_some() {
                count += 1;
            }
            self.store.remove(*key);
        }
        Ok(count)
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }
}
