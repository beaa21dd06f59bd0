use std::time::Duration;

use crate::error::CacheError;

/// Key-value cache with TTLs and atomic counters.
///
/// All values are strings; structured payloads are JSON-encoded by the
/// caller.
#[async_trait::async_trait]
pub trait FastCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Set `key` to `value`, expiring after `ttl`.
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    async fn exists(&self, key: &str) -> Result<bool, CacheError>;

    /// Increment the integer at `key` by one and (re)apply `ttl`.
    ///
    /// A missing key counts from zero. Returns the new value.
    async fn incr(&self, key: &str, ttl: Duration) -> Result<i64, CacheError>;

    /// Delete keys, returning how many existed.
    async fn del(&self, keys: &[&str]) -> Result<u64, CacheError>;

    async fn ping(&self) -> Result<(), CacheError>;

    /// Read an integer counter, treating a missing key as zero.
    async fn get_count(&self, key: &str) -> Result<i64, CacheError> {
        match self.get(key).await? {
            Some(raw) => raw.trim().parse().map_err(|_| CacheError::NotAnInteger {
                key: key.to_string(),
            }),
            None => Ok(0),
        }
    }
}
