/// Errors surfaced by a fast-cache backend.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cache pool error: {0}")]
    Pool(String),

    #[error("Redis error: {0}")]
    Redis(#[from] deadpool_redis::redis::RedisError),

    #[error("Stored value for {key} is not an integer")]
    NotAnInteger { key: String },
}
