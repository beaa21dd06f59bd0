//! Fast key-value cache used for transient task status, counters,
//! alert markers and duplicate-suppression keys.
//!
//! [`RedisCache`] is the production backend; [`MemoryCache`] keeps the
//! same semantics in-process.

pub mod backend;
pub mod error;
pub mod memory;
pub mod redis;

pub use backend::FastCache;
pub use error::CacheError;
pub use memory::MemoryCache;
pub use redis::RedisCache;
