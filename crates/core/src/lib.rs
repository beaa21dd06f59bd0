//! Shared domain types for the character crawl pipeline.
//!
//! Everything here is pure: no I/O, no async. The other crates build on
//! these types:
//!
//! - [`CrawlSubtype`] and [`CrawlStatus`]: what a run does and where it is.
//! - [`ErrorKind`]: the four user-visible failure categories.
//! - [`ParsedItem`] / [`ItemDetail`] with field rules in [`validation`].
//! - [`Checkpoint`]: expiry notification horizons.
//! - [`cache_keys`]: literal fast-cache key formats.
//! - [`CrawlerConfig`]: tuning knobs loaded from the environment.

pub mod cache_keys;
pub mod checkpoint;
pub mod config;
pub mod error;
pub mod error_kind;
pub mod item;
pub mod subtype;
pub mod task_status;
pub mod time;
pub mod types;
pub mod validation;

pub use checkpoint::Checkpoint;
pub use config::CrawlerConfig;
pub use error::CoreError;
pub use error_kind::{ErrorKind, FailureSignal};
pub use item::{ItemDetail, ItemOptions, ItemSource, ItemType, ParsedItem};
pub use subtype::CrawlSubtype;
pub use task_status::CrawlStatus;
pub use types::{DbId, TaskId, Timestamp};
