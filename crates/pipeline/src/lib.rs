//! Crawl task orchestration.
//!
//! [`CrawlScheduler`] accepts requests and spawns one [`CrawlRunner`] run
//! per task; [`TaskStatusStore`] keeps the task state in both the durable
//! store and the fast cache.

pub mod error;
pub mod runner;
pub mod scheduler;
pub mod status;
pub mod steps;

pub use error::{CrawlError, ScheduleError};
pub use runner::{CrawlDeps, CrawlJob, CrawlRunner};
pub use scheduler::{CrawlDecision, CrawlRequest, CrawlScheduler};
pub use status::{TaskStatusStore, TaskStatusView, TaskTransition};
pub use steps::{StepPartial, StepStatus};
