//! Pipeline error types.
//!
//! [`CrawlError`] is the only error a run's retry path sees. Lower-layer
//! errors are classified into an [`ErrorKind`] as they are converted, and
//! a `CrawlError` is never classified again.

use mapletrack_cache::CacheError;
use mapletrack_core::error::CoreError;
use mapletrack_core::error_kind::{ErrorKind, FailureSignal};
use mapletrack_vendor::{ApiError, BrowserError};

/// A classified crawl failure.
#[derive(Debug, thiserror::Error)]
#[error("{kind}: {detail}")]
pub struct CrawlError {
    pub kind: ErrorKind,
    /// Short description of what failed.
    pub detail: String,
    /// Underlying error text, kept for operators.
    pub technical: Option<String>,
}

impl CrawlError {
    pub fn new(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
            technical: None,
        }
    }

    fn classified(signal: &FailureSignal<'_>, detail: String, technical: String) -> Self {
        Self {
            kind: ErrorKind::classify(signal),
            detail,
            technical: Some(technical),
        }
    }

    /// Prefix the detail with the operation that failed.
    pub fn context(mut self, what: &str) -> Self {
        self.detail = format!("{what}: {}", self.detail);
        self
    }
}

impl From<ApiError> for CrawlError {
    fn from(e: ApiError) -> Self {
        Self::classified(&e.failure_signal(), e.to_string(), format!("{e:?}"))
    }
}

impl From<BrowserError> for CrawlError {
    fn from(e: BrowserError) -> Self {
        Self::classified(&e.failure_signal(), e.to_string(), format!("{e:?}"))
    }
}

impl From<sqlx::Error> for CrawlError {
    fn from(e: sqlx::Error) -> Self {
        let message = e.to_string();
        let signal = FailureSignal {
            timed_out: matches!(e, sqlx::Error::PoolTimedOut),
            transport: matches!(e, sqlx::Error::Io(_) | sqlx::Error::PoolClosed),
            message: &message,
            ..Default::default()
        };
        Self::classified(&signal, message.clone(), format!("{e:?}"))
    }
}

impl From<CacheError> for CrawlError {
    fn from(e: CacheError) -> Self {
        let message = e.to_string();
        let signal = FailureSignal {
            transport: true,
            message: &message,
            ..Default::default()
        };
        Self::classified(&signal, message.clone(), format!("{e:?}"))
    }
}

/// Why a crawl request was not accepted.
#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    /// The character has no identity record.
    #[error("Character not found: {0}")]
    CharacterNotFound(String),

    /// Bad request, e.g. an empty or unknown sub-step list.
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}
