/// Surrogate primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All stored timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Crawl tasks are addressed by a time-ordered UUID.
pub type TaskId = uuid::Uuid;
