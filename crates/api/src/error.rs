use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use mapletrack_cache::CacheError;
use mapletrack_core::error::CoreError;
use mapletrack_core::error_kind::ErrorKind;
use mapletrack_pipeline::ScheduleError;
use mapletrack_vendor::ApiError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps the domain, store, cache and vendor errors a handler can hit and
/// renders them as a `{error, code}` JSON body.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// A direct vendor call made on behalf of the request.
    #[error("Vendor API error: {0}")]
    Vendor(#[from] ApiError),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Core(core) => classify_core_error(core),

            AppError::Database(err) => classify_sqlx_error(err),

            AppError::Schedule(err) => match err {
                ScheduleError::CharacterNotFound(_) => (
                    StatusCode::NOT_FOUND,
                    ErrorKind::CharacterNotFound.as_str(),
                    ErrorKind::CharacterNotFound.user_message().to_string(),
                ),
                ScheduleError::Core(core) => classify_core_error(core),
                ScheduleError::Database(db) => classify_sqlx_error(db),
            },

            AppError::Cache(err) => {
                tracing::error!(error = %err, "Cache error");
                internal()
            }

            AppError::Vendor(err) => match err {
                ApiError::NotFound(_) => (
                    StatusCode::NOT_FOUND,
                    ErrorKind::CharacterNotFound.as_str(),
                    ErrorKind::CharacterNotFound.user_message().to_string(),
                ),
                other => {
                    let kind = ErrorKind::classify(&other.failure_signal());
                    tracing::warn!(error = %other, error_kind = %kind, "Vendor API call failed");
                    let status = match kind {
                        ErrorKind::Maintenance => StatusCode::SERVICE_UNAVAILABLE,
                        ErrorKind::NetworkError => StatusCode::GATEWAY_TIMEOUT,
                        _ => StatusCode::BAD_GATEWAY,
                    };
                    (status, kind.as_str(), kind.user_message().to_string())
                }
            },

            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

fn classify_core_error(err: &CoreError) -> (StatusCode, &'static str, String) {
    match err {
        CoreError::NotFound { entity, id } => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("{entity} with id {id} not found"),
        ),
        CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
        CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
        CoreError::Internal(msg) => {
            tracing::error!(error = %msg, "Internal core error");
            internal()
        }
    }
}

/// Classify a sqlx error into an HTTP status, error code, and message.
///
/// - `RowNotFound` maps to 404.
/// - Unique constraint violations (`23505`) map to 409.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, &'static str, String) {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
            let constraint = db_err.constraint().unwrap_or("unknown");
            (
                StatusCode::CONFLICT,
                "CONFLICT",
                format!("Duplicate value violates unique constraint: {constraint}"),
            )
        }
        other => {
            tracing::error!(error = %other, "Database error");
            internal()
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;

    use super::*;

    async fn render(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn missing_character_uses_its_error_kind_code() {
        let (status, body) =
            render(ScheduleError::CharacterNotFound("ocid-x".into()).into()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "CHARACTER_NOT_FOUND");
    }

    #[tokio::test]
    async fn validation_is_a_bad_request() {
        let (status, body) = render(
            ScheduleError::Core(CoreError::Validation("no subtypes".into())).into(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert_eq!(body["error"], "no subtypes");
    }

    #[tokio::test]
    async fn vendor_maintenance_is_unavailable() {
        let (status, body) = render(
            ApiError::Transient {
                status: Some(503),
                timed_out: false,
                message: "service unavailable".into(),
            }
            .into(),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["code"], "MAINTENANCE");
    }

    #[tokio::test]
    async fn pool_errors_are_sanitized() {
        let (status, body) = render(sqlx::Error::PoolTimedOut.into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "An internal error occurred");
    }
}
