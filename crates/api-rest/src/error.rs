//! Mapping core errors onto HTTP responses.

use crate::models::ErrorRes;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use physio_core::{BundleError, ErrorKind};

/// Error returned by every handler.
#[derive(Debug)]
pub enum ApiError {
    Bundle(BundleError),
    /// A blocking task panicked or was cancelled.
    Task(String),
}

impl From<BundleError> for ApiError {
    fn from(err: BundleError) -> Self {
        ApiError::Bundle(err)
    }
}

impl From<physio_core::TextError> for ApiError {
    fn from(err: physio_core::TextError) -> Self {
        ApiError::Bundle(err.into())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::InvariantViolation | ErrorKind::StorageFailure => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self {
            ApiError::Bundle(err) => {
                let status = status_for(err.kind());
                if status.is_server_error() {
                    tracing::error!(error = %err, "request failed");
                } else {
                    tracing::debug!(error = %err, "request rejected");
                }
                (status, err.to_string())
            }
            ApiError::Task(msg) => {
                tracing::error!(error = %msg, "blocking task failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".to_string())
            }
        };

        (status, Json(ErrorRes { detail })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use physio_core::Collection;

    #[test]
    fn kinds_map_to_statuses() {
        assert_eq!(status_for(ErrorKind::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(status_for(ErrorKind::Conflict), StatusCode::CONFLICT);
        assert_eq!(status_for(ErrorKind::InvalidInput), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_for(ErrorKind::InvariantViolation),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_for(ErrorKind::StorageFailure),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn not_found_response() {
        let err = ApiError::Bundle(BundleError::NotFound {
            collection: Collection::Exercises,
            query: "User Id = '1'".into(),
        });
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }
}
