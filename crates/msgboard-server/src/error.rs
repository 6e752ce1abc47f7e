//! Translation of service errors into HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use msgboard_service::BoardError;
use serde::Serialize;
use tracing::error;

/// An error response: a status code plus a JSON `{"error": ...}` body.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self { status: StatusCode::BAD_REQUEST, message: message.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self { status: StatusCode::INTERNAL_SERVER_ERROR, message: message.into() }
    }

    /// Map a service error. `missing` is the status this route uses for an
    /// unknown id: 404 on reads, 400 on update and delete.
    pub fn from_board(err: BoardError, missing: StatusCode) -> Self {
        match err {
            BoardError::NotFound { .. } => Self { status: missing, message: err.to_string() },
            BoardError::InvalidInput { .. } => Self::bad_request(err.to_string()),
            BoardError::Store(_) | BoardError::Codec(_) => {
                error!(error = %err, "storage failure");
                Self::internal(err.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: &self.message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use msgboard_store::StoreError;

    #[test]
    fn test_not_found_uses_route_status() {
        let err = BoardError::NotFound { id: "x".into() };
        assert_eq!(ApiError::from_board(err, StatusCode::NOT_FOUND).status, StatusCode::NOT_FOUND);

        let err = BoardError::NotFound { id: "x".into() };
        let api = ApiError::from_board(err, StatusCode::BAD_REQUEST);
        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        assert_eq!(api.message, "message not found: x");
    }

    #[test]
    fn test_invalid_input_is_bad_request() {
        let err = BoardError::InvalidInput { reason: "empty".into() };
        assert_eq!(ApiError::from_board(err, StatusCode::NOT_FOUND).status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_store_failure_is_internal() {
        let err = BoardError::Store(StoreError::InvalidConfig { reason: "bad".into() });
        let api = ApiError::from_board(err, StatusCode::NOT_FOUND);
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
