//! HTTP error responses.
//!
//! Engine failures become a JSON body `{ "code": ..., "message": ... }`
//! with a status derived from the failure kind:
//!
//! | Kind | Status |
//! |---|---|
//! | `NOT_FOUND` | 404 |
//! | `BAD_INPUT` | 400 |
//! | `INSUFFICIENT_STOCK`, `INSUFFICIENT_INCOMING`, `NO_INCOMING_SOURCE`, `INVALID_STATE` | 409 |
//! | `WRITE_CONFLICT` (retries exhausted), pool exhaustion | 503 |
//! | anything else | 500 |

use std::fmt;

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use stockroom_core::ErrorKind;
use stockroom_db::DbError;

/// Error returned by every handler.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: String,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError {
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn bad_input(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, ErrorKind::BadInput.as_str(), message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    /// True for the failures a storefront shows as "out of stock".
    pub fn is_out_of_stock(&self) -> bool {
        self.code == ErrorKind::InsufficientStock.as_str()
            || self.code == ErrorKind::InsufficientIncoming.as_str()
    }
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::BadInput => StatusCode::BAD_REQUEST,
        ErrorKind::InsufficientStock
        | ErrorKind::InsufficientIncoming
        | ErrorKind::NoIncomingSource
        | ErrorKind::InvalidState => StatusCode::CONFLICT,
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        if let Some(kind) = err.kind() {
            return ApiError::new(status_for(kind), kind.as_str(), err.to_string());
        }
        match err {
            DbError::Conflict(_) => ApiError::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "WRITE_CONFLICT",
                "The stock record is busy, please retry",
            ),
            DbError::PoolExhausted | DbError::ConnectionFailed(_) => ApiError::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "UNAVAILABLE",
                err.to_string(),
            ),
            other => ApiError::internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_input(rejection.body_text())
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorResponse {
    code: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(
                status = %self.status,
                code = %self.code,
                message = %self.message,
                "Request failed"
            );
        }

        let body = ErrorResponse {
            code: self.code,
            message: self.message,
        };

        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockroom_core::InventoryError;

    #[test]
    fn test_business_errors_map_to_status() {
        let err: ApiError = DbError::from(InventoryError::InsufficientStock {
            unit_id: "SIZE-M".to_string(),
            location_id: "WH".to_string(),
            available: 40,
            requested: 45,
        })
        .into();
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.code(), "INSUFFICIENT_STOCK");
        assert!(err.is_out_of_stock());

        let err: ApiError = DbError::not_found("Reservation", "r-1").into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert!(!err.is_out_of_stock());

        let err: ApiError = DbError::from(InventoryError::bad_input("qty must be positive")).into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "BAD_INPUT");
    }

    #[test]
    fn test_no_incoming_source_is_not_out_of_stock() {
        let err: ApiError = DbError::from(InventoryError::NoIncomingSource {
            unit_id: "SIZE-M".to_string(),
        })
        .into();
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert!(!err.is_out_of_stock());
    }

    #[test]
    fn test_storage_errors() {
        let err: ApiError = DbError::Conflict("database is locked".to_string()).into();
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.code(), "WRITE_CONFLICT");

        let err: ApiError = DbError::Internal("boom".to_string()).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "[INTERNAL_ERROR] Internal database error: boom");
    }
}
