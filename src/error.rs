use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    /// Trip exists but is not open for booking (cancelled/completed).
    #[error("{0}")]
    TripUnavailable(String),

    /// Requested seats already held by a pending or completed booking.
    /// Carries the offending seat numbers so the client can re-select.
    #[error("seats already taken: {0:?}")]
    SeatConflict(Vec<i32>),

    #[error("requested {requested} seats but only {available} available")]
    CapacityExceeded { requested: i32, available: i32 },

    /// Cancellation attempted on a booking that is no longer pending.
    #[error("{0}")]
    NotCancellable(String),

    /// Payment transition attempted on a booking already in a terminal
    /// state.
    #[error("{0}")]
    AlreadyTerminal(String),

    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_)
            | AppError::TripUnavailable(_)
            | AppError::SeatConflict(_)
            | AppError::CapacityExceeded { .. }
            | AppError::NotCancellable(_)
            | AppError::AlreadyTerminal(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation",
            AppError::NotFound(_) => "not_found",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Forbidden(_) => "forbidden",
            AppError::Conflict(_) => "conflict",
            AppError::TripUnavailable(_) => "trip_unavailable",
            AppError::SeatConflict(_) => "seat_conflict",
            AppError::CapacityExceeded { .. } => "capacity_exceeded",
            AppError::NotCancellable(_) => "not_cancellable",
            AppError::AlreadyTerminal(_) => "already_terminal",
            AppError::Database(_) | AppError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Infrastructure failures are logged in full but surfaced opaque
        let body = match &self {
            AppError::Database(e) => {
                tracing::error!(error = %e, "database error");
                json!({ "error": "internal", "message": "internal server error" })
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                json!({ "error": "internal", "message": "internal server error" })
            }
            AppError::SeatConflict(seats) => json!({
                "error": self.kind(),
                "message": self.to_string(),
                "seats": seats,
            }),
            _ => json!({ "error": self.kind(), "message": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contention_errors_are_retryable_400s() {
        assert_eq!(
            AppError::SeatConflict(vec![1, 2]).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::CapacityExceeded {
                requested: 2,
                available: 1
            }
            .status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_missing_trip_is_404() {
        assert_eq!(
            AppError::NotFound("trip".into()).status_code(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_storage_errors_are_500() {
        assert_eq!(
            AppError::Internal("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
