use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use marquee_core::ReservationError;
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    AuthenticationError(String),
    AuthorizationError(String),
    NotFoundError(String),
    Reservation(ReservationError),
    InternalServerError(String),
    Anyhow(anyhow::Error),
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::AuthenticationError(_) => (StatusCode::UNAUTHORIZED, "unauthenticated"),
            AppError::AuthorizationError(_) => (StatusCode::FORBIDDEN, "forbidden"),
            AppError::NotFoundError(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Reservation(err) => {
                let status = match err {
                    ReservationError::ShowNotFound(_) | ReservationError::SeatNotFound { .. } => {
                        StatusCode::NOT_FOUND
                    }
                    ReservationError::Validation(_) => StatusCode::BAD_REQUEST,
                    ReservationError::SeatUnavailable(_) | ReservationError::HoldRequired(_) => {
                        StatusCode::CONFLICT
                    }
                    ReservationError::FineThresholdExceeded { .. } => StatusCode::FORBIDDEN,
                    ReservationError::SettlementFailed { .. } => StatusCode::PAYMENT_REQUIRED,
                    ReservationError::Contention(_) => StatusCode::SERVICE_UNAVAILABLE,
                    ReservationError::FatalInconsistency { .. } | ReservationError::Storage(_) => {
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                (status, err.code())
            }
            AppError::InternalServerError(_) | AppError::Anyhow(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal")
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let error_message = match self {
            AppError::AuthenticationError(msg)
            | AppError::AuthorizationError(msg)
            | AppError::NotFoundError(msg) => msg,
            AppError::Reservation(err) if status.is_server_error() => {
                tracing::error!("Reservation failure: {}", err);
                match err {
                    // the booking id is what support needs to reconcile
                    ReservationError::FatalInconsistency { booking_id, .. } => {
                        format!("Booking {} needs manual reconciliation", booking_id)
                    }
                    _ => "Internal Server Error".to_string(),
                }
            }
            AppError::Reservation(err) => err.to_string(),
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                "Internal Server Error".to_string()
            }
            AppError::Anyhow(err) => {
                tracing::error!("Internal Server Error: {}", err);
                "Internal Server Error".to_string()
            }
        };

        let body = Json(json!({
            "error": error_message,
            "code": code,
        }));

        (status, body).into_response()
    }
}

impl From<ReservationError> for AppError {
    fn from(err: ReservationError) -> Self {
        Self::Reservation(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Anyhow(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_reservation_errors_map_to_statuses() {
        let cases = [
            (ReservationError::ShowNotFound(Uuid::new_v4()), StatusCode::NOT_FOUND),
            (ReservationError::SeatUnavailable("A1".into()), StatusCode::CONFLICT),
            (ReservationError::HoldRequired("A1".into()), StatusCode::CONFLICT),
            (ReservationError::FineThresholdExceeded { balance: 55, cap: 50 }, StatusCode::FORBIDDEN),
            (
                ReservationError::SettlementFailed { booking_id: Uuid::new_v4(), reason: "declined".into() },
                StatusCode::PAYMENT_REQUIRED,
            ),
            (ReservationError::Contention(Uuid::new_v4()), StatusCode::SERVICE_UNAVAILABLE),
            (ReservationError::Storage("down".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, expected) in cases {
            assert_eq!(AppError::from(err).into_response().status(), expected);
        }
    }
}
