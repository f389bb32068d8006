use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::Utc;
use marquee_core::Booking;
use uuid::Uuid;

use crate::{error::AppError, holds::SeatsRequest, middleware::CustomerClaims, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/shows/{show_id}/bookings", post(commit_booking))
        .route("/v1/bookings/{booking_id}", get(get_booking))
        .route("/v1/me/bookings", get(list_my_bookings))
}

/// POST /v1/shows/{show_id}/bookings
/// Books the seats at the show's current price and settles payment
async fn commit_booking(
    State(state): State<AppState>,
    Path(show_id): Path<Uuid>,
    Extension(claims): Extension<CustomerClaims>,
    Json(req): Json<SeatsRequest>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let price = state.engine.show(show_id).await?.price;
    let booking = state
        .engine
        .commit_booking(show_id, &req.seats, &claims.sub, price, Utc::now())
        .await?;

    Ok((StatusCode::CREATED, Json(booking)))
}

/// GET /v1/bookings/{booking_id}
async fn get_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
    Extension(claims): Extension<CustomerClaims>,
) -> Result<Json<Booking>, AppError> {
    let booking = state
        .engine
        .booking(booking_id)
        .await?
        .ok_or_else(|| AppError::NotFoundError(format!("Booking {} not found", booking_id)))?;

    if booking.user_id != claims.sub {
        return Err(AppError::AuthorizationError("Booking belongs to another user".to_string()));
    }

    Ok(Json(booking))
}

/// GET /v1/me/bookings
async fn list_my_bookings(
    State(state): State<AppState>,
    Extension(claims): Extension<CustomerClaims>,
) -> Result<Json<Vec<Booking>>, AppError> {
    Ok(Json(state.engine.bookings_for(&claims.sub).await?))
}
