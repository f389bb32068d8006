use axum::{
    extract::{Path, State},
    routing::post,
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use marquee_core::show::normalize_seat_keys;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::AppError, middleware::CustomerClaims, state::AppState};

#[derive(Debug, Deserialize)]
pub struct SeatsRequest {
    pub seats: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct HoldResponse {
    pub show_id: Uuid,
    pub seats: Vec<String>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ReleaseResponse {
    pub show_id: Uuid,
    pub released: Vec<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/shows/{show_id}/holds", post(hold_seats))
        .route("/v1/shows/{show_id}/holds/release", post(release_seats))
}

/// POST /v1/shows/{show_id}/holds
/// All-or-nothing hold for the caller
async fn hold_seats(
    State(state): State<AppState>,
    Path(show_id): Path<Uuid>,
    Extension(claims): Extension<CustomerClaims>,
    Json(req): Json<SeatsRequest>,
) -> Result<Json<HoldResponse>, AppError> {
    let seats = normalize_seat_keys(&req.seats)?;
    let expires_at = state.engine.hold_seats(show_id, &seats, &claims.sub, Utc::now()).await?;

    Ok(Json(HoldResponse { show_id, seats, expires_at }))
}

/// POST /v1/shows/{show_id}/holds/release
async fn release_seats(
    State(state): State<AppState>,
    Path(show_id): Path<Uuid>,
    Extension(claims): Extension<CustomerClaims>,
    Json(req): Json<SeatsRequest>,
) -> Result<Json<ReleaseResponse>, AppError> {
    let released = state.engine.release_seats(show_id, &req.seats, &claims.sub).await?;

    Ok(Json(ReleaseResponse { show_id, released }))
}
