use axum::{extract::State, routing::get, Extension, Json, Router};
use serde::Serialize;

use crate::{error::AppError, middleware::CustomerClaims, state::AppState};

#[derive(Debug, Serialize)]
pub struct FineResponse {
    pub user_id: String,
    pub balance: u64,
    pub threshold: u64,
    /// New holds are refused while true
    pub blocked: bool,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/me/fines", get(my_fines))
}

/// GET /v1/me/fines
async fn my_fines(
    State(state): State<AppState>,
    Extension(claims): Extension<CustomerClaims>,
) -> Result<Json<FineResponse>, AppError> {
    let balance = state.engine.fine_balance(&claims.sub).await?;
    let blocked = state.engine.exceeds_fine_threshold(&claims.sub).await?;

    Ok(Json(FineResponse {
        user_id: claims.sub,
        balance,
        threshold: state.engine.policy().fine_threshold,
        blocked,
    }))
}
