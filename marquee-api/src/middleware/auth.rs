use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::{error::AppError, state::AppState};

pub const GUEST_ROLE: &str = "GUEST";
pub const CUSTOMER_ROLE: &str = "CUSTOMER";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CustomerClaims {
    /// Opaque user id; holds, bookings and fines are keyed by it
    pub sub: String,
    pub role: String,
    pub exp: usize,
}

pub async fn customer_auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let bearer = req
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .ok_or_else(|| AppError::AuthenticationError("Missing bearer token".to_string()))?;

    let token_data = decode::<CustomerClaims>(
        bearer.token(),
        &DecodingKey::from_secret(state.auth.secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| AppError::AuthenticationError(format!("Invalid token: {}", e)))?;

    if token_data.claims.role != GUEST_ROLE && token_data.claims.role != CUSTOMER_ROLE {
        return Err(AppError::AuthorizationError(format!("Role {} may not reserve seats", token_data.claims.role)));
    }

    req.extensions_mut().insert(token_data.claims);

    Ok(next.run(req).await)
}
