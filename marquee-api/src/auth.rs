use axum::{extract::State, routing::post, Json, Router};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    error::AppError,
    middleware::auth::{CustomerClaims, GUEST_ROLE},
    state::{AppState, AuthConfig},
};

#[derive(Debug, Serialize)]
struct AuthResponse {
    token: String,
    user_id: String,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/auth/guest", post(login_guest))
}

/// Sign a token for `user_id` with the configured secret and lifetime.
pub fn issue_token(auth: &AuthConfig, user_id: &str, role: &str) -> Result<String, AppError> {
    let claims = CustomerClaims {
        sub: user_id.to_string(),
        role: role.to_owned(),
        exp: (Utc::now() + Duration::seconds(auth.expiration as i64)).timestamp() as usize,
    };

    encode(&Header::default(), &claims, &EncodingKey::from_secret(auth.secret.as_bytes()))
        .map_err(|e| AppError::InternalServerError(format!("Token encoding failed: {}", e)))
}

async fn login_guest(State(state): State<AppState>) -> Result<Json<AuthResponse>, AppError> {
    let user_id = format!("guest-{}", Uuid::new_v4());
    let token = issue_token(&state.auth, &user_id, GUEST_ROLE)?;
    tracing::debug!("Issued guest token for {}", user_id);

    Ok(Json(AuthResponse { token, user_id }))
}
