use std::sync::Arc;

use marquee_engine::ReservationEngine;
use marquee_store::RedisClient;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
}

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ReservationEngine>,
    /// Rate limiting is skipped when no Redis is configured
    pub redis: Option<Arc<RedisClient>>,
    pub auth: AuthConfig,
}
