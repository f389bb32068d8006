use async_trait::async_trait;
use marquee_core::PenaltyLedger;
use redis::{AsyncCommands, RedisResult};
use tracing::info;

#[derive(Clone)]
pub struct RedisClient {
    client: redis::Client,
}

impl RedisClient {
    pub async fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client })
    }

    pub async fn incr_fine(&self, user_id: &str, amount: u64) -> RedisResult<u64> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = format!("fines:{}", user_id);
        conn.incr(key, amount).await
    }

    pub async fn get_fine(&self, user_id: &str) -> RedisResult<Option<u64>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = format!("fines:{}", user_id);
        conn.get(key).await
    }

    pub async fn check_rate_limit(&self, key: &str, limit: i64, window_seconds: i64) -> RedisResult<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let (count,): (i64,) = redis::pipe()
            .atomic()
            .incr(key, 1)
            .expire(key, window_seconds)
            .ignore()
            .query_async(&mut conn)
            .await?;

        Ok(count <= limit)
    }
}

/// Penalty ledger kept in Redis as one counter per user (`fines:{user}`).
pub struct RedisPenaltyLedger {
    redis: RedisClient,
}

impl RedisPenaltyLedger {
    pub fn new(redis: RedisClient) -> Self {
        Self { redis }
    }
}

#[async_trait]
impl PenaltyLedger for RedisPenaltyLedger {
    async fn add_fine(
        &self,
        user_id: &str,
        amount: u64,
    ) -> Result<u64, Box<dyn std::error::Error + Send + Sync>> {
        let balance = self.redis.incr_fine(user_id, amount).await?;
        info!("Fine of {} added for {}, balance now {}", amount, user_id, balance);
        Ok(balance)
    }

    async fn balance(
        &self,
        user_id: &str,
    ) -> Result<u64, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.redis.get_fine(user_id).await?.unwrap_or(0))
    }
}
