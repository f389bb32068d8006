use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SettlementStatus {
    Succeeded,
    Declined,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementRequest {
    pub booking_id: Uuid,
    pub user_id: String,
    pub amount: i64,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementReceipt {
    /// Provider's reference (e.g. an order or charge id)
    pub reference: String,
    pub status: SettlementStatus,
    pub reason: Option<String>,
    pub settled_at: DateTime<Utc>,
}

/// External payment step invoked after seats are committed.
#[async_trait]
pub trait SettlementGateway: Send + Sync {
    /// Charge the booking amount. A decline is a receipt, transport trouble is an error.
    async fn settle(
        &self,
        request: &SettlementRequest,
    ) -> Result<SettlementReceipt, Box<dyn std::error::Error + Send + Sync>>;
}
