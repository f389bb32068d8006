use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// How an abandoned hold is charged when the reclaimer frees it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FinePolicy {
    /// One fine per distinct holder per sweep, whatever the seat count.
    #[default]
    PerHolder,
    /// Fine multiplied by the seats reclaimed from that holder, still one ledger write.
    PerSeat,
}

impl FinePolicy {
    pub fn amount(&self, base_fine: u64, seats_reclaimed: usize) -> u64 {
        match self {
            FinePolicy::PerHolder => base_fine,
            FinePolicy::PerSeat => base_fine.saturating_mul(seats_reclaimed as u64),
        }
    }
}

/// Per-user running total of abandonment fines. Balances only ever grow.
#[async_trait]
pub trait PenaltyLedger: Send + Sync {
    /// Add `amount` to the user's balance, returning the new balance.
    async fn add_fine(
        &self,
        user_id: &str,
        amount: u64,
    ) -> Result<u64, Box<dyn std::error::Error + Send + Sync>>;

    async fn balance(
        &self,
        user_id: &str,
    ) -> Result<u64, Box<dyn std::error::Error + Send + Sync>>;

    /// Strictly above the cap blocks new holds.
    async fn exceeds_threshold(
        &self,
        user_id: &str,
        cap: u64,
    ) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.balance(user_id).await? > cap)
    }
}

pub struct InMemoryPenaltyLedger {
    balances: RwLock<HashMap<String, u64>>,
}

impl InMemoryPenaltyLedger {
    pub fn new() -> Self {
        Self {
            balances: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryPenaltyLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PenaltyLedger for InMemoryPenaltyLedger {
    async fn add_fine(
        &self,
        user_id: &str,
        amount: u64,
    ) -> Result<u64, Box<dyn std::error::Error + Send + Sync>> {
        let mut balances = self.balances.write().await;
        let balance = balances.entry(user_id.to_string()).or_insert(0);
        *balance = balance.saturating_add(amount);
        Ok(*balance)
    }

    async fn balance(
        &self,
        user_id: &str,
    ) -> Result<u64, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.balances.read().await.get(user_id).copied().unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fines_accumulate() {
        let ledger = InMemoryPenaltyLedger::new();
        assert_eq!(ledger.balance("u1").await.unwrap(), 0);

        ledger.add_fine("u1", 5).await.unwrap();
        let balance = ledger.add_fine("u1", 5).await.unwrap();

        assert_eq!(balance, 10);
        assert_eq!(ledger.balance("u2").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_threshold_is_strict() {
        let ledger = InMemoryPenaltyLedger::new();
        ledger.add_fine("u1", 50).await.unwrap();
        assert!(!ledger.exceeds_threshold("u1", 50).await.unwrap());

        ledger.add_fine("u1", 5).await.unwrap();
        assert!(ledger.exceeds_threshold("u1", 50).await.unwrap());
    }

    #[test]
    fn test_fine_policy_amounts() {
        assert_eq!(FinePolicy::PerHolder.amount(5, 4), 5);
        assert_eq!(FinePolicy::PerSeat.amount(5, 4), 20);
    }
}
