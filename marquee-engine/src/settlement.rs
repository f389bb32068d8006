use async_trait::async_trait;
use chrono::Utc;
use marquee_core::{SettlementGateway, SettlementReceipt, SettlementRequest, SettlementStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MockBehaviour {
    Approve,
    Decline,
    Unreachable,
}

/// Stand-in payment provider for local runs and tests.
pub struct MockSettlementGateway {
    behaviour: MockBehaviour,
}

impl MockSettlementGateway {
    pub fn approving() -> Self {
        Self { behaviour: MockBehaviour::Approve }
    }

    pub fn declining() -> Self {
        Self { behaviour: MockBehaviour::Decline }
    }

    /// Every call fails as a transport error
    pub fn unreachable() -> Self {
        Self { behaviour: MockBehaviour::Unreachable }
    }
}

#[async_trait]
impl SettlementGateway for MockSettlementGateway {
    async fn settle(
        &self,
        request: &SettlementRequest,
    ) -> Result<SettlementReceipt, Box<dyn std::error::Error + Send + Sync>> {
        let reference = format!("mock_stl_{}", request.booking_id.simple());
        match self.behaviour {
            MockBehaviour::Approve => Ok(SettlementReceipt {
                reference,
                status: SettlementStatus::Succeeded,
                reason: None,
                settled_at: Utc::now(),
            }),
            MockBehaviour::Decline => Ok(SettlementReceipt {
                reference,
                status: SettlementStatus::Declined,
                reason: Some("card declined".to_string()),
                settled_at: Utc::now(),
            }),
            MockBehaviour::Unreachable => Err("Simulated payment gateway failure".into()),
        }
    }
}
