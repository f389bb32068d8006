use chrono::Duration;
use marquee_core::FinePolicy;

/// Business rules the engine enforces.
#[derive(Debug, Clone)]
pub struct ReservationPolicy {
    pub hold_duration: Duration,
    pub abandon_fine: u64,
    /// Holds are refused while a user's balance is above this.
    pub fine_threshold: u64,
    pub fine_policy: FinePolicy,
    pub allow_direct_booking: bool,
    /// Attempts per read-validate-write when another process saved the show first.
    pub max_write_attempts: u32,
    /// Retries when rolling back seats after a failed settlement.
    pub compensation_attempts: u32,
    pub currency: String,
}

impl Default for ReservationPolicy {
    fn default() -> Self {
        Self {
            hold_duration: Duration::seconds(300),
            abandon_fine: 5,
            fine_threshold: 50,
            fine_policy: FinePolicy::PerHolder,
            allow_direct_booking: true,
            max_write_attempts: 5,
            compensation_attempts: 20,
            currency: "INR".to_string(),
        }
    }
}
