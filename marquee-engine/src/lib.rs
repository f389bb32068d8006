pub mod policy;
mod atomic;
pub mod hold;
pub mod reclaim;
pub mod commit;
pub mod engine;
pub mod settlement;
pub mod resiliency;
pub mod sweeper;

pub use atomic::ShowLocks;
pub use commit::BookingCommitter;
pub use engine::ReservationEngine;
pub use hold::HoldManager;
pub use policy::ReservationPolicy;
pub use reclaim::{ExpiryReclaimer, ReclaimReport, SweepReport};
pub use resiliency::{CircuitBreaker, CircuitState, GuardedSettlement};
pub use settlement::MockSettlementGateway;
pub use sweeper::run_expiry_sweeper;
