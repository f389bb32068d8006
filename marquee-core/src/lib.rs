pub mod seat;
pub mod show;
pub mod booking;
pub mod ledger;
pub mod settlement;
pub mod repository;

pub use booking::{Booking, BookingStatus, BookingWrite};
pub use ledger::{FinePolicy, InMemoryPenaltyLedger, PenaltyLedger};
pub use repository::{SaveOutcome, ShowRepository};
pub use seat::{SeatState, Transition};
pub use settlement::{SettlementGateway, SettlementReceipt, SettlementRequest, SettlementStatus};
pub use show::Show;

use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum ReservationError {
    #[error("Show not found: {0}")]
    ShowNotFound(Uuid),
    #[error("Seat {seat} not found in show {show_id}")]
    SeatNotFound { show_id: Uuid, seat: String },
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Seat {0} is unavailable")]
    SeatUnavailable(String),
    #[error("Seat {0} must be held before it can be booked")]
    HoldRequired(String),
    #[error("Outstanding fines of {balance} exceed the limit of {cap}")]
    FineThresholdExceeded { balance: u64, cap: u64 },
    #[error("Settlement failed for booking {booking_id}: {reason}")]
    SettlementFailed { booking_id: Uuid, reason: String },
    #[error("Booking {booking_id} needs manual reconciliation: {reason}")]
    FatalInconsistency { booking_id: Uuid, reason: String },
    #[error("Show {0} is too contended, try again")]
    Contention(Uuid),
    #[error("Storage error: {0}")]
    Storage(String),
}

impl ReservationError {
    /// Stable identifier for callers that branch on the kind of failure.
    pub fn code(&self) -> &'static str {
        match self {
            ReservationError::ShowNotFound(_) | ReservationError::SeatNotFound { .. } => "not_found",
            ReservationError::Validation(_) => "validation",
            ReservationError::SeatUnavailable(_) => "seat_unavailable",
            ReservationError::HoldRequired(_) => "hold_required",
            ReservationError::FineThresholdExceeded { .. } => "fine_threshold_exceeded",
            ReservationError::SettlementFailed { .. } => "settlement_failed",
            ReservationError::FatalInconsistency { .. } => "fatal_inconsistency",
            ReservationError::Contention(_) => "contention",
            ReservationError::Storage(_) => "storage",
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.code() == "not_found"
    }

    pub fn storage(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        ReservationError::Storage(err.to_string())
    }
}

pub type ReservationResult<T> = Result<T, ReservationError>;
