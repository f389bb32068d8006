use uuid::Uuid;

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct SeatsHeldEvent {
    pub show_id: Uuid,
    pub seats: Vec<String>,
    pub holder_id: String,
    pub expires_at: i64,
    pub held_at: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct SeatsReleasedEvent {
    pub show_id: Uuid,
    pub seats: Vec<String>,
    pub holder_id: String,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct HoldsReclaimedEvent {
    pub show_id: Uuid,
    pub seats: Vec<String>,
    pub fined_users: Vec<String>,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct BookingConfirmedEvent {
    pub booking_id: Uuid,
    pub show_id: Uuid,
    pub user_id: String,
    pub seats: Vec<String>,
    pub amount: i64,
    pub settlement_reference: String,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct BookingCompensatedEvent {
    pub booking_id: Uuid,
    pub show_id: Uuid,
    pub user_id: String,
    pub seats: Vec<String>,
    pub reason: String,
    pub timestamp: i64,
}

/// Raised when a booking could not be rolled back after a failed settlement.
/// Seats may be stuck as booked without a paid booking and need an operator.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct ReconciliationRequiredEvent {
    pub booking_id: Uuid,
    pub show_id: Uuid,
    pub user_id: String,
    pub seats: Vec<String>,
    pub reason: String,
    pub timestamp: i64,
}

/// Everything the reservation engine broadcasts about seat and booking changes.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReservationEvent {
    SeatsHeld(SeatsHeldEvent),
    SeatsReleased(SeatsReleasedEvent),
    HoldsReclaimed(HoldsReclaimedEvent),
    BookingConfirmed(BookingConfirmedEvent),
    BookingCompensated(BookingCompensatedEvent),
    ReconciliationRequired(ReconciliationRequiredEvent),
}

impl ReservationEvent {
    pub fn show_id(&self) -> Uuid {
        match self {
            ReservationEvent::SeatsHeld(e) => e.show_id,
            ReservationEvent::SeatsReleased(e) => e.show_id,
            ReservationEvent::HoldsReclaimed(e) => e.show_id,
            ReservationEvent::BookingConfirmed(e) => e.show_id,
            ReservationEvent::BookingCompensated(e) => e.show_id,
            ReservationEvent::ReconciliationRequired(e) => e.show_id,
        }
    }

    /// Event name used on the SSE wire.
    pub fn name(&self) -> &'static str {
        match self {
            ReservationEvent::SeatsHeld(_) => "seats_held",
            ReservationEvent::SeatsReleased(_) => "seats_released",
            ReservationEvent::HoldsReclaimed(_) => "holds_reclaimed",
            ReservationEvent::BookingConfirmed(_) => "booking_confirmed",
            ReservationEvent::BookingCompensated(_) => "booking_compensated",
            ReservationEvent::ReconciliationRequired(_) => "reconciliation_required",
        }
    }
}
