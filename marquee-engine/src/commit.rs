use std::sync::Arc;

use chrono::{DateTime, Utc};
use marquee_core::show::normalize_seat_keys;
use marquee_core::{
    Booking, BookingWrite, PenaltyLedger, ReservationError, ReservationResult, SeatState, SettlementGateway,
    SettlementRequest, SettlementStatus, ShowRepository, Transition,
};
use marquee_shared::models::events::{
    BookingCompensatedEvent, BookingConfirmedEvent, ReconciliationRequiredEvent,
};
use marquee_shared::ReservationEvent;
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::atomic::{apply_to_show, ShowLocks, Staged};
use crate::policy::ReservationPolicy;
use crate::reclaim::charge_abandonment;

/// Turns seats into a booking, settles it, and rolls the seats back when
/// settlement does not go through.
pub struct BookingCommitter {
    shows: Arc<dyn ShowRepository>,
    locks: Arc<ShowLocks>,
    ledger: Arc<dyn PenaltyLedger>,
    settlement: Arc<dyn SettlementGateway>,
    policy: Arc<ReservationPolicy>,
    events: broadcast::Sender<ReservationEvent>,
}

impl BookingCommitter {
    pub fn new(
        shows: Arc<dyn ShowRepository>,
        locks: Arc<ShowLocks>,
        ledger: Arc<dyn PenaltyLedger>,
        settlement: Arc<dyn SettlementGateway>,
        policy: Arc<ReservationPolicy>,
        events: broadcast::Sender<ReservationEvent>,
    ) -> Self {
        Self { shows, locks, ledger, settlement, policy, events }
    }

    pub async fn commit_booking(
        &self,
        show_id: Uuid,
        seat_keys: &[String],
        user_id: &str,
        unit_price: i64,
        now: DateTime<Utc>,
    ) -> ReservationResult<Booking> {
        let seats = normalize_seat_keys(seat_keys)?;
        if unit_price < 0 {
            return Err(ReservationError::Validation("unit price cannot be negative".to_string()));
        }

        let allow_direct = self.policy.allow_direct_booking;
        let (booking, displaced) = apply_to_show(self.shows.as_ref(), &self.locks, show_id, self.policy.max_write_attempts, |show| {
            let mut displaced = Vec::new();
            for key in &seats {
                let state = show.seat(key)?;
                if !state.can_transition(Transition::Book, user_id, now) {
                    return Err(ReservationError::SeatUnavailable(key.clone()));
                }
                if !allow_direct && !state.is_live_hold_of(user_id, now) {
                    return Err(ReservationError::HoldRequired(key.clone()));
                }
                if let Some(holder) = state.lapsed_holder_other_than(user_id, now) {
                    displaced.push((key.clone(), holder.to_string()));
                }
            }

            let booking = Booking::confirmed(show, user_id, seats.clone(), unit_price, now)?;
            for key in &seats {
                show.set_seat(key, SeatState::Booked)?;
            }
            let write = BookingWrite::Insert(booking.clone());
            Ok(Staged::changed((booking, displaced)).with_booking(write))
        })
        .await
        .inspect_err(|e| warn!("Commit on show {} by {} rejected: {}", show_id, user_id, e))?;

        if !displaced.is_empty() {
            charge_abandonment(self.ledger.as_ref(), &self.policy, show_id, &displaced).await;
        }

        info!("Booking {} reserved {:?} on show {} for {}", booking.id, booking.seats, show_id, user_id);

        // settlement runs outside the show's atomic unit
        let request = SettlementRequest {
            booking_id: booking.id,
            user_id: user_id.to_string(),
            amount: booking.amount,
            currency: self.policy.currency.clone(),
        };
        let failure = match self.settlement.settle(&request).await {
            Ok(receipt) if receipt.status == SettlementStatus::Succeeded => {
                info!("Booking {} settled, reference {}", booking.id, receipt.reference);
                let _ = self.events.send(ReservationEvent::BookingConfirmed(BookingConfirmedEvent {
                    booking_id: booking.id,
                    show_id,
                    user_id: user_id.to_string(),
                    seats: booking.seats.clone(),
                    amount: booking.amount,
                    settlement_reference: receipt.reference,
                    timestamp: Utc::now().timestamp(),
                }));
                return Ok(booking);
            }
            Ok(receipt) => receipt.reason.unwrap_or_else(|| "payment declined".to_string()),
            Err(e) => e.to_string(),
        };

        warn!("Settlement failed for booking {}: {}", booking.id, failure);
        Err(self.compensate(&booking, failure).await)
    }

    /// Put the booking's seats back to available and drop the booking record.
    async fn compensate(&self, booking: &Booking, reason: String) -> ReservationError {
        let outcome = apply_to_show(
            self.shows.as_ref(),
            &self.locks,
            booking.show_id,
            self.policy.compensation_attempts,
            |show| {
                for key in &booking.seats {
                    if show.seat(key)?.is_booked() {
                        show.set_seat(key, SeatState::Available)?;
                    }
                }
                Ok(Staged::changed(()).with_booking(BookingWrite::Remove(booking.id)))
            },
        )
        .await;

        let now = Utc::now().timestamp();
        match outcome {
            Ok(()) => {
                info!("Booking {} rolled back, seats {:?} available again", booking.id, booking.seats);
                let _ = self.events.send(ReservationEvent::BookingCompensated(BookingCompensatedEvent {
                    booking_id: booking.id,
                    show_id: booking.show_id,
                    user_id: booking.user_id.clone(),
                    seats: booking.seats.clone(),
                    reason: reason.clone(),
                    timestamp: now,
                }));
                ReservationError::SettlementFailed { booking_id: booking.id, reason }
            }
            Err(e) => {
                let reason = format!("settlement failed ({}); rollback failed ({})", reason, e);
                error!(
                    booking_id = %booking.id,
                    show_id = %booking.show_id,
                    user_id = %booking.user_id,
                    seats = ?booking.seats,
                    "FATAL: seats left booked without payment, manual reconciliation required: {}",
                    reason
                );
                let _ = self.events.send(ReservationEvent::ReconciliationRequired(ReconciliationRequiredEvent {
                    booking_id: booking.id,
                    show_id: booking.show_id,
                    user_id: booking.user_id.clone(),
                    seats: booking.seats.clone(),
                    reason: reason.clone(),
                    timestamp: now,
                }));
                ReservationError::FatalInconsistency { booking_id: booking.id, reason }
            }
        }
    }
}
