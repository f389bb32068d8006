use std::sync::Arc;

use chrono::{DateTime, Utc};
use marquee_core::show::normalize_seat_keys;
use marquee_core::{
    PenaltyLedger, ReservationError, ReservationResult, SeatState, ShowRepository, Transition,
};
use marquee_shared::models::events::{SeatsHeldEvent, SeatsReleasedEvent};
use marquee_shared::ReservationEvent;
use tokio::sync::broadcast;
use tracing::{info, warn};
use uuid::Uuid;

use crate::atomic::{apply_to_show, ShowLocks, Staged};
use crate::policy::ReservationPolicy;
use crate::reclaim::charge_abandonment;

/// Grants and releases time-bounded exclusive holds on seats.
pub struct HoldManager {
    shows: Arc<dyn ShowRepository>,
    locks: Arc<ShowLocks>,
    ledger: Arc<dyn PenaltyLedger>,
    policy: Arc<ReservationPolicy>,
    events: broadcast::Sender<ReservationEvent>,
}

impl HoldManager {
    pub fn new(
        shows: Arc<dyn ShowRepository>,
        locks: Arc<ShowLocks>,
        ledger: Arc<dyn PenaltyLedger>,
        policy: Arc<ReservationPolicy>,
        events: broadcast::Sender<ReservationEvent>,
    ) -> Self {
        Self { shows, locks, ledger, policy, events }
    }

    /// Hold every requested seat for `user_id`, or none of them.
    ///
    /// Seats already held by the same user get a fresh expiry. Returns the
    /// expiry shared by all seats in the request.
    pub async fn hold_seats(
        &self,
        show_id: Uuid,
        seat_keys: &[String],
        user_id: &str,
        now: DateTime<Utc>,
    ) -> ReservationResult<DateTime<Utc>> {
        let seats = normalize_seat_keys(seat_keys)?;

        let cap = self.policy.fine_threshold;
        if self.ledger.exceeds_threshold(user_id, cap).await.map_err(ReservationError::storage)? {
            let balance = self.ledger.balance(user_id).await.map_err(ReservationError::storage)?;
            warn!("Refusing hold for {}: fines {} above cap {}", user_id, balance, cap);
            return Err(ReservationError::FineThresholdExceeded { balance, cap });
        }

        let expires_at = now + self.policy.hold_duration;
        let displaced = apply_to_show(self.shows.as_ref(), &self.locks, show_id, self.policy.max_write_attempts, |show| {
            let mut displaced = Vec::new();
            for key in &seats {
                let state = show.seat(key)?;
                if !state.can_transition(Transition::Hold, user_id, now) {
                    return Err(ReservationError::SeatUnavailable(key.clone()));
                }
                if let Some(holder) = state.lapsed_holder_other_than(user_id, now) {
                    displaced.push((key.clone(), holder.to_string()));
                }
            }
            for key in &seats {
                show.set_seat(
                    key,
                    SeatState::Held { holder_id: user_id.to_string(), expires_at },
                )?;
            }
            Ok(Staged::changed(displaced))
        })
        .await
        .inspect_err(|e| warn!("Hold on show {} by {} rejected: {}", show_id, user_id, e))?;

        // lapsed holds taken over here never reach the reclaimer
        if !displaced.is_empty() {
            charge_abandonment(self.ledger.as_ref(), &self.policy, show_id, &displaced).await;
        }

        info!("Held {:?} on show {} for {} until {}", seats, show_id, user_id, expires_at);
        let _ = self.events.send(ReservationEvent::SeatsHeld(SeatsHeldEvent {
            show_id,
            seats,
            holder_id: user_id.to_string(),
            expires_at: expires_at.timestamp(),
            held_at: now.timestamp(),
        }));

        Ok(expires_at)
    }

    /// Return the caller's held seats to the pool.
    ///
    /// Seats that are not held by `user_id` (free, booked, someone else's, or
    /// unknown keys) are skipped. Returns the seats that were actually released.
    pub async fn release_seats(
        &self,
        show_id: Uuid,
        seat_keys: &[String],
        user_id: &str,
    ) -> ReservationResult<Vec<String>> {
        let now = Utc::now();
        let released = apply_to_show(self.shows.as_ref(), &self.locks, show_id, self.policy.max_write_attempts, |show| {
            let mut released = Vec::new();
            for key in seat_keys {
                let releasable = show
                    .seats
                    .get(key.as_str())
                    .is_some_and(|s| s.can_transition(Transition::Release, user_id, now));
                if releasable && !released.contains(key) {
                    show.set_seat(key, SeatState::Available)?;
                    released.push(key.clone());
                }
            }

            if released.is_empty() {
                Ok(Staged::unchanged(released))
            } else {
                Ok(Staged::changed(released))
            }
        })
        .await?;

        if !released.is_empty() {
            info!("Released {:?} on show {} for {}", released, show_id, user_id);
            let _ = self.events.send(ReservationEvent::SeatsReleased(SeatsReleasedEvent {
                show_id,
                seats: released.clone(),
                holder_id: user_id.to_string(),
                timestamp: now.timestamp(),
            }));
        }

        Ok(released)
    }
}
