use std::sync::Arc;

use chrono::{DateTime, Utc};
use marquee_core::{
    Booking, PenaltyLedger, ReservationError, ReservationResult, SeatState, SettlementGateway, Show,
    ShowRepository,
};
use marquee_shared::ReservationEvent;
use tokio::sync::broadcast;
use tracing::info;
use uuid::Uuid;

use crate::atomic::ShowLocks;
use crate::commit::BookingCommitter;
use crate::hold::HoldManager;
use crate::policy::ReservationPolicy;
use crate::reclaim::{ExpiryReclaimer, ReclaimReport, SweepReport};

const EVENT_BUFFER: usize = 256;

/// Entry point for callers: holds, releases, commits, expiry and fines.
pub struct ReservationEngine {
    shows: Arc<dyn ShowRepository>,
    ledger: Arc<dyn PenaltyLedger>,
    policy: Arc<ReservationPolicy>,
    holds: HoldManager,
    reclaimer: ExpiryReclaimer,
    committer: BookingCommitter,
    events: broadcast::Sender<ReservationEvent>,
}

impl ReservationEngine {
    pub fn new(
        shows: Arc<dyn ShowRepository>,
        ledger: Arc<dyn PenaltyLedger>,
        settlement: Arc<dyn SettlementGateway>,
        policy: ReservationPolicy,
    ) -> Self {
        let policy = Arc::new(policy);
        let locks = Arc::new(ShowLocks::new());
        let (events, _) = broadcast::channel(EVENT_BUFFER);

        Self {
            holds: HoldManager::new(shows.clone(), locks.clone(), ledger.clone(), policy.clone(), events.clone()),
            reclaimer: ExpiryReclaimer::new(shows.clone(), locks.clone(), ledger.clone(), policy.clone(), events.clone()),
            committer: BookingCommitter::new(shows.clone(), locks, ledger.clone(), settlement, policy.clone(), events.clone()),
            shows,
            ledger,
            policy,
            events,
        }
    }

    pub fn policy(&self) -> &ReservationPolicy {
        &self.policy
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReservationEvent> {
        self.events.subscribe()
    }

    pub async fn create_show(&self, show: Show) -> ReservationResult<Show> {
        self.shows.insert_show(&show).await.map_err(ReservationError::storage)?;
        info!("Show {} created at {} with {} seats", show.id, show.venue_name, show.seats.len());
        Ok(show)
    }

    /// Seat map for a viewer. Lapsed holds on this show are reclaimed first so
    /// they do not block the viewer's next hold.
    pub async fn view_show(&self, show_id: Uuid, now: DateTime<Utc>) -> ReservationResult<Show> {
        self.reclaimer.reclaim_expired(show_id, now).await?;
        self.show(show_id).await
    }

    pub async fn seat_state(&self, show_id: Uuid, seat_key: &str) -> ReservationResult<SeatState> {
        let show = self.show(show_id).await?;
        show.seat(seat_key).cloned()
    }

    pub async fn hold_seats(
        &self,
        show_id: Uuid,
        seat_keys: &[String],
        user_id: &str,
        now: DateTime<Utc>,
    ) -> ReservationResult<DateTime<Utc>> {
        self.holds.hold_seats(show_id, seat_keys, user_id, now).await
    }

    pub async fn release_seats(
        &self,
        show_id: Uuid,
        seat_keys: &[String],
        user_id: &str,
    ) -> ReservationResult<Vec<String>> {
        self.holds.release_seats(show_id, seat_keys, user_id).await
    }

    pub async fn commit_booking(
        &self,
        show_id: Uuid,
        seat_keys: &[String],
        user_id: &str,
        unit_price: i64,
        now: DateTime<Utc>,
    ) -> ReservationResult<Booking> {
        self.committer.commit_booking(show_id, seat_keys, user_id, unit_price, now).await
    }

    pub async fn reclaim_expired(&self, show_id: Uuid, now: DateTime<Utc>) -> ReservationResult<ReclaimReport> {
        self.reclaimer.reclaim_expired(show_id, now).await
    }

    pub async fn reclaim_all(&self, now: DateTime<Utc>) -> ReservationResult<SweepReport> {
        self.reclaimer.reclaim_all(now).await
    }

    pub async fn fine_balance(&self, user_id: &str) -> ReservationResult<u64> {
        self.ledger.balance(user_id).await.map_err(ReservationError::storage)
    }

    pub async fn exceeds_fine_threshold(&self, user_id: &str) -> ReservationResult<bool> {
        self.ledger
            .exceeds_threshold(user_id, self.policy.fine_threshold)
            .await
            .map_err(ReservationError::storage)
    }

    pub async fn booking(&self, booking_id: Uuid) -> ReservationResult<Option<Booking>> {
        self.shows.get_booking(booking_id).await.map_err(ReservationError::storage)
    }

    pub async fn bookings_for(&self, user_id: &str) -> ReservationResult<Vec<Booking>> {
        self.shows.list_bookings(user_id).await.map_err(ReservationError::storage)
    }

    /// Current seat map without reclaiming anything.
    pub async fn show(&self, show_id: Uuid) -> ReservationResult<Show> {
        self.shows
            .load_show(show_id)
            .await
            .map_err(ReservationError::storage)?
            .ok_or(ReservationError::ShowNotFound(show_id))
    }
}
