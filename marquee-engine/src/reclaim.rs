use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use marquee_core::{PenaltyLedger, ReservationError, ReservationResult, SeatState, ShowRepository};
use marquee_shared::models::events::HoldsReclaimedEvent;
use marquee_shared::ReservationEvent;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{error, info};
use uuid::Uuid;

use crate::atomic::{apply_to_show, ShowLocks, Staged};
use crate::policy::ReservationPolicy;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ReclaimReport {
    pub show_id: Uuid,
    pub reclaimed: Vec<String>,
    /// Distinct holders fined in this pass
    pub fined_users: Vec<String>,
}

impl ReclaimReport {
    pub fn reclaimed_count(&self) -> usize {
        self.reclaimed.len()
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct SweepReport {
    pub shows_scanned: usize,
    pub seats_reclaimed: usize,
    pub users_fined: usize,
    pub failed_shows: Vec<Uuid>,
}

/// Fine every distinct holder in `abandoned` (seat, holder) once, scaled by the
/// fine policy. Ledger failures are logged and skipped. Returns who was fined.
pub(crate) async fn charge_abandonment(
    ledger: &dyn PenaltyLedger,
    policy: &ReservationPolicy,
    show_id: Uuid,
    abandoned: &[(String, String)],
) -> Vec<String> {
    let mut per_holder: BTreeMap<&str, usize> = BTreeMap::new();
    for (_, holder) in abandoned {
        *per_holder.entry(holder.as_str()).or_insert(0) += 1;
    }

    let mut fined_users = Vec::with_capacity(per_holder.len());
    for (holder, seat_count) in per_holder {
        let amount = policy.fine_policy.amount(policy.abandon_fine, seat_count);
        if amount == 0 {
            continue;
        }
        match ledger.add_fine(holder, amount).await {
            Ok(balance) => {
                info!("Fined {} {} for abandoning {} seat(s), balance {}", holder, amount, seat_count, balance);
                fined_users.push(holder.to_string());
            }
            Err(e) => error!("Failed to fine {} for abandoned hold on show {}: {}", holder, show_id, e),
        }
    }
    fined_users
}

/// Frees lapsed holds and charges their holders an abandonment fine.
pub struct ExpiryReclaimer {
    shows: Arc<dyn ShowRepository>,
    locks: Arc<ShowLocks>,
    ledger: Arc<dyn PenaltyLedger>,
    policy: Arc<ReservationPolicy>,
    events: broadcast::Sender<ReservationEvent>,
}

impl ExpiryReclaimer {
    pub fn new(
        shows: Arc<dyn ShowRepository>,
        locks: Arc<ShowLocks>,
        ledger: Arc<dyn PenaltyLedger>,
        policy: Arc<ReservationPolicy>,
        events: broadcast::Sender<ReservationEvent>,
    ) -> Self {
        Self { shows, locks, ledger, policy, events }
    }

    pub async fn reclaim_expired(&self, show_id: Uuid, now: DateTime<Utc>) -> ReservationResult<ReclaimReport> {
        let freed = apply_to_show(self.shows.as_ref(), &self.locks, show_id, self.policy.max_write_attempts, |show| {
            let expired = show.expired_holds(now);
            for (key, _) in &expired {
                show.set_seat(key, SeatState::Available)?;
            }
            if expired.is_empty() {
                Ok(Staged::unchanged(expired))
            } else {
                Ok(Staged::changed(expired))
            }
        })
        .await?;

        if freed.is_empty() {
            return Ok(ReclaimReport { show_id, reclaimed: Vec::new(), fined_users: Vec::new() });
        }

        // fines go to the ledger only after the seat map is committed
        let fined_users = charge_abandonment(self.ledger.as_ref(), &self.policy, show_id, &freed).await;

        let reclaimed: Vec<String> = freed.into_iter().map(|(key, _)| key).collect();
        info!("Reclaimed {} expired seat(s) on show {}", reclaimed.len(), show_id);
        let _ = self.events.send(ReservationEvent::HoldsReclaimed(HoldsReclaimedEvent {
            show_id,
            seats: reclaimed.clone(),
            fined_users: fined_users.clone(),
            timestamp: now.timestamp(),
        }));

        Ok(ReclaimReport { show_id, reclaimed, fined_users })
    }

    /// Sweep every show. A failing show is logged and skipped.
    pub async fn reclaim_all(&self, now: DateTime<Utc>) -> ReservationResult<SweepReport> {
        let show_ids = self.shows.list_show_ids().await.map_err(ReservationError::storage)?;
        let mut report = SweepReport { shows_scanned: show_ids.len(), ..SweepReport::default() };

        for show_id in show_ids {
            match self.reclaim_expired(show_id, now).await {
                Ok(r) => {
                    report.seats_reclaimed += r.reclaimed_count();
                    report.users_fined += r.fined_users.len();
                }
                Err(e) => {
                    error!("Expiry sweep failed for show {}: {}", show_id, e);
                    report.failed_shows.push(show_id);
                }
            }
        }

        Ok(report)
    }
}
