use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// State of a single seat within a show.
///
/// `Booked` is terminal: nothing in the engine moves a seat out of it except
/// the compensation path after a failed settlement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SeatState {
    Available,
    Held {
        holder_id: String,
        expires_at: DateTime<Utc>,
    },
    Booked,
}

/// A state change a caller asks for on one seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Available or lapsed hold → Held by the actor. Re-hold by the same holder refreshes.
    Hold,
    /// Held by the actor → Available.
    Release,
    /// Available, the actor's live hold, or a lapsed hold → Booked.
    Book,
    /// Held with `expires_at < now` → Available.
    Reclaim,
}

impl SeatState {
    pub fn is_available(&self) -> bool {
        matches!(self, SeatState::Available)
    }

    pub fn is_booked(&self) -> bool {
        matches!(self, SeatState::Booked)
    }

    /// Holder of a hold, live or lapsed.
    pub fn holder(&self) -> Option<&str> {
        match self {
            SeatState::Held { holder_id, .. } => Some(holder_id.as_str()),
            _ => None,
        }
    }

    /// True for a hold owned by `actor_id` that has not lapsed at `now`.
    pub fn is_live_hold_of(&self, actor_id: &str, now: DateTime<Utc>) -> bool {
        match self {
            SeatState::Held { holder_id, expires_at } => holder_id == actor_id && *expires_at > now,
            _ => false,
        }
    }

    /// A hold whose window has closed (`now >= expires_at`) can be taken by anyone.
    pub fn is_lapsed_hold(&self, now: DateTime<Utc>) -> bool {
        match self {
            SeatState::Held { expires_at, .. } => now >= *expires_at,
            _ => false,
        }
    }

    /// Holder of a lapsed hold that `actor_id` would take over, if it is someone else.
    pub fn lapsed_holder_other_than(&self, actor_id: &str, now: DateTime<Utc>) -> Option<&str> {
        match self.holder() {
            Some(holder) if holder != actor_id && self.is_lapsed_hold(now) => Some(holder),
            _ => None,
        }
    }

    /// Transition table for the seat grid.
    pub fn can_transition(&self, transition: Transition, actor_id: &str, now: DateTime<Utc>) -> bool {
        match (transition, self) {
            (_, SeatState::Booked) => false,

            (Transition::Hold, SeatState::Available) => true,
            (Transition::Hold, SeatState::Held { holder_id, .. }) => {
                holder_id == actor_id || self.is_lapsed_hold(now)
            }

            (Transition::Release, SeatState::Held { holder_id, .. }) => holder_id == actor_id,
            (Transition::Release, SeatState::Available) => false,

            (Transition::Book, SeatState::Available) => true,
            (Transition::Book, SeatState::Held { .. }) => {
                self.is_live_hold_of(actor_id, now) || self.is_lapsed_hold(now)
            }

            // strict: a hold expiring exactly now is not yet reclaimed
            (Transition::Reclaim, SeatState::Held { expires_at, .. }) => *expires_at < now,
            (Transition::Reclaim, SeatState::Available) => false,
        }
    }
}
