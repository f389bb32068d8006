use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::seat::{SeatState, Transition};
use crate::{ReservationError, ReservationResult};

/// Actor id the expiry reclaimer acts under.
pub const RECLAIMER_ID: &str = "system:reclaimer";

/// A single screening: the unit of concurrency control for seat mutations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Show {
    pub id: Uuid,
    pub venue_name: String,
    pub show_time: String,
    /// Price of one seat
    pub price: i64,
    pub seats: BTreeMap<String, SeatState>,
    /// Bumped by the store on every successful save.
    pub version: u64,
}

impl Show {
    pub fn new(venue_name: impl Into<String>, show_time: impl Into<String>, price: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            venue_name: venue_name.into(),
            show_time: show_time.into(),
            price,
            seats: BTreeMap::new(),
            version: 0,
        }
    }

    /// Lay out a grid of available seats keyed row letter + column (`A1`, `A2`, ...).
    pub fn with_grid(mut self, rows: &[&str], cols: u32) -> Self {
        for row in rows {
            for col in 1..=cols {
                self.seats.insert(format!("{}{}", row, col), SeatState::Available);
            }
        }
        self
    }

    pub fn with_seats<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for key in keys {
            self.seats.insert(key.into(), SeatState::Available);
        }
        self
    }

    pub fn seat(&self, seat_key: &str) -> ReservationResult<&SeatState> {
        self.seats.get(seat_key).ok_or_else(|| ReservationError::SeatNotFound {
            show_id: self.id,
            seat: seat_key.to_string(),
        })
    }

    pub(crate) fn seat_mut(&mut self, seat_key: &str) -> ReservationResult<&mut SeatState> {
        let show_id = self.id;
        self.seats.get_mut(seat_key).ok_or_else(|| ReservationError::SeatNotFound {
            show_id,
            seat: seat_key.to_string(),
        })
    }

    /// Overwrite a seat's state. The key must already be part of the layout.
    pub fn set_seat(&mut self, seat_key: &str, state: SeatState) -> ReservationResult<()> {
        *self.seat_mut(seat_key)? = state;
        Ok(())
    }

    /// `(seat, holder)` for every hold the reclaimer may free at `now`.
    pub fn expired_holds(&self, now: DateTime<Utc>) -> Vec<(String, String)> {
        self.seats
            .iter()
            .filter(|(_, state)| state.can_transition(Transition::Reclaim, RECLAIMER_ID, now))
            .filter_map(|(key, state)| state.holder().map(|holder| (key.clone(), holder.to_string())))
            .collect()
    }

    pub fn count_where(&self, pred: impl Fn(&SeatState) -> bool) -> usize {
        self.seats.values().filter(|s| pred(s)).count()
    }
}

/// Deduplicate seat keys while keeping the caller's order, rejecting an empty request.
pub fn normalize_seat_keys(seat_keys: &[String]) -> ReservationResult<Vec<String>> {
    let mut keys: Vec<String> = Vec::with_capacity(seat_keys.len());
    for key in seat_keys {
        let key = key.trim();
        if !key.is_empty() && !keys.iter().any(|k| k == key) {
            keys.push(key.to_string());
        }
    }

    if keys.is_empty() {
        return Err(ReservationError::Validation("at least one seat is required".to_string()));
    }
    Ok(keys)
}
