use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::show::Show;
use crate::{ReservationError, ReservationResult};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    /// Legacy, never produced by the engine
    Pending,
    Confirmed,
    /// Legacy, never produced by the engine
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "PENDING" => Some(BookingStatus::Pending),
            "CONFIRMED" => Some(BookingStatus::Confirmed),
            "CANCELLED" => Some(BookingStatus::Cancelled),
            _ => None,
        }
    }
}

/// Immutable record of seats sold to one user for one show.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Booking {
    pub id: Uuid,
    pub show_id: Uuid,
    pub user_id: String,
    pub seats: Vec<String>,
    pub unit_price: i64,
    pub amount: i64,
    pub status: BookingStatus,
    pub venue_name: String,
    pub show_time: String,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    /// Fails with `Validation` when the total does not fit the amount type.
    pub fn confirmed(
        show: &Show,
        user_id: &str,
        seats: Vec<String>,
        unit_price: i64,
        now: DateTime<Utc>,
    ) -> ReservationResult<Self> {
        let amount = i64::try_from(seats.len())
            .ok()
            .and_then(|count| unit_price.checked_mul(count))
            .ok_or_else(|| {
                ReservationError::Validation(format!(
                    "total for {} seat(s) at {} is out of range",
                    seats.len(),
                    unit_price
                ))
            })?;
        Ok(Self {
            id: Uuid::new_v4(),
            show_id: show.id,
            user_id: user_id.to_string(),
            seats,
            unit_price,
            amount,
            status: BookingStatus::Confirmed,
            venue_name: show.venue_name.clone(),
            show_time: show.show_time.clone(),
            created_at: now,
        })
    }
}

/// Booking change applied in the same atomic unit as a show save.
#[derive(Debug, Clone)]
pub enum BookingWrite {
    Insert(Booking),
    /// Compensation after a failed settlement
    Remove(Uuid),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirmed_booking_amount() {
        let show = Show::new("PVR Screen 2", "21:00", 250).with_seats(["A1", "A2"]);
        let booking = Booking::confirmed(&show, "u1", vec!["A1".into(), "A2".into()], 250, Utc::now()).unwrap();

        assert_eq!(booking.amount, 500);
        assert_eq!(booking.status, BookingStatus::Confirmed);
        assert_eq!(booking.show_id, show.id);
        assert_eq!(booking.venue_name, "PVR Screen 2");
    }

    #[test]
    fn test_amount_overflow_is_rejected() {
        let show = Show::new("PVR Screen 2", "21:00", 250).with_seats(["A1", "A2"]);
        let err = Booking::confirmed(&show, "u1", vec!["A1".into(), "A2".into()], i64::MAX / 2 + 1, Utc::now())
            .unwrap_err();

        assert_eq!(err.code(), "validation");
    }

    #[test]
    fn test_status_round_trip_through_str() {
        for status in [BookingStatus::Pending, BookingStatus::Confirmed, BookingStatus::Cancelled] {
            assert_eq!(BookingStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(BookingStatus::parse("EXPIRED"), None);
    }
}
