use async_trait::async_trait;
use uuid::Uuid;

use crate::booking::{Booking, BookingWrite};
use crate::show::Show;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    /// The stored version moved since the show was loaded
    Conflict,
}

/// Storage for shows and bookings.
///
/// `save_show` is the atomic read-validate-write unit: it must only succeed
/// when the stored version still equals `expected_version`, and the optional
/// booking write must land in the same unit as the seat map.
#[async_trait]
pub trait ShowRepository: Send + Sync {
    async fn insert_show(
        &self,
        show: &Show,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    async fn load_show(
        &self,
        show_id: Uuid,
    ) -> Result<Option<Show>, Box<dyn std::error::Error + Send + Sync>>;

    async fn list_show_ids(
        &self,
    ) -> Result<Vec<Uuid>, Box<dyn std::error::Error + Send + Sync>>;

    async fn save_show(
        &self,
        show: &Show,
        expected_version: u64,
        booking: Option<&BookingWrite>,
    ) -> Result<SaveOutcome, Box<dyn std::error::Error + Send + Sync>>;

    async fn get_booking(
        &self,
        booking_id: Uuid,
    ) -> Result<Option<Booking>, Box<dyn std::error::Error + Send + Sync>>;

    async fn list_bookings(
        &self,
        user_id: &str,
    ) -> Result<Vec<Booking>, Box<dyn std::error::Error + Send + Sync>>;
}
