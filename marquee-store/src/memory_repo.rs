use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use marquee_core::{Booking, BookingWrite, SaveOutcome, Show, ShowRepository};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

/// Process-local show store.
///
/// Each show sits behind its own mutex so saves on different shows never
/// contend; the outer map is only write-locked to add a show.
pub struct InMemoryShowRepository {
    shows: RwLock<HashMap<Uuid, Arc<Mutex<Show>>>>,
    bookings: RwLock<HashMap<Uuid, Booking>>,
}

impl InMemoryShowRepository {
    pub fn new() -> Self {
        Self {
            shows: RwLock::new(HashMap::new()),
            bookings: RwLock::new(HashMap::new()),
        }
    }

    async fn entry(&self, show_id: Uuid) -> Option<Arc<Mutex<Show>>> {
        self.shows.read().await.get(&show_id).cloned()
    }
}

impl Default for InMemoryShowRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ShowRepository for InMemoryShowRepository {
    async fn insert_show(
        &self,
        show: &Show,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut shows = self.shows.write().await;
        if shows.contains_key(&show.id) {
            return Err(format!("Show {} already exists", show.id).into());
        }
        shows.insert(show.id, Arc::new(Mutex::new(show.clone())));
        Ok(())
    }

    async fn load_show(
        &self,
        show_id: Uuid,
    ) -> Result<Option<Show>, Box<dyn std::error::Error + Send + Sync>> {
        match self.entry(show_id).await {
            Some(entry) => Ok(Some(entry.lock().await.clone())),
            None => Ok(None),
        }
    }

    async fn list_show_ids(
        &self,
    ) -> Result<Vec<Uuid>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.shows.read().await.keys().copied().collect())
    }

    async fn save_show(
        &self,
        show: &Show,
        expected_version: u64,
        booking: Option<&BookingWrite>,
    ) -> Result<SaveOutcome, Box<dyn std::error::Error + Send + Sync>> {
        let entry = self
            .entry(show.id)
            .await
            .ok_or_else(|| format!("Show {} not found", show.id))?;

        // lock order: show, then bookings
        let mut stored = entry.lock().await;
        if stored.version != expected_version {
            return Ok(SaveOutcome::Conflict);
        }

        if let Some(write) = booking {
            let mut bookings = self.bookings.write().await;
            match write {
                BookingWrite::Insert(b) => {
                    bookings.insert(b.id, b.clone());
                }
                BookingWrite::Remove(id) => {
                    bookings.remove(id);
                }
            }
        }

        let mut next = show.clone();
        next.version = expected_version + 1;
        *stored = next;
        Ok(SaveOutcome::Saved)
    }

    async fn get_booking(
        &self,
        booking_id: Uuid,
    ) -> Result<Option<Booking>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.bookings.read().await.get(&booking_id).cloned())
    }

    async fn list_bookings(
        &self,
        user_id: &str,
    ) -> Result<Vec<Booking>, Box<dyn std::error::Error + Send + Sync>> {
        let mut found: Vec<Booking> = self
            .bookings
            .read()
            .await
            .values()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        found.sort_by_key(|b| b.created_at);
        Ok(found)
    }
}
