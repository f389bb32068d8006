use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use marquee_core::{BookingWrite, ReservationError, ReservationResult, SaveOutcome, Show, ShowRepository};
use rand::Rng;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, warn};
use uuid::Uuid;

const BACKOFF_BASE_MS: u64 = 5;
const BACKOFF_CAP_MS: u64 = 200;

/// One async lock per show. Writers of the same show queue up in this
/// process; the version check only has to catch other processes.
#[derive(Default)]
pub struct ShowLocks {
    locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl ShowLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, show_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = self.locks.lock().await.entry(show_id).or_default().clone();
        lock.lock_owned().await
    }
}

/// Full-jitter exponential backoff for the n-th conflict.
fn backoff(attempt: u32) -> Duration {
    let ceiling = BACKOFF_BASE_MS
        .saturating_mul(1u64 << attempt.min(10))
        .min(BACKOFF_CAP_MS);
    Duration::from_millis(rand::thread_rng().gen_range(0..=ceiling))
}

/// What a staged mutation of a show produced.
pub(crate) struct Staged<T> {
    pub output: T,
    /// Nothing is written when false
    pub dirty: bool,
    pub booking: Option<BookingWrite>,
}

impl<T> Staged<T> {
    pub fn unchanged(output: T) -> Self {
        Self { output, dirty: false, booking: None }
    }

    pub fn changed(output: T) -> Self {
        Self { output, dirty: true, booking: None }
    }

    pub fn with_booking(mut self, write: BookingWrite) -> Self {
        self.booking = Some(write);
        self
    }
}

/// Run one read-validate-write on a show.
///
/// The show's lock is held from load to save. `stage` receives a freshly loaded
/// copy and either returns an error (nothing is written) or the staged result.
/// A version conflict (another process saved first) discards the copy and starts
/// over after a jittered pause; business errors are never retried.
pub(crate) async fn apply_to_show<T, F>(
    shows: &dyn ShowRepository,
    locks: &ShowLocks,
    show_id: Uuid,
    max_attempts: u32,
    mut stage: F,
) -> ReservationResult<T>
where
    T: Send,
    F: FnMut(&mut Show) -> ReservationResult<Staged<T>> + Send,
{
    let attempts = max_attempts.max(1);
    let _guard = locks.lock(show_id).await;

    for attempt in 1..=attempts {
        let mut show = shows
            .load_show(show_id)
            .await
            .map_err(ReservationError::storage)?
            .ok_or(ReservationError::ShowNotFound(show_id))?;
        let expected_version = show.version;

        let staged = stage(&mut show)?;
        if !staged.dirty {
            return Ok(staged.output);
        }

        match shows
            .save_show(&show, expected_version, staged.booking.as_ref())
            .await
            .map_err(ReservationError::storage)?
        {
            SaveOutcome::Saved => return Ok(staged.output),
            SaveOutcome::Conflict => {
                debug!("Show {} changed underneath attempt {}/{}, retrying", show_id, attempt, attempts);
                if attempt < attempts {
                    tokio::time::sleep(backoff(attempt)).await;
                }
            }
        }
    }

    warn!("Giving up on show {} after {} conflicting attempts", show_id, attempts);
    Err(ReservationError::Contention(show_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_stays_under_cap() {
        for attempt in 0..40 {
            assert!(backoff(attempt) <= Duration::from_millis(BACKOFF_CAP_MS));
        }
    }

    #[tokio::test]
    async fn test_show_lock_is_per_show() {
        let locks = ShowLocks::new();
        let first = Uuid::new_v4();

        let _held = locks.lock(first).await;
        // a different show is not blocked by the held one
        let other = tokio::time::timeout(Duration::from_millis(100), locks.lock(Uuid::new_v4())).await;
        assert!(other.is_ok());

        let same = tokio::time::timeout(Duration::from_millis(20), locks.lock(first)).await;
        assert!(same.is_err());
    }
}
