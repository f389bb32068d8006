use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::engine::ReservationEngine;

/// Periodically reclaim lapsed holds across all shows until `shutdown` flips to true.
pub async fn run_expiry_sweeper(
    engine: Arc<ReservationEngine>,
    every: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!("Expiry sweeper started, running every {:?}", every);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match engine.reclaim_all(Utc::now()).await {
                    Ok(report) if report.seats_reclaimed > 0 || !report.failed_shows.is_empty() => {
                        info!(
                            "Sweep reclaimed {} seat(s) over {} show(s), fined {} user(s), {} failure(s)",
                            report.seats_reclaimed,
                            report.shows_scanned,
                            report.users_fined,
                            report.failed_shows.len()
                        );
                    }
                    Ok(report) => debug!("Sweep found nothing to reclaim in {} show(s)", report.shows_scanned),
                    Err(e) => error!("Expiry sweep failed: {}", e),
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    info!("Expiry sweeper stopping");
                    break;
                }
            }
        }
    }
}
