use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use marquee_core::{
    FinePolicy, InMemoryPenaltyLedger, PenaltyLedger, ReservationError, SeatState, Show,
};
use marquee_engine::{MockSettlementGateway, ReservationEngine, ReservationPolicy};
use marquee_shared::ReservationEvent;
use marquee_store::InMemoryShowRepository;

struct Fixture {
    engine: ReservationEngine,
    ledger: Arc<InMemoryPenaltyLedger>,
    show: Show,
}

async fn fixture_with(policy: ReservationPolicy) -> Fixture {
    let repo = Arc::new(InMemoryShowRepository::new());
    let ledger = Arc::new(InMemoryPenaltyLedger::new());
    let engine = ReservationEngine::new(
        repo,
        ledger.clone(),
        Arc::new(MockSettlementGateway::approving()),
        policy,
    );
    let show = engine
        .create_show(Show::new("PVR Screen 1", "18:30", 250).with_seats(["A1", "A2", "A3", "A4"]))
        .await
        .unwrap();
    Fixture { engine, ledger, show }
}

async fn fixture() -> Fixture {
    fixture_with(ReservationPolicy::default()).await
}

fn seats(keys: &[&str]) -> Vec<String> {
    keys.iter().map(|k| k.to_string()).collect()
}

#[tokio::test]
async fn test_hold_expire_fine_then_rebook() {
    let f = fixture().await;
    let t0 = Utc.with_ymd_and_hms(2025, 1, 1, 18, 0, 0).unwrap();

    let expires_at = f.engine.hold_seats(f.show.id, &seats(&["A1"]), "U1", t0).await.unwrap();
    assert_eq!(expires_at, t0 + Duration::seconds(300));

    let err = f
        .engine
        .hold_seats(f.show.id, &seats(&["A1"]), "U2", t0 + Duration::seconds(10))
        .await
        .unwrap_err();
    assert!(matches!(err, ReservationError::SeatUnavailable(ref s) if s == "A1"));

    let report = f.engine.reclaim_expired(f.show.id, t0 + Duration::seconds(301)).await.unwrap();
    assert_eq!(report.reclaimed, vec!["A1"]);
    assert_eq!(report.fined_users, vec!["U1"]);
    assert_eq!(f.ledger.balance("U1").await.unwrap(), 5);
    assert_eq!(f.engine.seat_state(f.show.id, "A1").await.unwrap(), SeatState::Available);

    let t1 = t0 + Duration::seconds(302);
    f.engine.hold_seats(f.show.id, &seats(&["A1"]), "U2", t1).await.unwrap();
    let booking = f.engine.commit_booking(f.show.id, &seats(&["A1"]), "U2", 250, t1).await.unwrap();

    assert_eq!(booking.amount, 250);
    assert_eq!(booking.status, marquee_core::BookingStatus::Confirmed);
    assert_eq!(f.engine.seat_state(f.show.id, "A1").await.unwrap(), SeatState::Booked);
    assert_eq!(f.engine.booking(booking.id).await.unwrap(), Some(booking));
}

#[tokio::test]
async fn test_rehold_refreshes_expiry() {
    let f = fixture().await;
    let t0 = Utc::now();

    f.engine.hold_seats(f.show.id, &seats(&["A1", "A2"]), "U1", t0).await.unwrap();
    let later = t0 + Duration::seconds(60);
    let refreshed = f.engine.hold_seats(f.show.id, &seats(&["A1"]), "U1", later).await.unwrap();

    assert_eq!(refreshed, later + Duration::seconds(300));
    match f.engine.seat_state(f.show.id, "A1").await.unwrap() {
        SeatState::Held { holder_id, expires_at } => {
            assert_eq!(holder_id, "U1");
            assert_eq!(expires_at, refreshed);
        }
        other => panic!("expected held seat, got {:?}", other),
    }
}

#[tokio::test]
async fn test_hold_is_all_or_nothing() {
    let f = fixture().await;
    let now = Utc::now();

    f.engine.hold_seats(f.show.id, &seats(&["A2"]), "U2", now).await.unwrap();
    let err = f
        .engine
        .hold_seats(f.show.id, &seats(&["A1", "A2"]), "U1", now)
        .await
        .unwrap_err();

    assert_eq!(err.code(), "seat_unavailable");
    assert_eq!(f.engine.seat_state(f.show.id, "A1").await.unwrap(), SeatState::Available);
}

#[tokio::test]
async fn test_lapsed_hold_can_be_taken_by_another_user() {
    let f = fixture().await;
    let t0 = Utc::now();

    f.engine.hold_seats(f.show.id, &seats(&["A1"]), "U1", t0).await.unwrap();
    let at_expiry = t0 + Duration::seconds(300);
    f.engine.hold_seats(f.show.id, &seats(&["A1"]), "U2", at_expiry).await.unwrap();

    let state = f.engine.seat_state(f.show.id, "A1").await.unwrap();
    assert_eq!(state.holder(), Some("U2"));
    // the takeover still counts as abandonment
    assert_eq!(f.ledger.balance("U1").await.unwrap(), 5);
    assert_eq!(f.ledger.balance("U2").await.unwrap(), 0);
}

#[tokio::test]
async fn test_lapsed_hold_taken_before_sweep_is_fined_once() {
    let f = fixture().await;
    let t0 = Utc::now();

    f.engine.hold_seats(f.show.id, &seats(&["A1", "A2"]), "U1", t0).await.unwrap();
    let later = t0 + Duration::seconds(400);
    f.engine.hold_seats(f.show.id, &seats(&["A1"]), "U2", later).await.unwrap();
    assert_eq!(f.ledger.balance("U1").await.unwrap(), 5);

    // A2 is still U1's lapsed hold; the sweep frees it and fines again for that pass
    let report = f.engine.reclaim_expired(f.show.id, later).await.unwrap();
    assert_eq!(report.reclaimed, vec!["A2"]);
    assert_eq!(f.ledger.balance("U1").await.unwrap(), 10);
    assert_eq!(f.engine.seat_state(f.show.id, "A1").await.unwrap().holder(), Some("U2"));
}

#[tokio::test]
async fn test_booking_over_lapsed_hold_fines_previous_holder() {
    let f = fixture().await;
    let t0 = Utc::now();

    f.engine.hold_seats(f.show.id, &seats(&["A1"]), "U1", t0).await.unwrap();
    f.engine
        .commit_booking(f.show.id, &seats(&["A1"]), "U2", 250, t0 + Duration::seconds(400))
        .await
        .unwrap();

    assert_eq!(f.ledger.balance("U1").await.unwrap(), 5);
    assert_eq!(f.engine.seat_state(f.show.id, "A1").await.unwrap(), SeatState::Booked);
}

#[tokio::test]
async fn test_oversized_total_is_rejected_without_side_effects() {
    let f = fixture().await;
    let now = Utc::now();

    let err = f
        .engine
        .commit_booking(f.show.id, &seats(&["A1", "A2"]), "U1", i64::MAX / 2 + 1, now)
        .await
        .unwrap_err();

    assert_eq!(err.code(), "validation");
    assert_eq!(f.engine.seat_state(f.show.id, "A1").await.unwrap(), SeatState::Available);
    assert!(f.engine.bookings_for("U1").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_release_is_best_effort() {
    let f = fixture().await;
    let now = Utc::now();

    f.engine.hold_seats(f.show.id, &seats(&["A1"]), "U1", now).await.unwrap();
    f.engine.hold_seats(f.show.id, &seats(&["A2"]), "U2", now).await.unwrap();
    f.engine.commit_booking(f.show.id, &seats(&["A3"]), "U3", 250, now).await.unwrap();

    let released = f
        .engine
        .release_seats(f.show.id, &seats(&["A1", "A2", "A3", "A4", "Z9"]), "U1")
        .await
        .unwrap();
    assert_eq!(released, vec!["A1"]);

    // second release is a no-op
    let released = f.engine.release_seats(f.show.id, &seats(&["A1"]), "U1").await.unwrap();
    assert!(released.is_empty());

    assert_eq!(f.engine.seat_state(f.show.id, "A1").await.unwrap(), SeatState::Available);
    assert_eq!(f.engine.seat_state(f.show.id, "A2").await.unwrap().holder(), Some("U2"));
    assert_eq!(f.engine.seat_state(f.show.id, "A3").await.unwrap(), SeatState::Booked);
}

#[tokio::test]
async fn test_fine_charged_once_per_sweep() {
    let f = fixture().await;
    let t0 = Utc::now();

    f.engine.hold_seats(f.show.id, &seats(&["A1", "A2", "A3", "A4"]), "U1", t0).await.unwrap();
    let sweep_at = t0 + Duration::seconds(301);

    let report = f.engine.reclaim_expired(f.show.id, sweep_at).await.unwrap();
    assert_eq!(report.reclaimed_count(), 4);
    assert_eq!(f.ledger.balance("U1").await.unwrap(), 5);

    let again = f.engine.reclaim_expired(f.show.id, sweep_at).await.unwrap();
    assert_eq!(again.reclaimed_count(), 0);
    assert!(again.fined_users.is_empty());
    assert_eq!(f.ledger.balance("U1").await.unwrap(), 5);
}

#[tokio::test]
async fn test_per_seat_fine_policy() {
    let f = fixture_with(ReservationPolicy { fine_policy: FinePolicy::PerSeat, ..ReservationPolicy::default() }).await;
    let t0 = Utc::now();

    f.engine.hold_seats(f.show.id, &seats(&["A1", "A2", "A3"]), "U1", t0).await.unwrap();
    f.engine.reclaim_expired(f.show.id, t0 + Duration::seconds(301)).await.unwrap();

    assert_eq!(f.ledger.balance("U1").await.unwrap(), 15);
}

#[tokio::test]
async fn test_hold_refused_above_fine_threshold() {
    let f = fixture().await;
    f.ledger.add_fine("U1", 50).await.unwrap();
    f.engine.hold_seats(f.show.id, &seats(&["A1"]), "U1", Utc::now()).await.unwrap();

    f.ledger.add_fine("U1", 5).await.unwrap();
    let err = f.engine.hold_seats(f.show.id, &seats(&["A2"]), "U1", Utc::now()).await.unwrap_err();

    assert!(matches!(err, ReservationError::FineThresholdExceeded { balance: 55, cap: 50 }));
    assert!(f.engine.exceeds_fine_threshold("U1").await.unwrap());
    assert!(!f.engine.exceeds_fine_threshold("U2").await.unwrap());
}

#[tokio::test]
async fn test_unknown_show_and_seat() {
    let f = fixture().await;
    let now = Utc::now();

    let err = f.engine.hold_seats(uuid::Uuid::new_v4(), &seats(&["A1"]), "U1", now).await.unwrap_err();
    assert!(matches!(err, ReservationError::ShowNotFound(_)));

    let err = f.engine.hold_seats(f.show.id, &seats(&["A1", "Z9"]), "U1", now).await.unwrap_err();
    assert!(matches!(err, ReservationError::SeatNotFound { ref seat, .. } if seat == "Z9"));
    assert_eq!(f.engine.seat_state(f.show.id, "A1").await.unwrap(), SeatState::Available);

    let err = f.engine.commit_booking(uuid::Uuid::new_v4(), &seats(&["A1"]), "U1", 250, now).await.unwrap_err();
    assert!(matches!(err, ReservationError::ShowNotFound(_)));

    let err = f.engine.hold_seats(f.show.id, &[], "U1", now).await.unwrap_err();
    assert!(matches!(err, ReservationError::Validation(_)));
}

#[tokio::test]
async fn test_commit_is_atomic() {
    let f = fixture().await;
    let now = Utc::now();

    f.engine.commit_booking(f.show.id, &seats(&["A2"]), "U2", 250, now).await.unwrap();
    let err = f
        .engine
        .commit_booking(f.show.id, &seats(&["A1", "A2"]), "U1", 250, now)
        .await
        .unwrap_err();

    assert!(matches!(err, ReservationError::SeatUnavailable(ref s) if s == "A2"));
    assert_eq!(f.engine.seat_state(f.show.id, "A1").await.unwrap(), SeatState::Available);
    assert!(f.engine.bookings_for("U1").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_commit_respects_other_users_hold() {
    let f = fixture().await;
    let now = Utc::now();

    f.engine.hold_seats(f.show.id, &seats(&["A1"]), "U2", now).await.unwrap();
    let err = f.engine.commit_booking(f.show.id, &seats(&["A1"]), "U1", 250, now).await.unwrap_err();
    assert_eq!(err.code(), "seat_unavailable");

    let booking = f.engine.commit_booking(f.show.id, &seats(&["A1"]), "U2", 250, now).await.unwrap();
    assert_eq!(booking.seats, vec!["A1"]);
    assert_eq!(f.engine.bookings_for("U2").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_direct_booking_can_be_disabled() {
    let f = fixture_with(ReservationPolicy { allow_direct_booking: false, ..ReservationPolicy::default() }).await;
    let now = Utc::now();

    let err = f.engine.commit_booking(f.show.id, &seats(&["A1"]), "U1", 250, now).await.unwrap_err();
    assert!(matches!(err, ReservationError::HoldRequired(ref s) if s == "A1"));

    f.engine.hold_seats(f.show.id, &seats(&["A1"]), "U1", now).await.unwrap();
    f.engine.commit_booking(f.show.id, &seats(&["A1"]), "U1", 250, now).await.unwrap();
}

#[tokio::test]
async fn test_view_show_reclaims_lazily() {
    let f = fixture().await;
    let t0 = Utc::now();

    f.engine.hold_seats(f.show.id, &seats(&["A1"]), "U1", t0).await.unwrap();
    let show = f.engine.view_show(f.show.id, t0 + Duration::seconds(400)).await.unwrap();

    assert!(show.seat("A1").unwrap().is_available());
    assert_eq!(f.ledger.balance("U1").await.unwrap(), 5);
}

#[tokio::test]
async fn test_events_are_broadcast() {
    let f = fixture().await;
    let mut rx = f.engine.subscribe();

    f.engine.hold_seats(f.show.id, &seats(&["A1"]), "U1", Utc::now()).await.unwrap();
    f.engine.commit_booking(f.show.id, &seats(&["A1"]), "U1", 250, Utc::now()).await.unwrap();

    match rx.recv().await.unwrap() {
        ReservationEvent::SeatsHeld(e) => {
            assert_eq!(e.show_id, f.show.id);
            assert_eq!(e.seats, vec!["A1"]);
        }
        other => panic!("unexpected event {:?}", other),
    }
    assert!(matches!(rx.recv().await.unwrap(), ReservationEvent::BookingConfirmed(_)));
}

#[tokio::test]
async fn test_sweep_covers_every_show() {
    let f = fixture().await;
    let other = f
        .engine
        .create_show(Show::new("PVR Screen 2", "21:00", 300).with_grid(&["A"], 2))
        .await
        .unwrap();
    let t0 = Utc::now();

    f.engine.hold_seats(f.show.id, &seats(&["A1"]), "U1", t0).await.unwrap();
    f.engine.hold_seats(other.id, &seats(&["A1", "A2"]), "U2", t0).await.unwrap();

    let report = f.engine.reclaim_all(t0 + Duration::seconds(301)).await.unwrap();
    assert_eq!(report.shows_scanned, 2);
    assert_eq!(report.seats_reclaimed, 3);
    assert_eq!(report.users_fined, 2);
    assert!(report.failed_shows.is_empty());
}
