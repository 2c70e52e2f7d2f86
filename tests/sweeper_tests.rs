//! Expiry sweeper tests against the in-memory store.

use std::sync::Arc;

use chrono::{Duration, Utc};
use lectoria_core::config::{PolicyConfig, SweeperConfig};
use lectoria_core::models::book::NewBook;
use lectoria_core::models::booking::{BookingState, ReserveRequest};
use lectoria_core::repository::memory::MemoryStore;
use lectoria_core::{ExpirySweeper, InventoryEngine};

fn setup() -> (
    Arc<MemoryStore>,
    InventoryEngine<MemoryStore>,
    ExpirySweeper<MemoryStore>,
) {
    let store = Arc::new(MemoryStore::new());
    let engine = InventoryEngine::new(store.clone(), PolicyConfig::default());
    let sweeper = ExpirySweeper::new(store.clone(), engine.clone(), SweeperConfig::default());
    (store, engine, sweeper)
}

async fn seed_book(engine: &InventoryEngine<MemoryStore>, total: i32) -> i32 {
    engine
        .create_book(NewBook {
            title: "Dead Souls".to_string(),
            total_copies: total,
        })
        .await
        .unwrap()
        .id
}

async fn reserve_at(
    engine: &InventoryEngine<MemoryStore>,
    book_id: i32,
    holder_id: i32,
    qty: i32,
    age_days: i64,
) -> i32 {
    engine
        .reserve(ReserveRequest {
            book_id,
            holder_id,
            quantity: qty,
            requested_at: Some(Utc::now() - Duration::days(age_days)),
        })
        .await
        .unwrap()
        .id
}

#[tokio::test]
async fn stale_reservations_are_cancelled_and_capacity_released() {
    let (_, engine, sweeper) = setup();
    let book_id = seed_book(&engine, 5).await;

    let stale = reserve_at(&engine, book_id, 1, 2, 4).await;
    let fresh = reserve_at(&engine, book_id, 2, 1, 1).await;
    assert_eq!(engine.book(book_id).await.unwrap().remaining_copies, 2);

    let report = sweeper.sweep_once(Utc::now()).await.unwrap();
    assert_eq!(report.scanned, 1);
    assert_eq!(report.cancelled, 1);
    assert_eq!(report.already_handled, 0);
    assert_eq!(report.failed, 0);

    assert_eq!(
        engine.booking(stale).await.unwrap().state,
        BookingState::Cancelled
    );
    // Fresh reservation survives inside the grace window.
    assert_eq!(
        engine.booking(fresh).await.unwrap().state,
        BookingState::Reserved
    );
    assert_eq!(engine.book(book_id).await.unwrap().remaining_copies, 4);
}

#[tokio::test]
async fn reservation_exactly_at_the_window_edge_is_swept() {
    let (_, engine, sweeper) = setup();
    let book_id = seed_book(&engine, 2).await;
    let now = Utc::now();

    // Reserved exactly grace_days ago: cutoff is inclusive.
    engine
        .reserve(ReserveRequest {
            book_id,
            holder_id: 1,
            quantity: 1,
            requested_at: Some(now - Duration::days(3)),
        })
        .await
        .unwrap();

    let report = sweeper.sweep_once(now).await.unwrap();
    assert_eq!(report.cancelled, 1);
}

#[tokio::test]
async fn issued_bookings_are_never_swept() {
    let (_, engine, sweeper) = setup();
    let book_id = seed_book(&engine, 3).await;

    // Old reservation, but the holder picked the books up.
    let booking_id = reserve_at(&engine, book_id, 1, 2, 10).await;
    engine.mark_issued(booking_id).await.unwrap();

    let report = sweeper.sweep_once(Utc::now()).await.unwrap();
    assert_eq!(report.scanned, 0);
    assert_eq!(report.cancelled, 0);

    assert_eq!(
        engine.booking(booking_id).await.unwrap().state,
        BookingState::Issued
    );
    assert_eq!(engine.book(book_id).await.unwrap().remaining_copies, 1);
}

#[tokio::test]
async fn sweeping_twice_is_idempotent() {
    let (_, engine, sweeper) = setup();
    let book_id = seed_book(&engine, 5).await;
    reserve_at(&engine, book_id, 1, 3, 5).await;

    let first = sweeper.sweep_once(Utc::now()).await.unwrap();
    assert_eq!(first.cancelled, 1);
    assert_eq!(engine.book(book_id).await.unwrap().remaining_copies, 5);

    // Terminal bookings are invisible to the scan; capacity is released
    // exactly once.
    let second = sweeper.sweep_once(Utc::now()).await.unwrap();
    assert_eq!(second.scanned, 0);
    assert_eq!(second.cancelled, 0);
    assert_eq!(engine.book(book_id).await.unwrap().remaining_copies, 5);
}

#[tokio::test]
async fn holders_past_the_renewal_threshold_are_deactivated() {
    let (store, _, sweeper) = setup();
    let now = Utc::now();

    let lapsed = store
        .seed_holder("never renewed", now - Duration::days(400), None)
        .await;
    let renewed = store
        .seed_holder(
            "renewed recently",
            now - Duration::days(800),
            Some(now - Duration::days(30)),
        )
        .await;
    let recent = store
        .seed_holder("registered recently", now - Duration::days(10), None)
        .await;

    let report = sweeper.sweep_once(now).await.unwrap();
    assert_eq!(report.holders_deactivated, 1);

    assert!(!store.holder(lapsed.id).await.unwrap().is_active);
    assert!(store.holder(renewed.id).await.unwrap().is_active);
    assert!(store.holder(recent.id).await.unwrap().is_active);

    // Already-deactivated accounts are not counted again.
    let rerun = sweeper.sweep_once(now).await.unwrap();
    assert_eq!(rerun.holders_deactivated, 0);
}
