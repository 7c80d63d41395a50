//! End-to-end reservation scenarios against a real Postgres.
//!
//! Run with a database available:
//!   DATABASE_URL=postgres://... cargo test -- --ignored

use chrono::{Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Database, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use sea_orm_migration::MigratorTrait;
use uuid::Uuid;

use bus_ticketing_backend::entities::booking::{self, PaymentStatus};
use bus_ticketing_backend::entities::trip::{self, TripStatus};
use bus_ticketing_backend::entities::{bus, route, seat_assignment, user};
use bus_ticketing_backend::error::AppError;
use bus_ticketing_backend::reservation::{machine, sweeper};

async fn connect() -> DatabaseConnection {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for this test");
    let db = Database::connect(&url).await.expect("connect");
    migration::Migrator::up(&db, None).await.expect("migrate");
    db
}

async fn make_user(db: &DatabaseConnection) -> Uuid {
    let id = Uuid::new_v4();
    user::ActiveModel {
        id: Set(id),
        email: Set(format!("rider-{}@example.com", id)),
        password_hash: Set("x".to_string()),
        name: Set("Test Rider".to_string()),
        role: Set(user::UserRole::Passenger),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert user");
    id
}

/// A fresh scheduled trip with the given capacity at 10_000 per seat.
async fn make_trip(db: &DatabaseConnection, seats: i32) -> trip::Model {
    let bus = bus::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set("Test Bus".to_string()),
        seat_count: Set(seats),
        rate_per_km: Set(100),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert bus");

    let route = route::ActiveModel {
        id: Set(Uuid::new_v4()),
        origin: Set("Origin".to_string()),
        destination: Set("Destination".to_string()),
        distance_km: Set(100.0),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert route");

    let departure = Utc::now() + Duration::days(1);
    trip::ActiveModel {
        id: Set(Uuid::new_v4()),
        route_id: Set(route.id),
        bus_id: Set(bus.id),
        departure_time: Set(departure.into()),
        arrival_time: Set((departure + Duration::hours(3)).into()),
        total_seats: Set(seats),
        available_seats: Set(seats),
        price_per_seat: Set(10_000),
        status: Set(TripStatus::Scheduled),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert trip")
}

async fn available_seats(db: &DatabaseConnection, trip_id: Uuid) -> i32 {
    trip::Entity::find_by_id(trip_id)
        .one(db)
        .await
        .expect("find trip")
        .expect("trip exists")
        .available_seats
}

async fn held_seats(db: &DatabaseConnection, trip_id: Uuid) -> Vec<i32> {
    let mut seats: Vec<i32> = seat_assignment::Entity::find()
        .filter(seat_assignment::Column::TripId.eq(trip_id))
        .all(db)
        .await
        .expect("find assignments")
        .into_iter()
        .map(|a| a.seat_number)
        .collect();
    seats.sort_unstable();
    seats
}

// Scenario A: two concurrent requests for the same seat; exactly one
// wins, the loser gets a SeatConflict naming the seat.
#[tokio::test]
#[ignore = "requires Postgres via DATABASE_URL"]
async fn concurrent_requests_for_same_seat_yield_one_winner() {
    let db = connect().await;
    let user_id = make_user(&db).await;
    let t = make_trip(&db, 2).await;

    let (a, b) = tokio::join!(
        machine::create_booking(&db, user_id, t.id, &[1], 10_000),
        machine::create_booking(&db, user_id, t.id, &[1], 10_000),
    );

    let (ok, err) = match (a, b) {
        (Ok(ok), Err(err)) => (ok, err),
        (Err(err), Ok(ok)) => (ok, err),
        other => panic!("expected exactly one winner, got {:?}", other),
    };

    assert_eq!(ok.payment_status, PaymentStatus::Pending);
    match err {
        AppError::SeatConflict(seats) => assert_eq!(seats, vec![1]),
        other => panic!("expected SeatConflict, got {:?}", other),
    }

    // One seat held, one decrement
    assert_eq!(available_seats(&db, t.id).await, 1);
    assert_eq!(held_seats(&db, t.id).await, vec![1]);
}

// Scenario B: not enough capacity fails atomically and leaves the
// counter alone.
#[tokio::test]
#[ignore = "requires Postgres via DATABASE_URL"]
async fn capacity_exceeded_leaves_counter_unchanged() {
    let db = connect().await;
    let user_id = make_user(&db).await;
    let t = make_trip(&db, 2).await;

    // One of the two seats is already gone
    let mut active: trip::ActiveModel = t.clone().into();
    active.available_seats = Set(1);
    active.update(&db).await.expect("update trip");

    let err = machine::create_booking(&db, user_id, t.id, &[1, 2], 20_000)
        .await
        .expect_err("should exceed capacity");

    match err {
        AppError::CapacityExceeded {
            requested,
            available,
        } => {
            assert_eq!(requested, 2);
            assert_eq!(available, 1);
        }
        other => panic!("expected CapacityExceeded, got {:?}", other),
    }

    assert_eq!(available_seats(&db, t.id).await, 1);
    assert!(held_seats(&db, t.id).await.is_empty());
}

// Scenario C: a sweep before the grace period elapses leaves the
// booking pending and its seats held.
#[tokio::test]
#[ignore = "requires Postgres via DATABASE_URL"]
async fn sweep_before_grace_period_is_a_noop() {
    let db = connect().await;
    let user_id = make_user(&db).await;
    let t = make_trip(&db, 4).await;

    let b = machine::create_booking(&db, user_id, t.id, &[1, 2], 20_000)
        .await
        .expect("create booking");

    sweeper::sweep(&db, Duration::minutes(15)).await.expect("sweep");

    let b = booking::Entity::find_by_id(b.id)
        .one(&db)
        .await
        .expect("find")
        .expect("booking exists");
    assert_eq!(b.payment_status, PaymentStatus::Pending);
    assert_eq!(available_seats(&db, t.id).await, 2);
    assert_eq!(held_seats(&db, t.id).await, vec![1, 2]);
}

// Scenario D: once the grace period has elapsed the sweep cancels the
// booking and returns its seats.
#[tokio::test]
#[ignore = "requires Postgres via DATABASE_URL"]
async fn sweep_after_grace_period_releases_seats() {
    let db = connect().await;
    let user_id = make_user(&db).await;
    let t = make_trip(&db, 4).await;

    let b = machine::create_booking(&db, user_id, t.id, &[3, 4], 20_000)
        .await
        .expect("create booking");
    assert_eq!(available_seats(&db, t.id).await, 2);

    // Zero grace: the booking is already past its deadline
    let released = sweeper::sweep(&db, Duration::zero()).await.expect("sweep");
    assert!(released >= 1);

    let b = booking::Entity::find_by_id(b.id)
        .one(&db)
        .await
        .expect("find")
        .expect("booking exists");
    assert_eq!(b.payment_status, PaymentStatus::Cancelled);
    assert_eq!(available_seats(&db, t.id).await, 4);
    assert!(held_seats(&db, t.id).await.is_empty());
}

// Scenario E: a completed booking cannot be cancelled.
#[tokio::test]
#[ignore = "requires Postgres via DATABASE_URL"]
async fn completed_booking_is_not_cancellable() {
    let db = connect().await;
    let user_id = make_user(&db).await;
    let t = make_trip(&db, 2).await;

    let b = machine::create_booking(&db, user_id, t.id, &[1], 10_000)
        .await
        .expect("create booking");
    let b = machine::confirm_payment(&db, b.id).await.expect("confirm");
    assert_eq!(b.payment_status, PaymentStatus::Completed);

    let err = machine::cancel(&db, b.id).await.expect_err("cancel must fail");
    assert!(matches!(err, AppError::NotCancellable(_)));

    // Seats stay held, counter untouched
    assert_eq!(available_seats(&db, t.id).await, 1);
    assert_eq!(held_seats(&db, t.id).await, vec![1]);
}

// Cancelling twice releases the seats exactly once.
#[tokio::test]
#[ignore = "requires Postgres via DATABASE_URL"]
async fn release_is_idempotent() {
    let db = connect().await;
    let user_id = make_user(&db).await;
    let t = make_trip(&db, 3).await;

    let b = machine::create_booking(&db, user_id, t.id, &[1, 2], 20_000)
        .await
        .expect("create booking");

    let summary = machine::cancel(&db, b.id).await.expect("first cancel");
    assert_eq!(summary.seats_released, 2);
    assert_eq!(available_seats(&db, t.id).await, 3);

    let err = machine::cancel(&db, b.id).await.expect_err("second cancel");
    assert!(matches!(err, AppError::NotCancellable(_)));
    assert_eq!(available_seats(&db, t.id).await, 3);
}

// A failed payment releases seats through the same path as a cancel.
#[tokio::test]
#[ignore = "requires Postgres via DATABASE_URL"]
async fn failed_payment_releases_seats() {
    let db = connect().await;
    let user_id = make_user(&db).await;
    let t = make_trip(&db, 2).await;

    let b = machine::create_booking(&db, user_id, t.id, &[2], 10_000)
        .await
        .expect("create booking");
    assert_eq!(available_seats(&db, t.id).await, 1);

    let summary = machine::fail_payment(&db, b.id).await.expect("fail payment");
    assert_eq!(summary.seats_released, 1);

    let b = booking::Entity::find_by_id(b.id)
        .one(&db)
        .await
        .expect("find")
        .expect("booking exists");
    assert_eq!(b.payment_status, PaymentStatus::Failed);
    assert_eq!(available_seats(&db, t.id).await, 2);
    assert!(held_seats(&db, t.id).await.is_empty());
}

// available_seats + seats held by pending/completed bookings stays
// equal to capacity through a mix of operations.
#[tokio::test]
#[ignore = "requires Postgres via DATABASE_URL"]
async fn counter_conservation_holds_across_operations() {
    let db = connect().await;
    let user_id = make_user(&db).await;
    let t = make_trip(&db, 4).await;

    let conserved = |avail: i32, held: usize| avail + held as i32 == 4;

    let b1 = machine::create_booking(&db, user_id, t.id, &[1, 2], 20_000)
        .await
        .expect("first booking");
    assert!(conserved(
        available_seats(&db, t.id).await,
        held_seats(&db, t.id).await.len()
    ));

    let b2 = machine::create_booking(&db, user_id, t.id, &[3], 10_000)
        .await
        .expect("second booking");
    machine::confirm_payment(&db, b2.id).await.expect("confirm");
    assert!(conserved(
        available_seats(&db, t.id).await,
        held_seats(&db, t.id).await.len()
    ));

    machine::cancel(&db, b1.id).await.expect("cancel");
    assert!(conserved(
        available_seats(&db, t.id).await,
        held_seats(&db, t.id).await.len()
    ));
    assert_eq!(available_seats(&db, t.id).await, 3);
    assert_eq!(held_seats(&db, t.id).await, vec![3]);
}

// Overlapping but not identical seat requests: the loser is told only
// about the seats actually in contention.
#[tokio::test]
#[ignore = "requires Postgres via DATABASE_URL"]
async fn seat_conflict_names_only_contended_seats() {
    let db = connect().await;
    let user_id = make_user(&db).await;
    let t = make_trip(&db, 6).await;

    machine::create_booking(&db, user_id, t.id, &[1, 2, 3], 30_000)
        .await
        .expect("first booking");

    let err = machine::create_booking(&db, user_id, t.id, &[2, 3, 4], 30_000)
        .await
        .expect_err("overlap must conflict");
    match err {
        AppError::SeatConflict(seats) => assert_eq!(seats, vec![2, 3]),
        other => panic!("expected SeatConflict, got {:?}", other),
    }

    // Nothing from the losing request leaked through
    assert_eq!(available_seats(&db, t.id).await, 3);
    assert_eq!(held_seats(&db, t.id).await, vec![1, 2, 3]);
}

// Bookings against a cancelled trip are rejected before any seat work.
#[tokio::test]
#[ignore = "requires Postgres via DATABASE_URL"]
async fn cancelled_trip_is_unavailable() {
    let db = connect().await;
    let user_id = make_user(&db).await;
    let t = make_trip(&db, 2).await;

    let mut active: trip::ActiveModel = t.clone().into();
    active.status = Set(TripStatus::Cancelled);
    active.update(&db).await.expect("cancel trip");

    let err = machine::create_booking(&db, user_id, t.id, &[1], 10_000)
        .await
        .expect_err("must be unavailable");
    assert!(matches!(err, AppError::TripUnavailable(_)));
    assert_eq!(available_seats(&db, t.id).await, 2);
}
