use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseTransaction, EntityTrait, QueryFilter,
    QuerySelect, Set,
};
use uuid::Uuid;

use crate::entities::booking::{self, PaymentStatus};
use crate::entities::{seat_assignment, trip};
use crate::error::{AppError, AppResult};

/// Reserve seats on a trip. Must run inside the caller's transaction:
/// the trip row is locked `FOR UPDATE`, so concurrent reservations on
/// the same trip block here until the first transaction commits or
/// rolls back.
///
/// Checks, in order, under the lock:
/// - enough `available_seats` for the request, else `CapacityExceeded`
/// - none of the requested seats is held by a pending or completed
///   booking, else `SeatConflict` naming the offending seats
///
/// then decrements the counter and returns the updated trip. On error
/// the caller's rollback leaves the counter untouched.
pub async fn reserve(
    txn: &DatabaseTransaction,
    trip_id: Uuid,
    seat_numbers: &[i32],
) -> AppResult<trip::Model> {
    let trip = trip::Entity::find_by_id(trip_id)
        .lock_exclusive()
        .one(txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Trip not found".to_string()))?;

    let requested = seat_numbers.len() as i32;
    if trip.available_seats < requested {
        return Err(AppError::CapacityExceeded {
            requested,
            available: trip.available_seats,
        });
    }

    let mut taken: Vec<i32> = seat_assignment::Entity::find()
        .filter(seat_assignment::Column::TripId.eq(trip_id))
        .filter(seat_assignment::Column::SeatNumber.is_in(seat_numbers.iter().copied()))
        .inner_join(booking::Entity)
        .filter(booking::Column::PaymentStatus.is_in(PaymentStatus::holding()))
        .all(txn)
        .await?
        .into_iter()
        .map(|a| a.seat_number)
        .collect();

    if !taken.is_empty() {
        taken.sort_unstable();
        taken.dedup();
        return Err(AppError::SeatConflict(taken));
    }

    let remaining = trip.available_seats - requested;
    let mut active: trip::ActiveModel = trip.into();
    active.available_seats = Set(remaining);
    Ok(active.update(txn).await?)
}

/// Return seats to a trip's counter, capped at `total_seats` so a
/// double release can never push availability past capacity. The
/// caller deletes the seat-assignment rows in the same transaction.
pub async fn release(
    txn: &DatabaseTransaction,
    trip_id: Uuid,
    seat_count: i32,
) -> AppResult<i32> {
    let trip = trip::Entity::find_by_id(trip_id)
        .lock_exclusive()
        .one(txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Trip not found".to_string()))?;

    let restored = (trip.available_seats + seat_count).min(trip.total_seats);
    let mut active: trip::ActiveModel = trip.into();
    active.available_seats = Set(restored);
    active.update(txn).await?;

    Ok(restored)
}

/// Seat numbers currently held on a trip by pending or completed
/// bookings, sorted. Read-only, usable outside a transaction.
pub async fn occupied_seats<C: ConnectionTrait>(db: &C, trip_id: Uuid) -> AppResult<Vec<i32>> {
    let mut seats: Vec<i32> = seat_assignment::Entity::find()
        .filter(seat_assignment::Column::TripId.eq(trip_id))
        .inner_join(booking::Entity)
        .filter(booking::Column::PaymentStatus.is_in(PaymentStatus::holding()))
        .all(db)
        .await?
        .into_iter()
        .map(|a| a.seat_number)
        .collect();
    seats.sort_unstable();
    Ok(seats)
}
