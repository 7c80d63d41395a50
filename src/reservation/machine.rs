use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use sea_orm::{
    ActiveEnum, ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, QueryFilter, QuerySelect, Set, TransactionTrait,
};
use serde::Serialize;
use uuid::Uuid;

use crate::entities::booking::{self, PaymentStatus};
use crate::entities::trip::{self, TripStatus};
use crate::entities::seat_assignment;
use crate::error::{AppError, AppResult};
use crate::reservation::ledger;
use crate::utils::reference;

/// Attempts before giving up on finding an unused booking reference.
/// With 36 bits of reference entropy a second collision in a row is
/// already vanishingly unlikely.
const REFERENCE_ATTEMPTS: u32 = 5;

/// Outcome of a cancellation or expiry: which booking was released and
/// how many seats went back to the trip's pool.
#[derive(Debug, Serialize)]
pub struct ReleaseSummary {
    pub booking_id: Uuid,
    pub seats_released: i32,
}

/// Derived expiry view of a booking; no state is touched.
#[derive(Debug, Serialize)]
pub struct TimeoutInfo {
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub time_remaining_seconds: i64,
    pub expired: bool,
}

/// Seat selections must be non-empty, positive and duplicate-free.
pub fn validate_seat_numbers(seat_numbers: &[i32]) -> AppResult<()> {
    if seat_numbers.is_empty() {
        return Err(AppError::Validation(
            "At least one seat must be selected".to_string(),
        ));
    }
    let mut seen = HashSet::new();
    for &n in seat_numbers {
        if n < 1 {
            return Err(AppError::Validation(format!("Invalid seat number: {}", n)));
        }
        if !seen.insert(n) {
            return Err(AppError::Validation(format!("Duplicate seat number: {}", n)));
        }
    }
    Ok(())
}

/// A booking created at `created_at` with grace period `grace` is
/// eligible for expiry once `now >= created_at + grace`.
pub fn booking_timeout(
    created_at: DateTime<Utc>,
    now: DateTime<Utc>,
    grace: Duration,
) -> TimeoutInfo {
    let expires_at = created_at + grace;
    TimeoutInfo {
        created_at,
        expires_at,
        time_remaining_seconds: (expires_at - now).num_seconds().max(0),
        expired: now >= expires_at,
    }
}

/// Create a pending booking holding the requested seats.
///
/// Validates the request, then in one transaction: reserves the seats
/// through the ledger (trip row lock, capacity and conflict checks),
/// inserts the booking with a fresh reference, and inserts one seat
/// assignment per seat. Any failure rolls the whole transaction back;
/// no partial state is ever visible to other transactions.
///
/// `expected_amount` is the fare the client was shown; it must equal
/// `price_per_seat * seats` or the request is rejected before any seat
/// is touched.
pub async fn create_booking(
    db: &DatabaseConnection,
    user_id: Uuid,
    trip_id: Uuid,
    seat_numbers: &[i32],
    expected_amount: i64,
) -> AppResult<booking::Model> {
    validate_seat_numbers(seat_numbers)?;

    let txn = db.begin().await?;
    // Clock read at transaction start; expiry math keys off this.
    let now = Utc::now();

    let trip = trip::Entity::find_by_id(trip_id)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Trip not found".to_string()))?;

    if trip.status != TripStatus::Scheduled {
        return Err(AppError::TripUnavailable(format!(
            "Trip is {}, not open for booking",
            trip.status.to_value()
        )));
    }

    if let Some(&n) = seat_numbers.iter().find(|&&n| n > trip.total_seats) {
        return Err(AppError::Validation(format!(
            "Seat {} does not exist on this bus (1..={})",
            n, trip.total_seats
        )));
    }

    let total_amount = trip.price_per_seat * seat_numbers.len() as i64;
    if expected_amount != total_amount {
        return Err(AppError::Validation(format!(
            "Total amount mismatch: expected {}",
            total_amount
        )));
    }

    // Authoritative capacity and conflict checks under the trip lock
    ledger::reserve(&txn, trip_id, seat_numbers).await?;

    let booking_reference = unique_reference(&txn).await?;
    let booking_id = Uuid::new_v4();
    let new_booking = booking::ActiveModel {
        id: Set(booking_id),
        user_id: Set(user_id),
        trip_id: Set(trip_id),
        booking_reference: Set(booking_reference),
        payment_status: Set(PaymentStatus::Pending),
        total_amount: Set(total_amount),
        created_at: Set(now.into()),
    };
    let booking = new_booking.insert(&txn).await?;

    let assignments: Vec<seat_assignment::ActiveModel> = seat_numbers
        .iter()
        .map(|&seat| seat_assignment::ActiveModel {
            id: Set(Uuid::new_v4()),
            booking_id: Set(booking_id),
            trip_id: Set(trip_id),
            seat_number: Set(seat),
            created_at: Set(now.into()),
        })
        .collect();
    seat_assignment::Entity::insert_many(assignments)
        .exec(&txn)
        .await?;

    txn.commit().await?;

    tracing::info!(
        booking_id = %booking.id,
        reference = %booking.booking_reference,
        trip_id = %trip_id,
        seats = seat_numbers.len(),
        "booking created"
    );

    Ok(booking)
}

/// pending -> completed. No ledger effect: the seats were decremented
/// at creation and stay held.
pub async fn confirm_payment(
    db: &DatabaseConnection,
    booking_id: Uuid,
) -> AppResult<booking::Model> {
    let txn = db.begin().await?;

    let booking = booking::Entity::find_by_id(booking_id)
        .lock_exclusive()
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

    if booking.payment_status.is_terminal() {
        return Err(AppError::AlreadyTerminal(format!(
            "Booking is already {}",
            booking.payment_status.to_value()
        )));
    }

    let mut active: booking::ActiveModel = booking.into();
    active.payment_status = Set(PaymentStatus::Completed);
    let booking = active.update(&txn).await?;

    txn.commit().await?;

    tracing::info!(booking_id = %booking.id, reference = %booking.booking_reference, "payment confirmed");
    Ok(booking)
}

/// pending -> failed, releasing the held seats through the same path
/// cancellation uses.
pub async fn fail_payment(
    db: &DatabaseConnection,
    booking_id: Uuid,
) -> AppResult<ReleaseSummary> {
    match terminate(db, booking_id, PaymentStatus::Failed).await {
        Err(AppError::NotCancellable(msg)) => Err(AppError::AlreadyTerminal(msg)),
        other => other,
    }
}

/// pending -> cancelled. Deletes the seat assignments, releases the
/// counter and marks the booking in one transaction. Only pending
/// bookings can be cancelled; completed ones fall under a refund
/// policy that lives outside this core.
pub async fn cancel(db: &DatabaseConnection, booking_id: Uuid) -> AppResult<ReleaseSummary> {
    terminate(db, booking_id, PaymentStatus::Cancelled).await
}

/// Shared one-way transition out of pending into a terminal,
/// seat-releasing state. Locks the booking row first, so a concurrent
/// confirm/cancel/expiry on the same booking serializes here and the
/// loser sees a terminal status; the release can never run twice.
async fn terminate(
    db: &DatabaseConnection,
    booking_id: Uuid,
    final_status: PaymentStatus,
) -> AppResult<ReleaseSummary> {
    let txn = db.begin().await?;

    let booking = booking::Entity::find_by_id(booking_id)
        .lock_exclusive()
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

    if booking.payment_status.is_terminal() {
        return Err(AppError::NotCancellable(format!(
            "Booking is already {}",
            booking.payment_status.to_value()
        )));
    }

    let summary = release_booking(&txn, booking, final_status).await?;
    txn.commit().await?;

    Ok(summary)
}

/// The single release path shared by explicit cancellation, payment
/// failure and the expiry sweeper: delete the seat assignments, return
/// their count to the ledger, set the final status.
async fn release_booking(
    txn: &DatabaseTransaction,
    booking: booking::Model,
    final_status: PaymentStatus,
) -> AppResult<ReleaseSummary> {
    let booking_id = booking.id;
    let trip_id = booking.trip_id;

    let seats_released = seat_assignment::Entity::find()
        .filter(seat_assignment::Column::BookingId.eq(booking_id))
        .all(txn)
        .await?
        .len() as i32;

    seat_assignment::Entity::delete_many()
        .filter(seat_assignment::Column::BookingId.eq(booking_id))
        .exec(txn)
        .await?;

    ledger::release(txn, trip_id, seats_released).await?;

    let mut active: booking::ActiveModel = booking.into();
    active.payment_status = Set(final_status.clone());
    active.update(txn).await?;

    tracing::info!(
        booking_id = %booking_id,
        trip_id = %trip_id,
        seats = seats_released,
        status = %final_status.to_value(),
        "booking released"
    );

    Ok(ReleaseSummary {
        booking_id,
        seats_released,
    })
}

async fn unique_reference(txn: &DatabaseTransaction) -> AppResult<String> {
    for _ in 0..REFERENCE_ATTEMPTS {
        let candidate = reference::booking_reference();
        let exists = booking::Entity::find()
            .filter(booking::Column::BookingReference.eq(&candidate))
            .one(txn)
            .await?;
        if exists.is_none() {
            return Ok(candidate);
        }
        tracing::warn!(reference = %candidate, "booking reference collision, retrying");
    }
    Err(AppError::Internal(
        "Could not generate a unique booking reference".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_seat_selection_rejected() {
        assert!(matches!(
            validate_seat_numbers(&[]),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_duplicate_seats_rejected() {
        assert!(matches!(
            validate_seat_numbers(&[3, 1, 3]),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_non_positive_seats_rejected() {
        assert!(matches!(
            validate_seat_numbers(&[0]),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            validate_seat_numbers(&[-2]),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_valid_selection_accepted() {
        assert!(validate_seat_numbers(&[1, 2, 14]).is_ok());
    }

    #[test]
    fn test_timeout_before_grace_elapses() {
        // 10 minutes into a 15-minute grace period
        let created = Utc::now();
        let now = created + Duration::minutes(10);
        let info = booking_timeout(created, now, Duration::minutes(15));
        assert!(!info.expired);
        assert_eq!(info.time_remaining_seconds, 5 * 60);
        assert_eq!(info.expires_at, created + Duration::minutes(15));
    }

    #[test]
    fn test_timeout_after_grace_elapses() {
        // 16 minutes into a 15-minute grace period
        let created = Utc::now();
        let now = created + Duration::minutes(16);
        let info = booking_timeout(created, now, Duration::minutes(15));
        assert!(info.expired);
        assert_eq!(info.time_remaining_seconds, 0);
    }

    #[test]
    fn test_timeout_boundary_is_inclusive() {
        // Eligible exactly at created + grace
        let created = Utc::now();
        let now = created + Duration::minutes(15);
        let info = booking_timeout(created, now, Duration::minutes(15));
        assert!(info.expired);
        assert_eq!(info.time_remaining_seconds, 0);
    }
}
