use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::booking::{self, PaymentStatus};
use crate::entities::seat_assignment;
use crate::entities::user::UserRole;
use crate::error::{AppError, AppResult};
use crate::reservation::machine::{self, ReleaseSummary, TimeoutInfo};
use crate::utils::jwt::Claims;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub trip_id: Uuid,
    pub seat_numbers: Vec<i32>,
    /// The fare the client was shown; rejected if it disagrees with
    /// the trip's current price.
    pub total_amount: i64,
}

#[derive(Debug, Serialize)]
pub struct BookingResponse {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub booking_reference: String,
    pub payment_status: PaymentStatus,
    pub seat_numbers: Vec<i32>,
    pub total_amount: i64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentOutcome {
    Completed,
    Failed,
}

#[derive(Debug, Deserialize)]
pub struct PaymentRequest {
    pub outcome: PaymentOutcome,
}

fn to_response(b: booking::Model, seat_numbers: Vec<i32>, grace: chrono::Duration) -> BookingResponse {
    let created_at = b.created_at.with_timezone(&Utc);
    BookingResponse {
        id: b.id,
        trip_id: b.trip_id,
        booking_reference: b.booking_reference,
        payment_status: b.payment_status,
        seat_numbers,
        total_amount: b.total_amount,
        created_at,
        expires_at: created_at + grace,
    }
}

/// Owner may act on their own booking; admins on any.
fn authorize(claims: &Claims, booking: &booking::Model) -> AppResult<()> {
    if booking.user_id != claims.sub && claims.role != UserRole::Admin {
        return Err(AppError::Forbidden(
            "You can only manage your own bookings".to_string(),
        ));
    }
    Ok(())
}

async fn find_booking(state: &AppState, booking_id: Uuid) -> AppResult<booking::Model> {
    booking::Entity::find_by_id(booking_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))
}

/// Reserve seats on a trip. The booking starts pending and its seats
/// are released automatically if payment does not arrive within the
/// grace period.
pub async fn create_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateBookingRequest>,
) -> AppResult<(StatusCode, Json<BookingResponse>)> {
    let booking = machine::create_booking(
        &state.db,
        claims.sub,
        payload.trip_id,
        &payload.seat_numbers,
        payload.total_amount,
    )
    .await?;

    let mut seats = payload.seat_numbers;
    seats.sort_unstable();

    Ok((
        StatusCode::CREATED,
        Json(to_response(booking, seats, state.config.grace_period())),
    ))
}

/// List the caller's bookings, newest first
pub async fn my_bookings(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<Vec<BookingResponse>>> {
    let bookings = booking::Entity::find()
        .filter(booking::Column::UserId.eq(claims.sub))
        .order_by_desc(booking::Column::CreatedAt)
        .all(&state.db)
        .await?;

    let ids: Vec<Uuid> = bookings.iter().map(|b| b.id).collect();
    let assignments = seat_assignment::Entity::find()
        .filter(seat_assignment::Column::BookingId.is_in(ids))
        .all(&state.db)
        .await?;

    let grace = state.config.grace_period();
    let responses: Vec<BookingResponse> = bookings
        .into_iter()
        .map(|b| {
            let mut seats: Vec<i32> = assignments
                .iter()
                .filter(|a| a.booking_id == b.id)
                .map(|a| a.seat_number)
                .collect();
            seats.sort_unstable();
            to_response(b, seats, grace)
        })
        .collect();

    Ok(Json(responses))
}

/// How long the caller has left to pay. Purely derived; nothing is
/// mutated even for bookings past their grace period.
pub async fn booking_timeout(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(booking_id): Path<Uuid>,
) -> AppResult<Json<TimeoutInfo>> {
    let booking = find_booking(&state, booking_id).await?;
    authorize(&claims, &booking)?;

    let info = machine::booking_timeout(
        booking.created_at.with_timezone(&Utc),
        Utc::now(),
        state.config.grace_period(),
    );

    Ok(Json(info))
}

/// Cancel a pending booking and release its seats
pub async fn cancel_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(booking_id): Path<Uuid>,
) -> AppResult<Json<ReleaseSummary>> {
    let booking = find_booking(&state, booking_id).await?;
    authorize(&claims, &booking)?;

    let summary = machine::cancel(&state.db, booking_id).await?;
    Ok(Json(summary))
}

/// Record the payment gateway's verdict for a pending booking. A
/// completed payment keeps the seats; a failed one releases them the
/// same way a cancellation would.
pub async fn update_payment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(booking_id): Path<Uuid>,
    Json(payload): Json<PaymentRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let booking = find_booking(&state, booking_id).await?;
    authorize(&claims, &booking)?;

    match payload.outcome {
        PaymentOutcome::Completed => {
            let booking = machine::confirm_payment(&state.db, booking_id).await?;
            Ok(Json(serde_json::json!({
                "booking_id": booking.id,
                "booking_reference": booking.booking_reference,
                "payment_status": booking.payment_status,
            })))
        }
        PaymentOutcome::Failed => {
            let summary = machine::fail_payment(&state.db, booking_id).await?;
            Ok(Json(serde_json::json!({
                "booking_id": summary.booking_id,
                "payment_status": PaymentStatus::Failed,
                "seats_released": summary.seats_released,
            })))
        }
    }
}
