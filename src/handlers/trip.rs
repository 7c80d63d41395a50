use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde::Serialize;
use uuid::Uuid;

use crate::entities::trip::{self, TripStatus};
use crate::entities::{bus, route};
use crate::error::{AppError, AppResult};
use crate::reservation::ledger;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct TripResponse {
    pub id: Uuid,
    pub origin: String,
    pub destination: String,
    pub bus_name: String,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub total_seats: i32,
    pub available_seats: i32,
    pub price_per_seat: i64,
    pub status: TripStatus,
}

#[derive(Debug, Serialize)]
pub struct TripDetailResponse {
    #[serde(flatten)]
    pub trip: TripResponse,
    /// Seats currently held by pending or completed bookings.
    pub occupied_seats: Vec<i32>,
}

fn to_response(t: trip::Model, r: &route::Model, b: &bus::Model) -> TripResponse {
    TripResponse {
        id: t.id,
        origin: r.origin.clone(),
        destination: r.destination.clone(),
        bus_name: b.name.clone(),
        departure_time: t.departure_time.with_timezone(&Utc),
        arrival_time: t.arrival_time.with_timezone(&Utc),
        total_seats: t.total_seats,
        available_seats: t.available_seats,
        price_per_seat: t.price_per_seat,
        status: t.status,
    }
}

/// List upcoming scheduled trips
pub async fn list_trips(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<TripResponse>>> {
    let now = Utc::now();
    let trips = trip::Entity::find()
        .filter(trip::Column::Status.eq(TripStatus::Scheduled))
        .all(&state.db)
        .await?;
    let routes = route::Entity::find().all(&state.db).await?;
    let buses = bus::Entity::find().all(&state.db).await?;

    let responses: Vec<TripResponse> = trips
        .into_iter()
        .filter(|t| t.departure_time.with_timezone(&Utc) >= now)
        .filter_map(|t| {
            let r = routes.iter().find(|r| r.id == t.route_id)?;
            let b = buses.iter().find(|b| b.id == t.bus_id)?;
            Some(to_response(t, r, b))
        })
        .collect();

    Ok(Json(responses))
}

/// Trip details with the currently occupied seat numbers, so a client
/// can render the seat map before booking
pub async fn get_trip(
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
) -> AppResult<Json<TripDetailResponse>> {
    let trip = trip::Entity::find_by_id(trip_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Trip not found".to_string()))?;

    let route = route::Entity::find_by_id(trip.route_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::Internal("Route not found for trip".to_string()))?;
    let bus = bus::Entity::find_by_id(trip.bus_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::Internal("Bus not found for trip".to_string()))?;

    let occupied_seats = ledger::occupied_seats(&state.db, trip_id).await?;

    Ok(Json(TripDetailResponse {
        trip: to_response(trip, &route, &bus),
        occupied_seats,
    }))
}
