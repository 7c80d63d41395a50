use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, EntityTrait, QueryOrder, Set};
use serde::Deserialize;
use uuid::Uuid;

use crate::entities::trip::{self, TripStatus};
use crate::entities::{booking, bus, route};
use crate::error::{AppError, AppResult};
use crate::utils::pricing;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateBusRequest {
    pub name: String,
    pub seat_count: i32,
    pub rate_per_km: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateRouteRequest {
    pub origin: String,
    pub destination: String,
    pub distance_km: f64,
}

#[derive(Debug, Deserialize)]
pub struct CreateTripRequest {
    pub route_id: Uuid,
    pub bus_id: Uuid,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTripStatusRequest {
    pub status: TripStatus,
}

/// Register a bus in the fleet
pub async fn create_bus(
    State(state): State<AppState>,
    Json(payload): Json<CreateBusRequest>,
) -> AppResult<(StatusCode, Json<bus::Model>)> {
    if payload.seat_count < 1 {
        return Err(AppError::Validation(
            "A bus must have at least one seat".to_string(),
        ));
    }
    if payload.rate_per_km < 0 {
        return Err(AppError::Validation(
            "Rate per km cannot be negative".to_string(),
        ));
    }

    let new_bus = bus::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(payload.name),
        seat_count: Set(payload.seat_count),
        rate_per_km: Set(payload.rate_per_km),
        ..Default::default()
    };

    let bus = new_bus.insert(&state.db).await?;
    Ok((StatusCode::CREATED, Json(bus)))
}

/// Register a route
pub async fn create_route(
    State(state): State<AppState>,
    Json(payload): Json<CreateRouteRequest>,
) -> AppResult<(StatusCode, Json<route::Model>)> {
    if payload.distance_km <= 0.0 {
        return Err(AppError::Validation(
            "Route distance must be positive".to_string(),
        ));
    }

    let new_route = route::ActiveModel {
        id: Set(Uuid::new_v4()),
        origin: Set(payload.origin),
        destination: Set(payload.destination),
        distance_km: Set(payload.distance_km),
        ..Default::default()
    };

    let route = new_route.insert(&state.db).await?;
    Ok((StatusCode::CREATED, Json(route)))
}

/// Schedule a trip. Capacity comes from the bus; the per-seat fare is
/// derived from the route distance and the bus rate.
pub async fn create_trip(
    State(state): State<AppState>,
    Json(payload): Json<CreateTripRequest>,
) -> AppResult<(StatusCode, Json<trip::Model>)> {
    if payload.arrival_time <= payload.departure_time {
        return Err(AppError::Validation(
            "Arrival must be after departure".to_string(),
        ));
    }
    if payload.departure_time < Utc::now() {
        return Err(AppError::Validation(
            "Cannot schedule a trip in the past".to_string(),
        ));
    }

    let route = route::Entity::find_by_id(payload.route_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Route not found".to_string()))?;
    let bus = bus::Entity::find_by_id(payload.bus_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Bus not found".to_string()))?;

    let new_trip = trip::ActiveModel {
        id: Set(Uuid::new_v4()),
        route_id: Set(route.id),
        bus_id: Set(bus.id),
        departure_time: Set(payload.departure_time.into()),
        arrival_time: Set(payload.arrival_time.into()),
        total_seats: Set(bus.seat_count),
        available_seats: Set(bus.seat_count),
        price_per_seat: Set(pricing::trip_price(route.distance_km, bus.rate_per_km)),
        status: Set(TripStatus::Scheduled),
        ..Default::default()
    };

    let trip = new_trip.insert(&state.db).await?;
    Ok((StatusCode::CREATED, Json(trip)))
}

/// Move a trip out of the scheduled state. New bookings against it are
/// rejected as unavailable; existing pending bookings still expire via
/// the sweeper.
pub async fn update_trip_status(
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
    Json(payload): Json<UpdateTripStatusRequest>,
) -> AppResult<Json<trip::Model>> {
    let trip = trip::Entity::find_by_id(trip_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Trip not found".to_string()))?;

    let mut active: trip::ActiveModel = trip.into();
    active.status = Set(payload.status);
    let trip = active.update(&state.db).await?;

    Ok(Json(trip))
}

/// All bookings, newest first
pub async fn list_all_bookings(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<booking::Model>>> {
    let bookings = booking::Entity::find()
        .order_by_desc(booking::Column::CreatedAt)
        .all(&state.db)
        .await?;

    Ok(Json(bookings))
}
