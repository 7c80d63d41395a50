use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use crate::handlers::{admin, auth, booking, trip};
use crate::middleware::auth::{auth_middleware, require_admin};
use crate::middleware::rate_limit::create_public_governor;
use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    // IP-based governor for unauthenticated routes
    let public_governor = create_public_governor();

    // Public routes
    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .layer(public_governor.clone());

    let trip_routes = Router::new()
        .route("/trips", get(trip::list_trips))
        .route("/trips/{id}", get(trip::get_trip))
        .layer(public_governor);

    // Booking routes (any authenticated user; ownership is checked per
    // booking in the handlers)
    let booking_routes = Router::new()
        .route("/", post(booking::create_booking))
        .route("/", get(booking::my_bookings))
        .route("/{id}/timeout", get(booking::booking_timeout))
        .route("/{id}/cancel", patch(booking::cancel_booking))
        .route("/{id}/payment", patch(booking::update_payment))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Admin routes (requires auth + admin role)
    let admin_routes = Router::new()
        .route("/buses", post(admin::create_bus))
        .route("/routes", post(admin::create_route))
        .route("/trips", post(admin::create_trip))
        .route("/trips/{id}/status", patch(admin::update_trip_status))
        .route("/bookings", get(admin::list_all_bookings))
        .layer(middleware::from_fn(require_admin))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api", trip_routes)
        .nest("/api/bookings", booking_routes)
        .nest("/api/admin", admin_routes)
        .with_state(state)
}
