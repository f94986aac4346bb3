use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use crate::handlers::bookings;
use crate::middleware::auth::auth_middleware;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(bookings::create_booking))
        .route("/", get(bookings::list_bookings))
        .route("/:id/decision", patch(bookings::decide_booking))
        .route_layer(middleware::from_fn(auth_middleware))
}
