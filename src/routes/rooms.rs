use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::handlers::rooms;
use crate::middleware::auth::auth_middleware;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    let protected = Router::new()
        .route("/", post(rooms::create_room))
        .route("/mine", get(rooms::my_rooms))
        .route_layer(middleware::from_fn(auth_middleware));

    Router::new()
        .route("/", get(rooms::list_rooms))
        .route("/:id", get(rooms::get_room))
        .merge(protected)
}
