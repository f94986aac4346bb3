use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use crate::handlers::room_sharing;
use crate::middleware::auth::auth_middleware;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    let protected = Router::new()
        .route("/", post(room_sharing::create_post))
        .route("/mine", get(room_sharing::my_posts))
        .route("/:id/applications", get(room_sharing::post_applications))
        .route("/applications", post(room_sharing::apply))
        .route("/applications/mine", get(room_sharing::my_applications))
        .route(
            "/applications/:id",
            patch(room_sharing::review_application).delete(room_sharing::cancel_application),
        )
        .route_layer(middleware::from_fn(auth_middleware));

    Router::new()
        .route("/", get(room_sharing::browse_posts))
        .merge(protected)
}
