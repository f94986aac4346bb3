use axum::{
    middleware,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::json;

use crate::handlers::payments;
use crate::middleware::auth::auth_middleware;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    let protected = Router::new()
        .route("/create-order", post(payments::create_order))
        .route("/verify", post(payments::verify_payment))
        .route("/confirm-offline", post(payments::confirm_offline_payment))
        .route("/transactions", get(payments::my_transactions))
        .route_layer(middleware::from_fn(auth_middleware));

    Router::new()
        .route("/health", get(payments_health))
        // Authenticated by the HMAC signature header, not a bearer token
        .route("/webhook", post(payments::webhook))
        .merge(protected)
}

// Owner side of the offline reconciliation, nested under /api/owner
pub fn owner_routes() -> Router<AppState> {
    Router::new()
        .route("/payments/confirm", post(payments::owner_confirm_payment))
        .route("/payments/pending", get(payments::pending_offline_payments))
        .route_layer(middleware::from_fn(auth_middleware))
}

async fn payments_health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "payments",
        "timestamp": Utc::now().to_rfc3339(),
        "features": ["orders", "signature-verify", "webhooks", "offline-reconciliation"]
    }))
}
