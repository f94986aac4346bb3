use axum::extract::State;
use axum::{http::Method, response::Json, routing::get, Router};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

mod config;
mod database;
mod errors;
mod handlers;
mod middleware;
mod models;
mod routes;
mod services;
mod state;

use database::connection::get_db_client;
use database::indexes::ensure_indexes;
use state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let db = get_db_client().await;

    if let Err(e) = ensure_indexes(&db).await {
        tracing::error!("❌ Failed to ensure indexes: {}", e);
        panic!("Failed to ensure indexes: {}", e);
    }

    let app_state = initialize_app_state(db).await;

    let app = build_router(app_state).await;
    start_server(app).await;
}

async fn initialize_app_state(db: mongodb::Database) -> AppState {
    tracing::info!("🔧 Loading app config...");

    let config = config::AppConfig::from_env();
    tracing::info!("✅ App config loaded successfully");
    tracing::info!("🌐 Environment: {}", config.environment);

    let mut app_state = AppState::new(db, config.clone());

    tracing::info!("🔧 Attempting to initialize Razorpay service...");

    if config.razorpay_key_id.is_empty() || config.razorpay_key_secret.is_empty() {
        tracing::warn!("Razorpay credentials missing, online payments will be disabled");
    } else {
        let razorpay_service = Arc::new(services::razorpay_service::RazorpayService::new(config));
        app_state = app_state.with_razorpay(razorpay_service);
        tracing::info!("✅ Razorpay service initialized and ready");
    }

    app_state
}

async fn build_router(app_state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any)
        .allow_credentials(false);

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_check))
        .route("/api/health", get(api_health_check))
        .nest("/api/auth", routes::auth::routes())
        .nest("/api/rooms", routes::rooms::routes())
        .nest("/api/bookings", routes::bookings::routes())
        .nest("/api/payments", routes::payments::routes())
        .nest("/api/owner", routes::payments::owner_routes())
        .nest("/api/room-sharing", routes::room_sharing::routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

async fn start_server(app: Router) {
    let port = std::env::var("PORT").unwrap_or_else(|_| "8000".to_string());
    let addr = SocketAddr::from(([0, 0, 0, 0], port.parse().unwrap_or(8000)));

    tracing::info!("🚀 Server starting on {}", addr);

    match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => {
            axum::serve(listener, app).await.unwrap();
        }
        Err(e) => {
            tracing::error!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    }
}

async fn root_handler() -> &'static str {
    "🏠 UniStay Student Housing API"
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn api_health_check(State(state): State<AppState>) -> Json<Value> {
    use mongodb::bson::doc;

    let db_status = match state.db.run_command(doc! {"ping": 1}).await {
        Ok(_) => "connected",
        Err(_) => "disconnected",
    };

    Json(json!({
        "status": "healthy",
        "database": db_status,
        "razorpay": state.razorpay_service.is_some(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
