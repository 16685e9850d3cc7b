use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::handlers::{self, AppState};

/// Create the main application router with all API endpoints
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Upload submission
        .route("/api/upload", post(handlers::upload))
        // Query endpoints
        .route("/api/holdings", get(handlers::get_holdings))
        .route("/api/transactions", get(handlers::get_transactions))
        // Add shared state
        .with_state(state)
        // Add middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
