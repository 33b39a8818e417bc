//! Router setup and configuration.

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::api::handlers::{generate, health};
use crate::api::state::AppState;

/// Create the main application router.
pub fn create_router(state: AppState) -> Router {
    // Health and metrics routes
    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/metrics", get(health::metrics));

    // Allocation routes
    let api_routes = Router::new()
        .route("/generate", post(generate::generate))
        .route("/sequences", get(generate::list_sequences));

    Router::new()
        .merge(health_routes)
        .nest("/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
