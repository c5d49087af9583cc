//! Router configuration.

use super::handlers;
use super::health::{health_check, root};
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Build the complete Axum router.
///
/// CORS is fully permissive: the registration form is served from a
/// different origin.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/register", post(handlers::register))
        .route("/webhook", post(handlers::webhook))
        .with_state(state)
        .layer(CorsLayer::very_permissive())
        .layer(TraceLayer::new_for_http())
}
