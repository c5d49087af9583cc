//! HTTP server for registration intake.
//!
//! This module provides the Axum-based HTTP surface:
//! - Application state shared by handlers
//! - Liveness and health endpoints
//! - Registration and webhook endpoints
//! - Router configuration

pub mod error;
pub mod handlers;
pub mod health;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::build_router;
pub use state::AppState;
