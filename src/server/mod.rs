//! HTTP server exposing the content pipeline, the assistant and account
//! endpoints.
//!
//! # Endpoints
//!
//! - `GET  /health`   : Liveness probe
//! - `POST /chat`     : Routed content generation or chat
//! - `POST /generate` : Content generation
//! - `POST /auth/*`   : Signup, login and logout

pub mod error;
pub mod rate_limit;
pub mod routes;

pub use error::ApiError;
pub use rate_limit::{create_limiter, spawn_pruning, SharedRateLimiter, DEFAULT_PRUNE_INTERVAL};
pub use routes::{app_router, cors_layer, AppState};
