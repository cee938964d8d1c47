//! Axum route handlers for the blogcrew HTTP server.
//!
//! # Routes
//!
//! - `GET  /`             : Load banner
//! - `GET  /health`       : Liveness probe with pipeline readiness
//! - `POST /chat`         : Router picks the content pipeline or the assistant
//! - `POST /generate`     : Always runs the content pipeline
//! - `POST /auth/signup`  : Register an account
//! - `POST /auth/login`   : Password login, returns a session
//! - `POST /auth/logout`  : Revoke the bearer token
//!
//! `/chat` and `/generate` are rate limited per peer address.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::auth::{IdentityProvider, LoginRequest};
use crate::chat::{Assistant, QueryRouter, Route};
use crate::pipeline::ContentPipeline;
use crate::server::error::ApiError;
use crate::server::rate_limit::{client_key, rate_limit_middleware, SharedRateLimiter};
use crate::types::api::{BlogRequest, ChatResponse};

/// Shared application state for the HTTP server.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ContentPipeline>,
    pub router: Arc<QueryRouter>,
    pub assistant: Arc<Assistant>,
    pub identity: Arc<dyn IdentityProvider>,
    pub limiter: SharedRateLimiter,
}

/// Build the axum router with all routes.
pub fn app_router(state: AppState) -> Router {
    let limited = Router::new()
        .route("/chat", post(chat_handler))
        .route("/generate", post(generate_handler))
        .route_layer(middleware::from_fn_with_state(
            state.limiter.clone(),
            rate_limit_middleware,
        ));

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/auth/signup", post(signup_handler))
        .route("/auth/login", post(login_handler))
        .route("/auth/logout", post(logout_handler))
        .merge(limited)
        .with_state(state)
}

/// CORS for the configured origins; permissive when none are set.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                log::warn!("Ignoring invalid CORS origin {origin:?}");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn root_handler() -> impl IntoResponse {
    Json(json!({ "message": "Loaded successfully! Visit /health" }))
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": crate::VERSION,
        "service": "blogcrew",
        "pipeline_ready": state.pipeline.is_ready(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

fn validated(payload: Result<Json<BlogRequest>, JsonRejection>) -> Result<BlogRequest, ApiError> {
    let Json(request) = payload?;
    request.validate().map_err(ApiError::BadRequest)?;
    Ok(request)
}

/// POST /chat
async fn chat_handler(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    payload: Result<Json<BlogRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let request = validated(payload)?;

    match state.router.route(&request.topic).await {
        Route::Content => {
            log::info!("Routing request to the content pipeline");
            Ok(Json(state.pipeline.generate(&request).await).into_response())
        }
        Route::Chat => {
            log::info!("Routing request to the assistant");
            let session = client_key(&headers, peer.map(|ConnectInfo(addr)| addr));
            let reply = state
                .assistant
                .reply(&session, request.topic.trim())
                .await
                .map_err(|e| {
                    log::error!("Assistant failed to answer: {e}");
                    ApiError::Unavailable("The assistant is unavailable. Please try again later.".to_string())
                })?;
            Ok(Json(ChatResponse { response: reply.text }).into_response())
        }
    }
}

/// POST /generate
async fn generate_handler(
    State(state): State<AppState>,
    payload: Result<Json<BlogRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let request = validated(payload)?;
    Ok(Json(state.pipeline.generate(&request).await).into_response())
}

/// POST /auth/signup
async fn signup_handler(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    log::info!("Signing up new user: {}", request.email);
    state
        .identity
        .signup(&request)
        .await
        .map_err(|e| ApiError::from_auth(e, "Signup failed."))?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "User signed up successfully." })),
    )
        .into_response())
}

/// POST /auth/login
async fn login_handler(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    let session = state
        .identity
        .login(&request)
        .await
        .map_err(|e| ApiError::from_auth(e, "Authentication failed."))?;
    log::info!("User logged in: {}", session.user_id);
    Ok(Json(session).into_response())
}

/// POST /auth/logout
async fn logout_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("Missing bearer token.".to_string()))?;
    state
        .identity
        .logout(token)
        .await
        .map_err(|e| ApiError::from_auth(e, "Logout failed."))?;
    Ok(Json(json!({ "message": "User logged out successfully." })).into_response())
}
