//! Per-client request ceiling for the generation endpoints.
//!
//! The limiter is keyed on the connecting peer address. Request headers are
//! client-controlled and only name the conversation (see [`client_key`]).

use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{clock::DefaultClock, state::keyed::DefaultKeyedStateStore, Quota, RateLimiter};

use crate::server::error::ApiError;

/// Header clients may send to identify a conversation.
pub const SESSION_HEADER: &str = "x-session-id";

/// How often idle limiter keys are dropped by [`spawn_pruning`].
pub const DEFAULT_PRUNE_INTERVAL: Duration = Duration::from_secs(60);

pub type SharedRateLimiter = Arc<RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>>;

/// A keyed limiter allowing `per_minute` requests per client per minute.
pub fn create_limiter(per_minute: u32) -> SharedRateLimiter {
    let per_minute = NonZeroU32::new(per_minute).unwrap_or(NonZeroU32::MIN);
    Arc::new(RateLimiter::keyed(Quota::per_minute(per_minute)))
}

/// Limiter key for a connection: the peer IP.
pub fn peer_key(peer: Option<SocketAddr>) -> String {
    match peer {
        Some(addr) => format!("ip:{}", addr.ip()),
        None => "unknown".to_string(),
    }
}

/// Conversation key for off-topic tracking: session header, then bearer
/// token, then the first forwarded address, then the peer address.
pub fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let header_value = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };
    if let Some(session) = header_value(SESSION_HEADER) {
        return format!("session:{session}");
    }
    if let Some(token) = header_value(header::AUTHORIZATION.as_str()).and_then(|v| v.strip_prefix("Bearer ")) {
        return format!("token:{}", token.trim());
    }
    if let Some(forwarded) = header_value("x-forwarded-for").and_then(|v| v.split(',').next()) {
        return format!("ip:{}", forwarded.trim());
    }
    match peer {
        Some(addr) => format!("ip:{}", addr.ip()),
        None => "anonymous".to_string(),
    }
}

/// Drop keys whose quota has fully replenished.
pub fn prune(limiter: &SharedRateLimiter) {
    limiter.retain_recent();
    limiter.shrink_to_fit();
    log::debug!("Rate limiter tracking {} client(s)", limiter.len());
}

/// Prune `limiter` every `period` for the life of the process.
pub fn spawn_pruning(limiter: SharedRateLimiter, period: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            prune(&limiter);
        }
    })
}

pub async fn rate_limit_middleware(
    State(limiter): State<SharedRateLimiter>,
    request: Request,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let key = peer_key(peer);
    match limiter.check_key(&key) {
        Ok(_) => next.run(request).await,
        Err(_) => {
            log::warn!("Rate limit exceeded for {key}");
            ApiError::RateLimited.into_response()
        }
    }
}
