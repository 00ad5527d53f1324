//! Per-client request limits for map creation

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

const MINUTE: Duration = Duration::from_secs(60);
const HOUR: Duration = Duration::from_secs(60 * 60);
const DAY: Duration = Duration::from_secs(24 * 60 * 60);

const FORWARDED_FOR: &str = "x-forwarded-for";

/// Requests allowed per client in each window. Zero disables a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimits {
    pub per_minute: u32,
    pub per_hour: u32,
    pub per_day: u32,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            per_minute: 5,
            per_hour: 50,
            per_day: 200,
        }
    }
}

fn quota(window: Duration, max: u32) -> Option<Quota> {
    let max = NonZeroU32::new(max)?;
    Quota::with_period(window / max.get()).map(|quota| quota.allow_burst(max))
}

/// One keyed limiter per window; a request must fit all of them
pub struct ClientRateLimiter {
    windows: Vec<DefaultKeyedRateLimiter<IpAddr>>,
}

impl ClientRateLimiter {
    pub fn new(limits: &RateLimits) -> Self {
        let windows = [
            (MINUTE, limits.per_minute),
            (HOUR, limits.per_hour),
            (DAY, limits.per_day),
        ]
        .into_iter()
        .filter_map(|(window, max)| quota(window, max))
        .map(RateLimiter::keyed)
        .collect();
        Self { windows }
    }

    /// Count one request from `client`, returning false once any window is full
    pub fn check(&self, client: IpAddr) -> bool {
        self.windows
            .iter()
            .all(|limiter| limiter.check_key(&client).is_ok())
    }
}

/// The client address as seen through one trusted proxy hop: the last
/// `X-Forwarded-For` entry when present, otherwise the socket peer.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> IpAddr {
    headers
        .get(FORWARDED_FOR)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.rsplit(',').next())
        .and_then(|last| last.trim().parse().ok())
        .or_else(|| peer.map(|addr| addr.ip()))
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

pub async fn limit_requests(
    State(limiter): State<Arc<ClientRateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client = client_ip(request.headers(), peer);

    if !limiter.check(client) {
        warn!("Rate limit exceeded for {}", client);
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(serde_json::json!({"error": "Too many requests"})),
        )
            .into_response();
    }

    next.run(request).await
}
