//! Per-IP rate limiting for the OAuth callback, using governor.

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use governor::{
    clock::{Clock, DefaultClock},
    middleware::NoOpMiddleware,
    state::keyed::DashMapStateStore,
    Quota, RateLimiter,
};
use serde::Serialize;
use slotwise_config::RateLimitSettings;
use std::{net::IpAddr, net::SocketAddr, num::NonZeroU32, sync::Arc, time::Duration};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub type KeyedRateLimiter =
    RateLimiter<IpAddr, DashMapStateStore<IpAddr>, DefaultClock, NoOpMiddleware>;

/// Limiter shared by the rate-limited routes; `limiter` is `None` when disabled.
#[derive(Clone)]
pub struct RateLimitState {
    limiter: Option<Arc<KeyedRateLimiter>>,
    requests_per_window: u32,
}

impl RateLimitState {
    pub fn from_settings(settings: &RateLimitSettings) -> Self {
        Self {
            limiter: create_limiter(settings),
            requests_per_window: settings.requests_per_window,
        }
    }

    pub fn disabled() -> Self {
        Self {
            limiter: None,
            requests_per_window: 0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.limiter.is_some()
    }

    /// Drops per-IP entries whose budget has fully replenished.
    pub fn purge_idle(&self) {
        if let Some(limiter) = self.limiter.as_ref() {
            limiter.retain_recent();
            limiter.shrink_to_fit();
        }
    }

    pub fn tracked_clients(&self) -> usize {
        self.limiter.as_ref().map_or(0, |limiter| limiter.len())
    }

    /// Purges idle entries every `every` until the runtime shuts down.
    pub fn spawn_cleanup(&self, every: Duration) -> Option<JoinHandle<()>> {
        self.limiter.as_ref()?;
        let state = self.clone();
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                state.purge_idle();
                debug!(clients = state.tracked_clients(), "Rate limiter purged");
            }
        }))
    }
}

/// `None` when disabled or when the settings describe no usable quota.
pub fn create_limiter(settings: &RateLimitSettings) -> Option<Arc<KeyedRateLimiter>> {
    if !settings.enabled || settings.requests_per_window == 0 {
        return None;
    }
    // e.g. 10 requests / 60 s = one token every 6 s
    let replenish_interval_ns =
        (u128::from(settings.window_secs) * 1_000_000_000) / u128::from(settings.requests_per_window);
    let replenish_interval = Duration::from_nanos(replenish_interval_ns.max(1) as u64);
    let burst = NonZeroU32::new(settings.burst_size.max(1))?;
    let quota = Quota::with_period(replenish_interval)?.allow_burst(burst);
    Some(Arc::new(RateLimiter::dashmap(quota)))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitExceeded {
    pub error: String,
    pub retry_after_secs: u64,
}

impl IntoResponse for RateLimitExceeded {
    fn into_response(self) -> Response {
        let retry_after = HeaderValue::from(self.retry_after_secs);
        let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(self)).into_response();
        response.headers_mut().insert("Retry-After", retry_after);
        response
    }
}

fn client_ip(request: &Request) -> IpAddr {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip())
        .unwrap_or(IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED))
}

pub async fn rate_limit_middleware(
    State(state): State<RateLimitState>,
    request: Request,
    next: Next,
) -> Result<Response, RateLimitExceeded> {
    let Some(limiter) = state.limiter.as_ref() else {
        return Ok(next.run(request).await);
    };
    let ip = client_ip(&request);

    match limiter.check_key(&ip) {
        Ok(_) => {
            let mut response = next.run(request).await;
            response.headers_mut().insert(
                "X-RateLimit-Limit",
                HeaderValue::from(state.requests_per_window),
            );
            Ok(response)
        }
        Err(not_until) => {
            let retry_after = not_until
                .wait_time_from(DefaultClock::default().now())
                .as_secs()
                .max(1);
            warn!(ip = %ip, retry_after_secs = retry_after, "Rate limit exceeded");
            metrics::counter!("slotwise_rate_limited_total").increment(1);
            Err(RateLimitExceeded {
                error: "Too many requests".to_string(),
                retry_after_secs: retry_after,
            })
        }
    }
}
