//! Rate limiting middleware using Governor.
//!
//! Implements per-collecting-agent rate limiting with a token bucket algorithm.

use axum::{
    Json,
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use std::{collections::HashSet, num::NonZeroU32, sync::Arc, time::Duration};

use biller_types::{BillerResponse, ResponseCode};

/// Header banks use to identify themselves for rate limiting.
pub const COLLECTING_AGENT_HEADER: &str = "X-Collecting-Agent";

/// Bucket shared by callers that send no accepted agent header.
const ANONYMOUS_KEY: &str = "anonymous";

/// Rate limiter state shared across requests.
///
/// Only accepted collecting agents get a bucket of their own; any other
/// header value is throttled through the shared anonymous bucket, so the
/// number of limiters never exceeds the allow-list plus one.
pub struct RateLimiterState {
    /// Per-agent rate limiters
    limiters: DashMap<String, Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>>,
    /// Agents that may key their own bucket
    agents: HashSet<String>,
    /// Default quota for new keys
    quota: Quota,
}

impl RateLimiterState {
    /// Creates a new rate limiter state.
    ///
    /// # Arguments
    /// * `requests` - Number of requests allowed per period (also the burst size)
    /// * `period` - Time period for the quota
    /// * `agents` - Collecting agents that get a dedicated bucket
    pub fn new<I, S>(requests: u32, period: Duration, agents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let burst = NonZeroU32::new(requests).unwrap_or(NonZeroU32::MIN);
        let quota = Quota::with_period(period / burst.get())
            .unwrap_or_else(|| Quota::per_second(burst))
            .allow_burst(burst);

        Self {
            limiters: DashMap::new(),
            agents: agents.into_iter().map(Into::into).collect(),
            quota,
        }
    }

    /// Maps a raw header value to the bucket it is charged against.
    fn bucket_key<'a>(&self, agent: Option<&'a str>) -> &'a str {
        match agent.map(str::trim) {
            Some(agent) if self.agents.contains(agent) => agent,
            _ => ANONYMOUS_KEY,
        }
    }

    /// Checks if a request from `agent` should be rate limited.
    /// Returns true if the request is allowed, false if rate limited.
    pub fn check(&self, agent: Option<&str>) -> bool {
        let key = self.bucket_key(agent);
        let limiter = self
            .limiters
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(RateLimiter::direct(self.quota)));

        limiter.check().is_ok()
    }
}

fn is_exempt(path: &str) -> bool {
    path == "/health" || path.starts_with("/api-docs")
}

/// Rate limiting middleware keyed by the collecting agent header.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiterState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if is_exempt(request.uri().path()) {
        return next.run(request).await;
    }

    let agent = request
        .headers()
        .get(COLLECTING_AGENT_HEADER)
        .and_then(|h| h.to_str().ok());

    if !limiter.check(agent) {
        tracing::warn!(agent = limiter.bucket_key(agent), "Rate limit exceeded");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(BillerResponse::error(
                ResponseCode::RateLimited,
                "Rate limit exceeded. Please try again later.",
            )),
        )
            .into_response();
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(requests: u32) -> RateLimiterState {
        RateLimiterState::new(requests, Duration::from_secs(60), ["BSM", "BNI"])
    }

    #[test]
    fn test_burst_then_limited() {
        let state = state(3);

        assert!(state.check(Some("BSM")));
        assert!(state.check(Some("BSM")));
        assert!(state.check(Some("BSM")));
        assert!(!state.check(Some("BSM")));
    }

    #[test]
    fn test_accepted_agents_are_independent() {
        let state = state(1);

        assert!(state.check(Some("BSM")));
        assert!(!state.check(Some("BSM")));
        assert!(state.check(Some("BNI")));
    }

    #[test]
    fn test_unknown_agents_share_anonymous_bucket() {
        let state = state(1);

        assert!(state.check(Some("BSM-0")));
        for i in 1..100 {
            assert!(!state.check(Some(&format!("BSM-{}", i))));
        }
        assert!(!state.check(None));
        assert!(!state.check(Some("  ")));
        assert_eq!(state.limiters.len(), 1);

        // Accepted agents keep their own quota.
        assert!(state.check(Some(" BSM ")));
    }

    #[test]
    fn test_zero_quota_still_allows_one() {
        let state = state(0);

        assert!(state.check(Some("BSM")));
    }

    #[test]
    fn test_exempt_paths() {
        assert!(is_exempt("/health"));
        assert!(is_exempt("/api-docs/openapi.json"));
        assert!(!is_exempt("/inquiry"));
    }
}
