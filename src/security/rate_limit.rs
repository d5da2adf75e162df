//! Sliding-window rate limiting with a strict tier for the login route.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::config::RateLimitConfig;
use crate::security::clock::{Clock, SystemClock};

/// `(client identifier, route identifier)`.
type WindowKey = (String, String);

/// Counts requests per key over a trailing window.
///
/// Timestamps older than the window are pruned lazily on each check. The
/// DashMap entry guard holds the shard lock for the whole prune-count-append
/// sequence, so concurrent checks on one key never undercount.
#[derive(Debug)]
pub struct SlidingWindowLimiter {
    window: Duration,
    limit: usize,
    history: DashMap<WindowKey, VecDeque<Instant>>,
    clock: Arc<dyn Clock>,
}

impl SlidingWindowLimiter {
    pub fn new(limit: usize, window: Duration) -> Self {
        Self::with_clock(limit, window, Arc::new(SystemClock))
    }

    pub fn with_clock(limit: usize, window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            window,
            limit,
            history: DashMap::new(),
            clock,
        }
    }

    /// Record a request for the key if it is under the limit.
    ///
    /// A rejected attempt is not recorded.
    pub fn allow(&self, client_key: &str, route_key: &str) -> bool {
        let now = self.clock.now();
        let mut entry = self
            .history
            .entry((client_key.to_owned(), route_key.to_owned()))
            .or_default();
        let stamps = entry.value_mut();

        while let Some(&oldest) = stamps.front() {
            if now.duration_since(oldest) >= self.window {
                stamps.pop_front();
            } else {
                break;
            }
        }

        if stamps.len() >= self.limit {
            return false;
        }
        stamps.push_back(now);
        true
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Forget all recorded requests.
    pub fn clear(&self) {
        self.history.clear();
    }
}

/// Which limiter handled a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Auth,
    General,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Auth => "auth",
            Tier::General => "general",
        }
    }
}

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed(Tier),
    Rejected(Tier),
    /// Limiting is switched off in config.
    Bypassed,
}

/// The two-tier limiter owned by the server state.
#[derive(Debug)]
pub struct RateLimiter {
    enabled: bool,
    login_path: String,
    auth: SlidingWindowLimiter,
    general: SlidingWindowLimiter,
}

impl RateLimiter {
    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            enabled: config.enabled,
            login_path: config.login_path.clone(),
            auth: SlidingWindowLimiter::with_clock(config.auth_limit, config.window(), clock.clone()),
            general: SlidingWindowLimiter::with_clock(config.general_limit, config.window(), clock),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Pick the tier for `path` and count the request against it.
    pub fn check(&self, client_key: &str, path: &str) -> Decision {
        if !self.enabled {
            return Decision::Bypassed;
        }

        let (tier, limiter, route_key) = if path.starts_with(&self.login_path) {
            (Tier::Auth, &self.auth, self.login_path.as_str())
        } else {
            (Tier::General, &self.general, route_key(path))
        };

        if limiter.allow(client_key, route_key) {
            Decision::Allowed(tier)
        } else {
            Decision::Rejected(tier)
        }
    }

    pub fn clear(&self) {
        self.auth.clear();
        self.general.clear();
    }
}

/// First path segment, so `/events/1` and `/events/2` share one window.
fn route_key(path: &str) -> &str {
    let trimmed = path.trim_start_matches('/');
    match trimmed.find('/') {
        Some(idx) => &path[..path.len() - trimmed.len() + idx],
        None => path,
    }
}
