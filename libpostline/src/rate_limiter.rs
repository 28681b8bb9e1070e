//! Fixed-window rate limiting for user-initiated calls
//!
//! Counters live in process memory keyed by `(resource, user)` and are
//! recreated on restart. That is acceptable here: exceeding a limit only
//! delays a user-initiated action. The scheduler's sweep never consults
//! this limiter.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::config::RateLimitConfig;
use crate::error::{PostlineError, Result};

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    reset_at: i64,
}

/// Outcome of a limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: u32,
    pub reset_at: i64,
}

pub struct RateLimiter {
    window_secs: i64,
    default_max: u32,
    limits: HashMap<String, u32>,
    windows: Mutex<HashMap<(String, String), Window>>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            window_secs: config.window_secs,
            default_max: config.default_max,
            limits: config.limits.clone(),
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Limiter with one uniform maximum, for tests and simple setups
    pub fn with_uniform_limit(max: u32, window_secs: i64) -> Self {
        Self {
            window_secs,
            default_max: max,
            limits: HashMap::new(),
            windows: Mutex::new(HashMap::new()),
        }
    }

    fn max_for(&self, resource: &str) -> u32 {
        self.limits.get(resource).copied().unwrap_or(self.default_max)
    }

    /// Check and count one request against the `(resource, user)` window.
    ///
    /// While a window is active and full, the request is denied and
    /// `reset_at` is unchanged; once `reset_at` elapses the window restarts
    /// as if this were the first request. Expired entries for other keys are
    /// purged on every call.
    pub fn check(&self, resource: &str, user_id: &str, now: i64) -> RateLimitDecision {
        let max = self.max_for(resource);
        let mut windows = self.windows.lock().unwrap();

        // Lazy purge; no background thread
        windows.retain(|_, w| w.reset_at > now);

        let key = (resource.to_string(), user_id.to_string());
        let window = windows.entry(key).or_insert(Window {
            count: 0,
            reset_at: now + self.window_secs,
        });

        if window.count >= max {
            return RateLimitDecision {
                allowed: false,
                remaining: 0,
                reset_at: window.reset_at,
            };
        }

        window.count += 1;
        RateLimitDecision {
            allowed: true,
            remaining: max - window.count,
            reset_at: window.reset_at,
        }
    }

    /// Like [`check`](Self::check) but denied requests become an error
    pub fn enforce(&self, resource: &str, user_id: &str, now: i64) -> Result<RateLimitDecision> {
        let decision = self.check(resource, user_id, now);
        if !decision.allowed {
            return Err(PostlineError::RateLimitExceeded {
                resource: resource.to_string(),
                reset_at: decision.reset_at,
            });
        }
        Ok(decision)
    }
}
