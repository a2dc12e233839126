//! # Feature: Rate Limiting
//!
//! Sliding-window limit on interactions per Discord user. Button clicks and
//! form submits count alike; over the limit the interaction is answered with
//! a notice and dropped.
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 2.0.0: Keyed by user id only, retry hint for the notice
//! - 1.0.0: Initial release with per-user sliding window rate limiting

use dashmap::DashMap;
use std::time::{Duration, Instant};

/// Interactions allowed per window
pub const DEFAULT_MAX_REQUESTS: usize = 20;
/// Window length
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(10);

pub struct RateLimiter {
    requests: DashMap<u64, Vec<Instant>>,
    max_requests: usize,
    time_window: Duration,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW)
    }
}

impl RateLimiter {
    pub fn new(max_requests: usize, time_window: Duration) -> Self {
        RateLimiter {
            requests: DashMap::new(),
            max_requests,
            time_window,
        }
    }

    /// Record an interaction; false when the user is over the limit
    pub fn check(&self, user_id: u64) -> bool {
        let now = Instant::now();
        let mut entry = self.requests.entry(user_id).or_default();

        entry.retain(|&time| now.duration_since(time) < self.time_window);

        if entry.len() >= self.max_requests {
            false
        } else {
            entry.push(now);
            true
        }
    }

    /// Time until the oldest interaction in the window expires
    pub fn retry_after(&self, user_id: u64) -> Duration {
        self.requests
            .get(&user_id)
            .and_then(|entry| entry.first().copied())
            .map(|oldest| self.time_window.saturating_sub(oldest.elapsed()))
            .unwrap_or(Duration::ZERO)
    }

    /// Drop users with no interaction inside the window
    pub fn prune(&self) {
        let now = Instant::now();
        self.requests.retain(|_, times| {
            times.retain(|&time| now.duration_since(time) < self.time_window);
            !times.is_empty()
        });
    }

    pub fn tracked_users(&self) -> usize {
        self.requests.len()
    }
}
