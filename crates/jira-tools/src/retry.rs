//! Retry/backoff policy for upstream Jira calls.

use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Backoff policy (Temporal-style fields).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the initial attempt (1 => no retries).
    pub maximum_attempts: u32,
    /// Backoff interval in milliseconds before the first retry.
    pub initial_interval_ms: u64,
    /// Backoff multiplier (typically >= 1.0).
    pub backoff_coefficient: f64,
    /// Upper bound on any single delay, including server-requested ones.
    pub maximum_interval_ms: u64,
    /// Relative jitter in `[0, 1]`; 0.1 spreads a delay uniformly over +/-10%.
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            maximum_attempts: 3,
            initial_interval_ms: 500,
            backoff_coefficient: 2.0,
            maximum_interval_ms: 30_000,
            jitter: 0.1,
        }
    }
}

impl RetryPolicy {
    pub const MAX_ATTEMPTS_LIMIT: u32 = 10;

    /// Check ranges. Returns a human readable reason on failure.
    pub(crate) fn check(&self) -> std::result::Result<(), String> {
        if !(1..=Self::MAX_ATTEMPTS_LIMIT).contains(&self.maximum_attempts) {
            return Err(format!(
                "retry.maximumAttempts must be between 1 and {}, got {}",
                Self::MAX_ATTEMPTS_LIMIT,
                self.maximum_attempts
            ));
        }
        if !self.backoff_coefficient.is_finite() || self.backoff_coefficient < 1.0 {
            return Err(format!(
                "retry.backoffCoefficient must be a finite number >= 1.0, got {}",
                self.backoff_coefficient
            ));
        }
        if !(0.0..=1.0).contains(&self.jitter) {
            return Err(format!("retry.jitter must be within [0, 1], got {}", self.jitter));
        }
        Ok(())
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    ///
    /// Exponential in `attempt`, jittered, then capped at `maximum_interval_ms`.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let exp = attempt.saturating_sub(1).min(30);
        let coeff = self.backoff_coefficient;
        if !coeff.is_finite() || coeff <= 0.0 {
            return Duration::ZERO;
        }
        let mult = coeff.powi(i32::try_from(exp).unwrap_or(30));
        if !mult.is_finite() || mult <= 0.0 {
            return Duration::ZERO;
        }

        let cap = self.maximum_interval_ms as f64;
        let mut ms = (self.initial_interval_ms as f64 * mult).min(cap);
        if self.jitter > 0.0 && self.jitter.is_finite() {
            let delta = ms * self.jitter.min(1.0);
            ms = ms - delta + rand::random::<f64>() * delta * 2.0;
        }
        // `as` saturates; the clamp keeps jitter from pushing past the cap.
        Duration::from_millis(ms.clamp(0.0, cap) as u64)
    }

    /// Combine the computed backoff with a server-provided `Retry-After`.
    #[must_use]
    pub fn delay_with_hint(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let delay = self.delay_for(attempt);
        match retry_after {
            Some(hint) => delay
                .max(hint)
                .min(Duration::from_millis(self.maximum_interval_ms)),
            None => delay,
        }
    }
}

/// Parse `Retry-After` in its delta-seconds form. HTTP-date values are ignored.
#[must_use]
pub fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let raw = headers.get(RETRY_AFTER)?.to_str().ok()?;
    raw.trim().parse::<u64>().ok().map(Duration::from_secs)
}

/// Per-request retry bookkeeping.
#[derive(Debug)]
pub(crate) struct RetryState {
    pub attempt: u32,
    pub started: Instant,
    pub last_error: Option<String>,
}

impl RetryState {
    pub(crate) fn new() -> Self {
        Self {
            attempt: 0,
            started: Instant::now(),
            last_error: None,
        }
    }

    pub(crate) fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub(crate) fn exhausted(&self, policy: &RetryPolicy) -> bool {
        self.attempt >= policy.maximum_attempts
    }

    pub(crate) fn last_error(&self) -> &str {
        self.last_error.as_deref().unwrap_or("no response")
    }
}
