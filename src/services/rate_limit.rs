//! Request budget tracking and 429 backoff.
//!
//! One limiter instance is shared by every concurrent path of a run.
//! `acquire` blocks until a request fits the rolling quota and never
//! fails; the cumulative-backoff hard ceiling is the caller's to enforce,
//! which is why `acquire` reports how long it waited.

use std::future::Future;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

use crate::client::ResponseMeta;
use crate::error::{AppError, Result};
use crate::models::RateLimitConfig;

/// Enforces the API request budget and exponential 429 backoff.
pub struct RateLimiter {
    config: RateLimitConfig,
    state: Mutex<LimiterState>,
}

#[derive(Debug)]
struct LimiterState {
    /// Requests left in the current window; corrected from live headers
    remaining: f64,
    /// When the window refreshes
    window_reset: Instant,
    /// No request may start before this point (set by `penalize`)
    penalty_until: Option<Instant>,
    /// Current backoff delay; `None` when healthy
    backoff: Option<Duration>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        let state = LimiterState {
            remaining: config.requests_per_window as f64,
            window_reset: Instant::now() + config.window(),
            penalty_until: None,
            backoff: None,
        };
        Self {
            config,
            state: Mutex::new(state),
        }
    }

    /// Block until one request may be issued. Returns the total time
    /// spent waiting so callers can enforce the cumulative ceiling.
    pub async fn acquire(&self) -> Duration {
        let mut waited = Duration::ZERO;
        loop {
            let wait = {
                let mut state = self.state.lock();
                let now = Instant::now();

                if now >= state.window_reset {
                    state.remaining = self.config.requests_per_window as f64;
                    state.window_reset = now + self.config.window();
                }

                if let Some(until) = state.penalty_until {
                    if now < until {
                        Some(until - now)
                    } else {
                        state.penalty_until = None;
                        None
                    }
                } else {
                    None
                }
                .or_else(|| {
                    if state.remaining >= 1.0 {
                        state.remaining -= 1.0;
                        None
                    } else {
                        Some(state.window_reset - now)
                    }
                })
            };

            match wait {
                None => return waited,
                Some(delay) => {
                    tokio::time::sleep(delay).await;
                    waited += delay;
                }
            }
        }
    }

    /// Feed quota signals from the most recent response back in.
    pub fn report(&self, meta: &ResponseMeta) {
        let mut state = self.state.lock();
        if let Some(remaining) = meta.rate_remaining {
            state.remaining = remaining;
        }
        if let Some(reset) = meta.rate_reset {
            state.window_reset = Instant::now() + reset;
        }
    }

    /// Record an explicit rate-limit signal: double the backoff delay up
    /// to the cap (honoring a longer server hint), add jitter, and hold
    /// off all callers until it elapses.
    pub fn penalize(&self, server_hint: Option<Duration>) {
        let mut state = self.state.lock();
        let next = state
            .backoff
            .map(|d| (d * 2).min(self.config.backoff_max()))
            .unwrap_or_else(|| self.config.backoff_initial());
        state.backoff = Some(next);

        let base = match server_hint {
            Some(hint) if hint > next => hint,
            _ => next,
        };
        let jittered = base.mul_f64(1.0 + fastrand::f64() * self.config.backoff_jitter);
        state.penalty_until = Some(Instant::now() + jittered);
    }

    /// One successful call resets the backoff delay to its initial value.
    pub fn settle(&self) {
        self.state.lock().backoff = None;
    }

    /// Cumulative backoff ceiling, per request.
    pub fn hard_ceiling(&self) -> Duration {
        self.config.backoff_ceiling()
    }
}

/// Run one API call under the limiter: acquire budget, invoke, feed the
/// response metadata back, and absorb rate-limit signals by backing off
/// and re-invoking. Gives up with a retryable error once the cumulative
/// wait passes the configured ceiling.
pub async fn call_with_quota<T, F, Fut>(limiter: &RateLimiter, context: &str, op: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<(T, ResponseMeta)>>,
{
    let ceiling = limiter.hard_ceiling();
    let mut waited = Duration::ZERO;

    loop {
        waited += limiter.acquire().await;
        if waited > ceiling {
            return Err(AppError::transient(
                context,
                "cumulative backoff exceeded the configured ceiling",
            ));
        }

        match op().await {
            Ok((value, meta)) => {
                limiter.report(&meta);
                limiter.settle();
                return Ok(value);
            }
            Err(AppError::RateLimited { reset_in }) => {
                log::warn!("rate limited during {context}, backing off");
                limiter.penalize(reset_in);
            }
            Err(err) => return Err(err),
        }
    }
}
