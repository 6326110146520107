//! Fixed window counter limiter.

use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use super::keyed::KeyedState;
use super::Limiter;
use crate::config::LimiterConfig;
use crate::error::Result;

/// Per-key admission count within the current window.
struct WindowState {
    count: u64,
    window_start: Instant,
}

/// A limiter that counts admissions in a rolling-start time bucket of fixed
/// duration.
///
/// The window start is aligned to the first call that observes an expired
/// (or unseen) window, not to wall-clock boundaries. When the window expires
/// the count is hard-reset synchronously with the triggering call.
pub struct FixedWindowLimiter {
    limit: u64,
    window: Duration,
    keys: KeyedState<WindowState>,
}

impl FixedWindowLimiter {
    /// Create a new fixed window limiter from a validated configuration.
    pub fn new(config: &LimiterConfig) -> Result<Self> {
        config.validate_windowed()?;
        Ok(Self {
            limit: config.limit,
            window: config.window(),
            keys: KeyedState::new(),
        })
    }

    /// The number of keys with tracked state.
    pub fn keys(&self) -> usize {
        self.keys.len()
    }
}

impl Limiter for FixedWindowLimiter {
    fn allow(&self, key: &str) -> bool {
        let entry = self.keys.entry(key, || WindowState {
            count: 0,
            window_start: Instant::now(),
        });
        let mut state = entry.lock();

        let now = Instant::now();
        if now.duration_since(state.window_start) >= self.window {
            state.window_start = now;
            state.count = 0;
        }

        if state.count < self.limit {
            state.count += 1;
            trace!(key = %key, count = state.count, "Admission granted");
            return true;
        }

        debug!(key = %key, limit = self.limit, "Rate limit exceeded");
        false
    }

    fn wait(&self, key: &str) -> bool {
        let entry = self.keys.entry(key, || WindowState {
            count: 0,
            window_start: Instant::now(),
        });
        let mut state = entry.lock();

        let now = Instant::now();
        let elapsed = now.duration_since(state.window_start);

        if state.count >= self.limit {
            let sleep_time = self.window.saturating_sub(elapsed);
            debug!(key = %key, sleep_ms = sleep_time.as_millis() as u64, "Waiting for window reset");
            // The key's lock is held across the sleep: a second caller for
            // the same key queues behind this one, other keys are unaffected.
            thread::sleep(sleep_time);

            state.window_start = Instant::now();
            state.count = 0;
        }

        true
    }

    fn rate(&self) -> f64 {
        self.limit as f64 / self.window.as_secs_f64()
    }

    fn token(&self, key: &str) -> u64 {
        let entry = self.keys.entry(key, || WindowState {
            count: 0,
            window_start: Instant::now(),
        });
        let state = entry.lock();

        // Intentionally no expiry check here: this reports admission state
        // as of the last allow() call, so a count left by an elapsed window
        // is still reported until the next allow() resets it.
        self.limit.saturating_sub(state.count)
    }
}
