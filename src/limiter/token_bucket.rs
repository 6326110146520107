//! Token bucket limiter.

use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use super::keyed::KeyedState;
use super::Limiter;
use crate::config::LimiterConfig;
use crate::error::Result;

/// Per-key token balance and refill bookkeeping.
struct BucketState {
    tokens: u64,
    last_refill: Instant,
}

/// A limiter that holds a per-key token balance, drained per admission and
/// refilled in discrete increments at a fixed cadence.
///
/// A key's bucket starts full on first use. Refills happen lazily at the
/// start of every operation; there is no background work.
pub struct TokenBucketLimiter {
    capacity: u64,
    refill_amount: u64,
    refill_duration: Duration,
    keys: KeyedState<BucketState>,
}

impl TokenBucketLimiter {
    /// Create a new token bucket limiter from a validated configuration.
    pub fn new(config: &LimiterConfig) -> Result<Self> {
        config.validate_bucket()?;
        Ok(Self {
            capacity: config.capacity,
            refill_amount: config.refill_amount,
            refill_duration: config.refill_duration(),
            keys: KeyedState::new(),
        })
    }

    /// The number of keys with tracked state.
    pub fn keys(&self) -> usize {
        self.keys.len()
    }

    /// Apply any whole refill steps that have elapsed since the last refill.
    ///
    /// `last_refill` is intentionally reset to `now` rather than advanced by
    /// exact step multiples, so partial progress toward the next step is
    /// discarded on every refill event.
    fn refill(&self, state: &mut BucketState, now: Instant) {
        let elapsed = now.duration_since(state.last_refill);
        if elapsed >= self.refill_duration {
            let steps = (elapsed.as_nanos() / self.refill_duration.as_nanos()) as u64;
            state.tokens = self
                .capacity
                .min(state.tokens.saturating_add(steps.saturating_mul(self.refill_amount)));
            state.last_refill = now;
        }
    }
}

impl Limiter for TokenBucketLimiter {
    fn allow(&self, key: &str) -> bool {
        let entry = self.keys.entry(key, || BucketState {
            tokens: self.capacity,
            last_refill: Instant::now(),
        });
        let mut state = entry.lock();

        let now = Instant::now();
        self.refill(&mut state, now);

        if state.tokens > 0 {
            state.tokens -= 1;
            trace!(key = %key, tokens = state.tokens, "Admission granted");
            return true;
        }

        debug!(key = %key, "Rate limit exceeded");
        false
    }

    fn wait(&self, key: &str) -> bool {
        let entry = self.keys.entry(key, || BucketState {
            tokens: self.capacity,
            last_refill: Instant::now(),
        });
        let mut state = entry.lock();

        let now = Instant::now();
        self.refill(&mut state, now);

        // A drained bucket implies no refill step fired above, so
        // last_refill predates now by less than one step. Sleeping out the
        // remainder guarantees a refill will have occurred by the time this
        // returns; no token is reserved.
        if state.tokens == 0 {
            let elapsed = now.duration_since(state.last_refill);
            let sleep_time = self.refill_duration.saturating_sub(elapsed);
            debug!(key = %key, sleep_ms = sleep_time.as_millis() as u64, "Waiting for refill");
            thread::sleep(sleep_time);
        }

        true
    }

    fn rate(&self) -> f64 {
        self.refill_amount as f64 / self.refill_duration.as_secs_f64()
    }

    fn token(&self, key: &str) -> u64 {
        let entry = self.keys.entry(key, || BucketState {
            tokens: self.capacity,
            last_refill: Instant::now(),
        });
        let mut state = entry.lock();

        self.refill(&mut state, Instant::now());
        state.tokens
    }
}
