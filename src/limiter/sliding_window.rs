//! Sliding window log limiter.

use std::collections::VecDeque;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use super::keyed::KeyedState;
use super::Limiter;
use crate::config::LimiterConfig;
use crate::error::Result;

/// A limiter that retains one timestamp per admitted unit and counts how
/// many fall within a trailing window.
///
/// Every operation prunes expired timestamps before reading or mutating the
/// log, so counts always reflect the trailing window at the instant of the
/// call. The log for one key never holds more than `limit` entries, which
/// bounds the per-call prune cost.
pub struct SlidingWindowLimiter {
    limit: u64,
    window: Duration,
    keys: KeyedState<VecDeque<Instant>>,
}

impl SlidingWindowLimiter {
    /// Create a new sliding window log limiter from a validated configuration.
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

    /// Drop every timestamp at or before `now - window`, retaining the
    /// maximal trailing run strictly newer than the threshold.
    fn prune(&self, samples: &mut VecDeque<Instant>, now: Instant) {
        // None means the process is younger than the window; nothing can
        // have expired yet.
        let Some(threshold) = now.checked_sub(self.window) else {
            return;
        };
        while samples.front().is_some_and(|&t| t <= threshold) {
            samples.pop_front();
        }
    }
}

impl Limiter for SlidingWindowLimiter {
    fn allow(&self, key: &str) -> bool {
        let entry = self.keys.entry(key, VecDeque::new);
        let mut samples = entry.lock();

        let now = Instant::now();
        self.prune(&mut samples, now);

        if (samples.len() as u64) < self.limit {
            samples.push_back(now);
            trace!(key = %key, occupancy = samples.len(), "Admission granted");
            return true;
        }

        debug!(key = %key, limit = self.limit, "Rate limit exceeded");
        false
    }

    fn wait(&self, key: &str) -> bool {
        let entry = self.keys.entry(key, VecDeque::new);
        let mut samples = entry.lock();

        let now = Instant::now();
        self.prune(&mut samples, now);

        // After pruning, any remaining oldest sample expires in the future.
        // Sleeping until that expiry frees exactly one slot, not full
        // capacity.
        if let Some(&oldest) = samples.front() {
            let expiry = oldest + self.window;
            let sleep_time = expiry.saturating_duration_since(now);
            if !sleep_time.is_zero() {
                debug!(key = %key, sleep_ms = sleep_time.as_millis() as u64, "Waiting for slot expiry");
                thread::sleep(sleep_time);
            }
        }

        true
    }

    fn rate(&self) -> f64 {
        self.limit as f64 / self.window.as_secs_f64()
    }

    fn token(&self, key: &str) -> u64 {
        let entry = self.keys.entry(key, VecDeque::new);
        let mut samples = entry.lock();

        self.prune(&mut samples, Instant::now());
        self.limit.saturating_sub(samples.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_allow_within_limit() {
        let config = LimiterConfig::windowed(3, Duration::from_secs(1));
        let limiter = SlidingWindowLimiter::new(&config).unwrap();

        assert!(limiter.allow("client_a"));
        assert!(limiter.allow("client_a"));
        assert!(limiter.allow("client_a"));
        assert!(!limiter.allow("client_a"));
    }

    #[test]
    fn test_sliding_expiry() {
        let config = LimiterConfig::windowed(1, Duration::from_millis(100));
        let limiter = SlidingWindowLimiter::new(&config).unwrap();

        assert_eq!(limiter.token("client_a"), 1);
        assert!(limiter.allow("client_a"));
        assert_eq!(limiter.token("client_a"), 0);
        assert!(!limiter.allow("client_a"));

        thread::sleep(Duration::from_millis(120));

        assert!(limiter.allow("client_a"));
    }

    #[test]
    fn test_window_slides_rather_than_resets() {
        let config = LimiterConfig::windowed(2, Duration::from_millis(200));
        let limiter = SlidingWindowLimiter::new(&config).unwrap();

        assert!(limiter.allow("client_a"));
        thread::sleep(Duration::from_millis(120));
        assert!(limiter.allow("client_a"));
        assert!(!limiter.allow("client_a"));

        // The first sample expires before the second one does.
        thread::sleep(Duration::from_millis(100));
        assert_eq!(limiter.token("client_a"), 1);
        assert!(limiter.allow("client_a"));
        assert!(!limiter.allow("client_a"));
    }

    #[test]
    fn test_token_reflects_expiry() {
        let config = LimiterConfig::windowed(2, Duration::from_millis(100));
        let limiter = SlidingWindowLimiter::new(&config).unwrap();

        limiter.allow("client_a");
        limiter.allow("client_a");
        assert_eq!(limiter.token("client_a"), 0);

        thread::sleep(Duration::from_millis(120));
        assert_eq!(limiter.token("client_a"), 2);
    }

    #[test]
    fn test_wait_blocks_until_one_slot_frees() {
        let config = LimiterConfig::windowed(1, Duration::from_millis(100));
        let limiter = SlidingWindowLimiter::new(&config).unwrap();

        assert!(limiter.allow("client_a"));

        let start = Instant::now();
        assert!(limiter.wait("client_a"));
        let waited = start.elapsed();

        assert!(waited >= Duration::from_millis(50), "waited {:?}", waited);
        assert!(waited < Duration::from_millis(200), "waited {:?}", waited);

        assert!(limiter.allow("client_a"));
    }

    #[test]
    fn test_wait_on_empty_log_returns_immediately() {
        let config = LimiterConfig::windowed(1, Duration::from_millis(500));
        let limiter = SlidingWindowLimiter::new(&config).unwrap();

        let start = Instant::now();
        assert!(limiter.wait("fresh"));
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[test]
    fn test_concurrent_allow_admits_exactly_limit() {
        let config = LimiterConfig::windowed(10, Duration::from_secs(5));
        let limiter = Arc::new(SlidingWindowLimiter::new(&config).unwrap());
        let admitted = Arc::new(AtomicU64::new(0));

        let handles: Vec<_> = (0..40)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                let admitted = Arc::clone(&admitted);
                thread::spawn(move || {
                    if limiter.allow("shared") {
                        admitted.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(admitted.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn test_independent_keys() {
        let config = LimiterConfig::windowed(1, Duration::from_secs(5));
        let limiter = SlidingWindowLimiter::new(&config).unwrap();

        assert!(limiter.allow("client_a"));
        assert!(!limiter.allow("client_a"));
        assert!(limiter.allow("client_b"));
        assert_eq!(limiter.keys(), 2);
    }

    #[test]
    fn test_rate() {
        let config = LimiterConfig::windowed(5, Duration::from_millis(500));
        let limiter = SlidingWindowLimiter::new(&config).unwrap();
        assert_eq!(limiter.rate(), 10.0);
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = LimiterConfig::windowed(3, Duration::ZERO);
        assert!(SlidingWindowLimiter::new(&config).is_err());
    }
}
