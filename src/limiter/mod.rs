//! Rate limiting policies and their shared capability contract.

mod fixed_window;
mod keyed;
mod sliding_window;
mod token_bucket;

pub use fixed_window::FixedWindowLimiter;
pub use sliding_window::SlidingWindowLimiter;
pub use token_bucket::TokenBucketLimiter;

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::LimiterConfig;
use crate::error::{RatekeeperError, Result};

/// The capability contract shared by all limiting policies.
///
/// Implementations are thread-safe; any method may be called for any key
/// from any thread. All per-key state is serialized through that key's
/// dedicated lock, so calls for distinct keys never contend.
pub trait Limiter: Send + Sync {
    /// Decide whether a unit attributed to `key` is admitted right now.
    ///
    /// On admission the decision is recorded as part of the same atomic
    /// step; no other call for the same key can observe a stale count
    /// between the decision and the recording.
    fn allow(&self, key: &str) -> bool;

    /// Block the calling thread until `key` is admittable, then return
    /// `true`.
    ///
    /// The remaining delay is computed analytically and slept exactly once;
    /// there is no re-check after waking. The key's lock is held across the
    /// sleep, so concurrent callers for the same key queue behind it.
    fn wait(&self, key: &str) -> bool;

    /// The sustained admission rate in units per second implied by the
    /// configuration.
    fn rate(&self) -> f64;

    /// The number of additional admissions currently available for `key`.
    fn token(&self, key: &str) -> u64;
}

/// Discriminator selecting which policy backs a limiter instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    FixedWindow,
    SlidingWindow,
    TokenBucket,
}

impl FromStr for Algorithm {
    type Err = RatekeeperError;

    fn from_str(s: &str) -> Result<Self> {
        match s.replace('-', "_").as_str() {
            "fixed_window" => Ok(Algorithm::FixedWindow),
            "sliding_window" => Ok(Algorithm::SlidingWindow),
            "token_bucket" => Ok(Algorithm::TokenBucket),
            _ => Err(RatekeeperError::UnknownAlgorithm(s.to_string())),
        }
    }
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Algorithm::FixedWindow => write!(f, "fixed_window"),
            Algorithm::SlidingWindow => write!(f, "sliding_window"),
            Algorithm::TokenBucket => write!(f, "token_bucket"),
        }
    }
}

/// Construct the limiter backing `algorithm` from `config`.
///
/// The parameters relevant to the chosen policy are validated here;
/// non-positive bounds or zero durations are a configuration error.
pub fn build(algorithm: Algorithm, config: &LimiterConfig) -> Result<Box<dyn Limiter>> {
    let limiter: Box<dyn Limiter> = match algorithm {
        Algorithm::FixedWindow => Box::new(FixedWindowLimiter::new(config)?),
        Algorithm::SlidingWindow => Box::new(SlidingWindowLimiter::new(config)?),
        Algorithm::TokenBucket => Box::new(TokenBucketLimiter::new(config)?),
    };
    Ok(limiter)
}
