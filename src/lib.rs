//! Ratekeeper - Per-Key Rate Limiting Primitives
//!
//! This crate implements single-process, in-memory admission control keyed
//! by an opaque caller-supplied identifier. Three interchangeable policies
//! share one capability contract: a fixed window counter, a sliding window
//! log, and a token bucket. Limiters are constructed once from an immutable
//! configuration and embedded at the point where a unit of work is admitted.
//!
//! Per-key state is created lazily on first use and never evicted, so memory
//! grows with key cardinality for the life of the limiter. Callers with
//! high-cardinality or churning key spaces should bound the keys they pass
//! in; idle-key eviction is a deliberate non-feature because it would make
//! idle keys forget their admission history.

pub mod config;
pub mod error;
pub mod limiter;
