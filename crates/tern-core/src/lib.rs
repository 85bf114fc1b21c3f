//! Event-gating core for a long-running chat assistant bot.
//!
//! Everything a dispatch layer needs to process a stream of human-sent
//! events at most once, fairly, and in bounded memory over weeks of
//! uptime: duplicate suppression, per-actor rate limiting, per-actor
//! single-flight execution, capped conversation history, and the counters
//! and sweeps that keep it all honest. The chat platform and the model
//! behind the handlers are the caller's business.

pub mod admission;
pub mod gateway;
pub mod health;
pub mod history;
pub mod ratelimit;
pub mod singleflight;
pub mod stats;
pub mod types;

pub use admission::{Admission, AdmissionController, AdmissionLimits};
pub use gateway::{GateLimits, Gateway, LockOutcome};
pub use health::{
    HealthConfig, HealthSnapshot, log_uptime_summary, process_rss_bytes, run_health_check,
};
pub use history::{ConversationHistory, HistoryLimits};
pub use ratelimit::{RateDecision, RateLimiter};
pub use singleflight::{ActorLockGuard, ActorLocks};
pub use stats::{Stats, StatsSnapshot};
pub use types::{ActorId, ChannelId, EventId, Turn};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Poison-tolerant lock acquisition: a panicked writer must not wedge the
/// stores for the rest of the process lifetime.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
