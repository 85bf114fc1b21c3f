//! Minimum-interval rate limiting per actor.
//!
//! `check` is a pure read and `commit` a separate write, so the caller
//! controls exactly when an actor's interval restarts. The split carries a
//! usage contract: commit synchronously right after an `Allowed` check,
//! before the gated work first suspends. Committing after a slow call
//! leaves a window where a second request from the same actor also
//! observes `Allowed`.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::lock;
use crate::types::ActorId;

/// Result of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    Denied {
        /// Time left until the actor's window reopens.
        retry_after: Duration,
    },
}

#[derive(Default)]
pub struct RateLimiter {
    last_commit: Mutex<HashMap<ActorId, Instant>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pure read: denied while `window` has not elapsed since the actor's
    /// last commit. Never mutates.
    pub fn check(&self, actor: ActorId, now: Instant, window: Duration) -> RateDecision {
        match lock(&self.last_commit).get(&actor) {
            Some(last) => {
                let elapsed = now.duration_since(*last);
                if elapsed < window {
                    RateDecision::Denied {
                        retry_after: window - elapsed,
                    }
                } else {
                    RateDecision::Allowed
                }
            }
            None => RateDecision::Allowed,
        }
    }

    /// Restarts the actor's interval at `now`.
    ///
    /// Must run synchronously after an `Allowed` check, before any await in
    /// the gated work. The recorded instant never moves backwards, so a
    /// stale commit cannot shrink an already-open window.
    pub fn commit(&self, actor: ActorId, now: Instant) {
        let mut last_commit = lock(&self.last_commit);
        let entry = last_commit.entry(actor).or_insert(now);
        if now > *entry {
            *entry = now;
        }
    }

    /// Drops entries older than `max_age`. Returns how many were removed.
    pub fn prune_older_than(&self, now: Instant, max_age: Duration) -> usize {
        let mut last_commit = lock(&self.last_commit);
        let before = last_commit.len();
        last_commit.retain(|_, last| now.duration_since(*last) <= max_age);
        before - last_commit.len()
    }

    pub fn actors_tracked(&self) -> usize {
        lock(&self.last_commit).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(30);

    #[test]
    fn allowed_then_denied_with_remaining_then_allowed() {
        let limiter = RateLimiter::new();
        let t = Instant::now();

        assert_eq!(limiter.check(ActorId(1), t, WINDOW), RateDecision::Allowed);
        limiter.commit(ActorId(1), t);

        assert_eq!(
            limiter.check(ActorId(1), t + Duration::from_secs(10), WINDOW),
            RateDecision::Denied {
                retry_after: Duration::from_secs(20)
            }
        );
        assert_eq!(
            limiter.check(ActorId(1), t + Duration::from_secs(31), WINDOW),
            RateDecision::Allowed
        );
    }

    #[test]
    fn check_does_not_mutate() {
        let limiter = RateLimiter::new();
        let t = Instant::now();

        // Repeated checks without a commit all pass.
        for _ in 0..5 {
            assert_eq!(limiter.check(ActorId(1), t, WINDOW), RateDecision::Allowed);
        }
        assert_eq!(limiter.actors_tracked(), 0);
    }

    #[test]
    fn actors_are_limited_independently() {
        let limiter = RateLimiter::new();
        let t = Instant::now();

        limiter.commit(ActorId(1), t);
        assert!(matches!(
            limiter.check(ActorId(1), t + Duration::from_secs(1), WINDOW),
            RateDecision::Denied { .. }
        ));
        assert_eq!(
            limiter.check(ActorId(2), t + Duration::from_secs(1), WINDOW),
            RateDecision::Allowed
        );
    }

    #[test]
    fn commit_never_moves_backwards() {
        let limiter = RateLimiter::new();
        let t = Instant::now();

        limiter.commit(ActorId(1), t + Duration::from_secs(10));
        // A racing commit with an older timestamp is ignored.
        limiter.commit(ActorId(1), t);

        assert_eq!(
            limiter.check(ActorId(1), t + Duration::from_secs(11), WINDOW),
            RateDecision::Denied {
                retry_after: Duration::from_secs(29)
            }
        );
    }

    #[test]
    fn prune_drops_only_stale_entries() {
        let limiter = RateLimiter::new();
        let t = Instant::now();
        let day = Duration::from_secs(24 * 60 * 60);

        limiter.commit(ActorId(1), t);
        limiter.commit(ActorId(2), t + day);

        let pruned = limiter.prune_older_than(t + day + Duration::from_secs(1), day);
        assert_eq!(pruned, 1);
        assert_eq!(limiter.actors_tracked(), 1);

        // Pruning again with no traffic changes nothing.
        assert_eq!(
            limiter.prune_older_than(t + day + Duration::from_secs(1), day),
            0
        );
    }
}
