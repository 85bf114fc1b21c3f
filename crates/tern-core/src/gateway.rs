//! The gate every inbound event passes through.
//!
//! Owns the shared stores — admission caches, rate limiter, actor locks,
//! conversation history, stats — and composes them: `on_inbound_event` for
//! admission, `with_actor_lock` for single-flight handler execution,
//! `sweep` for periodic cap re-enforcement. Each store carries its own
//! lock, so a `Gateway` behind an `Arc` is shared freely across tasks.

use std::future::Future;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use crate::admission::{Admission, AdmissionController, AdmissionLimits};
use crate::health::{self, HealthSnapshot};
use crate::history::{ConversationHistory, HistoryLimits};
use crate::ratelimit::RateLimiter;
use crate::singleflight::ActorLocks;
use crate::stats::Stats;
use crate::types::{ActorId, ChannelId, EventId};

/// Tunables for the shared stores.
#[derive(Debug, Clone, Copy)]
pub struct GateLimits {
    pub admission: AdmissionLimits,
    pub history: HistoryLimits,
    /// Rate-limit entries idle this long are dropped by the sweep.
    pub rate_entry_ttl: Duration,
}

impl Default for GateLimits {
    fn default() -> Self {
        Self {
            admission: AdmissionLimits::default(),
            history: HistoryLimits::default(),
            rate_entry_ttl: Duration::from_secs(24 * 60 * 60),
        }
    }
}

/// Result of running a handler body under the per-actor lock.
#[derive(Debug, PartialEq, Eq)]
pub enum LockOutcome<T> {
    Completed(T),
    /// Another operation for this actor is still in flight. Not an error;
    /// the caller should ask the actor to wait.
    Busy,
}

pub struct Gateway {
    admission: AdmissionController,
    rate_limiter: RateLimiter,
    locks: ActorLocks,
    history: ConversationHistory,
    stats: Stats,
    rate_entry_ttl: Duration,
}

impl Gateway {
    pub fn new(limits: GateLimits, started_at: DateTime<Utc>) -> Self {
        Self {
            admission: AdmissionController::new(limits.admission),
            rate_limiter: RateLimiter::new(),
            locks: ActorLocks::new(),
            history: ConversationHistory::new(limits.history),
            stats: Stats::new(started_at),
            rate_entry_ttl: limits.rate_entry_ttl,
        }
    }

    /// Admission decision for one inbound event. Duplicates are suppressed
    /// without side effects; accepted events are recorded for future checks.
    pub fn on_inbound_event(
        &self,
        event_id: EventId,
        actor: ActorId,
        channel: ChannelId,
        content: &str,
        now: Instant,
    ) -> Admission {
        let decision = self.admission.admit(event_id, actor, content, now);
        if decision != Admission::Accept {
            tracing::debug!(%event_id, %actor, %channel, ?decision, "suppressed duplicate event");
        }
        decision
    }

    /// Runs `body` while holding the actor's single-flight slot.
    ///
    /// Returns `Busy` without polling `body` when the actor already has an
    /// operation in flight. The slot is freed when the body completes or
    /// the future is dropped, so cancellation cannot leak the lock.
    pub async fn with_actor_lock<T, F>(&self, actor: ActorId, op_name: &str, body: F) -> LockOutcome<T>
    where
        F: Future<Output = T>,
    {
        let Some(_guard) = self.locks.try_acquire(actor, op_name) else {
            tracing::debug!(%actor, op_name, running = ?self.locks.running_op(actor), "actor busy");
            return LockOutcome::Busy;
        };
        LockOutcome::Completed(body.await)
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn locks(&self) -> &ActorLocks {
        &self.locks
    }

    /// Re-applies every cap and drops stale rate-limit entries. Idempotent;
    /// runs on the cleanup period and again whenever memory pressure asks.
    pub fn sweep(&self, now: Instant) {
        self.admission.enforce_caps();
        let pruned = self.rate_limiter.prune_older_than(now, self.rate_entry_ttl);
        self.history.enforce_caps();
        tracing::debug!(
            pruned_rate_entries = pruned,
            event_ids = self.admission.event_ids_tracked(),
            debounce_actors = self.admission.actors_tracked(),
            rate_actors = self.rate_limiter.actors_tracked(),
            channels = self.history.channels_tracked(),
            turns = self.history.turns_tracked(),
            in_flight = self.locks.held(),
            "cleanup sweep finished"
        );
    }

    /// The JSON-ready status document for an external HTTP collaborator.
    /// `ready` comes from the caller's connection state.
    pub fn health_snapshot(&self, ready: bool, now: DateTime<Utc>) -> HealthSnapshot {
        health::snapshot(self, ready, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway() -> Gateway {
        Gateway::new(GateLimits::default(), Utc::now())
    }

    #[tokio::test]
    async fn with_actor_lock_runs_the_body_and_frees_the_slot() {
        let gateway = gateway();

        let outcome = gateway
            .with_actor_lock(ActorId(1), "chat", async { 41 + 1 })
            .await;
        assert_eq!(outcome, LockOutcome::Completed(42));
        assert_eq!(gateway.locks().held(), 0);
    }

    #[tokio::test]
    async fn with_actor_lock_reports_busy_while_held() {
        let gateway = gateway();
        let guard = gateway.locks().try_acquire(ActorId(1), "chat").unwrap();

        let outcome = gateway
            .with_actor_lock(ActorId(1), "status", async {})
            .await;
        assert_eq!(outcome, LockOutcome::Busy);

        drop(guard);
        let outcome = gateway
            .with_actor_lock(ActorId(1), "status", async {})
            .await;
        assert_eq!(outcome, LockOutcome::Completed(()));
    }

    #[tokio::test]
    async fn cancelled_body_does_not_leak_the_lock() {
        let gateway = gateway();

        {
            let pending = gateway.with_actor_lock(ActorId(1), "chat", std::future::pending::<()>());
            tokio::pin!(pending);
            // Poll once so the lock is taken, then drop the future.
            let poll = futures_poll_once(pending.as_mut()).await;
            assert!(poll.is_none());
            assert_eq!(gateway.locks().held(), 1);
        }

        assert_eq!(gateway.locks().held(), 0);
    }

    async fn futures_poll_once<F: Future>(future: std::pin::Pin<&mut F>) -> Option<F::Output> {
        use std::task::Poll;
        let mut future = Some(future);
        std::future::poll_fn(move |cx| {
            let polled = future.take().expect("polled twice").poll(cx);
            match polled {
                Poll::Ready(value) => Poll::Ready(Some(value)),
                Poll::Pending => Poll::Ready(None),
            }
        })
        .await
    }

    #[test]
    fn sweep_twice_changes_nothing() {
        let gateway = gateway();
        let t = Instant::now();

        gateway.on_inbound_event(EventId(1), ActorId(1), ChannelId(1), "hi", t);
        gateway.rate_limiter().commit(ActorId(1), t);
        gateway.history().append(
            ChannelId(1),
            crate::types::Turn {
                speaker: "ada".into(),
                message: "hi".into(),
                timestamp: Utc::now(),
                response: "hello".into(),
            },
        );

        gateway.sweep(t + Duration::from_secs(60));
        let channels = gateway.history().channels_tracked();
        let rate_actors = gateway.rate_limiter().actors_tracked();

        gateway.sweep(t + Duration::from_secs(60));
        assert_eq!(gateway.history().channels_tracked(), channels);
        assert_eq!(gateway.rate_limiter().actors_tracked(), rate_actors);
    }

    #[test]
    fn sweep_drops_stale_rate_entries() {
        let gateway = gateway();
        let t = Instant::now();

        gateway.rate_limiter().commit(ActorId(1), t);
        gateway.sweep(t + Duration::from_secs(25 * 60 * 60));
        assert_eq!(gateway.rate_limiter().actors_tracked(), 0);
    }
}
