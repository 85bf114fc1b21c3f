//! Per-actor single-flight gate.
//!
//! An advisory mutex keyed by actor id: at most one gated operation per
//! actor is in flight at a time, whatever the operation is. Acquisition
//! hands back an RAII guard so the slot is freed on every exit path,
//! including panics and task cancellation. This gate serializes one actor's
//! work; it does not protect the other stores, which carry their own locks.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::lock;
use crate::types::ActorId;

type InFlightMap = Arc<Mutex<HashMap<ActorId, String>>>;

#[derive(Default, Clone)]
pub struct ActorLocks {
    in_flight: InFlightMap,
}

impl ActorLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the actor's slot, recording the operation name.
    ///
    /// Fails while any operation for this actor is in flight, regardless of
    /// name: an actor cannot run a second gated operation alongside a first.
    pub fn try_acquire(&self, actor: ActorId, op_name: &str) -> Option<ActorLockGuard> {
        let mut in_flight = lock(&self.in_flight);
        if in_flight.contains_key(&actor) {
            return None;
        }
        in_flight.insert(actor, op_name.to_string());
        Some(ActorLockGuard {
            in_flight: Arc::clone(&self.in_flight),
            actor,
        })
    }

    /// Frees the actor's slot. Releasing an idle actor is a no-op.
    pub fn release(&self, actor: ActorId) {
        lock(&self.in_flight).remove(&actor);
    }

    /// Name of the operation currently running for the actor, if any.
    pub fn running_op(&self, actor: ActorId) -> Option<String> {
        lock(&self.in_flight).get(&actor).cloned()
    }

    /// Number of actors with an operation in flight.
    pub fn held(&self) -> usize {
        lock(&self.in_flight).len()
    }
}

/// Frees the actor's slot on drop.
pub struct ActorLockGuard {
    in_flight: InFlightMap,
    actor: ActorId,
}

impl Drop for ActorLockGuard {
    fn drop(&mut self) {
        lock(&self.in_flight).remove(&self.actor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_fails_until_release() {
        let locks = ActorLocks::new();

        let guard = locks.try_acquire(ActorId(1), "chat");
        assert!(guard.is_some());
        // Denied for a different operation name too.
        assert!(locks.try_acquire(ActorId(1), "status").is_none());
        assert_eq!(locks.running_op(ActorId(1)).as_deref(), Some("chat"));

        drop(guard);
        assert!(locks.try_acquire(ActorId(1), "status").is_some());
    }

    #[test]
    fn different_actors_do_not_contend() {
        let locks = ActorLocks::new();
        let _a = locks.try_acquire(ActorId(1), "chat").unwrap();
        let _b = locks.try_acquire(ActorId(2), "chat").unwrap();
        assert_eq!(locks.held(), 2);
    }

    #[test]
    fn release_is_idempotent() {
        let locks = ActorLocks::new();
        locks.release(ActorId(1));

        let guard = locks.try_acquire(ActorId(1), "chat").unwrap();
        locks.release(ActorId(1));
        locks.release(ActorId(1));
        assert_eq!(locks.held(), 0);
        // Guard drop after an explicit release must not disturb other actors.
        let _other = locks.try_acquire(ActorId(2), "chat").unwrap();
        drop(guard);
        assert_eq!(locks.held(), 1);
    }

    #[test]
    fn guard_releases_even_when_the_holder_panics() {
        let locks = ActorLocks::new();
        let locks_for_panic = locks.clone();

        let result = std::thread::spawn(move || {
            let _guard = locks_for_panic.try_acquire(ActorId(1), "chat").unwrap();
            panic!("handler blew up");
        })
        .join();
        assert!(result.is_err());

        assert!(locks.try_acquire(ActorId(1), "chat").is_some());
    }
}
