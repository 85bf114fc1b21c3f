//! Duplicate suppression for inbound events.
//!
//! Two layers: an exact event-id check, which absorbs transport
//! redeliveries carrying the same id, and a per-actor content debounce,
//! which absorbs immediate resends of identical text. Both caches are
//! capped; when an insert would exceed a cap the whole map is cleared
//! before the new entry lands, keeping bound enforcement O(1) at the cost
//! of forgetting prior entries all at once.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::lock;
use crate::types::{ActorId, EventId};

/// Outcome of admitting one inbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Accept,
    /// The event id was already seen.
    DuplicateExact,
    /// The same actor sent identical content within the debounce window.
    DuplicateDebounced,
}

/// Caps and window for the admission caches.
#[derive(Debug, Clone, Copy)]
pub struct AdmissionLimits {
    pub max_event_ids: usize,
    pub max_actor_entries: usize,
    pub debounce_window: Duration,
}

impl Default for AdmissionLimits {
    fn default() -> Self {
        Self {
            max_event_ids: 1000,
            max_actor_entries: 100,
            debounce_window: Duration::from_secs(3),
        }
    }
}

#[derive(Default)]
struct AdmissionState {
    seen_events: HashSet<EventId>,
    last_by_actor: HashMap<ActorId, (String, Instant)>,
}

pub struct AdmissionController {
    limits: AdmissionLimits,
    state: Mutex<AdmissionState>,
}

impl AdmissionController {
    pub fn new(limits: AdmissionLimits) -> Self {
        Self {
            limits,
            state: Mutex::new(AdmissionState::default()),
        }
    }

    /// Decides whether to process an event.
    ///
    /// Duplicate outcomes leave the caches untouched. Only `Accept` records
    /// the event id and the actor's latest content, and cap enforcement runs
    /// inside that insert step, after the decision, so a coarse reset never
    /// changes the decision being returned.
    pub fn admit(
        &self,
        event_id: EventId,
        actor: ActorId,
        content: &str,
        now: Instant,
    ) -> Admission {
        let mut state = lock(&self.state);

        if state.seen_events.contains(&event_id) {
            return Admission::DuplicateExact;
        }

        if let Some((last_content, last_seen)) = state.last_by_actor.get(&actor)
            && last_content == content
            && now.duration_since(*last_seen) < self.limits.debounce_window
        {
            return Admission::DuplicateDebounced;
        }

        if state.seen_events.len() >= self.limits.max_event_ids {
            tracing::debug!(
                dropped = state.seen_events.len(),
                "event id cache full, clearing"
            );
            state.seen_events.clear();
        }
        state.seen_events.insert(event_id);

        if !state.last_by_actor.contains_key(&actor)
            && state.last_by_actor.len() >= self.limits.max_actor_entries
        {
            tracing::debug!(
                dropped = state.last_by_actor.len(),
                "actor debounce cache full, clearing"
            );
            state.last_by_actor.clear();
        }
        state.last_by_actor.insert(actor, (content.to_string(), now));

        Admission::Accept
    }

    /// Re-applies both caps. No-op while the caches are within bounds.
    pub fn enforce_caps(&self) {
        let mut state = lock(&self.state);
        if state.seen_events.len() > self.limits.max_event_ids {
            state.seen_events.clear();
        }
        if state.last_by_actor.len() > self.limits.max_actor_entries {
            state.last_by_actor.clear();
        }
    }

    pub fn event_ids_tracked(&self) -> usize {
        lock(&self.state).seen_events.len()
    }

    pub fn actors_tracked(&self) -> usize {
        lock(&self.state).last_by_actor.len()
    }
}
