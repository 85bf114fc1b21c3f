//! Bounded conversation history.
//!
//! Two caps keep memory flat over weeks of uptime: each channel keeps at
//! most `max_turns` turns (FIFO, oldest dropped first), and the store
//! tracks at most `max_channels` channels. When a new channel would exceed
//! the global cap, the channel with the smallest id is evicted — eviction
//! follows ascending key order, not recency of use. Channels are admitted
//! with ascending transport ids in practice, so the evicted channel is the
//! first one ever tracked.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;

use crate::lock;
use crate::types::{ChannelId, Turn};

#[derive(Debug, Clone, Copy)]
pub struct HistoryLimits {
    pub max_turns: usize,
    pub max_channels: usize,
}

impl Default for HistoryLimits {
    fn default() -> Self {
        Self {
            max_turns: 10,
            max_channels: 50,
        }
    }
}

pub struct ConversationHistory {
    limits: HistoryLimits,
    channels: Mutex<BTreeMap<ChannelId, VecDeque<Turn>>>,
}

impl ConversationHistory {
    pub fn new(limits: HistoryLimits) -> Self {
        Self {
            limits,
            channels: Mutex::new(BTreeMap::new()),
        }
    }

    /// Appends one turn, evicting per the channel and global caps.
    pub fn append(&self, channel: ChannelId, turn: Turn) {
        let mut channels = lock(&self.channels);

        if !channels.contains_key(&channel)
            && channels.len() >= self.limits.max_channels
            && let Some((evicted, _)) = channels.pop_first()
        {
            tracing::debug!(%evicted, %channel, "channel cap reached, evicted lowest channel id");
        }

        let turns = channels.entry(channel).or_default();
        while turns.len() >= self.limits.max_turns && turns.pop_front().is_some() {}
        turns.push_back(turn);
    }

    /// Up to `limit` most recent turns, oldest first. Never mutates.
    pub fn recent(&self, channel: ChannelId, limit: usize) -> Vec<Turn> {
        lock(&self.channels)
            .get(&channel)
            .map(|turns| {
                let skip = turns.len().saturating_sub(limit);
                turns.iter().skip(skip).cloned().collect()
            })
            .unwrap_or_default()
    }

    /// Forgets a channel entirely; it no longer counts against the global
    /// cap. Returns whether the channel was tracked.
    pub fn clear(&self, channel: ChannelId) -> bool {
        lock(&self.channels).remove(&channel).is_some()
    }

    pub fn channels_tracked(&self) -> usize {
        lock(&self.channels).len()
    }

    pub fn turns_tracked(&self) -> usize {
        lock(&self.channels).values().map(VecDeque::len).sum()
    }

    /// Re-applies both caps. No-op while the store is within bounds.
    pub fn enforce_caps(&self) {
        let mut channels = lock(&self.channels);
        while channels.len() > self.limits.max_channels && channels.pop_first().is_some() {}
        for turns in channels.values_mut() {
            while turns.len() > self.limits.max_turns && turns.pop_front().is_some() {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn turn(n: usize) -> Turn {
        Turn {
            speaker: "ada".to_string(),
            message: format!("message {n}"),
            timestamp: Utc::now(),
            response: format!("reply {n}"),
        }
    }

    fn history() -> ConversationHistory {
        ConversationHistory::new(HistoryLimits::default())
    }

    #[test]
    fn per_channel_overflow_drops_oldest_first() {
        let history = history();
        for n in 1..=12 {
            history.append(ChannelId(9), turn(n));
        }

        let turns = history.recent(ChannelId(9), 100);
        assert_eq!(turns.len(), 10);
        assert_eq!(turns.first().unwrap().message, "message 3");
        assert_eq!(turns.last().unwrap().message, "message 12");
    }

    #[test]
    fn recent_respects_limit_and_keeps_order() {
        let history = history();
        for n in 1..=5 {
            history.append(ChannelId(1), turn(n));
        }

        let turns = history.recent(ChannelId(1), 2);
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].message, "message 4");
        assert_eq!(turns[1].message, "message 5");

        assert!(history.recent(ChannelId(99), 10).is_empty());
    }

    #[test]
    fn global_overflow_evicts_lowest_channel_id() {
        let history = history();
        for id in 1..=50 {
            history.append(ChannelId(id), turn(1));
        }
        assert_eq!(history.channels_tracked(), 50);

        history.append(ChannelId(51), turn(1));
        assert_eq!(history.channels_tracked(), 50);
        assert!(history.recent(ChannelId(1), 10).is_empty());
        assert_eq!(history.recent(ChannelId(51), 10).len(), 1);
    }

    #[test]
    fn clear_frees_a_slot_under_the_global_cap() {
        let history = history();
        for id in 1..=50 {
            history.append(ChannelId(id), turn(1));
        }

        assert!(history.clear(ChannelId(30)));
        assert!(!history.clear(ChannelId(30)));
        assert_eq!(history.channels_tracked(), 49);

        // The freed slot admits a new channel without evicting anyone.
        history.append(ChannelId(60), turn(1));
        assert_eq!(history.channels_tracked(), 50);
        assert_eq!(history.recent(ChannelId(2), 10).len(), 1);
    }

    #[test]
    fn enforce_caps_is_idempotent() {
        let history = history();
        for n in 1..=8 {
            history.append(ChannelId(1), turn(n));
        }

        history.enforce_caps();
        let after_first = history.recent(ChannelId(1), 100);
        history.enforce_caps();
        let after_second = history.recent(ChannelId(1), 100);

        assert_eq!(after_first, after_second);
        assert_eq!(after_first.len(), 8);
    }
}
