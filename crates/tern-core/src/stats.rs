//! Process-wide counters for the status surface.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};

use crate::lock;

const MAX_LAST_ERROR_CHARS: usize = 200;

pub struct Stats {
    commands_executed: AtomicU64,
    messages_processed: AtomicU64,
    errors_count: AtomicU64,
    last_error: Mutex<Option<String>>,
    last_heartbeat: Mutex<Option<DateTime<Utc>>>,
    started_at: DateTime<Utc>,
}

impl Stats {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            commands_executed: AtomicU64::new(0),
            messages_processed: AtomicU64::new(0),
            errors_count: AtomicU64::new(0),
            last_error: Mutex::new(None),
            last_heartbeat: Mutex::new(None),
            started_at,
        }
    }

    pub fn record_command(&self) {
        self.commands_executed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_message(&self) {
        self.messages_processed.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a handler failure and keeps a truncated copy of the message.
    pub fn record_error(&self, message: &str) {
        self.errors_count.fetch_add(1, Ordering::Relaxed);
        let truncated = if message.chars().count() > MAX_LAST_ERROR_CHARS {
            message.chars().take(MAX_LAST_ERROR_CHARS).collect()
        } else {
            message.to_string()
        };
        *lock(&self.last_error) = Some(truncated);
    }

    pub fn touch_heartbeat(&self, now: DateTime<Utc>) {
        *lock(&self.last_heartbeat) = Some(now);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            commands_executed: self.commands_executed.load(Ordering::Relaxed),
            messages_processed: self.messages_processed.load(Ordering::Relaxed),
            errors_count: self.errors_count.load(Ordering::Relaxed),
            last_error: lock(&self.last_error).clone(),
            last_heartbeat: *lock(&self.last_heartbeat),
            started_at: self.started_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub commands_executed: u64,
    pub messages_processed: u64,
    pub errors_count: u64,
    pub last_error: Option<String>,
    pub last_heartbeat: Option<DateTime<Utc>>,
    pub started_at: DateTime<Utc>,
}

impl StatsSnapshot {
    /// Errors per executed command, defined as 0 before any command ran.
    pub fn error_rate(&self) -> f64 {
        if self.commands_executed == 0 {
            0.0
        } else {
            self.errors_count as f64 / self.commands_executed as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate_into_the_snapshot() {
        let stats = Stats::new(Utc::now());
        stats.record_command();
        stats.record_command();
        stats.record_message();
        stats.record_error("model call failed");

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.commands_executed, 2);
        assert_eq!(snapshot.messages_processed, 1);
        assert_eq!(snapshot.errors_count, 1);
        assert_eq!(snapshot.last_error.as_deref(), Some("model call failed"));
    }

    #[test]
    fn last_error_is_truncated() {
        let stats = Stats::new(Utc::now());
        stats.record_error(&"x".repeat(500));

        let last_error = stats.snapshot().last_error.unwrap();
        assert_eq!(last_error.chars().count(), 200);
    }

    #[test]
    fn error_rate_is_zero_before_any_command() {
        let stats = Stats::new(Utc::now());
        stats.record_error("early failure");
        assert_eq!(stats.snapshot().error_rate(), 0.0);

        for _ in 0..4 {
            stats.record_command();
        }
        assert!((stats.snapshot().error_rate() - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn heartbeat_updates() {
        let stats = Stats::new(Utc::now());
        assert!(stats.snapshot().last_heartbeat.is_none());

        let now = Utc::now();
        stats.touch_heartbeat(now);
        assert_eq!(stats.snapshot().last_heartbeat, Some(now));
    }
}
