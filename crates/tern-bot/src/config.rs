//! Bot configuration, loaded from a TOML file.
//!
//! Every field has a default, so an empty file (or a missing optional
//! section) yields a working config. Durations are stored as plain
//! integers in the file and converted here.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tern_core::{AdmissionLimits, GateLimits, HealthConfig, HistoryLimits};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Bot username, used to match `/command@name` forms in group chats.
    pub bot_name: Option<String>,

    /// Cap on the exact-duplicate event id set.
    pub max_event_ids: usize,
    /// Cap on the per-actor debounce map.
    pub max_actor_entries: usize,
    /// Same-content messages from one actor inside this window are dropped.
    pub debounce_window_ms: u64,

    /// Minimum spacing between chat turns from one actor.
    pub chat_rate_limit_secs: u64,
    /// Rate-limit entries idle this long are dropped by the cleanup sweep.
    pub rate_entry_ttl_hours: u64,

    /// Turns kept per channel.
    pub max_turns_per_channel: usize,
    /// Channels kept before the lowest-id one is evicted.
    pub max_channels: usize,

    /// Cleanup sweep period.
    pub cleanup_period_secs: u64,
    /// Health monitor period.
    pub health_period_secs: u64,
    /// Ceiling on one model response while the actor's slot is held.
    pub respond_timeout_secs: u64,

    /// Resident set size above which the monitor sweeps immediately.
    pub memory_limit_mb: u64,
    /// Error rate (errors / commands) above which the monitor warns.
    pub warn_error_rate: f64,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            bot_name: None,
            max_event_ids: 1000,
            max_actor_entries: 100,
            debounce_window_ms: 3000,
            chat_rate_limit_secs: 30,
            rate_entry_ttl_hours: 24,
            max_turns_per_channel: 10,
            max_channels: 50,
            cleanup_period_secs: 30 * 60,
            health_period_secs: 5 * 60,
            respond_timeout_secs: 30,
            memory_limit_mb: 512,
            warn_error_rate: 0.20,
        }
    }
}

impl BotConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config at {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("Failed to parse config at {}", path.display()))
    }

    pub fn gate_limits(&self) -> GateLimits {
        GateLimits {
            admission: AdmissionLimits {
                max_event_ids: self.max_event_ids,
                max_actor_entries: self.max_actor_entries,
                debounce_window: Duration::from_millis(self.debounce_window_ms),
            },
            history: HistoryLimits {
                max_turns: self.max_turns_per_channel,
                max_channels: self.max_channels,
            },
            rate_entry_ttl: Duration::from_secs(self.rate_entry_ttl_hours * 60 * 60),
        }
    }

    pub fn health_config(&self) -> HealthConfig {
        HealthConfig {
            memory_limit_bytes: self.memory_limit_mb * 1024 * 1024,
            warn_error_rate: self.warn_error_rate,
        }
    }

    pub fn chat_rate_limit(&self) -> Duration {
        Duration::from_secs(self.chat_rate_limit_secs)
    }

    pub fn cleanup_period(&self) -> Duration {
        Duration::from_secs(self.cleanup_period_secs)
    }

    pub fn health_period(&self) -> Duration {
        Duration::from_secs(self.health_period_secs)
    }

    pub fn respond_timeout(&self) -> Duration {
        Duration::from_secs(self.respond_timeout_secs)
    }
}
