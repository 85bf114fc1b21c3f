//! Liveness and error-rate monitoring.
//!
//! One monitor pass samples process memory, computes the command error
//! rate, and escalates: a warning log past the error-rate threshold, an
//! immediate cleanup sweep past the memory limit. The snapshot is the
//! JSON health document an HTTP collaborator serves to the process
//! supervisor.

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::gateway::Gateway;

#[derive(Debug, Clone, Copy)]
pub struct HealthConfig {
    /// Resident set size above which a sweep runs immediately.
    pub memory_limit_bytes: u64,
    /// Error rate (errors / commands) above which a warning is logged.
    pub warn_error_rate: f64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            memory_limit_bytes: 512 * 1024 * 1024,
            warn_error_rate: 0.20,
        }
    }
}

/// Read-only status document for supervisors.
#[derive(Debug, Clone, Serialize)]
pub struct HealthSnapshot {
    pub status: &'static str,
    pub uptime_seconds: i64,
    pub ready: bool,
    pub commands_executed: u64,
    pub messages_processed: u64,
    pub errors_count: u64,
    pub last_error: Option<String>,
    pub last_heartbeat: Option<DateTime<Utc>>,
}

pub(crate) fn snapshot(gateway: &Gateway, ready: bool, now: DateTime<Utc>) -> HealthSnapshot {
    let stats = gateway.stats().snapshot();
    HealthSnapshot {
        status: if ready { "ok" } else { "degraded" },
        uptime_seconds: (now - stats.started_at).num_seconds(),
        ready,
        commands_executed: stats.commands_executed,
        messages_processed: stats.messages_processed,
        errors_count: stats.errors_count,
        last_error: stats.last_error,
        last_heartbeat: stats.last_heartbeat,
    }
}

/// One monitor pass: heartbeat, error-rate warning, memory-pressure sweep.
///
/// Never fails; everything it does is a log line or an in-memory trim.
pub fn run_health_check(gateway: &Gateway, config: &HealthConfig, now: Instant, wall: DateTime<Utc>) {
    gateway.stats().touch_heartbeat(wall);

    let stats = gateway.stats().snapshot();
    let error_rate = stats.error_rate();
    if error_rate > config.warn_error_rate {
        tracing::warn!(
            error_rate,
            errors = stats.errors_count,
            commands = stats.commands_executed,
            "command error rate above threshold"
        );
    }

    match process_rss_bytes() {
        Some(rss) if rss > config.memory_limit_bytes => {
            tracing::warn!(
                rss_bytes = rss,
                limit_bytes = config.memory_limit_bytes,
                "memory above limit, sweeping early"
            );
            gateway.sweep(now);
        }
        Some(rss) => {
            tracing::debug!(rss_bytes = rss, error_rate, "health check passed");
        }
        None => {
            tracing::debug!(error_rate, "health check passed (no memory sampling here)");
        }
    }
}

/// Hourly liveness summary, emitted best-effort by the monitor loop.
pub fn log_uptime_summary(gateway: &Gateway, wall: DateTime<Utc>) {
    let stats = gateway.stats().snapshot();
    let uptime = wall - stats.started_at;
    tracing::info!(
        uptime_hours = uptime.num_hours(),
        commands = stats.commands_executed,
        messages = stats.messages_processed,
        errors = stats.errors_count,
        "uptime summary"
    );
}

/// Resident set size of this process, where the platform exposes it.
#[cfg(target_os = "linux")]
pub fn process_rss_bytes() -> Option<u64> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    let line = status.lines().find(|line| line.starts_with("VmRSS:"))?;
    let kib: u64 = line.split_whitespace().nth(1)?.parse().ok()?;
    Some(kib * 1024)
}

#[cfg(not(target_os = "linux"))]
pub fn process_rss_bytes() -> Option<u64> {
    None
}
