//! Background maintenance loops.
//!
//! Per-operation bound checks keep the stores capped under traffic; these
//! loops keep them capped through idle stretches and watch process health.
//! Both run until the shutdown token fires.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tern_core::{log_uptime_summary, run_health_check};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::client::{ChatClient, Responder};
use crate::context::BotContext;

const UPTIME_SUMMARY_PERIOD: Duration = Duration::from_secs(60 * 60);

pub fn spawn_background_tasks<C: ChatClient, R: Responder>(
    context: &Arc<BotContext<C, R>>,
    shutdown: &CancellationToken,
) -> Vec<JoinHandle<()>> {
    vec![
        tokio::spawn(cleanup_loop(Arc::clone(context), shutdown.clone())),
        tokio::spawn(health_loop(Arc::clone(context), shutdown.clone())),
    ]
}

async fn cleanup_loop<C: ChatClient, R: Responder>(
    context: Arc<BotContext<C, R>>,
    shutdown: CancellationToken,
) {
    let mut ticker = tokio::time::interval(context.config().cleanup_period());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; skip it so the first sweep
    // happens one full period after startup.
    ticker.tick().await;

    loop {
        tokio::select! {
            () = shutdown.cancelled() => break,
            _ = ticker.tick() => context.gateway().sweep(Instant::now()),
        }
    }
    tracing::debug!("cleanup loop stopped");
}

async fn health_loop<C: ChatClient, R: Responder>(
    context: Arc<BotContext<C, R>>,
    shutdown: CancellationToken,
) {
    let health_config = context.config().health_config();
    let mut ticker = tokio::time::interval(context.config().health_period());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;

    let mut last_summary = Instant::now();
    loop {
        tokio::select! {
            () = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                run_health_check(context.gateway(), &health_config, Instant::now(), Utc::now());
                if last_summary.elapsed() >= UPTIME_SUMMARY_PERIOD {
                    log_uptime_summary(context.gateway(), Utc::now());
                    last_summary = Instant::now();
                }
            }
        }
    }
    tracing::debug!("health loop stopped");
}
